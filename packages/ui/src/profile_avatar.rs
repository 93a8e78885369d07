use dioxus::prelude::*;

use crate::avatar::{AvatarImage, AvatarResolver, ResolutionGuard};
use crate::backend::use_backend;

/// Avatar image for a stored `avatar_url` reference.
///
/// Re-resolves whenever `reference` or `user_id` changes; an unmounted or
/// superseded resolution never assigns its result.
#[component]
pub fn ProfileAvatar(
    reference: String,
    #[props(default)] user_id: String,
    #[props(default = 160)] size: u32,
) -> Element {
    let backend = use_backend();
    let guard = use_hook(ResolutionGuard::default);
    let mut image = use_signal(AvatarImage::default);

    let effect_guard = guard.clone();
    let error_user_id = user_id.clone();
    use_effect(use_reactive!(|(reference, user_id)| {
        let ticket = effect_guard.begin();
        let backend = backend.clone();
        tracing::debug!(user_id = %user_id, "resolving avatar");
        spawn(async move {
            let resolver = AvatarResolver::new(&*backend, backend.avatar_bucket());
            if let Some(src) = resolver.resolve_for(&ticket, &reference).await {
                image.write().show(src);
            }
        });
    }));

    use_drop(move || guard.cancel());

    let src = image.read().src().to_string();
    let rendered = src.clone();

    rsx! {
        img {
            class: "avatar",
            src: "{src}",
            alt: "Avatar",
            width: "{size}",
            height: "{size}",
            onerror: move |_| {
                tracing::warn!(user_id = %error_user_id, src = %rendered, "avatar failed to load");
                image.write().load_failed(&rendered);
            },
        }
    }
}
