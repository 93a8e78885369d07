use dioxus::prelude::*;

use ui::session::current_user;
use ui::use_backend;

/// Placeholder conversation page.
#[component]
pub fn Chat(friend_id: String) -> Element {
    let backend = use_backend();

    let _me = use_resource(use_reactive!(|friend_id| {
        let backend = backend.clone();
        async move {
            let user = current_user(&*backend).await;
            if let Some(user) = &user {
                tracing::info!(user_id = %user.id, friend_id = %friend_id, "chat opened");
            }
            user
        }
    }));

    rsx! {
        h1 { "Chat" }
        p { class: "profile-meta", "Conversation with {friend_id}" }
        p { "Messaging is not available yet." }
    }
}
