use dioxus::prelude::*;

use ui::profile::load_user_list;
use ui::use_backend;

use crate::Route;

/// Every profile, each linking to a chat with that user.
#[component]
pub fn Users() -> Element {
    let backend = use_backend();

    let users = use_resource(move || {
        let backend = backend.clone();
        async move { load_user_list(&*backend).await }
    });

    rsx! {
        h1 { "Users" }
        match &*users.read() {
            None => rsx! { p { class: "profile-meta", "Loading users…" } },
            Some(list) if list.is_empty() => rsx! { p { class: "profile-meta", "No users yet." } },
            Some(list) => rsx! {
                ul {
                    class: "user-list",
                    for (id, label) in list.iter().map(|u| (u.id.clone(), u.email.clone().unwrap_or_else(|| u.id.clone()))) {
                        li {
                            key: "{id}",
                            Link {
                                to: Route::Chat { friend_id: id.clone() },
                                "{label}"
                            }
                        }
                    }
                }
            },
        }
    }
}
