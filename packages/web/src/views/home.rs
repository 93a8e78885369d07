use dioxus::prelude::*;

#[component]
pub fn Home() -> Element {
    rsx! {
        h1 { "Home" }
        p { "Welcome back. Pick a user to chat with, or update your profile." }
    }
}
