use dioxus::prelude::*;

use crate::auth::SignOutButton;
use crate::icons::FaRightFromBracket;
use crate::shell::Page;
use crate::Icon;

pub const PORTAL_CSS: Asset = asset!("/assets/portal.css");

/// Top bar of the signed-in chrome. `children` are the page links.
#[component]
pub fn Navbar(
    #[props(default)] email: String,
    on_signed_out: EventHandler<Page>,
    children: Element,
) -> Element {
    rsx! {
        document::Link { rel: "stylesheet", href: PORTAL_CSS }
        nav {
            class: "navbar",
            span { class: "navbar-brand", "Portal" }
            div {
                class: "navbar-links",
                {children}
            }
            if !email.is_empty() {
                span { class: "navbar-user", "{email}" }
            }
            Icon { icon: FaRightFromBracket, width: 14, height: 14 }
            SignOutButton {
                class: "btn",
                on_signed_out,
            }
        }
    }
}
