use dioxus::prelude::*;

use ui::icons::{FaHouse, FaUser, FaUsers};
use ui::{use_session, Icon, Mount, Navbar, Page};

use crate::Route;

/// Mounts exactly one of: the loading indicator, the anonymous routes or the
/// signed-in chrome with its routes.
#[component]
pub fn Shell() -> Element {
    let session = use_session();
    let route = use_route::<Route>();
    let nav = use_navigator();

    let state = session();
    match state.mount(&route.to_string()) {
        Mount::Loading => rsx! {
            div { class: "loading", "Loading…" }
        },
        Mount::Redirect(page) => {
            tracing::debug!(from = %route, to = %page.path(), "redirecting");
            nav.replace(Route::from(page));
            rsx! {}
        }
        Mount::Render(Page::Login) => rsx! {
            Outlet::<Route> {}
        },
        Mount::Render(_) => {
            let email = state
                .session()
                .and_then(|s| s.email())
                .unwrap_or_default()
                .to_string();
            rsx! {
                Navbar {
                    email,
                    on_signed_out: move |page: Page| {
                        nav.replace(Route::from(page));
                    },
                    Link {
                        to: Route::Home {},
                        active_class: "active",
                        Icon { icon: FaHouse, width: 14, height: 14 }
                        "Home"
                    }
                    Link {
                        to: Route::Users {},
                        active_class: "active",
                        Icon { icon: FaUsers, width: 14, height: 14 }
                        "Users"
                    }
                    Link {
                        to: Route::Profile {},
                        active_class: "active",
                        Icon { icon: FaUser, width: 14, height: 14 }
                        "Profile"
                    }
                }
                main {
                    class: "page",
                    Outlet::<Route> {}
                }
            }
        }
    }
}
