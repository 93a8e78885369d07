use dioxus::prelude::*;

use ui::{make_backend, Page, SessionProvider};
use views::{Chat, Home, Login, Profile, Shell, Users};

mod views;

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[layout(Shell)]
        #[route("/")]
        Root {},
        #[route("/login")]
        Login {},
        #[route("/home")]
        Home {},
        #[route("/users")]
        Users {},
        #[route("/profile")]
        Profile {},
        #[route("/chat/:friend_id")]
        Chat { friend_id: String },
        #[route("/:..segments")]
        NotFound { segments: Vec<String> },
}

impl From<Page> for Route {
    fn from(page: Page) -> Self {
        match page {
            Page::Login => Route::Login {},
            Page::Home => Route::Home {},
            Page::Users => Route::Users {},
            Page::Profile => Route::Profile {},
            Page::Chat { friend_id } => Route::Chat { friend_id },
        }
    }
}

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    use_context_provider(make_backend);

    rsx! {
        // Global app resources
        document::Link { rel: "stylesheet", href: MAIN_CSS }

        SessionProvider {
            Router::<Route> {}
        }
    }
}

/// `/` never renders; the shell redirects it.
#[component]
fn Root() -> Element {
    rsx! {}
}

/// Unmatched paths never render; the shell redirects them.
#[component]
fn NotFound(segments: Vec<String>) -> Element {
    tracing::debug!(?segments, "unmatched path");
    rsx! {}
}
