//! Which route tree the application shell mounts for a session state.

use crate::session::SessionState;

/// A page the portal can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Login,
    Home,
    Users,
    Profile,
    Chat { friend_id: String },
}

impl Page {
    /// Match a location path against the known pages. `/` and unknown paths
    /// give `None`.
    pub fn parse(path: &str) -> Option<Page> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["login"] => Some(Page::Login),
            ["home"] => Some(Page::Home),
            ["users"] => Some(Page::Users),
            ["profile"] => Some(Page::Profile),
            ["chat", friend_id] => Some(Page::Chat {
                friend_id: friend_id.to_string(),
            }),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Page::Login => "/login".to_string(),
            Page::Home => "/home".to_string(),
            Page::Users => "/users".to_string(),
            Page::Profile => "/profile".to_string(),
            Page::Chat { friend_id } => format!("/chat/{friend_id}"),
        }
    }
}

/// What the shell shows for a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mount {
    /// Loading indicator, no routes.
    Loading,
    Render(Page),
    /// Replace the current location with this page.
    Redirect(Page),
}

impl SessionState {
    pub fn mount(&self, path: &str) -> Mount {
        let page = Page::parse(path);
        match self {
            SessionState::Loading => Mount::Loading,
            SessionState::Anonymous => match page {
                Some(Page::Login) => Mount::Render(Page::Login),
                _ => Mount::Redirect(Page::Login),
            },
            SessionState::Authenticated(_) => match page {
                Some(Page::Login) | None => Mount::Redirect(Page::Home),
                Some(page) => Mount::Render(page),
            },
        }
    }
}
