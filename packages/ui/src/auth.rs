//! Session context and hooks for the UI.

use dioxus::prelude::*;

use crate::backend::use_backend;
use crate::session::{self, SessionGateTask, SessionState};
use crate::shell::Page;

/// Get the current session state.
/// Returns a signal that updates when the user signs in or out.
pub fn use_session() -> Signal<SessionState> {
    use_context::<Signal<SessionState>>()
}

/// Provider component that runs the session gate.
/// Wrap your app with this component (inside the backend context).
#[component]
pub fn SessionProvider(children: Element) -> Element {
    let backend = use_backend();
    let mut state = use_signal(SessionState::default);

    // One gate per mounted provider; the task and its subscription end with
    // the component.
    use_hook(|| {
        let backend = backend.shared();
        spawn(async move {
            let task = SessionGateTask::start(backend).await;
            task.run(move |next| {
                match &next {
                    SessionState::Authenticated(s) => {
                        tracing::info!(user_id = %s.user_id(), "session authenticated")
                    }
                    _ => tracing::info!("session anonymous"),
                }
                state.set(next);
            })
            .await;
        });
    });

    use_context_provider(|| state);

    rsx! {
        {children}
    }
}

/// Button to sign the current user out.
#[component]
pub fn SignOutButton(
    #[props(default = "Sign out".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
    on_signed_out: EventHandler<Page>,
) -> Element {
    let backend = use_backend();
    let mut busy = use_signal(|| false);

    let onclick = move |_| {
        let backend = backend.clone();
        async move {
            busy.set(true);
            // Failures are logged by `sign_out`; the user stays where they are.
            if let Ok(page) = session::sign_out(&*backend).await {
                on_signed_out.call(page);
            }
            busy.set(false);
        }
    };

    rsx! {
        button {
            class: "{class}",
            disabled: busy(),
            onclick: onclick,
            "{label}"
        }
    }
}
