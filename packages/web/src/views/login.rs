//! Login page view with email/password form.

use dioxus::prelude::*;

use api::SignUpOutcome;
use ui::notify::{alert, report_error};
use ui::use_backend;

const CONFIRMATION_SENT: &str = "Check your email for a confirmation link.";

/// Login page component. Once signed in, the shell moves on to `/home`.
#[component]
pub fn Login() -> Element {
    let backend = use_backend();
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut notice = use_signal(|| Option::<&'static str>::None);
    let mut busy = use_signal(|| false);

    let sign_in_backend = backend.clone();
    let handle_sign_in = move |evt: FormEvent| {
        evt.prevent_default();
        let backend = sign_in_backend.clone();
        spawn(async move {
            busy.set(true);
            notice.set(None);
            match backend.sign_in_with_password(email().trim(), &password()).await {
                Ok(session) => tracing::info!(user_id = %session.user_id(), "signed in"),
                Err(e) => report_error("Sign-in failed", &e),
            }
            busy.set(false);
        });
    };

    let handle_sign_up = move |_| {
        let backend = backend.clone();
        spawn(async move {
            busy.set(true);
            notice.set(None);
            match backend.sign_up(email().trim(), &password()).await {
                Ok(SignUpOutcome::ConfirmationSent(user)) => {
                    tracing::info!(user_id = %user.id, "confirmation email sent");
                    notice.set(Some(CONFIRMATION_SENT));
                    alert(CONFIRMATION_SENT);
                }
                Ok(SignUpOutcome::SignedIn(session)) => {
                    tracing::info!(user_id = %session.user_id(), "signed up");
                }
                Err(e) => report_error("Sign-up failed", &e),
            }
            busy.set(false);
        });
    };

    rsx! {
        div {
            class: "login-container",

            h1 { "Portal" }
            p { class: "profile-meta", "Sign in with your email and password" }

            form {
                class: "login-form",
                onsubmit: handle_sign_in,

                if let Some(message) = notice() {
                    div { class: "notice", "{message}" }
                }

                input {
                    r#type: "email",
                    placeholder: "Email",
                    value: email(),
                    oninput: move |evt: FormEvent| email.set(evt.value()),
                }

                input {
                    r#type: "password",
                    placeholder: "Password",
                    value: password(),
                    oninput: move |evt: FormEvent| password.set(evt.value()),
                }

                div {
                    class: "login-actions",
                    button {
                        class: "btn btn-primary",
                        r#type: "submit",
                        disabled: busy(),
                        if busy() { "Working..." } else { "Sign in" }
                    }
                    button {
                        class: "btn",
                        r#type: "button",
                        disabled: busy(),
                        onclick: handle_sign_up,
                        "Sign up"
                    }
                }
            }
        }
    }
}
