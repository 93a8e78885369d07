use dioxus::prelude::*;

use ui::notify::{alert, report_error};
use ui::profile::{
    load_profile, save_avatar_url, save_profile, store_avatar, AvatarFile, ProfileField, ProfileForm,
    UploadError,
};
use ui::{use_backend, use_session, Page, ProfileAvatar, SignOutButton};

use crate::Route;

/// View and edit the signed-in user's profile.
#[component]
pub fn Profile() -> Element {
    let backend = use_backend();
    let session = use_session();
    let nav = use_navigator();

    let mut saved = use_signal(ProfileForm::default);
    let mut draft = use_signal(ProfileForm::default);
    let mut editing = use_signal(|| false);
    let mut busy = use_signal(|| false);

    let load_backend = backend.clone();
    let _loader = use_resource(move || {
        let backend = load_backend.clone();
        async move {
            let Some(user_id) = session().session().map(|s| s.user_id().to_string()) else {
                return;
            };
            if let Some(profile) = load_profile(&*backend, &user_id).await {
                saved.set(ProfileForm::from_profile(&profile));
            }
        }
    });

    let save_backend = backend.clone();
    let handle_save = move |evt: FormEvent| {
        evt.prevent_default();
        let backend = save_backend.clone();
        spawn(async move {
            let Some(user) = session().session().map(|s| s.user.clone()) else {
                return;
            };
            busy.set(true);
            let edited = draft();
            match save_profile(&*backend, &user, &edited).await {
                Ok(()) => {
                    saved.set(edited);
                    editing.set(false);
                }
                Err(e) => report_error("Save failed", &e),
            }
            busy.set(false);
        });
    };

    let handle_upload = move |evt: FormEvent| {
        let backend = backend.clone();
        async move {
            let Some(user_id) = session().session().map(|s| s.user_id().to_string()) else {
                return;
            };
            let Some(file) = evt.files().into_iter().next() else {
                alert(&UploadError::EmptyFile.to_string());
                return;
            };
            let bytes = match file.read_bytes().await {
                Ok(bytes) => bytes.to_vec(),
                Err(e) => {
                    report_error("Could not read the selected file", &e);
                    return;
                }
            };
            let upload = AvatarFile {
                name: file.name(),
                content_type: file.content_type(),
                bytes,
            };

            busy.set(true);
            match store_avatar(&*backend, backend.avatar_bucket(), &user_id, upload).await {
                Ok(url) => {
                    draft.write().set(ProfileField::AvatarUrl, url.clone());
                    saved.write().set(ProfileField::AvatarUrl, url.clone());
                    if let Err(e) = save_avatar_url(&*backend, &user_id, &url).await {
                        report_error("Avatar update failed", &e);
                    }
                }
                Err(UploadError::EmptyFile) => alert(&UploadError::EmptyFile.to_string()),
                Err(e) => report_error("Avatar upload failed", &e),
            }
            busy.set(false);
        }
    };

    let state = session();
    let Some(current) = state.session() else {
        return rsx! {};
    };
    let user_id = current.user_id().to_string();
    let email = current.email().unwrap_or("").to_string();
    let view = saved();
    let name = view.display_name().to_string();
    let handle = view.handle();

    rsx! {
        h1 { "Profile" }

        if editing() {
            form {
                class: "profile-form",
                onsubmit: handle_save,

                ProfileAvatar { reference: draft().avatar_url, user_id: user_id.clone(), size: 96 }
                label {
                    "Avatar"
                    input {
                        r#type: "file",
                        accept: "image/*",
                        disabled: busy(),
                        onchange: handle_upload,
                    }
                }

                label { "Username" }
                input {
                    value: draft().username,
                    oninput: move |evt: FormEvent| draft.write().set(ProfileField::Username, evt.value()),
                }
                label { "Full name" }
                input {
                    value: draft().full_name,
                    oninput: move |evt: FormEvent| draft.write().set(ProfileField::FullName, evt.value()),
                }
                label { "Bio" }
                textarea {
                    rows: 4,
                    value: draft().bio,
                    oninput: move |evt: FormEvent| draft.write().set(ProfileField::Bio, evt.value()),
                }
                label { "Avatar URL" }
                input {
                    value: draft().avatar_url,
                    oninput: move |evt: FormEvent| draft.write().set(ProfileField::AvatarUrl, evt.value()),
                }

                div {
                    class: "profile-actions",
                    button {
                        class: "btn btn-primary",
                        r#type: "submit",
                        disabled: busy(),
                        if busy() { "Saving..." } else { "Save" }
                    }
                    button {
                        class: "btn",
                        r#type: "button",
                        disabled: busy(),
                        onclick: move |_| editing.set(false),
                        "Cancel"
                    }
                }
            }
        } else {
            div {
                class: "profile-card",
                ProfileAvatar { reference: view.avatar_url.clone(), user_id: user_id.clone() }
                div {
                    h2 { "{name}" }
                    p { class: "profile-meta", "{handle}" }
                    if !view.bio.is_empty() {
                        p { "{view.bio}" }
                    }
                    p { class: "profile-meta", "ID: {user_id}" }
                    p { class: "profile-meta", "Email: {email}" }
                    div {
                        class: "profile-actions",
                        button {
                            class: "btn btn-primary",
                            disabled: busy(),
                            onclick: move |_| {
                                draft.set(saved());
                                editing.set(true);
                            },
                            "Edit"
                        }
                        SignOutButton {
                            class: "btn",
                            on_signed_out: move |page: Page| {
                                nav.replace(Route::from(page));
                            },
                        }
                    }
                }
            }
        }
    }
}
