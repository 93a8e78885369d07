use std::rc::Rc;

use api::{Backend, MemoryBackend};
use ui::session::{sign_out, SessionGateTask};
use ui::{Mount, Page, SessionState};

#[tokio::test]
async fn sign_in_then_sign_out_returns_to_login() {
    let backend = Rc::new(MemoryBackend::new());
    let user_id = backend.with_account("trinity@example.com", "matrix");

    let mut gate = SessionGateTask::start(backend.clone()).await;
    let state = gate.next().await.unwrap();
    assert_eq!(state, SessionState::Anonymous);
    assert_eq!(state.mount("/profile"), Mount::Redirect(Page::Login));

    backend
        .sign_in_with_password("trinity@example.com", "matrix")
        .await
        .unwrap();
    let state = gate.next().await.unwrap();
    assert_eq!(state.session().map(|s| s.user_id()), Some(user_id.as_str()));
    assert_eq!(state.mount("/login"), Mount::Redirect(Page::Home));
    assert_eq!(state.mount("/profile"), Mount::Render(Page::Profile));

    let next_page = sign_out(backend.as_ref()).await.unwrap();
    assert_eq!(next_page, Page::Login);

    let state = gate.next().await.unwrap();
    assert_eq!(state, SessionState::Anonymous);
    assert_eq!(state.mount(&next_page.path()), Mount::Render(Page::Login));
    assert!(backend.current_session().await.unwrap().is_none());

    // Exactly one stub for the single sign-in.
    gate.flush().await;
    let upserts = backend.upserts();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].id, user_id);
}

#[tokio::test]
async fn restored_session_is_published_first() {
    let backend = Rc::new(MemoryBackend::new());
    backend.with_account("neo@example.com", "secret");
    backend
        .sign_in_with_password("neo@example.com", "secret")
        .await
        .unwrap();

    let mut gate = SessionGateTask::start(backend.clone()).await;
    let state = gate.next().await.unwrap();
    assert!(state.session().is_some());
    assert_eq!(state.mount("/"), Mount::Redirect(Page::Home));
    gate.flush().await;
    assert_eq!(backend.upserts().len(), 1);
}
