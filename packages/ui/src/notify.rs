//! Blocking user notifications.

/// Show `message` in a browser alert. Native builds only log it.
pub fn alert(message: &str) {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
            return;
        }
    }
    tracing::warn!("{}", message);
}

/// Log `err` and alert `"<context>: <err>"`.
pub fn report_error(context: &str, err: &dyn std::fmt::Display) {
    tracing::error!("{}: {}", context, err);
    alert(&format!("{context}: {err}"));
}
