//! # Avatar resolution
//!
//! A stored `avatar_url` is either an absolute URL or a path inside the avatar
//! bucket. [`AvatarResolver::resolve`] turns it into something an `img` can
//! load, trying in order:
//!
//! 1. nothing at all for an empty reference (no backend calls);
//! 2. the public URL (the reference itself when absolute, otherwise built by the
//!    backend), cache-busted and probed; a 2xx answer wins;
//! 3. a one-hour signed URL for the storage path, cache-busted;
//! 4. the empty string, which renders as [`PLACEHOLDER_AVATAR`].
//!
//! Resolutions race when the reference changes while one is in flight.
//! [`ResolutionGuard`] hands out tickets; only the newest ticket may assign its
//! result.

use std::cell::Cell;
use std::rc::Rc;

use api::Backend;
use chrono::Utc;

/// Shown when there is no avatar or it fails to load.
pub const PLACEHOLDER_AVATAR: &str = "https://placehold.co/160x160?text=No+avatar";

/// Validity of fallback signed URLs.
pub const SIGNED_URL_TTL_SECS: u64 = 60 * 60;

pub fn is_absolute_url(reference: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        reference
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Append `t=<stamp>` so the browser cannot serve a cached copy.
pub fn with_cache_bust(url: &str, stamp: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}t={stamp}")
}

/// The object path inside `bucket` of a public object URL.
pub fn path_from_public_url(url: &str, bucket: &str) -> Option<String> {
    let marker = format!("/storage/v1/object/public/{bucket}/");
    let start = url.find(&marker)? + marker.len();
    let path = &url[start..];
    (!path.is_empty()).then(|| path.to_string())
}

/// What the image element should load.
pub fn display_src(resolved: &str, load_failed: bool) -> &str {
    if resolved.is_empty() || load_failed {
        PLACEHOLDER_AVATAR
    } else {
        resolved
    }
}

/// What one avatar slot shows: the latest resolved source, unless that very
/// source failed to load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvatarImage {
    resolved: String,
    failed: Option<String>,
}

impl AvatarImage {
    pub fn show(&mut self, resolved: String) {
        self.resolved = resolved;
    }

    /// Record that the image element failed to load `src`.
    pub fn load_failed(&mut self, src: &str) {
        self.failed = Some(src.to_string());
    }

    pub fn src(&self) -> &str {
        let failed = self.failed.as_deref() == Some(self.resolved.as_str());
        display_src(&self.resolved, failed)
    }
}

pub struct AvatarResolver<'a> {
    backend: &'a dyn Backend,
    bucket: &'a str,
}

impl<'a> AvatarResolver<'a> {
    pub fn new(backend: &'a dyn Backend, bucket: &'a str) -> Self {
        Self { backend, bucket }
    }

    /// Resolve `reference`; empty means "show the placeholder".
    pub async fn resolve(&self, reference: &str) -> String {
        self.resolve_at(reference, Utc::now().timestamp_millis()).await
    }

    /// Like [`resolve`](Self::resolve), but only yields a value if `ticket`
    /// is still the newest one when resolution finishes.
    pub async fn resolve_for(&self, ticket: &ResolutionTicket, reference: &str) -> Option<String> {
        let src = self.resolve(reference).await;
        if ticket.is_current() {
            Some(src)
        } else {
            tracing::debug!("dropping stale avatar resolution");
            None
        }
    }

    pub async fn resolve_at(&self, reference: &str, stamp: i64) -> String {
        if reference.is_empty() {
            return String::new();
        }

        let absolute = is_absolute_url(reference);
        let public_url = if absolute {
            reference.to_string()
        } else {
            self.backend.public_url(self.bucket, reference)
        };

        let candidate = with_cache_bust(&public_url, stamp);
        match self.backend.probe(&candidate).await {
            Ok(status) if (200..300).contains(&status) => return candidate,
            Ok(status) => tracing::warn!(status, url = %candidate, "avatar public URL not OK"),
            Err(e) => tracing::warn!("Avatar probe failed: {}", e),
        }

        let path = if absolute {
            match path_from_public_url(reference, self.bucket) {
                Some(path) => path,
                None => return String::new(),
            }
        } else {
            reference.to_string()
        };

        match self
            .backend
            .create_signed_url(self.bucket, &path, SIGNED_URL_TTL_SECS)
            .await
        {
            Ok(signed) => with_cache_bust(&signed, stamp),
            Err(e) => {
                tracing::error!("Failed to create signed avatar URL: {}", e);
                String::new()
            }
        }
    }
}

/// Generation counter shared by all resolutions of one avatar slot.
#[derive(Debug, Clone, Default)]
pub struct ResolutionGuard {
    current: Rc<Cell<u64>>,
}

impl ResolutionGuard {
    /// Start a resolution; every earlier ticket becomes stale.
    pub fn begin(&self) -> ResolutionTicket {
        let generation = self.current.get() + 1;
        self.current.set(generation);
        ResolutionTicket {
            generation,
            current: self.current.clone(),
        }
    }

    /// Invalidate every outstanding ticket.
    pub fn cancel(&self) {
        self.current.set(self.current.get() + 1);
    }
}

#[derive(Debug)]
pub struct ResolutionTicket {
    generation: u64,
    current: Rc<Cell<u64>>,
}

impl ResolutionTicket {
    pub fn is_current(&self) -> bool {
        self.current.get() == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::{BackendCall, MemoryBackend};

    const BUCKET: &str = "avatars";

    #[test]
    fn test_url_helpers() {
        assert!(is_absolute_url("https://host/a.png"));
        assert!(is_absolute_url("HTTP://host/a.png"));
        assert!(!is_absolute_url("u1/a.png"));
        assert!(!is_absolute_url("http"));

        assert_eq!(with_cache_bust("https://h/a.png", 5), "https://h/a.png?t=5");
        assert_eq!(with_cache_bust("https://h/a.png?token=x", 5), "https://h/a.png?token=x&t=5");

        assert_eq!(
            path_from_public_url("https://host/storage/v1/object/public/avatars/u1/123.png", BUCKET),
            Some("u1/123.png".to_string())
        );
        assert_eq!(path_from_public_url("https://cdn.example.com/u1/123.png", BUCKET), None);
        assert_eq!(path_from_public_url("https://host/storage/v1/object/public/avatars/", BUCKET), None);
    }

    #[test]
    fn test_display_src_falls_back_for_both_causes() {
        assert_eq!(display_src("", false), PLACEHOLDER_AVATAR);
        assert_eq!(display_src("https://h/a.png?t=1", true), PLACEHOLDER_AVATAR);
        assert_eq!(display_src("https://h/a.png?t=1", false), "https://h/a.png?t=1");
    }

    #[test]
    fn test_failure_only_hides_the_source_that_failed() {
        let mut image = AvatarImage::default();
        assert_eq!(image.src(), PLACEHOLDER_AVATAR);

        image.show("https://h/old.png?t=1".into());
        image.load_failed("https://h/old.png?t=1");
        assert_eq!(image.src(), PLACEHOLDER_AVATAR);

        // A new upload resolves while the broken image reports its error again.
        image.load_failed("https://h/old.png?t=1");
        image.show("https://h/new.png?t=2".into());
        assert_eq!(image.src(), "https://h/new.png?t=2");

        image.load_failed("https://h/old.png?t=1");
        assert_eq!(image.src(), "https://h/new.png?t=2");

        image.load_failed("https://h/new.png?t=2");
        assert_eq!(image.src(), PLACEHOLDER_AVATAR);
    }

    #[tokio::test]
    async fn test_empty_reference_makes_no_calls() {
        let backend = MemoryBackend::new();
        let resolver = AvatarResolver::new(&backend, BUCKET);
        assert_eq!(resolver.resolve("").await, "");
        assert!(!backend.calls().iter().any(BackendCall::is_network));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_absolute_url_with_failed_probe_uses_signed_url() {
        let backend = MemoryBackend::new();
        backend.put_object(BUCKET, "u1/123.png", vec![1], "image/png");
        let reference = "https://host/storage/v1/object/public/avatars/u1/123.png";
        backend.set_probe_status(reference, 404);

        let resolver = AvatarResolver::new(&backend, BUCKET);
        let src = resolver.resolve_at(reference, 42).await;

        assert_eq!(
            src,
            "https://memory.backend.test/storage/v1/object/sign/avatars/u1/123.png?token=memory-3600&t=42"
        );
        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::Probe(format!("{reference}?t=42")),
                BackendCall::SignedUrl {
                    bucket: BUCKET.into(),
                    path: "u1/123.png".into(),
                    ttl_secs: 3600
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_relative_path_with_good_probe_skips_signing() {
        let backend = MemoryBackend::new();
        backend.put_object(BUCKET, "u2/456.jpg", vec![1], "image/jpeg");

        let resolver = AvatarResolver::new(&backend, BUCKET);
        let src = resolver.resolve_at("u2/456.jpg", 7).await;

        assert_eq!(
            src,
            "https://memory.backend.test/storage/v1/object/public/avatars/u2/456.jpg?t=7"
        );
        let network: Vec<_> = backend.calls().into_iter().filter(BackendCall::is_network).collect();
        assert_eq!(network, vec![BackendCall::Probe(src)]);
    }

    #[tokio::test]
    async fn test_failed_probe_tries_signed_url_before_giving_up() {
        let backend = MemoryBackend::new();
        let public = backend.public_url(BUCKET, "u3/1.png");
        backend.fail_probe(&public, "connection reset");
        backend.clear_calls();

        let resolver = AvatarResolver::new(&backend, BUCKET);
        assert_eq!(resolver.resolve_at("u3/1.png", 1).await, "");

        let calls = backend.calls();
        let probe = calls.iter().position(|c| matches!(c, BackendCall::Probe(_)));
        let sign = calls.iter().position(
            |c| matches!(c, BackendCall::SignedUrl { path, .. } if path == "u3/1.png"),
        );
        assert!(probe.unwrap() < sign.unwrap());
    }

    #[tokio::test]
    async fn test_foreign_absolute_url_without_marker_is_empty() {
        let backend = MemoryBackend::new();
        let resolver = AvatarResolver::new(&backend, BUCKET);
        assert_eq!(resolver.resolve_at("https://cdn.example.com/me.png", 1).await, "");
        assert!(!backend
            .calls()
            .iter()
            .any(|call| matches!(call, BackendCall::SignedUrl { .. })));
    }

    #[tokio::test]
    async fn test_repeat_resolution_differs_only_in_stamp() {
        let backend = MemoryBackend::new();
        backend.put_object(BUCKET, "u1/a.png", vec![1], "image/png");
        let resolver = AvatarResolver::new(&backend, BUCKET);

        let first = resolver.resolve_at("u1/a.png", 100).await;
        let second = resolver.resolve_at("u1/a.png", 200).await;
        assert_ne!(first, second);
        assert_eq!(first.strip_suffix("t=100"), second.strip_suffix("t=200"));
    }

    #[tokio::test]
    async fn test_stale_ticket_is_ignored() {
        let backend = MemoryBackend::new();
        backend.put_object(BUCKET, "u1/a.png", vec![1], "image/png");
        let resolver = AvatarResolver::new(&backend, BUCKET);
        let guard = ResolutionGuard::default();

        let old = guard.begin();
        let new = guard.begin();
        assert!(resolver.resolve_for(&old, "u1/a.png").await.is_none());
        assert!(resolver.resolve_for(&new, "u1/a.png").await.is_some());

        guard.cancel();
        assert!(!new.is_current());
    }
}
