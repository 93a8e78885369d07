//! # Session model
//!
//! A [`Session`] is what the hosted auth service hands back after a successful
//! password sign-in or token refresh. It is also the value persisted in browser
//! storage so that a reload restores the signed-in user.
//!
//! Only the fields the portal reads are modeled; everything else in the auth
//! payload (`token_type`, `user.app_metadata`, ...) is ignored on deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user as reported by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }

    /// Whether the access token is past its expiry at `now`.
    /// Sessions without an expiry never expire client-side.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|exp| exp <= now.timestamp())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_deserialize_ignores_unknown_fields() {
        let json = r#"{
            "access_token": "abc",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1700000000,
            "refresh_token": "r1",
            "user": { "id": "u1", "email": "a@b.c", "aud": "authenticated" }
        }"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.user_id(), "u1");
        assert_eq!(session.email(), Some("a@b.c"));
        assert_eq!(session.refresh_token.as_deref(), Some("r1"));
        assert_eq!(session.expires_at, Some(1_700_000_000));
    }

    #[test]
    fn test_expiry() {
        let session = Session {
            access_token: "abc".into(),
            refresh_token: None,
            expires_at: Some(100),
            user: SessionUser {
                id: "u1".into(),
                email: None,
            },
        };
        assert!(!session.is_expired_at(Utc.timestamp_opt(99, 0).unwrap()));
        assert!(session.is_expired_at(Utc.timestamp_opt(100, 0).unwrap()));

        let no_expiry = Session {
            expires_at: None,
            ..session
        };
        assert!(!no_expiry.is_expired_at(Utc.timestamp_opt(i32::MAX as i64, 0).unwrap()));
    }
}
