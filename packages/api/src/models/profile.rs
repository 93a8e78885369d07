//! # Profile rows
//!
//! Three shapes of the `profiles` table cross the wire:
//!
//! | Type | Used by |
//! |------|---------|
//! | [`Profile`] | The editable columns selected for the profile page. |
//! | [`ProfileSummary`] | `{id, email}` rows for the users list. |
//! | [`ProfileUpsert`] | A patch keyed by `id`. Each optional column is either left out of the payload (`None`), written as null (`Some(None)`), or set (`Some(Some(v))`). |
//!
//! The patch form lets the session stub and the avatar update write only the
//! columns they own, while a full save writes every column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionUser;

/// Editable profile columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Absolute URL or a path inside the avatar bucket.
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A row of the users list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSummary {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Upsert payload for one profile row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileUpsert {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileUpsert {
    /// A patch that only touches `updated_at`.
    pub fn new(id: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            email: None,
            username: None,
            full_name: None,
            bio: None,
            avatar_url: None,
            updated_at,
        }
    }

    /// The row written whenever a user signs in: id, email and timestamp.
    pub fn stub(user: &SessionUser, updated_at: DateTime<Utc>) -> Self {
        Self::new(user.id.clone(), updated_at).with_email(user.email.clone())
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = Some(username);
        self
    }

    pub fn with_full_name(mut self, full_name: Option<String>) -> Self {
        self.full_name = Some(full_name);
        self
    }

    pub fn with_bio(mut self, bio: Option<String>) -> Self {
        self.bio = Some(bio);
        self
    }

    pub fn with_avatar_url(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = Some(avatar_url);
        self
    }

    /// Merge the columns this patch carries into `profile`.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(username) = &self.username {
            profile.username = username.clone();
        }
        if let Some(full_name) = &self.full_name {
            profile.full_name = full_name.clone();
        }
        if let Some(bio) = &self.bio {
            profile.bio = bio.clone();
        }
        if let Some(avatar_url) = &self.avatar_url {
            profile.avatar_url = avatar_url.clone();
        }
        profile.updated_at = Some(self.updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_stub_omits_untouched_columns() {
        let user = SessionUser {
            id: "u1".into(),
            email: Some("a@b.c".into()),
        };
        let value = serde_json::to_value(ProfileUpsert::stub(&user, at())).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["id"], "u1");
        assert_eq!(obj["email"], "a@b.c");
        assert_eq!(obj["updated_at"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_explicit_null_is_serialized() {
        let patch = ProfileUpsert::new("u1", at())
            .with_username(Some("neo".into()))
            .with_bio(None);
        let value = serde_json::to_value(patch).unwrap();
        assert_eq!(value["username"], "neo");
        assert!(value["bio"].is_null());
        assert!(value.get("full_name").is_none());
    }

    #[test]
    fn test_apply_to_merges_only_present_columns() {
        let mut profile = Profile {
            username: Some("neo".into()),
            full_name: Some("Thomas Anderson".into()),
            ..Default::default()
        };
        ProfileUpsert::new("u1", at())
            .with_avatar_url(Some("u1/1.png".into()))
            .apply_to(&mut profile);

        assert_eq!(profile.username.as_deref(), Some("neo"));
        assert_eq!(profile.full_name.as_deref(), Some("Thomas Anderson"));
        assert_eq!(profile.avatar_url.as_deref(), Some("u1/1.png"));
        assert_eq!(profile.updated_at, Some(at()));
    }
}
