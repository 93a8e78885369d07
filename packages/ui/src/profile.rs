//! Profile loading, editing and avatar upload, independent of rendering.

use api::{Backend, Profile, ProfileSummary, ProfileUpsert, SessionUser, StorageError, StoreError, UploadOptions};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Editable copy of the four profile columns. Empty means "unset".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileForm {
    pub username: String,
    pub full_name: String,
    pub bio: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Username,
    FullName,
    Bio,
    AvatarUrl,
}

impl ProfileForm {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            username: profile.username.clone().unwrap_or_default(),
            full_name: profile.full_name.clone().unwrap_or_default(),
            bio: profile.bio.clone().unwrap_or_default(),
            avatar_url: profile.avatar_url.clone().unwrap_or_default(),
        }
    }

    pub fn set(&mut self, field: ProfileField, value: String) {
        match field {
            ProfileField::Username => self.username = value,
            ProfileField::FullName => self.full_name = value,
            ProfileField::Bio => self.bio = value,
            ProfileField::AvatarUrl => self.avatar_url = value,
        }
    }

    /// Full-record upsert; empty fields are written as null.
    pub fn to_upsert(&self, user: &SessionUser, now: DateTime<Utc>) -> ProfileUpsert {
        ProfileUpsert::new(user.id.clone(), now)
            .with_email(user.email.clone())
            .with_username(non_empty(&self.username))
            .with_full_name(non_empty(&self.full_name))
            .with_bio(non_empty(&self.bio))
            .with_avatar_url(non_empty(&self.avatar_url))
    }

    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            "No name"
        } else {
            &self.full_name
        }
    }

    pub fn handle(&self) -> String {
        if self.username.is_empty() {
            "—".to_string()
        } else {
            format!("@{}", self.username)
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// The stored profile, or `None` when there is no row yet or it could not be read.
pub async fn load_profile(backend: &dyn Backend, user_id: &str) -> Option<Profile> {
    match backend.select_profile(user_id).await {
        Ok(profile) => Some(profile),
        Err(StoreError::NotFound) => {
            tracing::debug!(user_id, "no profile row yet");
            None
        }
        Err(e) => {
            tracing::error!("Failed to load profile for {}: {}", user_id, e);
            None
        }
    }
}

pub async fn save_profile(
    backend: &dyn Backend,
    user: &SessionUser,
    form: &ProfileForm,
) -> Result<(), StoreError> {
    backend.upsert_profile(&form.to_upsert(user, Utc::now())).await?;
    tracing::info!(user_id = %user.id, "profile saved");
    Ok(())
}

pub async fn load_user_list(backend: &dyn Backend) -> Vec<ProfileSummary> {
    match backend.list_profiles().await {
        Ok(users) => users,
        Err(e) => {
            tracing::error!("Failed to load users: {}", e);
            Vec::new()
        }
    }
}

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Please choose a non-empty image file")]
    EmptyFile,

    #[error("Upload failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Saving the avatar failed: {0}")]
    Store(#[from] StoreError),
}

/// `<user id>/<stamp>.<ext>`, the extension lower-cased and `png` when missing.
pub fn avatar_object_path(user_id: &str, file_name: &str, stamp: i64) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "png".to_string());
    format!("{user_id}/{stamp}.{ext}")
}

/// Upload `file` into `bucket` and return its public URL.
pub async fn store_avatar(
    backend: &dyn Backend,
    bucket: &str,
    user_id: &str,
    file: AvatarFile,
) -> Result<String, UploadError> {
    if file.bytes.is_empty() {
        return Err(UploadError::EmptyFile);
    }

    let path = avatar_object_path(user_id, &file.name, Utc::now().timestamp_millis());
    let options = UploadOptions {
        content_type: file
            .content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| "image/png".to_string()),
        overwrite: true,
        cache_control: 3600,
    };
    backend.upload_object(bucket, &path, file.bytes, &options).await?;
    tracing::info!(%path, "avatar uploaded");

    Ok(backend.public_url(bucket, &path))
}

/// Write only `{id, avatar_url, updated_at}`.
pub async fn save_avatar_url(backend: &dyn Backend, user_id: &str, url: &str) -> Result<(), UploadError> {
    let patch = ProfileUpsert::new(user_id, Utc::now()).with_avatar_url(Some(url.to_string()));
    backend.upsert_profile(&patch).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::{BackendCall, MemoryBackend};

    fn user() -> SessionUser {
        SessionUser {
            id: "u1".into(),
            email: Some("neo@example.com".into()),
        }
    }

    #[test]
    fn test_display_fallbacks() {
        let mut form = ProfileForm::default();
        assert_eq!(form.display_name(), "No name");
        assert_eq!(form.handle(), "—");

        form.set(ProfileField::FullName, "Thomas Anderson".into());
        form.set(ProfileField::Username, "neo".into());
        assert_eq!(form.display_name(), "Thomas Anderson");
        assert_eq!(form.handle(), "@neo");
    }

    #[test]
    fn test_object_path_extension() {
        assert_eq!(avatar_object_path("u1", "Me.JPG", 10), "u1/10.jpg");
        assert_eq!(avatar_object_path("u1", "archive.tar.gz", 10), "u1/10.gz");
        assert_eq!(avatar_object_path("u1", "noext", 10), "u1/10.png");
        assert_eq!(avatar_object_path("u1", "trailing.", 10), "u1/10.png");
    }

    #[tokio::test]
    async fn test_save_with_only_username_nulls_the_rest() {
        let backend = MemoryBackend::new();
        let mut form = ProfileForm::default();
        form.set(ProfileField::Username, "neo".into());

        let before = Utc::now();
        save_profile(&backend, &user(), &form).await.unwrap();

        let upserts = backend.upserts();
        assert_eq!(upserts.len(), 1);
        let record = &upserts[0];
        assert_eq!(record.id, "u1");
        assert_eq!(record.email, Some(Some("neo@example.com".into())));
        assert_eq!(record.username, Some(Some("neo".into())));
        assert_eq!(record.full_name, Some(None));
        assert_eq!(record.bio, Some(None));
        assert_eq!(record.avatar_url, Some(None));
        assert!(record.updated_at >= before);

        let value = serde_json::to_value(record).unwrap();
        assert!(value["full_name"].is_null());
        assert!(value.as_object().unwrap().contains_key("bio"));
    }

    #[tokio::test]
    async fn test_load_profile_missing_and_failing() {
        let backend = MemoryBackend::new();
        assert_eq!(load_profile(&backend, "u1").await, None);

        backend.insert_profile(
            "u1",
            Some("neo@example.com"),
            Profile {
                username: Some("neo".into()),
                ..Profile::default()
            },
        );
        let form = ProfileForm::from_profile(&load_profile(&backend, "u1").await.unwrap());
        assert_eq!(form.username, "neo");
        assert_eq!(form.bio, "");

        backend.fail_selects("boom");
        assert_eq!(load_profile(&backend, "u1").await, None);
    }

    #[tokio::test]
    async fn test_store_avatar_then_patch_only_avatar_columns() {
        let backend = MemoryBackend::new();
        let file = AvatarFile {
            name: "face.PNG".into(),
            content_type: None,
            bytes: vec![0x89, 0x50],
        };

        let url = store_avatar(&backend, "avatars", "u1", file).await.unwrap();
        save_avatar_url(&backend, "u1", &url).await.unwrap();

        let (path, content_type, overwrite) = backend
            .calls()
            .into_iter()
            .find_map(|call| match call {
                BackendCall::Upload {
                    path,
                    content_type,
                    overwrite,
                    ..
                } => Some((path, content_type, overwrite)),
                _ => None,
            })
            .unwrap();
        assert!(path.starts_with("u1/") && path.ends_with(".png"));
        assert_eq!(content_type, "image/png");
        assert!(overwrite);
        assert_eq!(url, backend.public_url("avatars", &path));

        let upserts = backend.upserts();
        assert_eq!(upserts.len(), 1);
        let value = serde_json::to_value(&upserts[0]).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["avatar_url", "id", "updated_at"]);
    }

    #[tokio::test]
    async fn test_empty_file_is_rejected_without_upload() {
        let backend = MemoryBackend::new();
        let file = AvatarFile {
            name: "empty.png".into(),
            content_type: Some("image/png".into()),
            bytes: Vec::new(),
        };
        let err = store_avatar(&backend, "avatars", "u1", file).await.unwrap_err();
        assert!(matches!(err, UploadError::EmptyFile));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_user_list_survives_errors() {
        let backend = MemoryBackend::new();
        backend.insert_profile("u1", Some("a@b.c"), Profile::default());
        assert_eq!(load_user_list(&backend).await.len(), 1);

        backend.fail_lists("offline");
        assert!(load_user_list(&backend).await.is_empty());
    }
}
