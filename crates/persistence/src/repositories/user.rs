//! User profile repository.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use domain::models::UserProfile;

use crate::paths;
use crate::store::{Document, DocumentStore, Query};

use super::{log_read_error, write_with_timeout, RepoError, RepoOptions};

/// Repository for user profile documents, keyed by auth uid.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
    options: RepoOptions,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_options(store, RepoOptions::default())
    }

    pub fn with_options(store: Arc<dyn DocumentStore>, options: RepoOptions) -> Self {
        Self { store, options }
    }

    /// Query matching one profile document. Also the shape watched by
    /// follower-count subscriptions.
    pub fn profile_query(uid: &str) -> Query {
        Query::collection(paths::USERS).where_eq("uid", uid)
    }

    pub async fn get(&self, uid: &str) -> Option<UserProfile> {
        match self.store.get(paths::USERS, uid).await {
            Ok(doc) => doc.map(|doc| UserProfile::from_document(uid, &doc)),
            Err(err) => {
                log_read_error("users.get", &err);
                None
            }
        }
    }

    /// Fetches the profile, creating a default document on first sign-in.
    pub async fn ensure(
        &self,
        uid: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<UserProfile, RepoError> {
        if let Some(existing) = self.store.get(paths::USERS, uid).await? {
            return Ok(UserProfile::from_document(uid, &existing));
        }

        let mut doc = Document::new();
        doc.insert("uid".to_string(), json!(uid));
        if let Some(name) = display_name {
            doc.insert("displayName".to_string(), json!(name));
        }
        if let Some(url) = photo_url {
            doc.insert("photoURL".to_string(), json!(url));
        }
        doc.insert("following".to_string(), json!([]));
        doc.insert("followers".to_string(), json!([]));
        doc.insert("bannedEvents".to_string(), json!([]));
        doc.insert("createdAt".to_string(), json!(Utc::now()));

        write_with_timeout(
            self.options.write_timeout,
            self.store.set(paths::USERS, uid, doc.clone()),
        )
        .await?;
        Ok(UserProfile::from_document(uid, &doc))
    }

    /// Adds `target_uid` to the follower's `following` array and the
    /// follower to the target's `followers` array. Two single-document
    /// atomic updates; no cross-document transaction, consistent with the
    /// rest of the layer.
    pub async fn follow(&self, follower_uid: &str, target_uid: &str) -> Result<(), RepoError> {
        write_with_timeout(
            self.options.write_timeout,
            self.store
                .array_union(paths::USERS, follower_uid, "following", json!(target_uid)),
        )
        .await?;
        write_with_timeout(
            self.options.write_timeout,
            self.store
                .array_union(paths::USERS, target_uid, "followers", json!(follower_uid)),
        )
        .await
    }

    pub async fn unfollow(&self, follower_uid: &str, target_uid: &str) -> Result<(), RepoError> {
        write_with_timeout(
            self.options.write_timeout,
            self.store
                .array_remove(paths::USERS, follower_uid, "following", json!(target_uid)),
        )
        .await?;
        write_with_timeout(
            self.options.write_timeout,
            self.store
                .array_remove(paths::USERS, target_uid, "followers", json!(follower_uid)),
        )
        .await
    }

    /// Follower count from the profile document; zero on store failure.
    pub async fn follower_count(&self, uid: &str) -> u32 {
        self.get(uid)
            .await
            .map(|profile| profile.follower_count())
            .unwrap_or(0)
    }

    /// Records a host-initiated ban on the user's profile.
    pub async fn ban_from_event(&self, uid: &str, event_id: &str) -> Result<(), RepoError> {
        write_with_timeout(
            self.options.write_timeout,
            self.store
                .array_union(paths::USERS, uid, "bannedEvents", json!(event_id)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn repo() -> (UserRepository, MemoryStore) {
        let store = MemoryStore::new();
        (UserRepository::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_ensure_creates_once() {
        use fake::faker::name::en::Name;
        use fake::Fake;

        let (repo, _) = repo();
        let name: String = Name().fake();
        let created = repo.ensure("u-1", Some(&name), None).await.unwrap();
        assert_eq!(created.display_name, name);

        // Second call returns the stored profile untouched.
        let again = repo.ensure("u-1", Some("Someone else"), None).await.unwrap();
        assert_eq!(again.display_name, name);
    }

    #[tokio::test]
    async fn test_follow_updates_both_profiles() {
        let (repo, _) = repo();
        repo.ensure("u-1", None, None).await.unwrap();
        repo.ensure("u-2", None, None).await.unwrap();

        repo.follow("u-1", "u-2").await.unwrap();
        let follower = repo.get("u-1").await.unwrap();
        let target = repo.get("u-2").await.unwrap();
        assert!(follower.is_following("u-2"));
        assert_eq!(target.follower_count(), 1);

        // Following twice stays a single membership.
        repo.follow("u-1", "u-2").await.unwrap();
        assert_eq!(repo.follower_count("u-2").await, 1);

        repo.unfollow("u-1", "u-2").await.unwrap();
        assert_eq!(repo.follower_count("u-2").await, 0);
        assert!(!repo.get("u-1").await.unwrap().is_following("u-2"));
    }

    #[tokio::test]
    async fn test_ban_from_event() {
        let (repo, _) = repo();
        repo.ensure("u-1", None, None).await.unwrap();
        repo.ban_from_event("u-1", "ev-1").await.unwrap();
        assert!(repo.get("u-1").await.unwrap().is_banned_from("ev-1"));
    }

    #[tokio::test]
    async fn test_follower_count_degrades_to_zero() {
        let (repo, store) = repo();
        repo.ensure("u-1", None, None).await.unwrap();
        store.set_unavailable(true);
        assert_eq!(repo.follower_count("u-1").await, 0);
        assert!(repo.get("u-1").await.is_none());
    }
}
