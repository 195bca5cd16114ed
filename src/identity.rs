use std::sync::Arc;

use crate::api::ContentApi;
use crate::error::{ClientError, ClientResult};
use crate::storage::KeyValueStorage;

/// Storage key under which the opaque access credential is persisted
pub const ACCESS_KEY_STORAGE_KEY: &str = "reel_sync:access_key";

/// Owns the opaque access credential
///
/// The credential is created lazily via the remote API on first use and then
/// persisted; it is never recreated unless explicitly cleared. Network
/// failures during creation propagate to the caller: retrying is the
/// gateway's job, not this layer's.
pub struct IdentityProvider {
    api: Arc<dyn ContentApi>,
    storage: Arc<dyn KeyValueStorage>,
    /// Serializes user creation so concurrent first-time callers share one
    /// remote call instead of racing to create two users.
    init_lock: tokio::sync::Mutex<()>,
}

impl IdentityProvider {
    pub fn new(api: Arc<dyn ContentApi>, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            api,
            storage,
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the persisted credential, creating one if none exists.
    /// Always resolves with a key or fails; never returns absent.
    pub async fn access_key(&self) -> ClientResult<String> {
        if let Some(key) = self.read_persisted_key().await {
            return Ok(key);
        }

        tracing::info!("No access key found, creating new user");
        self.initialize_user().await
    }

    /// Non-creating read, used where a credential is optional (e.g. feed
    /// personalization). Storage failures are logged and reported as absent.
    pub async fn peek_access_key(&self) -> Option<String> {
        self.read_persisted_key().await
    }

    /// Idempotent user creation: an already-persisted credential is returned
    /// unchanged; otherwise the remote "create user" endpoint is called once
    /// and its key persisted.
    pub async fn initialize_user(&self) -> ClientResult<String> {
        let _guard = self.init_lock.lock().await;

        // Re-check under the lock: a concurrent caller may have finished
        // creating while this one waited.
        if let Some(key) = self.read_persisted_key().await {
            tracing::debug!("User already exists, using persisted access key");
            return Ok(key);
        }

        let response = self.api.create_user().await?;

        if !response.success || response.access_key.is_empty() {
            return Err(ClientError::InvalidServerResponse(
                "user creation response missing access key".to_string(),
            ));
        }

        self.storage
            .set(ACCESS_KEY_STORAGE_KEY, &response.access_key)
            .await?;

        tracing::info!(message = %response.message, "User created");
        Ok(response.access_key)
    }

    /// Deletes the persisted credential. Does not create a replacement.
    pub async fn clear_user(&self) -> ClientResult<()> {
        self.storage.remove(ACCESS_KEY_STORAGE_KEY).await
    }

    async fn read_persisted_key(&self) -> Option<String> {
        match self.storage.get(ACCESS_KEY_STORAGE_KEY).await {
            Ok(key) => key.filter(|k| !k.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read access key from storage");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockContentApi;
    use crate::models::CreateUserResponse;
    use crate::storage::MemoryStorage;

    fn provider_with_api(api: MockContentApi) -> (IdentityProvider, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (
            IdentityProvider::new(Arc::new(api), storage.clone() as Arc<dyn KeyValueStorage>),
            storage,
        )
    }

    fn created_response(key: &str) -> CreateUserResponse {
        CreateUserResponse {
            success: true,
            access_key: key.to_string(),
            message: "User created".to_string(),
        }
    }

    #[tokio::test]
    async fn test_initialize_user_creates_once() {
        let mut api = MockContentApi::new();
        // Exactly one create call across two initializations
        api.expect_create_user()
            .times(1)
            .returning(|| Ok(created_response("key-1")));

        let (provider, _storage) = provider_with_api(api);

        let first = provider.initialize_user().await.unwrap();
        let second = provider.initialize_user().await.unwrap();
        assert_eq!(first, "key-1");
        assert_eq!(second, "key-1");
    }

    #[tokio::test]
    async fn test_access_key_lazily_creates_user() {
        let mut api = MockContentApi::new();
        api.expect_create_user()
            .times(1)
            .returning(|| Ok(created_response("lazy-key")));

        let (provider, storage) = provider_with_api(api);

        let key = provider.access_key().await.unwrap();
        assert_eq!(key, "lazy-key");

        // Persisted for next time
        let stored = storage.get(ACCESS_KEY_STORAGE_KEY).await.unwrap();
        assert_eq!(stored, Some("lazy-key".to_string()));
    }

    #[tokio::test]
    async fn test_access_key_prefers_persisted_credential() {
        let mut api = MockContentApi::new();
        api.expect_create_user().times(0);

        let (provider, storage) = provider_with_api(api);
        storage.set(ACCESS_KEY_STORAGE_KEY, "existing").await.unwrap();

        assert_eq!(provider.access_key().await.unwrap(), "existing");
    }

    #[tokio::test]
    async fn test_missing_access_key_in_response_is_invalid() {
        let mut api = MockContentApi::new();
        api.expect_create_user().times(1).returning(|| {
            Ok(CreateUserResponse {
                success: true,
                access_key: String::new(),
                message: String::new(),
            })
        });

        let (provider, _storage) = provider_with_api(api);
        let err = provider.initialize_user().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidServerResponse(_)));
    }

    #[tokio::test]
    async fn test_clear_then_initialize_creates_again() {
        let mut api = MockContentApi::new();
        let mut call = 0;
        api.expect_create_user().times(2).returning(move || {
            call += 1;
            Ok(created_response(&format!("key-{}", call)))
        });

        let (provider, _storage) = provider_with_api(api);

        assert_eq!(provider.initialize_user().await.unwrap(), "key-1");
        provider.clear_user().await.unwrap();
        assert_eq!(provider.initialize_user().await.unwrap(), "key-2");
    }

    #[tokio::test]
    async fn test_concurrent_first_use_creates_one_user() {
        let mut api = MockContentApi::new();
        api.expect_create_user()
            .times(1)
            .returning(|| Ok(created_response("shared-key")));

        let (provider, _storage) = provider_with_api(api);

        let (a, b) = tokio::join!(provider.access_key(), provider.access_key());
        assert_eq!(a.unwrap(), "shared-key");
        assert_eq!(b.unwrap(), "shared-key");
    }

    #[tokio::test]
    async fn test_peek_does_not_create() {
        let mut api = MockContentApi::new();
        api.expect_create_user().times(0);

        let (provider, _storage) = provider_with_api(api);
        assert_eq!(provider.peek_access_key().await, None);
    }
}
