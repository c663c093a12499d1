//! Ambient client binding.
//!
//! [`ApiProvider::scope`] makes a client available to everything awaited
//! inside it, and [`use_api`] retrieves it without threading the client
//! through every function signature.
//!
//! The binding is task-local: tasks spawned from inside a scope do not
//! inherit it and need a scope of their own.
//!
//! # Example
//!
//! ```ignore
//! use api_zero::{ApiClient, ApiProvider, RequestOptions, use_api};
//!
//! async fn load_profile() -> Result<Profile, ApiError> {
//!     use_api().get("/me", RequestOptions::new()).await
//! }
//!
//! let client = ApiClient::builder("https://api.example.com").build()?;
//! let profile = ApiProvider::new(client).scope(load_profile()).await?;
//! ```

use std::future::Future;

use crate::builder::ClientBuildError;
use crate::client::ApiClient;
use crate::config::ClientConfig;

tokio::task_local! {
    static CURRENT_CLIENT: ApiClient;
}

/// Installs a client as the ambient client for a future.
#[derive(Clone, Debug)]
pub struct ApiProvider {
    client: ApiClient,
}

impl ApiProvider {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Build a client from `config` and provide it.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientBuildError> {
        ApiClient::new(config).map(Self::new)
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Run `fut` with this provider's client as the ambient client.
    ///
    /// Scopes nest; the innermost provider wins.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT_CLIENT.scope(self.client, fut).await
    }

    /// Synchronous form of [`scope`](Self::scope).
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        CURRENT_CLIENT.sync_scope(self.client, f)
    }
}

/// The ambient client.
///
/// # Panics
///
/// Panics when called outside an [`ApiProvider`] scope. Use [`try_use_api`]
/// to handle that case.
pub fn use_api() -> ApiClient {
    match try_use_api() {
        Some(client) => client,
        None => panic!("use_api must be used within an ApiProvider scope"),
    }
}

/// The ambient client, or `None` outside an [`ApiProvider`] scope.
pub fn try_use_api() -> Option<ApiClient> {
    CURRENT_CLIENT.try_with(ApiClient::clone).ok()
}
