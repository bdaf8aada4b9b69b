//! # contract: collaborator interfaces of the sync engine
//!
//! The engine talks to the outside world through two traits:
//! - [`Transport`]: issues a GET for a URL plus query parameters and returns the raw body.
//! - [`SyncPersistence`]: receives push notifications while sync pages are merged.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` (behind `test-export-mocks`), so consumers can
//!   script transports and assert notification order in their own tests.
//!
//! ## Adding New Transports
//! - Implement [`Transport`] for your client. Map non-success responses to
//!   [`TransportError::Status`] so callers can tell HTTP failures from decoding failures.
//! - Retry policy belongs to the transport; the sync coordinator never retries.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::TransportError;
use crate::resource::{Asset, Entry};

/// Query parameters, ordered for deterministic URLs.
pub type QueryParams = BTreeMap<String, String>;

/// Fetches raw response bodies.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` with `params`, returning the body bytes of a successful response.
    async fn fetch(&self, url: &str, params: &QueryParams) -> Result<Vec<u8>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn fetch(&self, url: &str, params: &QueryParams) -> Result<Vec<u8>, TransportError> {
        (**self).fetch(url, params).await
    }
}

/// Receives changes as sync pages are merged.
///
/// Within a page, upsert and delete notifications arrive in the order the resources were
/// merged; `on_sync_token_advanced` follows once all of them have been delivered. All of
/// page N's notifications precede page N+1's.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait SyncPersistence: Send + Sync {
    fn on_asset_upserted(&self, asset: &Asset);

    fn on_asset_deleted(&self, id: &str);

    fn on_entry_upserted(&self, entry: &Entry);

    fn on_entry_deleted(&self, id: &str);

    fn on_sync_token_advanced(&self, token: &str);
}

impl<P: SyncPersistence + ?Sized> SyncPersistence for Arc<P> {
    fn on_asset_upserted(&self, asset: &Asset) {
        (**self).on_asset_upserted(asset)
    }

    fn on_asset_deleted(&self, id: &str) {
        (**self).on_asset_deleted(id)
    }

    fn on_entry_upserted(&self, entry: &Entry) {
        (**self).on_entry_upserted(entry)
    }

    fn on_entry_deleted(&self, id: &str) {
        (**self).on_entry_deleted(id)
    }

    fn on_sync_token_advanced(&self, token: &str) {
        (**self).on_sync_token_advanced(token)
    }
}
