//! Coordinating module for the fetch-merge sync loop.
//!
//! A run moves through `Start -> Fetching -> PageReceived -> (more pages ? Fetching : Done)`.
//! Pages are fetched strictly one after another: page N+1 is requested only after page N
//! has been merged and re-resolved, since its links may point at resources from page N.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::ClientConfig;
use crate::contract::{QueryParams, SyncPersistence, Transport};
use crate::error::{ConfigurationError, Error, Result};
use crate::locale::LocaleTable;
use crate::merge::PageReport;
use crate::query::sync_params;
use crate::resource::Decoder;
use crate::response::SyncPage;
use crate::state::SyncState;

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: Vec<PageReport>,
}

impl SyncReport {
    /// Cursor committed by the last merged page.
    pub fn sync_token(&self) -> Option<&str> {
        self.pages.last().map(|page| page.sync_token.as_str())
    }

    pub fn upserted(&self) -> usize {
        self.pages
            .iter()
            .map(|page| page.upserted_entries + page.upserted_assets)
            .sum()
    }

    pub fn deleted(&self) -> usize {
        self.pages
            .iter()
            .map(|page| page.deleted_entries + page.deleted_assets)
            .sum()
    }
}

/// A failed [`SyncCoordinator::run_sync`]: the error, and the state as it stood when the
/// run stopped.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct SyncFailure {
    pub state: SyncState,
    #[source]
    pub error: Error,
}

impl SyncFailure {
    pub fn into_parts(self) -> (SyncState, Error) {
        (self.state, self.error)
    }
}

impl From<SyncFailure> for Error {
    fn from(failure: SyncFailure) -> Self {
        failure.error
    }
}

/// Drives repeated fetch and merge cycles against the sync endpoint.
pub struct SyncCoordinator<T, P> {
    config: ClientConfig,
    transport: T,
    persistence: P,
    decoder: Decoder,
}

impl<T, P> SyncCoordinator<T, P>
where
    T: Transport,
    P: SyncPersistence,
{
    /// Fails if the configured projection locale is not in `locales`.
    pub fn new(
        config: ClientConfig,
        transport: T,
        persistence: P,
        locales: Arc<LocaleTable>,
    ) -> std::result::Result<Self, ConfigurationError> {
        let decoder = Decoder::with_locale(locales, config.locale.as_deref())?;
        Ok(Self {
            config,
            transport,
            persistence,
            decoder,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn locales(&self) -> &Arc<LocaleTable> {
        self.decoder.locales()
    }

    /// Syncs `state` until the server reports no more pages.
    ///
    /// Only one run may hold `state` at a time; a second concurrent call fails with
    /// [`Error::ConcurrentSync`]. `extra` is sent with the initial request only. If a fetch
    /// or decode fails, or the returned future is dropped, pages merged so far stay in
    /// `state` and the page in flight is discarded.
    pub async fn sync(&self, state: &Mutex<SyncState>, extra: &QueryParams) -> Result<SyncReport> {
        if self.config.preview {
            error!(space_id = %self.config.space_id, "[SYNC][ERROR] Sync is not available in preview mode");
            return Err(ConfigurationError::PreviewSync.into());
        }

        let mut state = state.try_lock().map_err(|_| {
            warn!(space_id = %self.config.space_id, "[SYNC] Rejected sync run: another run holds the state");
            Error::ConcurrentSync
        })?;

        let url = self.config.sync_url();
        let mut report = SyncReport::default();
        info!(
            space_id = %self.config.space_id,
            environment = %self.config.environment,
            initial = state.sync_token().is_none(),
            "[SYNC] Starting synchronisation"
        );

        loop {
            let page_number = report.pages.len() + 1;
            let params = sync_params(state.sync_token().is_none(), state.sync_token(), extra);

            let body = self.transport.fetch(&url, &params).await.map_err(|e| {
                error!(page = page_number, error = ?e, "[SYNC][ERROR] Fetching page failed");
                e
            })?;

            let page = SyncPage::decode(&body, &self.decoder).map_err(|e| {
                error!(page = page_number, error = ?e, "[SYNC][ERROR] Decoding page failed");
                e
            })?;
            info!(
                page = page_number,
                items = page.resources.len(),
                sync_token = %page.sync_token,
                has_more_pages = page.has_more_pages,
                "[SYNC] Page received"
            );

            let page_report = state.merge_page(page, &self.persistence);
            let has_more_pages = page_report.has_more_pages;
            report.pages.push(page_report);

            if !has_more_pages {
                break;
            }
        }

        info!(
            pages = report.pages.len(),
            upserted = report.upserted(),
            deleted = report.deleted(),
            entries = state.graph().entry_count(),
            assets = state.graph().asset_count(),
            "[SYNC] Synchronisation complete"
        );
        Ok(report)
    }

    /// By-value form of [`sync`](Self::sync): starts from `existing` (or an empty state)
    /// and returns the final state. On failure the state comes back inside the
    /// [`SyncFailure`], holding every page merged before the error.
    pub async fn run_sync(
        &self,
        existing: Option<SyncState>,
        extra: &QueryParams,
    ) -> std::result::Result<SyncState, SyncFailure> {
        let state = Mutex::new(existing.unwrap_or_default());
        let outcome = self.sync(&state, extra).await;
        let state = state.into_inner();
        match outcome {
            Ok(_) => Ok(state),
            Err(error) => Err(SyncFailure { state, error }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockSyncPersistence, MockTransport};
    use crate::locale::Locale;
    use crate::persistence::NoopPersistence;
    use serde_json::json;

    fn locales() -> Arc<LocaleTable> {
        Arc::new(LocaleTable::build(vec![Locale::new("en-US", "English").default_locale()]).unwrap())
    }

    fn terminal_page(token: &str) -> Vec<u8> {
        json!({
            "items": [],
            "nextSyncUrl": format!("https://cdn.contentful.com/spaces/s/environments/master/sync?sync_token={token}")
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn resumed_state_sends_only_the_token() {
        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .withf(|url, params| {
                url.ends_with("/spaces/s/environments/master/sync")
                    && params.len() == 1
                    && params.get("sync_token").map(String::as_str) == Some("stored")
            })
            .times(1)
            .returning(|_, _| Ok(terminal_page("next")));

        let coordinator =
            SyncCoordinator::new(ClientConfig::new("s", "t"), transport, NoopPersistence, locales()).unwrap();
        let extra: QueryParams = [("type".to_string(), "Entry".to_string())].into_iter().collect();
        let state = coordinator.run_sync(Some(SyncState::resume("stored")), &extra).await.unwrap();

        assert_eq!(state.sync_token(), Some("next"));
        assert!(!state.has_more_pages());
    }

    #[tokio::test]
    async fn decoding_failure_keeps_token_and_skips_notifications() {
        let mut transport = MockTransport::new();
        transport.expect_fetch().times(1).returning(|_, _| {
            Ok(json!({
                "items": [{"sys": {"id": "x", "type": "Space"}}],
                "nextSyncUrl": "https://cdn.contentful.com/sync?sync_token=never"
            })
            .to_string()
            .into_bytes())
        });
        let mut persistence = MockSyncPersistence::new();
        persistence.expect_on_sync_token_advanced().never();

        let coordinator =
            SyncCoordinator::new(ClientConfig::new("s", "t"), transport, persistence, locales()).unwrap();
        let state = Mutex::new(SyncState::resume("before"));
        let err = coordinator.sync(&state, &QueryParams::new()).await.unwrap_err();

        assert!(matches!(err, Error::Decoding(_)));
        assert_eq!(state.lock().await.sync_token(), Some("before"));
    }

    #[test]
    fn unknown_projection_locale_is_rejected() {
        let config = ClientConfig::new("s", "t").with_locale("fr-FR");
        let result = SyncCoordinator::new(config, MockTransport::new(), NoopPersistence, locales());
        assert!(matches!(result, Err(ConfigurationError::UnknownLocale(code)) if code == "fr-FR"));
    }
}
