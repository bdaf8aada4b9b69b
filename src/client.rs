//! Read-side facade over the delivery API.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::contract::{QueryParams, SyncPersistence, Transport};
use crate::error::{ConfigurationError, Result};
use crate::locale::LocaleTable;
use crate::query::Query;
use crate::resource::{Asset, ContentType, Decoder, Entry};
use crate::response::{decode_locales, Collection};
use crate::synchronise::SyncCoordinator;
use crate::transport::HttpTransport;

/// Fetches entries, assets and content types, and hands out sync coordinators that share
/// its transport and locale table.
pub struct Client<T = HttpTransport> {
    config: ClientConfig,
    transport: Arc<T>,
    locales: OnceCell<Arc<LocaleTable>>,
}

impl Client<HttpTransport> {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, ConfigurationError> {
        let transport = HttpTransport::from_config(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            locales: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches the space's locales and validates them into a table. Not cached.
    pub async fn locales(&self) -> Result<LocaleTable> {
        let body = self.transport.fetch(&self.config.locales_url(), &QueryParams::new()).await?;
        let table = LocaleTable::build(decode_locales(&body)?).map_err(|e| {
            error!(error = ?e, space_id = %self.config.space_id, "Rejected locale table");
            e
        })?;
        info!(
            locales = table.len(),
            default_locale = %table.default_locale().code,
            "Fetched locale table"
        );
        Ok(table)
    }

    /// Returns the cached locale table, fetching it on first use.
    pub async fn connect(&self) -> Result<Arc<LocaleTable>> {
        let table = self
            .locales
            .get_or_try_init(|| async { self.locales().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(table))
    }

    pub async fn entries(&self, query: &Query) -> Result<Collection<Entry>> {
        let (decoder, params) = self.localized_request(query).await?;
        let body = self.transport.fetch(&self.config.entries_url(), &params).await?;
        let collection = Collection::decode_entries(&body, &decoder)?;
        debug!(items = collection.len(), total = collection.total, "Fetched entries");
        Ok(collection)
    }

    /// The entry with `id`, with its links resolved against the included resources.
    pub async fn entry(&self, id: &str) -> Result<Option<Entry>> {
        let query = Query::new().where_field("sys.id", id).limit(1);
        Ok(self.entries(&query).await?.items.into_iter().next())
    }

    pub async fn assets(&self, query: &Query) -> Result<Collection<Asset>> {
        let (decoder, params) = self.localized_request(query).await?;
        let body = self.transport.fetch(&self.config.assets_url(), &params).await?;
        let collection = Collection::decode_assets(&body, &decoder)?;
        debug!(items = collection.len(), total = collection.total, "Fetched assets");
        Ok(collection)
    }

    pub async fn asset(&self, id: &str) -> Result<Option<Asset>> {
        let query = Query::new().where_field("sys.id", id).limit(1);
        Ok(self.assets(&query).await?.items.into_iter().next())
    }

    pub async fn content_types(&self) -> Result<Vec<ContentType>> {
        let decoder = Decoder::new(self.connect().await?);
        let body = self
            .transport
            .fetch(&self.config.content_types_url(), &QueryParams::new())
            .await?;
        Ok(Collection::decode_content_types(&body, &decoder)?.items)
    }

    /// A sync coordinator sharing this client's transport and locale table.
    pub async fn coordinator<P: SyncPersistence>(&self, persistence: P) -> Result<SyncCoordinator<Arc<T>, P>> {
        let locales = self.connect().await?;
        Ok(SyncCoordinator::new(
            self.config.clone(),
            Arc::clone(&self.transport),
            persistence,
            locales,
        )?)
    }

    /// Decoder and request parameters for `query`. The configured locale applies when the
    /// query names none; a wildcard query projects into the default locale.
    async fn localized_request(&self, query: &Query) -> Result<(Decoder, QueryParams)> {
        let locales = self.connect().await?;
        let mut params = query.to_params();
        if let (None, Some(locale)) = (query.get("locale"), self.config.locale.as_ref()) {
            params.insert("locale".into(), locale.clone());
        }
        let decoder = Decoder::with_locale(locales, params.get("locale").map(String::as_str))?;
        Ok((decoder, params))
    }
}
