//! Client for a content delivery API with resumable incremental sync.
//!
//! Entries and assets are decoded into typed resources whose fields are stored per locale
//! and projected through the space's locale fallback chain. Links between resources are
//! kept as ids and resolved against an id-keyed [`ResourceGraph`], so cyclic references
//! are representable. The [`SyncCoordinator`] pages through the sync endpoint, merging
//! every page into a cumulative [`SyncState`] and re-resolving links across pages.
//!
//! Network access and change notifications go through the traits in [`contract`], so
//! either side can be replaced or mocked.

pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod fields;
pub mod graph;
pub mod link;
pub mod locale;
pub mod merge;
pub mod persistence;
pub mod query;
pub mod resource;
pub mod response;
pub mod state;
pub mod synchronise;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use contract::{QueryParams, SyncPersistence, Transport};
pub use error::{ConfigurationError, DecodingError, Error, Result, TransportError};
pub use fields::{FieldValue, LocalizedFields};
pub use graph::{Linked, ResourceGraph};
pub use link::{Link, LinkTarget, LinkType};
pub use locale::{Locale, LocaleTable};
pub use merge::PageReport;
pub use persistence::{NoopPersistence, TokenFile};
pub use query::Query;
pub use resource::{Asset, AssetFile, ContentType, Decoder, Entry, Resource, Sys};
pub use response::{Collection, SyncPage};
pub use state::SyncState;
pub use synchronise::{SyncCoordinator, SyncFailure, SyncReport};
pub use transport::HttpTransport;
