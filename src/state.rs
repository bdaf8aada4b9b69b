//! Cumulative local mirror of a synchronized space.

use std::collections::{BTreeSet, HashMap};

use crate::error::ConfigurationError;
use crate::graph::{Linked, ResourceGraph};
use crate::link::Link;
use crate::resource::{Asset, Entry};

/// Live resources, deletion markers and the sync cursor.
///
/// An id is never both live and deleted: merging a deletion removes the live resource,
/// merging a re-creation clears the deletion marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    pub(crate) graph: ResourceGraph,
    pub(crate) deleted_entry_ids: BTreeSet<String>,
    pub(crate) deleted_asset_ids: BTreeSet<String>,
    pub(crate) sync_token: Option<String>,
    pub(crate) has_more_pages: bool,
}

impl SyncState {
    /// Empty state; the next sync run starts with an initial request.
    pub fn new() -> Self {
        Self::default()
    }

    /// State resuming from a token persisted by an earlier run.
    pub fn resume(sync_token: impl Into<String>) -> Self {
        Self {
            sync_token: Some(sync_token.into()),
            ..Self::default()
        }
    }

    /// State rebuilt from the caller's persisted resources plus the token; links between
    /// the restored resources are resolved immediately.
    pub fn restore(
        sync_token: impl Into<String>,
        entries: impl IntoIterator<Item = Entry>,
        assets: impl IntoIterator<Item = Asset>,
    ) -> Self {
        let mut graph = ResourceGraph::from_resources(entries, assets);
        graph.resolve();
        Self {
            graph,
            sync_token: Some(sync_token.into()),
            ..Self::default()
        }
    }

    /// Cursor for the next run; `None` before the first page was merged.
    pub fn sync_token(&self) -> Option<&str> {
        self.sync_token.as_deref()
    }

    pub fn has_more_pages(&self) -> bool {
        self.has_more_pages
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn entry(&self, id: &str) -> Option<&Entry> {
        self.graph.entry(id)
    }

    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.graph.asset(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.graph.entries()
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.graph.assets()
    }

    pub fn entries_by_id(&self) -> &HashMap<String, Entry> {
        self.graph.entries_by_id()
    }

    pub fn assets_by_id(&self) -> &HashMap<String, Asset> {
        self.graph.assets_by_id()
    }

    pub fn deleted_entry_ids(&self) -> &BTreeSet<String> {
        &self.deleted_entry_ids
    }

    pub fn deleted_asset_ids(&self) -> &BTreeSet<String> {
        &self.deleted_asset_ids
    }

    pub fn follow(&self, link: &Link) -> Option<Linked<'_>> {
        self.graph.follow(link)
    }

    /// Applies `code` (`None` for the default) as the projection locale of every entry
    /// and asset.
    pub fn set_locale(&mut self, code: Option<&str>) -> Result<(), ConfigurationError> {
        self.graph.set_locale(code)
    }
}
