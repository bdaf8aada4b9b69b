//! Folding sync pages into [`SyncState`].
//!
//! A page moves through `decoded -> categorized -> merged -> re-resolved`. Live resources
//! are upserted (the later page wins), deletion markers move ids from the live maps into
//! the deleted sets, and links are then re-resolved against the whole cumulative graph so
//! targets that arrived on earlier pages are found.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::contract::SyncPersistence;
use crate::link::LinkTarget;
use crate::resource::Resource;
use crate::response::SyncPage;
use crate::state::SyncState;

/// What merging one page changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReport {
    pub sync_token: String,
    pub has_more_pages: bool,
    pub upserted_entries: usize,
    pub upserted_assets: usize,
    pub deleted_entries: usize,
    pub deleted_assets: usize,
    /// Links newly resolved across the cumulative graph.
    pub resolved_links: usize,
    /// Resolved links demoted because their target was deleted.
    pub detached_links: usize,
    /// Links still lacking a target after this page.
    pub orphans: Vec<LinkTarget>,
}

enum Change {
    EntryUpserted(String),
    AssetUpserted(String),
    EntryDeleted(String),
    AssetDeleted(String),
}

impl SyncState {
    /// Merges one decoded page, notifies `persistence`, then commits the page's token.
    pub fn merge_page(&mut self, page: SyncPage, persistence: &dyn SyncPersistence) -> PageReport {
        let SyncPage {
            resources,
            sync_token,
            has_more_pages,
        } = page;

        let mut report = PageReport::default();
        let mut changes = Vec::with_capacity(resources.len());
        let mut removed_entries = BTreeSet::new();
        let mut removed_assets = BTreeSet::new();

        for resource in resources {
            match resource {
                Resource::Entry(entry) => {
                    let id = entry.sys.id.clone();
                    self.deleted_entry_ids.remove(&id);
                    removed_entries.remove(&id);
                    self.graph.insert_entry(entry);
                    report.upserted_entries += 1;
                    changes.retain(|c| !matches!(c, Change::EntryUpserted(prev) if *prev == id));
                    changes.push(Change::EntryUpserted(id));
                }
                Resource::Asset(asset) => {
                    let id = asset.sys.id.clone();
                    self.deleted_asset_ids.remove(&id);
                    removed_assets.remove(&id);
                    self.graph.insert_asset(asset);
                    report.upserted_assets += 1;
                    changes.retain(|c| !matches!(c, Change::AssetUpserted(prev) if *prev == id));
                    changes.push(Change::AssetUpserted(id));
                }
                Resource::DeletedEntry(sys) => {
                    self.graph.remove_entry(&sys.id);
                    self.deleted_entry_ids.insert(sys.id.clone());
                    removed_entries.insert(sys.id.clone());
                    report.deleted_entries += 1;
                    changes.retain(|c| !matches!(c, Change::EntryUpserted(prev) if *prev == sys.id));
                    changes.push(Change::EntryDeleted(sys.id));
                }
                Resource::DeletedAsset(sys) => {
                    self.graph.remove_asset(&sys.id);
                    self.deleted_asset_ids.insert(sys.id.clone());
                    removed_assets.insert(sys.id.clone());
                    report.deleted_assets += 1;
                    changes.retain(|c| !matches!(c, Change::AssetUpserted(prev) if *prev == sys.id));
                    changes.push(Change::AssetDeleted(sys.id));
                }
                Resource::ContentType(content_type) => {
                    warn!(
                        content_type_id = %content_type.sys.id,
                        "[SYNC][MERGE] Ignoring content type in sync page"
                    );
                }
            }
        }

        report.detached_links = self.graph.detach(&removed_entries, &removed_assets);
        let resolution = self.graph.resolve();
        report.resolved_links = resolution.resolved;
        report.orphans = resolution.orphans;

        // Within a page only the last upsert of an id is reported, and an upsert followed
        // by a deletion reports only the deletion.
        for change in &changes {
            match change {
                Change::EntryUpserted(id) => {
                    if let Some(entry) = self.graph.entry(id) {
                        persistence.on_entry_upserted(entry);
                    }
                }
                Change::AssetUpserted(id) => {
                    if let Some(asset) = self.graph.asset(id) {
                        persistence.on_asset_upserted(asset);
                    }
                }
                Change::EntryDeleted(id) => persistence.on_entry_deleted(id),
                Change::AssetDeleted(id) => persistence.on_asset_deleted(id),
            }
        }

        self.sync_token = Some(sync_token.clone());
        self.has_more_pages = has_more_pages;
        persistence.on_sync_token_advanced(&sync_token);

        for orphan in &report.orphans {
            debug!(target_id = %orphan.id, link_type = %orphan.link_type, "[SYNC][MERGE] Link target not yet available");
        }
        info!(
            upserted_entries = report.upserted_entries,
            upserted_assets = report.upserted_assets,
            deleted_entries = report.deleted_entries,
            deleted_assets = report.deleted_assets,
            resolved_links = report.resolved_links,
            orphans = report.orphans.len(),
            has_more_pages,
            "[SYNC][MERGE] Merged page"
        );

        report.sync_token = sync_token;
        report.has_more_pages = has_more_pages;
        report
    }
}
