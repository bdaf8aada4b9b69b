//! Id-keyed resource graph and the link resolver.
//!
//! Entries and assets live in maps keyed by id; links refer to them by id only. Resolution
//! flips a link from `Unresolved` to `Entry`/`Asset` once its target is present in the pool
//! it is resolved against. It is monotonic and idempotent: resolved links are skipped, and
//! orphans stay unresolved until a later call sees their target.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::error::ConfigurationError;
use crate::link::{Link, LinkTarget, LinkType};
use crate::resource::{Asset, Entry};

/// Ids available as link targets.
#[derive(Debug, Clone, Default)]
pub struct LinkPool {
    entries: HashSet<String>,
    assets: HashSet<String>,
}

impl LinkPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entries<'a>(&mut self, entries: impl IntoIterator<Item = &'a Entry>) -> &mut Self {
        self.entries.extend(entries.into_iter().map(|e| e.sys.id.clone()));
        self
    }

    pub fn add_assets<'a>(&mut self, assets: impl IntoIterator<Item = &'a Asset>) -> &mut Self {
        self.assets.extend(assets.into_iter().map(|a| a.sys.id.clone()));
        self
    }

    pub fn contains(&self, target: &LinkTarget) -> bool {
        match target.link_type {
            LinkType::Entry => self.entries.contains(&target.id),
            LinkType::Asset => self.assets.contains(&target.id),
        }
    }
}

/// Outcome of one resolver pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Links flipped to resolved in this pass.
    pub resolved: usize,
    /// Links whose target is still missing.
    pub orphans: Vec<LinkTarget>,
}

/// Resolves every unresolved link in `entries` whose target is in `pool`.
pub fn resolve_links<'a>(entries: impl IntoIterator<Item = &'a mut Entry>, pool: &LinkPool) -> Resolution {
    let mut resolution = Resolution::default();
    for entry in entries {
        for link in entry.links_mut() {
            if let Link::Unresolved(target) = link {
                if pool.contains(target) {
                    link.resolve();
                    resolution.resolved += 1;
                } else {
                    resolution.orphans.push(target.clone());
                }
            }
        }
    }
    resolution
}

/// Demotes resolved links whose target id was removed back to `Unresolved`. Returns how
/// many links were detached.
pub fn detach_links<'a>(
    entries: impl IntoIterator<Item = &'a mut Entry>,
    removed_entries: &BTreeSet<String>,
    removed_assets: &BTreeSet<String>,
) -> usize {
    if removed_entries.is_empty() && removed_assets.is_empty() {
        return 0;
    }
    let mut detached = 0;
    for entry in entries {
        for link in entry.links_mut() {
            let removed = match &*link {
                Link::Entry(id) => removed_entries.contains(id),
                Link::Asset(id) => removed_assets.contains(id),
                Link::Unresolved(_) => false,
            };
            if removed {
                link.detach();
                detached += 1;
            }
        }
    }
    detached
}

/// Target of a resolved link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Linked<'a> {
    Entry(&'a Entry),
    Asset(&'a Asset),
}

/// Arena of entries and assets keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceGraph {
    entries: HashMap<String, Entry>,
    assets: HashMap<String, Asset>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resources(entries: impl IntoIterator<Item = Entry>, assets: impl IntoIterator<Item = Asset>) -> Self {
        let mut graph = Self::new();
        for entry in entries {
            graph.insert_entry(entry);
        }
        for asset in assets {
            graph.insert_asset(asset);
        }
        graph
    }

    /// Inserts or replaces an entry, returning the previous version.
    pub fn insert_entry(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.sys.id.clone(), entry)
    }

    pub fn insert_asset(&mut self, asset: Asset) -> Option<Asset> {
        self.assets.insert(asset.sys.id.clone(), asset)
    }

    pub fn remove_entry(&mut self, id: &str) -> Option<Entry> {
        self.entries.remove(id)
    }

    pub fn remove_asset(&mut self, id: &str) -> Option<Asset> {
        self.assets.remove(id)
    }

    pub fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn entry_mut(&mut self, id: &str) -> Option<&mut Entry> {
        self.entries.get_mut(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn entries_by_id(&self) -> &HashMap<String, Entry> {
        &self.entries
    }

    pub fn assets_by_id(&self) -> &HashMap<String, Asset> {
        &self.assets
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.assets.is_empty()
    }

    /// Ids of everything in the graph.
    pub fn pool(&self) -> LinkPool {
        let mut pool = LinkPool::new();
        pool.add_entries(self.entries.values()).add_assets(self.assets.values());
        pool
    }

    /// Resolves the graph's entries against the graph itself.
    pub fn resolve(&mut self) -> Resolution {
        let pool = self.pool();
        self.resolve_against(&pool)
    }

    /// Resolves the graph's entries against an explicit pool.
    pub fn resolve_against(&mut self, pool: &LinkPool) -> Resolution {
        let resolution = resolve_links(self.entries.values_mut(), pool);
        debug!(
            resolved = resolution.resolved,
            orphans = resolution.orphans.len(),
            "Resolved graph links"
        );
        resolution
    }

    pub fn detach(&mut self, removed_entries: &BTreeSet<String>, removed_assets: &BTreeSet<String>) -> usize {
        detach_links(self.entries.values_mut(), removed_entries, removed_assets)
    }

    /// Switches every resource to `code`. All tables are checked first, so on error no
    /// resource has changed locale.
    pub fn set_locale(&mut self, code: Option<&str>) -> Result<(), ConfigurationError> {
        for table in self
            .entries
            .values()
            .map(Entry::locale_table)
            .chain(self.assets.values().map(Asset::locale_table))
        {
            table.resolve(code)?;
        }
        for entry in self.entries.values_mut() {
            entry.set_locale(code)?;
        }
        for asset in self.assets.values_mut() {
            asset.set_locale(code)?;
        }
        Ok(())
    }

    /// Follows a resolved link. Unresolved links, and resolved links whose target has since
    /// left the graph, yield `None`.
    pub fn follow(&self, link: &Link) -> Option<Linked<'_>> {
        match link {
            Link::Entry(id) => self.entries.get(id).map(Linked::Entry),
            Link::Asset(id) => self.assets.get(id).map(Linked::Asset),
            Link::Unresolved(_) => None,
        }
    }

    pub fn linked_entry(&self, link: &Link) -> Option<&Entry> {
        match self.follow(link)? {
            Linked::Entry(entry) => Some(entry),
            Linked::Asset(_) => None,
        }
    }

    pub fn linked_asset(&self, link: &Link) -> Option<&Asset> {
        match self.follow(link)? {
            Linked::Asset(asset) => Some(asset),
            Linked::Entry(_) => None,
        }
    }

    /// Every unresolved link in the graph, for orphan reporting.
    pub fn orphans(&self) -> Vec<LinkTarget> {
        self.entries
            .values()
            .flat_map(|entry| entry.unresolved_links().map(Link::target))
            .collect()
    }
}
