//! Decoding of collection and sync responses.

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DecodingError;
use crate::graph::{Linked, ResourceGraph};
use crate::link::{Link, LinkTarget, LinkType};
use crate::locale::Locale;
use crate::resource::{Asset, ContentType, Decoder, Entry, Resource};

/// One page of a collection endpoint, with its included resources.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    pub items: Vec<T>,
    /// Linked resources shipped alongside the items.
    pub includes: ResourceGraph,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
    /// Targets the API reported as not resolvable.
    pub unresolvable: Vec<LinkTarget>,
}

impl<T> Collection<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether later pages exist beyond this one.
    pub fn has_more(&self) -> bool {
        self.skip + (self.items.len() as u64) < self.total
    }
}

impl Collection<Entry> {
    /// Decodes an `Array` of entries and resolves item links against items and includes.
    pub fn decode_entries(body: &[u8], decoder: &Decoder) -> Result<Self, DecodingError> {
        let raw: Value = serde_json::from_slice(body)?;
        let mut collection = decode_array(&raw, decoder, |d, v| d.decode_entry(v))?;

        let mut pool = collection.includes.pool();
        pool.add_entries(collection.items.iter());
        let resolution = crate::graph::resolve_links(collection.items.iter_mut(), &pool);
        collection.includes.resolve_against(&pool);

        debug!(
            items = collection.items.len(),
            resolved = resolution.resolved,
            orphans = resolution.orphans.len(),
            "Decoded entry collection"
        );
        Ok(collection)
    }

    /// Follows a resolved link into the items or the includes.
    pub fn follow(&self, link: &Link) -> Option<Linked<'_>> {
        self.includes.follow(link).or_else(|| match link {
            Link::Entry(id) => self.items.iter().find(|e| &e.sys.id == id).map(Linked::Entry),
            _ => None,
        })
    }
}

impl Collection<Asset> {
    pub fn decode_assets(body: &[u8], decoder: &Decoder) -> Result<Self, DecodingError> {
        let raw: Value = serde_json::from_slice(body)?;
        decode_array(&raw, decoder, |d, v| d.decode_asset(v))
    }
}

impl Collection<ContentType> {
    pub fn decode_content_types(body: &[u8], decoder: &Decoder) -> Result<Self, DecodingError> {
        let raw: Value = serde_json::from_slice(body)?;
        decode_array(&raw, decoder, |d, v| d.decode_content_type(v))
    }
}

#[derive(Deserialize)]
struct LocaleArray {
    items: Vec<Locale>,
}

/// Decodes the locales endpoint into the raw locale list; build a
/// [`LocaleTable`](crate::locale::LocaleTable) from it to validate fallbacks.
pub fn decode_locales(body: &[u8]) -> Result<Vec<Locale>, DecodingError> {
    let array: LocaleArray = serde_json::from_slice(body)?;
    Ok(array.items)
}

fn decode_array<T>(
    raw: &Value,
    decoder: &Decoder,
    decode_item: impl Fn(&Decoder, &Value) -> Result<T, DecodingError>,
) -> Result<Collection<T>, DecodingError> {
    let items = raw
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| DecodingError::MissingField("items".into()))?
        .iter()
        .map(|item| decode_item(decoder, item))
        .collect::<Result<Vec<_>, _>>()?;

    let mut includes = ResourceGraph::new();
    if let Some(raw_includes) = raw.get("includes") {
        for raw_entry in array_at(raw_includes, "Entry") {
            includes.insert_entry(decoder.decode_entry(raw_entry)?);
        }
        for raw_asset in array_at(raw_includes, "Asset") {
            includes.insert_asset(decoder.decode_asset(raw_asset)?);
        }
    }

    let unresolvable = array_at(raw, "errors")
        .filter(|error| error.pointer("/sys/id").and_then(Value::as_str) == Some("notResolvable"))
        .filter_map(|error| {
            let details = error.get("details")?;
            let id = details.get("id")?.as_str()?;
            let link_type = LinkType::parse(details.get("linkType")?.as_str()?)?;
            Some(LinkTarget::new(id, link_type))
        })
        .collect();

    Ok(Collection {
        total: count_at(raw, "total").unwrap_or(items.len() as u64),
        skip: count_at(raw, "skip").unwrap_or(0),
        limit: count_at(raw, "limit").unwrap_or(items.len() as u64),
        items,
        includes,
        unresolvable,
    })
}

fn array_at<'a>(raw: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

fn count_at(raw: &Value, key: &str) -> Option<u64> {
    raw.get(key).and_then(Value::as_u64)
}

/// One decoded page of the sync endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPage {
    /// Resources in wire order.
    pub resources: Vec<Resource>,
    pub sync_token: String,
    pub has_more_pages: bool,
}

impl SyncPage {
    /// Decodes a sync response. Any malformed item fails the whole page.
    pub fn decode(body: &[u8], decoder: &Decoder) -> Result<Self, DecodingError> {
        let raw: Value = serde_json::from_slice(body)?;

        let resources = raw
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| DecodingError::MissingField("items".into()))?
            .iter()
            .map(|item| decoder.decode(item))
            .collect::<Result<Vec<_>, _>>()?;

        let (next_url, has_more_pages) = match (
            raw.get("nextPageUrl").and_then(Value::as_str),
            raw.get("nextSyncUrl").and_then(Value::as_str),
        ) {
            (Some(url), _) => (url, true),
            (None, Some(url)) => (url, false),
            (None, None) => return Err(DecodingError::MissingField("nextSyncUrl".into())),
        };
        let sync_token = token_from_url(next_url)?;

        if resources.is_empty() && has_more_pages {
            warn!(sync_token = %sync_token, "[SYNC] Received an empty page that announces more pages");
        }

        Ok(Self {
            resources,
            sync_token,
            has_more_pages,
        })
    }
}

/// Extracts the `sync_token` query parameter from a next-page/next-sync URL.
pub fn token_from_url(url: &str) -> Result<String, DecodingError> {
    let parsed = Url::parse(url).map_err(|e| DecodingError::InvalidValue {
        field: "nextSyncUrl".into(),
        message: e.to_string(),
    })?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "sync_token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| DecodingError::MissingField("sync_token".into()))
}
