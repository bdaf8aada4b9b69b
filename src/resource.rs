//! Typed resources and the wire decoder.
//!
//! [`Decoder::decode`] dispatches on `sys.type` into the closed [`Resource`] enum. Unknown
//! or missing types are a [`DecodingError`], never a panic.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::{ConfigurationError, DecodingError};
use crate::fields::{FieldValue, LocalizedFields};
use crate::link::Link;
use crate::locale::{Locale, LocaleTable};

/// System metadata shared by every resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sys {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub locale: Option<String>,
    pub content_type_id: Option<String>,
    pub revision: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSys {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    locale: Option<String>,
    content_type: Option<Value>,
    revision: Option<u64>,
}

impl Sys {
    /// Decodes the `sys` block of a resource.
    pub fn from_wire(resource: &Value) -> Result<Self, DecodingError> {
        let raw = resource
            .get("sys")
            .ok_or_else(|| DecodingError::MissingField("sys".into()))?;
        let wire: WireSys =
            serde_json::from_value(raw.clone()).map_err(|e| DecodingError::InvalidSys(e.to_string()))?;
        let id = wire.id.ok_or_else(|| DecodingError::MissingField("sys.id".into()))?;
        let kind = wire
            .kind
            .ok_or_else(|| DecodingError::MissingField("sys.type".into()))?;
        let content_type_id = wire
            .content_type
            .as_ref()
            .and_then(|ct| ct.pointer("/sys/id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            id,
            kind,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            locale: wire.locale,
            content_type_id,
            revision: wire.revision,
        })
    }
}

/// An entry: localized fields that may link to other entries and assets.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub sys: Sys,
    fields: LocalizedFields,
    locales: Arc<LocaleTable>,
    current_locale: Locale,
}

/// An asset: localized metadata for an uploaded file. Assets hold no links.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub sys: Sys,
    fields: LocalizedFields,
    locales: Arc<LocaleTable>,
    current_locale: Locale,
}

macro_rules! localized_accessors {
    ($ty:ty) => {
        impl $ty {
            pub fn id(&self) -> &str {
                &self.sys.id
            }

            /// The locale used for field reads.
            pub fn current_locale(&self) -> &Locale {
                &self.current_locale
            }

            /// Switches the projection locale; `None` selects the default. Stored data is
            /// untouched.
            pub fn set_locale(&mut self, code: Option<&str>) -> Result<(), ConfigurationError> {
                self.current_locale = self.locales.resolve(code)?.clone();
                Ok(())
            }

            pub fn locale_table(&self) -> &LocaleTable {
                &self.locales
            }

            /// Raw per-locale storage, for wildcard consumers.
            pub fn localized(&self) -> &LocalizedFields {
                &self.fields
            }

            /// All fields projected into the current locale.
            pub fn fields(&self) -> BTreeMap<&str, &FieldValue> {
                self.fields.project(&self.current_locale, &self.locales)
            }

            pub fn field(&self, name: &str) -> Option<&FieldValue> {
                self.fields.value(name, &self.current_locale, &self.locales)
            }

            pub fn string(&self, name: &str) -> Option<&str> {
                self.field(name).and_then(FieldValue::as_str)
            }
        }
    };
}

localized_accessors!(Entry);
localized_accessors!(Asset);

impl Entry {
    pub fn new(sys: Sys, fields: LocalizedFields, locales: Arc<LocaleTable>, current_locale: Locale) -> Self {
        Self {
            sys,
            fields,
            locales,
            current_locale,
        }
    }

    pub fn content_type_id(&self) -> Option<&str> {
        self.sys.content_type_id.as_deref()
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.field(name).and_then(FieldValue::as_link)
    }

    pub fn links(&self, name: &str) -> Option<&[Link]> {
        self.field(name).and_then(FieldValue::as_links)
    }

    /// Links still waiting for their target, across all locales.
    pub fn unresolved_links(&self) -> impl Iterator<Item = &Link> {
        self.fields.links().filter(|link| !link.is_resolved())
    }

    pub(crate) fn links_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.fields.links_mut()
    }
}

impl Asset {
    pub fn new(sys: Sys, fields: LocalizedFields, locales: Arc<LocaleTable>, current_locale: Locale) -> Self {
        Self {
            sys,
            fields,
            locales,
            current_locale,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.string("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.string("description")
    }

    /// File metadata in the current locale, if the asset has been processed.
    pub fn file(&self) -> Option<AssetFile> {
        let raw = self.field("file")?.as_value()?;
        match serde_json::from_value(raw.clone()) {
            Ok(file) => Some(file),
            Err(e) => {
                trace!(asset_id = %self.sys.id, error = %e, "Asset file field has an unexpected shape");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFile {
    pub url: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub details: Option<FileDetails>,
}

impl AssetFile {
    /// The file URL with an explicit scheme; the API hands out protocol-relative URLs.
    pub fn https_url(&self) -> String {
        if self.url.starts_with("//") {
            format!("https:{}", self.url)
        } else {
            self.url.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDetails {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub image: Option<ImageDimensions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Schema of a family of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentType {
    pub sys: Sys,
    pub name: String,
    pub description: Option<String>,
    pub display_field: Option<String>,
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub items: Option<Value>,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub omitted: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireContentType {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    display_field: Option<String>,
    #[serde(default)]
    fields: Vec<FieldDefinition>,
}

/// Any decoded wire resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Entry(Entry),
    Asset(Asset),
    ContentType(ContentType),
    DeletedEntry(Sys),
    DeletedAsset(Sys),
}

impl Resource {
    pub fn sys(&self) -> &Sys {
        match self {
            Resource::Entry(e) => &e.sys,
            Resource::Asset(a) => &a.sys,
            Resource::ContentType(ct) => &ct.sys,
            Resource::DeletedEntry(sys) | Resource::DeletedAsset(sys) => sys,
        }
    }
}

/// Decodes wire resources against a shared locale table.
#[derive(Debug, Clone)]
pub struct Decoder {
    locales: Arc<LocaleTable>,
    locale: Locale,
}

impl Decoder {
    /// Decoder projecting into the default locale.
    pub fn new(locales: Arc<LocaleTable>) -> Self {
        let locale = locales.default_locale().clone();
        Self { locales, locale }
    }

    /// Decoder projecting into `code` (`None` or `*` select the default locale).
    pub fn with_locale(locales: Arc<LocaleTable>, code: Option<&str>) -> Result<Self, ConfigurationError> {
        let locale = match code {
            None | Some(crate::locale::WILDCARD) => locales.default_locale().clone(),
            Some(code) => locales.resolve(Some(code))?.clone(),
        };
        Ok(Self { locales, locale })
    }

    pub fn locales(&self) -> &Arc<LocaleTable> {
        &self.locales
    }

    pub fn decode(&self, value: &Value) -> Result<Resource, DecodingError> {
        let sys = Sys::from_wire(value)?;
        match sys.kind.as_str() {
            "Entry" => {
                let (fields, locale) = self.decode_fields(value, &sys)?;
                Ok(Resource::Entry(Entry::new(sys, fields, self.locales.clone(), locale)))
            }
            "Asset" => {
                let (fields, locale) = self.decode_fields(value, &sys)?;
                Ok(Resource::Asset(Asset::new(sys, fields, self.locales.clone(), locale)))
            }
            "ContentType" => {
                let wire: WireContentType = serde_json::from_value(value.clone())?;
                Ok(Resource::ContentType(ContentType {
                    sys,
                    name: wire.name,
                    description: wire.description,
                    display_field: wire.display_field,
                    fields: wire.fields,
                }))
            }
            "DeletedEntry" => Ok(Resource::DeletedEntry(sys)),
            "DeletedAsset" => Ok(Resource::DeletedAsset(sys)),
            other => Err(DecodingError::UnknownType(other.to_string())),
        }
    }

    pub fn decode_entry(&self, value: &Value) -> Result<Entry, DecodingError> {
        match self.decode(value)? {
            Resource::Entry(entry) => Ok(entry),
            other => Err(unexpected("Entry", &other)),
        }
    }

    pub fn decode_asset(&self, value: &Value) -> Result<Asset, DecodingError> {
        match self.decode(value)? {
            Resource::Asset(asset) => Ok(asset),
            other => Err(unexpected("Asset", &other)),
        }
    }

    pub fn decode_content_type(&self, value: &Value) -> Result<ContentType, DecodingError> {
        match self.decode(value)? {
            Resource::ContentType(ct) => Ok(ct),
            other => Err(unexpected("ContentType", &other)),
        }
    }

    fn decode_fields(&self, value: &Value, sys: &Sys) -> Result<(LocalizedFields, Locale), DecodingError> {
        let locale = match sys.locale.as_deref() {
            Some(code) => self
                .locales
                .get(code)
                .cloned()
                .ok_or_else(|| DecodingError::UnknownLocale {
                    id: sys.id.clone(),
                    locale: code.to_string(),
                })?,
            None => self.locale.clone(),
        };

        let fields = match value.get("fields") {
            None | Some(Value::Null) => LocalizedFields::default(),
            Some(Value::Object(raw)) => LocalizedFields::normalize(raw, sys.locale.as_deref(), &self.locales)?,
            Some(_) => {
                return Err(DecodingError::InvalidValue {
                    field: "fields".into(),
                    message: "expected an object".into(),
                })
            }
        };
        Ok((fields, locale))
    }
}

fn unexpected(expected: &str, found: &Resource) -> DecodingError {
    DecodingError::UnexpectedType {
        expected: expected.to_string(),
        found: found.sys().kind.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkType;
    use serde_json::json;

    fn decoder() -> Decoder {
        let table = LocaleTable::build(vec![
            Locale::new("en-US", "English").default_locale(),
            Locale::new("de-DE", "German"),
        ])
        .unwrap();
        Decoder::new(Arc::new(table))
    }

    #[test]
    fn decodes_single_locale_entry() {
        let raw = json!({
            "sys": {
                "id": "cat-1",
                "type": "Entry",
                "locale": "de-DE",
                "createdAt": "2024-01-02T03:04:05.000Z",
                "updatedAt": "2024-01-03T03:04:05.000Z",
                "revision": 3,
                "contentType": {"sys": {"type": "Link", "linkType": "ContentType", "id": "cat"}}
            },
            "fields": {
                "name": "Nyan",
                "image": {"sys": {"type": "Link", "linkType": "Asset", "id": "img-1"}}
            }
        });
        let entry = decoder().decode_entry(&raw).unwrap();
        assert_eq!(entry.id(), "cat-1");
        assert_eq!(entry.content_type_id(), Some("cat"));
        assert_eq!(entry.sys.revision, Some(3));
        assert!(entry.sys.created_at.is_some());
        assert_eq!(entry.current_locale().code, "de-DE");
        assert_eq!(entry.string("name"), Some("Nyan"));
        assert_eq!(entry.link("image"), Some(&Link::unresolved("img-1", LinkType::Asset)));
        assert_eq!(entry.unresolved_links().count(), 1);
    }

    #[test]
    fn decodes_wildcard_entry_and_switches_locale() {
        let raw = json!({
            "sys": {"id": "fox", "type": "Entry"},
            "fields": {"name": {"en-US": "Fox", "de-DE": "Fuchs"}, "legs": {"en-US": 4}}
        });
        let mut entry = decoder().decode_entry(&raw).unwrap();
        assert_eq!(entry.string("name"), Some("Fox"));

        entry.set_locale(Some("de-DE")).unwrap();
        assert_eq!(entry.string("name"), Some("Fuchs"));
        assert_eq!(entry.fields().len(), 2);

        assert!(entry.set_locale(Some("fr-FR")).is_err());
        assert_eq!(entry.current_locale().code, "de-DE");
    }

    #[test]
    fn decodes_asset_file() {
        let raw = json!({
            "sys": {"id": "img-1", "type": "Asset", "locale": "en-US"},
            "fields": {
                "title": "Nyan cat",
                "file": {
                    "url": "//images.example.com/nyan.png",
                    "fileName": "nyan.png",
                    "contentType": "image/png",
                    "details": {"size": 12273, "image": {"width": 250, "height": 250}}
                }
            }
        });
        let asset = decoder().decode_asset(&raw).unwrap();
        assert_eq!(asset.title(), Some("Nyan cat"));
        let file = asset.file().unwrap();
        assert_eq!(file.https_url(), "https://images.example.com/nyan.png");
        assert_eq!(file.details.unwrap().image.unwrap().width, 250);
    }

    #[test]
    fn decodes_deleted_markers_and_content_types() {
        let decoder = decoder();
        let deleted = decoder
            .decode(&json!({"sys": {"id": "gone", "type": "DeletedEntry"}}))
            .unwrap();
        assert!(matches!(deleted, Resource::DeletedEntry(sys) if sys.id == "gone"));

        let ct = decoder
            .decode_content_type(&json!({
                "sys": {"id": "cat", "type": "ContentType"},
                "name": "Cat",
                "displayField": "name",
                "fields": [
                    {"id": "name", "name": "Name", "type": "Symbol", "localized": true},
                    {"id": "image", "name": "Image", "type": "Link", "linkType": "Asset"}
                ]
            }))
            .unwrap();
        assert_eq!(ct.display_field.as_deref(), Some("name"));
        assert_eq!(ct.fields[1].link_type.as_deref(), Some("Asset"));
    }

    #[test]
    fn unknown_or_missing_type_is_a_decoding_error() {
        let decoder = decoder();
        let err = decoder
            .decode(&json!({"sys": {"id": "x", "type": "Space"}}))
            .unwrap_err();
        assert!(matches!(err, DecodingError::UnknownType(t) if t == "Space"));

        let err = decoder.decode(&json!({"sys": {"id": "x"}})).unwrap_err();
        assert!(matches!(err, DecodingError::MissingField(f) if f == "sys.type"));

        let err = decoder.decode(&json!({"fields": {}})).unwrap_err();
        assert!(matches!(err, DecodingError::MissingField(f) if f == "sys"));
    }

    #[test]
    fn flat_fields_without_locale_are_rejected() {
        let err = decoder()
            .decode(&json!({"sys": {"id": "x", "type": "Entry"}, "fields": {"name": "Fox"}}))
            .unwrap_err();
        assert!(matches!(err, DecodingError::AmbiguousFields { .. }));
    }

    #[test]
    fn flat_link_and_location_without_locale_are_rejected() {
        let err = decoder()
            .decode_entry(&json!({
                "sys": {"id": "cat-1", "type": "Entry"},
                "fields": {"image": {"sys": {"type": "Link", "linkType": "Asset", "id": "img-1"}}}
            }))
            .unwrap_err();
        assert!(matches!(err, DecodingError::AmbiguousFields { field } if field == "image"));

        let err = decoder()
            .decode_entry(&json!({
                "sys": {"id": "cat-1", "type": "Entry"},
                "fields": {"location": {"lat": 1.0, "lon": 2.0}}
            }))
            .unwrap_err();
        assert!(matches!(err, DecodingError::AmbiguousFields { field } if field == "location"));
    }

    #[test]
    fn wrong_resource_type_is_reported() {
        let err = decoder()
            .decode_entry(&json!({"sys": {"id": "img", "type": "Asset", "locale": "en-US"}, "fields": {}}))
            .unwrap_err();
        assert!(matches!(err, DecodingError::UnexpectedType { .. }));
    }
}
