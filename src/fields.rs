//! Localized field storage and locale projection.
//!
//! Whatever the wire shape, fields are stored as `field name -> locale code -> value`.
//! Single-locale responses (with `sys.locale`) are wrapped under that locale; wildcard
//! responses already come locale-keyed. Link descriptors are recognized while normalizing
//! and stored as [`Link`]s so the resolver can rewrite them in place.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::DecodingError;
use crate::link::{Link, LinkTarget};
use crate::locale::{Locale, LocaleTable};

/// A single stored field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Any non-link JSON value.
    Value(Value),
    /// A one-to-one reference.
    Link(Link),
    /// A one-to-many reference, order preserved.
    Links(Vec<Link>),
}

impl FieldValue {
    /// Classifies a raw wire value. Arrays count as link arrays only when non-empty and
    /// made entirely of link descriptors.
    pub fn from_wire(value: &Value) -> Self {
        if let Some(target) = LinkTarget::from_descriptor(value) {
            return FieldValue::Link(Link::Unresolved(target));
        }
        if let Value::Array(items) = value {
            if !items.is_empty() {
                let targets: Option<Vec<_>> = items.iter().map(LinkTarget::from_descriptor).collect();
                if let Some(targets) = targets {
                    return FieldValue::Links(targets.into_iter().map(Link::Unresolved).collect());
                }
            }
        }
        FieldValue::Value(value.clone())
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_link(&self) -> Option<&Link> {
        match self {
            FieldValue::Link(link) => Some(link),
            _ => None,
        }
    }

    pub fn as_links(&self) -> Option<&[Link]> {
        match self {
            FieldValue::Links(links) => Some(links),
            _ => None,
        }
    }

    /// Every link held by this value; empty for plain values.
    pub fn links(&self) -> &[Link] {
        match self {
            FieldValue::Value(_) => &[],
            FieldValue::Link(link) => std::slice::from_ref(link),
            FieldValue::Links(links) => links,
        }
    }

    pub(crate) fn links_mut(&mut self) -> &mut [Link] {
        match self {
            FieldValue::Value(_) => &mut [],
            FieldValue::Link(link) => std::slice::from_mut(link),
            FieldValue::Links(links) => links,
        }
    }
}

/// Per-resource mapping of `field name -> locale code -> value`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalizedFields {
    fields: BTreeMap<String, BTreeMap<String, FieldValue>>,
}

impl LocalizedFields {
    /// Normalizes a wire `fields` object.
    ///
    /// With `sys_locale` set, each value is stored under that locale. Without it every
    /// field must be a map keyed only by codes known to `locales`; anything else (a flat
    /// scalar, a link descriptor, a location object) is ambiguous and rejected. `null`
    /// values are treated as absent.
    pub fn normalize(
        fields: &Map<String, Value>,
        sys_locale: Option<&str>,
        locales: &LocaleTable,
    ) -> Result<Self, DecodingError> {
        let mut normalized = Self::default();
        for (name, raw) in fields {
            if raw.is_null() {
                continue;
            }
            match sys_locale {
                Some(locale) => normalized.insert(name, locale, FieldValue::from_wire(raw)),
                None => {
                    let per_locale = raw
                        .as_object()
                        .filter(|map| {
                            LinkTarget::from_descriptor(raw).is_none()
                                && map.keys().all(|code| locales.contains(code))
                        })
                        .ok_or_else(|| DecodingError::AmbiguousFields { field: name.clone() })?;
                    for (locale, value) in per_locale {
                        if !value.is_null() {
                            normalized.insert(name, locale, FieldValue::from_wire(value));
                        }
                    }
                }
            }
        }
        Ok(normalized)
    }

    pub fn insert(&mut self, field: &str, locale: &str, value: FieldValue) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .insert(locale.to_string(), value);
    }

    /// Raw lookup without fallback.
    pub fn get(&self, field: &str, locale: &str) -> Option<&FieldValue> {
        self.fields.get(field)?.get(locale)
    }

    /// All stored locales for one field.
    pub fn locales_of(&self, field: &str) -> Option<&BTreeMap<String, FieldValue>> {
        self.fields.get(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Best value for one field in `locale`: the first locale along the fallback chain
    /// that defines it, else the default locale's value.
    pub fn value(&self, field: &str, locale: &Locale, table: &LocaleTable) -> Option<&FieldValue> {
        let per_locale = self.fields.get(field)?;
        table
            .fallback_chain(&locale.code)
            .into_iter()
            .find_map(|l| per_locale.get(&l.code))
    }

    /// The projected view of all fields for `locale`.
    ///
    /// The default locale's fields form the base layer; each field is then overridden by
    /// the first value found along `locale`'s fallback chain. Fields with no value anywhere
    /// in the chain are absent.
    pub fn project(&self, locale: &Locale, table: &LocaleTable) -> BTreeMap<&str, &FieldValue> {
        let chain = table.fallback_chain(&locale.code);
        self.fields
            .iter()
            .filter_map(|(name, per_locale)| {
                chain
                    .iter()
                    .find_map(|l| per_locale.get(&l.code))
                    .map(|value| (name.as_str(), value))
            })
            .collect()
    }

    /// Every link in every locale of every field.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.fields
            .values()
            .flat_map(|per_locale| per_locale.values())
            .flat_map(|value| value.links().iter())
    }

    pub(crate) fn links_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.fields
            .values_mut()
            .flat_map(|per_locale| per_locale.values_mut())
            .flat_map(|value| value.links_mut().iter_mut())
    }
}
