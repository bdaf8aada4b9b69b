//! Locale table and fallback chains.
//!
//! A space defines its locales once; the table built from them is immutable and shared
//! (behind an `Arc`) by every resource decoded against it. Fallback chains are validated
//! when the table is built so projections never have to deal with cycles or dangling codes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;

/// Locale code used to request every locale at once.
pub const WILDCARD: &str = "*";

/// A locale as defined by the space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locale {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "default", default)]
    pub is_default: bool,
    #[serde(default)]
    pub fallback_code: Option<String>,
}

impl Locale {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            is_default: false,
            fallback_code: None,
        }
    }

    /// Marks this locale as the space default.
    pub fn default_locale(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn with_fallback(mut self, code: impl Into<String>) -> Self {
        self.fallback_code = Some(code.into());
        self
    }
}

/// Validated lookup of a space's locales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleTable {
    locales: Vec<Locale>,
    index: HashMap<String, usize>,
    default: usize,
}

impl LocaleTable {
    /// Builds the table, rejecting missing or duplicate defaults, dangling fallbacks and
    /// fallback chains that do not terminate within `locales.len()` steps.
    pub fn build(locales: Vec<Locale>) -> Result<Self, ConfigurationError> {
        let mut index = HashMap::with_capacity(locales.len());
        let mut default: Option<usize> = None;

        for (i, locale) in locales.iter().enumerate() {
            if index.insert(locale.code.clone(), i).is_some() {
                return Err(ConfigurationError::DuplicateLocale(locale.code.clone()));
            }
            if locale.is_default {
                if let Some(first) = default {
                    return Err(ConfigurationError::MultipleDefaultLocales {
                        first: locales[first].code.clone(),
                        second: locale.code.clone(),
                    });
                }
                if locale.fallback_code.is_some() {
                    return Err(ConfigurationError::DefaultHasFallback(locale.code.clone()));
                }
                default = Some(i);
            }
        }

        let default = default.ok_or(ConfigurationError::NoDefaultLocale)?;

        for locale in &locales {
            if let Some(fallback) = &locale.fallback_code {
                if !index.contains_key(fallback) {
                    return Err(ConfigurationError::DanglingFallback {
                        code: locale.code.clone(),
                        fallback: fallback.clone(),
                    });
                }
            }
        }

        let table = Self {
            locales,
            index,
            default,
        };

        for locale in &table.locales {
            let mut current = locale;
            let mut steps = 0;
            while let Some(next) = current.fallback_code.as_deref().and_then(|c| table.get(c)) {
                steps += 1;
                if steps > table.locales.len() {
                    return Err(ConfigurationError::FallbackCycle(locale.code.clone()));
                }
                current = next;
            }
        }

        debug!(
            locales = table.locales.len(),
            default = %table.default_locale().code,
            "Built locale table"
        );
        Ok(table)
    }

    pub fn default_locale(&self) -> &Locale {
        &self.locales[self.default]
    }

    pub fn get(&self, code: &str) -> Option<&Locale> {
        self.index.get(code).map(|&i| &self.locales[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn locales(&self) -> &[Locale] {
        &self.locales
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    /// Resolves a requested locale code; `None` selects the default locale.
    ///
    /// The wildcard `*` has no single projection and is rejected, as are codes the
    /// space does not define.
    pub fn resolve(&self, requested: Option<&str>) -> Result<&Locale, ConfigurationError> {
        match requested {
            None => Ok(self.default_locale()),
            Some(WILDCARD) => Err(ConfigurationError::WildcardProjection),
            Some(code) => self
                .get(code)
                .ok_or_else(|| ConfigurationError::UnknownLocale(code.to_string())),
        }
    }

    /// The ordered locales consulted for `code`: the locale itself, then its fallbacks,
    /// always ending with the default locale. Unknown codes yield just the default.
    pub fn fallback_chain(&self, code: &str) -> Vec<&Locale> {
        let mut chain: Vec<&Locale> = Vec::new();
        let mut current = self.get(code);
        while let Some(locale) = current {
            // The build step rules out cycles; the cap keeps lookups bounded regardless.
            if chain.len() >= self.locales.len() || chain.iter().any(|l| l.code == locale.code) {
                break;
            }
            chain.push(locale);
            current = locale.fallback_code.as_deref().and_then(|c| self.get(c));
        }

        let default = self.default_locale();
        if !chain.iter().any(|l| l.code == default.code) {
            chain.push(default);
        }
        chain
    }
}
