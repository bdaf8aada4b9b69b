//! Query parameters for the sync and collection endpoints.

use crate::contract::QueryParams;

/// Deepest include level the API accepts.
pub const MAX_INCLUDE: u8 = 10;

/// Builds the parameters for one sync request.
///
/// The initial request carries `initial=true` plus the caller's extras (e.g. `type=Entry`);
/// follow-up requests carry only `sync_token`, which already encodes the original filter.
pub fn sync_params(initial: bool, sync_token: Option<&str>, extra: &QueryParams) -> QueryParams {
    let mut params = QueryParams::new();
    match sync_token {
        Some(token) if !initial => {
            params.insert("sync_token".into(), token.to_string());
        }
        _ => {
            params.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            params.insert("initial".into(), "true".into());
        }
    }
    params
}

/// Filter, ordering and pagination for the collection endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: QueryParams,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(self, id: impl Into<String>) -> Self {
        self.param("content_type", id)
    }

    /// Requested locale; `*` asks for every locale.
    pub fn locale(self, code: impl Into<String>) -> Self {
        self.param("locale", code)
    }

    /// Levels of linked resources to include, clamped to [`MAX_INCLUDE`].
    pub fn include(self, depth: u8) -> Self {
        self.param("include", depth.min(MAX_INCLUDE).to_string())
    }

    pub fn skip(self, skip: u64) -> Self {
        self.param("skip", skip.to_string())
    }

    pub fn limit(self, limit: u64) -> Self {
        self.param("limit", limit.to_string())
    }

    pub fn order(self, order: impl Into<String>) -> Self {
        self.param("order", order)
    }

    /// Equality filter on a field or sys property, e.g. `("fields.color", "red")`.
    pub fn where_field(self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.param(path, value)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn to_params(&self) -> QueryParams {
        self.params.clone()
    }
}
