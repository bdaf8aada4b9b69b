//! Typed references between resources.
//!
//! Links never own their target. Before resolution a link carries the target id and the
//! declared type; after resolution it names a resource known to be present in the graph it
//! was resolved against, and [`crate::graph::ResourceGraph::follow`] hands out the object.
//! This keeps cyclic entry graphs representable.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    Entry,
    Asset,
}

impl LinkType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Entry" => Some(LinkType::Entry),
            "Asset" => Some(LinkType::Asset),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Entry => "Entry",
            LinkType::Asset => "Asset",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a link points at: id plus declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkTarget {
    pub id: String,
    pub link_type: LinkType,
}

impl LinkTarget {
    pub fn new(id: impl Into<String>, link_type: LinkType) -> Self {
        Self {
            id: id.into(),
            link_type,
        }
    }

    /// Recognizes a wire link descriptor: a map whose `sys` carries `id` and a known
    /// `linkType`. Anything else is not a link.
    pub fn from_descriptor(value: &Value) -> Option<Self> {
        let sys = value.as_object()?.get("sys")?.as_object()?;
        if let Some(kind) = sys.get("type").and_then(Value::as_str) {
            if kind != "Link" {
                return None;
            }
        }
        let id = sys.get("id")?.as_str()?;
        let link_type = LinkType::parse(sys.get("linkType")?.as_str()?)?;
        Some(Self::new(id, link_type))
    }
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.link_type, self.id)
    }
}

/// A reference held in a link-typed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// Target not (yet) present in any resolved pool.
    Unresolved(LinkTarget),
    /// Resolved to the entry with this id.
    Entry(String),
    /// Resolved to the asset with this id.
    Asset(String),
}

impl Link {
    pub fn unresolved(id: impl Into<String>, link_type: LinkType) -> Self {
        Link::Unresolved(LinkTarget::new(id, link_type))
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Link::Unresolved(_))
    }

    pub fn id(&self) -> &str {
        match self {
            Link::Unresolved(target) => &target.id,
            Link::Entry(id) | Link::Asset(id) => id,
        }
    }

    pub fn link_type(&self) -> LinkType {
        match self {
            Link::Unresolved(target) => target.link_type,
            Link::Entry(_) => LinkType::Entry,
            Link::Asset(_) => LinkType::Asset,
        }
    }

    pub fn target(&self) -> LinkTarget {
        LinkTarget::new(self.id(), self.link_type())
    }

    pub(crate) fn resolve(&mut self) {
        if let Link::Unresolved(target) = self {
            let id = std::mem::take(&mut target.id);
            *self = match target.link_type {
                LinkType::Entry => Link::Entry(id),
                LinkType::Asset => Link::Asset(id),
            };
        }
    }

    pub(crate) fn detach(&mut self) {
        if self.is_resolved() {
            *self = Link::Unresolved(self.target());
        }
    }
}
