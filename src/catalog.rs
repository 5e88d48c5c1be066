//! Field catalog
//!
//! The catalog maps attribute field names to value kinds and is
//! supplied by the host (the owner of the attribute table schema). The
//! engine depends on it but never keeps it in sync itself; hosts call
//! [`Expression::set_fields`](crate::Expression::set_fields) whenever
//! the schema changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved field name bound to the caller-supplied row identifier
/// instead of a catalog lookup. Matched case-insensitively.
pub const FID_FIELD: &str = "fid";

/// Value kind of an attribute column, collapsed to the four kinds the
/// evaluator distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Number,
    Text,
    Boolean,
    /// Column kinds the engine cannot compute with (geometry blobs,
    /// rasters, …). Usable only via stringification.
    Opaque,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Number => "number",
            ValueKind::Text => "text",
            ValueKind::Boolean => "boolean",
            ValueKind::Opaque => "opaque",
        }
    }
}

/// An attribute field: immutable (name, kind) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: ValueKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Case-insensitive field name → kind table.
///
/// Registration replaces the table wholesale; on duplicate names the
/// most recently registered entry wins.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    by_name: HashMap<String, ValueKind>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog with the given field list.
    pub fn register(&mut self, fields: impl IntoIterator<Item = Field>) {
        self.by_name.clear();
        for field in fields {
            self.by_name.insert(field.name.to_lowercase(), field.kind);
        }
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<ValueKind> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
