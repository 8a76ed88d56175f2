//! Table document types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record in a table. Records are free-form JSON objects that
/// carry at least `id` and `active` once stored.
pub type Record = Map<String, Value>;

/// Kind of mutation recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Patch,
    Delete,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Create => write!(f, "create"),
            AuditAction::Patch => write!(f, "patch"),
            AuditAction::Delete => write!(f, "delete"),
        }
    }
}

/// One entry of the append-only audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub data: Value,
}

impl AuditEntry {
    pub fn new(action: AuditAction, data: Value) -> Self {
        Self {
            action,
            timestamp: tallyweb_utils::now_millis(),
            data,
        }
    }
}

/// Table bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMeta {
    /// Next id handed out by a create
    pub next_index: u64,
}

impl Default for TableMeta {
    fn default() -> Self {
        Self { next_index: 1 }
    }
}

/// Full contents of one table file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDocument {
    /// ISO timestamp of the most recent mutation
    pub last_updated: String,
    /// Records in insertion order
    #[serde(default)]
    pub data: Vec<Record>,
    /// Write-only audit trail
    #[serde(default)]
    pub transactions: Vec<AuditEntry>,
    #[serde(default)]
    pub meta: TableMeta,
}

impl Default for TableDocument {
    fn default() -> Self {
        Self {
            last_updated: tallyweb_utils::now_iso(),
            data: Vec::new(),
            transactions: Vec::new(),
            meta: TableMeta::default(),
        }
    }
}

impl TableDocument {
    /// Mark the document as mutated now
    pub fn touch(&mut self) {
        self.last_updated = tallyweb_utils::now_iso();
    }

    /// Append an audit entry stamped with the current time
    pub fn audit(&mut self, action: AuditAction, data: Value) {
        self.transactions.push(AuditEntry::new(action, data));
    }

    /// Position of the record whose `id` field matches `key`
    pub fn position_of(&self, key: &Value) -> Option<usize> {
        self.data.iter().position(|record| {
            record
                .get("id")
                .map(|id| tallyweb_utils::keys_match(id, key))
                .unwrap_or(false)
        })
    }
}
