use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single audit-log entry as received from the upstream callback.
///
/// Records carry no schema of their own: they are an opaque bag of named
/// fields, and anything the formatter needs but does not find renders as a
/// placeholder at delivery time. Non-string values are tolerated on the way
/// in and simply treated as absent by [`AuditRecord::field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditRecord(pub Map<String, Value>);

impl AuditRecord {
    /// Look up a field, returning it only if present and a string.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }
}
