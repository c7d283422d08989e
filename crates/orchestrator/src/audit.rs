//! Best-effort history writing.
//!
//! History rows enrich the audit trail but never gate a lifecycle operation:
//! a failed append is logged and swallowed so the saga's primary writes are
//! not blocked by the audit path.

use serde::Serialize;
use serde_json::Value;
use store::HistoryStore;

use domain::HistoryEntry;

/// Serializes a record for a history snapshot. Falls back to `null` rather
/// than failing the operation over an audit detail.
pub(crate) fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Appends a history entry, logging and discarding any store error.
pub(crate) async fn append<S: HistoryStore>(store: &S, entry: HistoryEntry) {
    let change = entry.change_type;
    let sale_id = entry.sale_id;
    if let Err(error) = store.append_history(entry).await {
        tracing::warn!(%sale_id, %change, %error, "history append failed");
    }
}
