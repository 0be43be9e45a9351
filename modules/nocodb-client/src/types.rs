use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload for one record in a create batch.
#[derive(Debug, Clone, Serialize)]
pub struct NewRecord {
    pub fields: Value,
}

/// Payload for one record in an update batch, addressed by remote id.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRecord {
    pub id: i64,
    pub fields: Value,
}

/// Payload for one record in a delete batch.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeleteRecord {
    pub id: i64,
}

/// One row echoed back from a create call. The API does not guarantee
/// submission order, so callers must match on a round-tripped field.
#[derive(Debug, Clone)]
pub struct CreatedRecord {
    pub id: i64,
    pub fields: Value,
}

/// Table listing entry from the base metadata API.
#[derive(Debug, Clone, Deserialize)]
pub struct TableInfo {
    pub id: String,
    pub title: String,
}

/// Field listing entry from the table metadata API.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldInfo {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    pub list: Vec<T>,
}
