/// Identifiers assigned by the HRMS backend (attachments, jobs, dataset
/// files). The server may emit them as strings or numbers; they are always
/// normalised to strings on the client.
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Normalise a JSON identifier (string or number) to [`EntityId`].
///
/// Returns `None` for any other JSON type or an empty string.
pub fn id_from_json(value: &serde_json::Value) -> Option<EntityId> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
