use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod config;
pub mod form;
pub mod health;
pub mod images;
pub mod push;
pub mod record;

pub use catalog::RecordSet;
pub use config::AppConfig;
pub use record::Record;

/// Body of every successful `/api/objects` response: `{ "data": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Snapshot body. A missing or `null` `data` field is an empty collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<Record>,
}

/// Error body the backend sends alongside non-2xx statuses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl ListResponse {
    /// The visible collection for a snapshot read. A failed read shows as
    /// an empty collection.
    pub fn or_empty<E>(read: Result<ListResponse, E>) -> Vec<Record> {
        read.map(|body| body.data).unwrap_or_default()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Record>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Record>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_response_tolerates_missing_and_null_data() {
        let missing: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(missing.data.is_empty());

        let null: ListResponse = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert!(null.data.is_empty());
    }

    #[test]
    fn failed_read_is_an_empty_collection() {
        let timed_out: Result<ListResponse, &str> = Err("request timed out");
        assert!(ListResponse::or_empty(timed_out).is_empty());

        let undecodable = serde_json::from_str::<ListResponse>("<html>502</html>");
        assert!(ListResponse::or_empty(undecodable).is_empty());

        let body = r#"{"data":[{"id":"1","title":"Lamp","description":"Desk lamp"}]}"#;
        let records = ListResponse::or_empty(serde_json::from_str::<ListResponse>(body));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Lamp");
    }

    #[test]
    fn create_response_unwraps_data() {
        let body = r#"{"data":{"id":"1","title":"Lamp","description":"Desk lamp",
            "image_url":"https://x.vercel.app/lamp.png","created_at":"2024-03-01T10:00:00Z"}}"#;
        let created: DataEnvelope<Record> = serde_json::from_str(body).unwrap();
        assert_eq!(created.data.id, "1");
        assert_eq!(created.data.title, "Lamp");
    }

    #[test]
    fn error_body_is_optional() {
        let body: ErrorBody = serde_json::from_str(r#"{"message":"nope"}"#).unwrap();
        assert_eq!(body.error, None);

        let body: ErrorBody = serde_json::from_str(r#"{"error":"Image too large"}"#).unwrap();
        assert_eq!(body.error.as_deref(), Some("Image too large"));
    }
}
