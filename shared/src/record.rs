use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A catalog item as stored by the backend. The client never assigns ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub created_at: String,
}

impl Record {
    /// `created_at` as `DD/MM/YYYY HH:MM`, or the raw value if it doesn't parse.
    pub fn display_date(&self) -> String {
        format_timestamp(&self.created_at)
    }
}

pub fn format_timestamp(raw: &str) -> String {
    const DISPLAY: &str = "%d/%m/%Y %H:%M";

    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return date.format(DISPLAY).to_string();
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return date.format(DISPLAY).to_string();
    }
    raw.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Text(id) => id,
            RawId::Number(id) => id.to_string(),
        }
    }
}

/// Ids are opaque strings, but some backends send integers.
pub fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

#[cfg(test)]
pub(crate) fn record(id: &str, title: &str) -> Record {
    Record {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("{} description", title),
        image_url: format!("https://cdn.vercel.app/{}.png", id),
        created_at: "2024-03-01T10:00:00Z".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_become_strings() {
        let record: Record = serde_json::from_str(
            r#"{"id":42,"title":"Lamp","description":"Desk lamp","image_url":"","created_at":""}"#,
        )
        .unwrap();
        assert_eq!(record.id, "42");
    }

    #[test]
    fn missing_image_and_date_default_to_empty() {
        let record: Record =
            serde_json::from_str(r#"{"id":"a","title":"Lamp","description":"Desk lamp"}"#).unwrap();
        assert_eq!(record.image_url, "");
        assert_eq!(record.created_at, "");
    }

    #[test]
    fn display_date_formats_rfc3339_and_naive_timestamps() {
        assert_eq!(format_timestamp("2024-03-01T10:05:00Z"), "01/03/2024 10:05");
        assert_eq!(
            format_timestamp("2024-03-01T10:05:00.123456+00:00"),
            "01/03/2024 10:05"
        );
        assert_eq!(format_timestamp("2024-12-24T18:30:00.5"), "24/12/2024 18:30");
    }

    #[test]
    fn display_date_falls_back_to_raw_value() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp(""), "");
    }
}
