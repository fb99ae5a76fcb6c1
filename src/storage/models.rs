use serde::{Deserialize, Deserializer, Serialize};

/// A row of the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub url: String,
    #[serde(default, deserialize_with = "tags_or_null")]
    pub tags: Vec<String>,
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewImage {
    pub url: String,
    pub tags: Vec<String>,
}

impl NewImage {
    pub fn into_record(self, id: String) -> ImageRecord {
        ImageRecord {
            id,
            url: self.url,
            tags: self.tags,
        }
    }
}

/// Result of an insert against a table with a unique `url` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(ImageRecord),
    /// A row with the same URL already exists.
    Duplicate,
}

/// PostgREST returns `bigint` ids as JSON numbers; redb stores strings.
/// Also used for ids in admin request bodies.
pub(crate) fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Unsigned(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}

fn tags_or_null<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
