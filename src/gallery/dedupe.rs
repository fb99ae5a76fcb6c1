use crate::storage::models::{ImageRecord, InsertOutcome, NewImage};
use crate::storage::{ImageTable, TableError};

/// Outcome of making sure a URL has a metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured {
    Inserted(ImageRecord),
    /// A row for this URL was already there, or was created concurrently
    /// and surfaced as a unique-constraint hit.
    Exists,
}

/// Insert `{url, tags}` unless a row with that URL already exists.
pub async fn ensure_record(
    table: &dyn ImageTable,
    url: &str,
    tags: Vec<String>,
) -> Result<Ensured, TableError> {
    if table.select_by_url(url).await?.is_some() {
        return Ok(Ensured::Exists);
    }

    let image = NewImage {
        url: url.to_string(),
        tags,
    };
    match table.insert(image).await? {
        InsertOutcome::Inserted(record) => Ok(Ensured::Inserted(record)),
        InsertOutcome::Duplicate => {
            tracing::debug!(url, "Lost insert race, treating as existing");
            Ok(Ensured::Exists)
        }
    }
}

/// Split a comma-separated tag string. No trimming and no filtering:
/// an empty string yields a single empty tag.
pub fn parse_tags(csv: &str) -> Vec<String> {
    csv.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("a,b"), vec!["a", "b"]);
        assert_eq!(parse_tags("cat, cute"), vec!["cat", " cute"]);
        assert_eq!(parse_tags(""), vec![""]);
        assert_eq!(parse_tags("a,,b"), vec!["a", "", "b"]);
    }

    #[tokio::test]
    async fn test_ensure_record_inserts_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();

        let first = ensure_record(&db, "http://x/a.png", vec!["a".into()])
            .await
            .unwrap();
        let Ensured::Inserted(record) = first else {
            panic!("expected insert, got {first:?}");
        };
        assert_eq!(record.tags, vec!["a"]);

        let second = ensure_record(&db, "http://x/a.png", vec!["other".into()])
            .await
            .unwrap();
        assert_eq!(second, Ensured::Exists);
        let rows = db.get_all_images().unwrap();
        assert_eq!(rows, vec![record]);
    }
}
