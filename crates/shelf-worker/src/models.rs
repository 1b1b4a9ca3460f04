//! Domain models shared by the worker components

use serde::{Deserialize, Serialize};
use shelf_common::{Result, ShelfError};

/// Identifier of a book record. Queue payloads carry it JSON encoded.
pub type BookId = i64;

/// A stored book record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub published_date: String,
    pub description: String,
    pub image_url: String,
    /// Who created the record. Never touched by enrichment.
    pub created_by: String,
}

/// One candidate returned by the metadata lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    #[serde(default)]
    pub thumbnail: String,
}

/// Parse a book id typed by a person, e.g. on the command line
pub fn parse_book_id(input: &str) -> Result<BookId> {
    let trimmed = input.trim();
    match trimmed.parse::<BookId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ShelfError::InvalidBookId(trimmed.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_info_decodes_camel_case() {
        let info: VolumeInfo = serde_json::from_str(
            r#"{
                "title": "Dune",
                "authors": ["Frank Herbert"],
                "publishedDate": "1965",
                "imageLinks": {"thumbnail": "http://books.example/dune.jpg"}
            }"#,
        )
        .unwrap();

        assert_eq!(info.title, "Dune");
        assert_eq!(info.published_date, "1965");
        assert_eq!(info.description, "");
        assert_eq!(
            info.image_links.unwrap().thumbnail,
            "http://books.example/dune.jpg"
        );
    }

    #[test]
    fn test_volume_info_tolerates_missing_fields() {
        let info: VolumeInfo = serde_json::from_str("{}").unwrap();
        assert!(info.authors.is_empty());
        assert!(info.image_links.is_none());
    }

    #[test]
    fn test_parse_book_id() {
        assert_eq!(parse_book_id("42").unwrap(), 42);
        assert_eq!(parse_book_id("  7\n").unwrap(), 7);

        for bad in ["", "0", "-3", "abc", "4.2"] {
            assert!(matches!(parse_book_id(bad), Err(ShelfError::InvalidBookId(_))));
        }
    }
}
