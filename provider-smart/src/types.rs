//! Smart server wire types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Action a report records against an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportTag {
    Favorite,
    Trash,
}

impl ReportTag {
    /// Path segment of the report endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportTag::Favorite => "favorite",
            ReportTag::Trash => "trash",
        }
    }
}

impl fmt::Display for ReportTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET /sync/{userId}`: the server's view of the user's images.
///
/// Only `favorite` and `trash` are interpreted; everything else the server
/// sends is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    #[serde(default)]
    pub favorite: HashSet<String>,
    #[serde(default)]
    pub trash: HashSet<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ServerSnapshot {
    pub fn is_favorite(&self, image_id: &str) -> bool {
        self.favorite.contains(image_id)
    }

    pub fn is_trashed(&self, image_id: &str) -> bool {
        self.trash.contains(image_id)
    }
}

/// `GET /image/{id}/json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub image_url: String,
    #[serde(default)]
    pub origin_url: Option<String>,
    /// `[[name, location], ...]`, most relevant first
    #[serde(default)]
    pub sources: Vec<Vec<String>>,
}

impl ImageInfo {
    pub fn source_name(&self) -> Option<&str> {
        self.sources.first()?.first().map(String::as_str)
    }

    pub fn source_location(&self) -> Option<&str> {
        self.sources.first()?.get(1).map(String::as_str)
    }
}

/// Image description sent with a report, JSON-encoded into the `image`
/// form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Base64 of a JPEG thumbnail
    pub thumbnail: String,
    pub width: u32,
    pub height: u32,
    pub origin_url: Option<String>,
    pub source_name: Option<String>,
    pub source_location: Option<String>,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_keeps_unknown_fields() {
        let snapshot: ServerSnapshot = serde_json::from_str(
            r#"{"favorite":["abc","def"],"trash":["def"],"banned":["x"],"version":3}"#,
        )
        .unwrap();

        assert!(snapshot.is_favorite("abc"));
        assert!(snapshot.is_trashed("def"));
        assert_eq!(snapshot.extra["version"], 3);
        assert!(snapshot.extra.contains_key("banned"));
    }

    #[test]
    fn test_snapshot_missing_lists_default_empty() {
        let snapshot: ServerSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.favorite.is_empty());
        assert!(snapshot.trash.is_empty());
    }

    #[test]
    fn test_image_info_first_source() {
        let info: ImageInfo = serde_json::from_str(
            r#"{"image_url":"http://i/a.jpg","origin_url":"http://o/a",
                "sources":[["Flickr","http://flickr.com/x"],["Other","y"]]}"#,
        )
        .unwrap();

        assert_eq!(info.source_name(), Some("Flickr"));
        assert_eq!(info.source_location(), Some("http://flickr.com/x"));
    }

    #[test]
    fn test_image_info_without_sources() {
        let info: ImageInfo = serde_json::from_str(r#"{"image_url":"http://i/a.jpg"}"#).unwrap();

        assert_eq!(info.origin_url, None);
        assert_eq!(info.source_name(), None);
        assert_eq!(info.source_location(), None);
    }

    #[test]
    fn test_report_tag() {
        assert_eq!(ReportTag::Favorite.as_str(), "favorite");
        assert_eq!(ReportTag::Trash.to_string(), "trash");
    }
}
