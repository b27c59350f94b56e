//! Image Inspection and Provenance
//!
//! The core never decodes images itself. Dimension probing, thumbnail
//! generation and the per-file provenance metadata (where an image came from)
//! are supplied by the host.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Where a local image was downloaded from.
///
/// Field names follow the keys the desktop app embeds in image files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(rename = "sourceURL", default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(rename = "sourceName", default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(rename = "sourceLocation", default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<String>,
    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Provenance {
    pub fn with_source_url(source_url: impl Into<String>) -> Self {
        Self {
            source_url: Some(source_url.into()),
            ..Self::default()
        }
    }

    /// True when nothing worth persisting is set
    pub fn is_empty(&self) -> bool {
        self.source_url.is_none()
            && self.source_name.is_none()
            && self.source_location.is_none()
            && self.image_url.is_none()
    }
}

/// Reads image dimensions and renders thumbnails
#[async_trait]
pub trait ImageInspector: Send + Sync {
    /// Whether `path` is an image file the app would use as a wallpaper
    async fn is_image(&self, path: &Path) -> bool;

    /// Pixel dimensions as `(width, height)`
    async fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;

    /// JPEG thumbnail fitting inside `max_width` x `max_height`, aspect preserved
    async fn thumbnail(&self, path: &Path, max_width: u32, max_height: u32) -> Result<Bytes>;
}

/// Reader/writer for the provenance metadata attached to image files
#[async_trait]
pub trait ProvenanceStore: Send + Sync {
    /// `Ok(None)` when the file carries no provenance at all
    async fn read(&self, path: &Path) -> Result<Option<Provenance>>;

    async fn write(&self, path: &Path, provenance: &Provenance) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_uses_embedded_key_names() {
        let provenance = Provenance {
            source_url: Some("http://example.com/a.jpg".to_string()),
            source_name: Some("Flickr".to_string()),
            ..Provenance::default()
        };

        let json = serde_json::to_value(&provenance).unwrap();
        assert_eq!(json["sourceURL"], "http://example.com/a.jpg");
        assert_eq!(json["sourceName"], "Flickr");
        assert!(json.get("imageURL").is_none());
    }

    #[test]
    fn test_provenance_is_empty() {
        assert!(Provenance::default().is_empty());
        assert!(!Provenance::with_source_url("http://x").is_empty());
    }
}
