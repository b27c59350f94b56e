//! Provenance metadata for downloaded images
//!
//! The desktop app embeds `variety:*` properties in an XMP packet inside the
//! image file. Images fetched by this crate get a JSON sidecar next to them
//! (`<file>.provenance.json`) instead of rewriting the image container.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{Provenance, ProvenanceStore},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const XMP_OPEN: &str = "<x:xmpmeta";
const XMP_CLOSE: &str = "</x:xmpmeta>";
const NAMESPACE: &str = "variety";

#[derive(Debug, Default, Clone, Copy)]
pub struct XmpProvenanceStore;

impl XmpProvenanceStore {
    pub fn new() -> Self {
        Self
    }

    pub fn sidecar_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".provenance.json");
        path.with_file_name(name)
    }

    async fn read_sidecar(&self, path: &Path) -> Result<Option<Provenance>> {
        let sidecar = Self::sidecar_path(path);
        let data = match tokio::fs::read(&sidecar).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        match serde_json::from_slice::<Provenance>(&data) {
            Ok(provenance) if !provenance.is_empty() => Ok(Some(provenance)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(path = ?sidecar, error = %e, "Ignoring unreadable provenance sidecar");
                Ok(None)
            }
        }
    }
}

/// Extract the `variety:*` properties from the first XMP packet in `data`.
pub(crate) fn parse_xmp(data: &[u8]) -> Option<Provenance> {
    let start = find(data, XMP_OPEN.as_bytes())?;
    let end = find(&data[start..], XMP_CLOSE.as_bytes())
        .map(|offset| start + offset + XMP_CLOSE.len())
        .unwrap_or(data.len());
    let packet = String::from_utf8_lossy(&data[start..end]);

    let provenance = Provenance {
        source_url: xmp_property(&packet, "sourceURL"),
        source_name: xmp_property(&packet, "sourceName"),
        source_location: xmp_property(&packet, "sourceLocation"),
        image_url: xmp_property(&packet, "imageURL"),
    };

    (!provenance.is_empty()).then_some(provenance)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Matches both the attribute form (`variety:sourceURL="..."`) and the
/// element form (`<variety:sourceURL>...</variety:sourceURL>`).
fn xmp_property(packet: &str, name: &str) -> Option<String> {
    let qualified = format!("{}:{}", NAMESPACE, name);

    let attribute = format!("{}=\"", qualified);
    if let Some(pos) = packet.find(&attribute) {
        let rest = &packet[pos + attribute.len()..];
        if let Some(end) = rest.find('"') {
            return non_empty(unescape(&rest[..end]));
        }
    }

    let open = format!("<{}>", qualified);
    let close = format!("</{}>", qualified);
    let pos = packet.find(&open)?;
    let rest = &packet[pos + open.len()..];
    let end = rest.find(&close)?;
    non_empty(unescape(rest[..end].trim()))
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[async_trait]
impl ProvenanceStore for XmpProvenanceStore {
    async fn read(&self, path: &Path) -> Result<Option<Provenance>> {
        let data = tokio::fs::read(path).await?;
        if let Some(provenance) = parse_xmp(&data) {
            debug!(path = ?path, "Read embedded provenance");
            return Ok(Some(provenance));
        }
        self.read_sidecar(path).await
    }

    async fn write(&self, path: &Path, provenance: &Provenance) -> Result<()> {
        let sidecar = Self::sidecar_path(path);
        let json = serde_json::to_vec_pretty(provenance).map_err(|e| {
            BridgeError::OperationFailed(format!("Provenance serialization failed: {}", e))
        })?;
        tokio::fs::write(&sidecar, Bytes::from(json)).await?;
        debug!(path = ?sidecar, "Wrote provenance sidecar");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKET: &str = r#"<?xpacket begin=''?><x:xmpmeta xmlns:x="adobe:ns:meta/">
<rdf:RDF><rdf:Description xmlns:variety="https://launchpad.net/variety/"
 variety:sourceURL="http://example.com/a.jpg?x=1&amp;y=2"
 variety:sourceName="Flickr">
<variety:imageURL>http://cdn.example.com/a.jpg</variety:imageURL>
</rdf:Description></rdf:RDF></x:xmpmeta><?xpacket end='w'?>"#;

    #[test]
    fn test_parse_attribute_and_element_forms() {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE1];
        data.extend_from_slice(PACKET.as_bytes());
        data.extend_from_slice(&[0xFF, 0xD9]);

        let provenance = parse_xmp(&data).unwrap();
        assert_eq!(
            provenance.source_url.as_deref(),
            Some("http://example.com/a.jpg?x=1&y=2")
        );
        assert_eq!(provenance.source_name.as_deref(), Some("Flickr"));
        assert_eq!(
            provenance.image_url.as_deref(),
            Some("http://cdn.example.com/a.jpg")
        );
        assert_eq!(provenance.source_location, None);
    }

    #[test]
    fn test_no_packet() {
        assert_eq!(parse_xmp(b"\x89PNG plain image bytes"), None);
    }

    #[tokio::test]
    async fn test_sidecar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("b.jpg");
        std::fs::write(&image, b"jpeg bytes without xmp").unwrap();

        let store = XmpProvenanceStore::new();
        assert_eq!(store.read(&image).await.unwrap(), None);

        let provenance = Provenance::with_source_url("http://example.com/b.jpg");
        store.write(&image, &provenance).await.unwrap();

        assert_eq!(store.read(&image).await.unwrap(), Some(provenance));
        assert!(XmpProvenanceStore::sidecar_path(&image).exists());
    }
}
