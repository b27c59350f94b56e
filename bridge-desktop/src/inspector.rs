//! Image inspection backed by the `image` crate

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::ImageInspector,
};
use bytes::Bytes;
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp", "svg",
];

/// Decoding runs on the blocking pool; wallpapers are routinely 20+ megapixels.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateInspector;

impl ImageCrateInspector {
    pub fn new() -> Self {
        Self
    }

    fn has_image_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    async fn blocking<T, F>(path: &Path, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(PathBuf) -> Result<T> + Send + 'static,
    {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || op(path))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Image task failed: {}", e)))?
    }
}

fn image_error(path: &Path, err: image::ImageError) -> BridgeError {
    BridgeError::OperationFailed(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl ImageInspector for ImageCrateInspector {
    async fn is_image(&self, path: &Path) -> bool {
        if !Self::has_image_extension(path) {
            return false;
        }
        tokio::fs::metadata(path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false)
    }

    async fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        Self::blocking(path, |path| {
            image::image_dimensions(&path).map_err(|e| image_error(&path, e))
        })
        .await
    }

    async fn thumbnail(&self, path: &Path, max_width: u32, max_height: u32) -> Result<Bytes> {
        let bytes = Self::blocking(path, move |path| {
            let img = image::open(&path).map_err(|e| image_error(&path, e))?;
            let thumb = img.thumbnail(max_width, max_height).to_rgb8();

            let mut buffer = Vec::new();
            thumb
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
                .map_err(|e| image_error(&path, e))?;
            Ok(buffer)
        })
        .await?;

        debug!(path = ?path, size = bytes.len(), "Generated thumbnail");
        Ok(Bytes::from(bytes))
    }
}
