//! Figure image loading.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageReader;

use crate::error::{Error, Result};
use crate::model::ImageSize;

/// Raw image bytes with their pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub data: Vec<u8>,
    pub size: ImageSize,
}

/// Resolves a figure URI to image bytes.
pub trait ImageLoader: Send + Sync {
    /// Load the image at `uri`.
    fn load(&self, uri: &str) -> Result<LoadedImage>;
}

/// Loads figure images from the filesystem.
///
/// Relative URIs are resolved against the configured root. The source file
/// bytes are kept as-is; only the header is decoded to read the dimensions.
#[derive(Debug, Clone, Default)]
pub struct FileImageLoader {
    root: Option<PathBuf>,
}

impl FileImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative URIs against `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Filesystem path for `uri`.
    pub fn resolve(&self, uri: &str) -> PathBuf {
        let uri = uri.strip_prefix("file://").unwrap_or(uri);
        let path = Path::new(uri);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageLoader for FileImageLoader {
    fn load(&self, uri: &str) -> Result<LoadedImage> {
        let path = self.resolve(uri);
        if !path.exists() {
            return Err(Error::InputNotFound(path));
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            return Err(Error::ImageDecode(format!(
                "{}: PDF figures are not rasterized",
                path.display()
            )));
        }

        let data = std::fs::read(&path)?;
        let (width, height) = image_dimensions(&data)?;
        Ok(LoadedImage {
            data,
            size: ImageSize::new(width, height),
        })
    }
}

/// Read pixel dimensions from encoded image bytes.
pub fn image_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    if reader.format().is_none() {
        return Err(Error::ImageDecode("unrecognized image format".to_string()));
    }
    Ok(reader.into_dimensions()?)
}

/// Conventional file extension for encoded image bytes, if recognized.
pub fn image_extension(data: &[u8]) -> Option<&'static str> {
    image::guess_format(data)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use tempfile::tempdir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        RgbaImage::new(width, height)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_image_dimensions() {
        assert_eq!(image_dimensions(&png_bytes(7, 3)).unwrap(), (7, 3));
        assert!(matches!(
            image_dimensions(b"not an image"),
            Err(Error::ImageDecode(_))
        ));
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(&png_bytes(1, 1)), Some("png"));
        assert_eq!(image_extension(b""), None);
    }

    #[test]
    fn test_load_relative_to_root() {
        let dir = tempdir().unwrap();
        let bytes = png_bytes(4, 5);
        std::fs::write(dir.path().join("fig.png"), &bytes).unwrap();

        let loader = FileImageLoader::new().with_root(dir.path());
        let image = loader.load("fig.png").unwrap();
        assert_eq!(image.data, bytes);
        assert_eq!(image.size, ImageSize::new(4, 5));
    }

    #[test]
    fn test_load_missing_and_pdf() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("fig.pdf"), b"%PDF-1.5").unwrap();
        let loader = FileImageLoader::new().with_root(dir.path());

        assert!(matches!(loader.load("nope.png"), Err(Error::InputNotFound(_))));
        assert!(matches!(loader.load("fig.pdf"), Err(Error::ImageDecode(_))));
    }
}
