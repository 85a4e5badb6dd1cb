//! Paper source format detection.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Kind of a paper source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Gzip-compressed tar archive
    TarGz,
    /// Gzip-compressed single file
    Gzip,
    /// Uncompressed tar archive
    Tar,
    /// Zip archive
    Zip,
    /// PDF document
    Pdf,
    /// LaTeX source
    Tex,
    /// Plain text
    Text,
    /// Structured paper JSON
    Json,
}

impl SourceFormat {
    /// Conventional file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::TarGz => "tar.gz",
            SourceFormat::Gzip => "gz",
            SourceFormat::Tar => "tar",
            SourceFormat::Zip => "zip",
            SourceFormat::Pdf => "pdf",
            SourceFormat::Tex => "tex",
            SourceFormat::Text => "txt",
            SourceFormat::Json => "json",
        }
    }

    /// Whether the format is an archive that may hold a LaTeX project.
    pub fn is_archive(self) -> bool {
        matches!(
            self,
            SourceFormat::TarGz | SourceFormat::Gzip | SourceFormat::Tar | SourceFormat::Zip
        )
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const PDF_MAGIC: &[u8] = b"%PDF-";
const TAR_MAGIC: &[u8] = b"ustar";
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_HEADER_LEN: usize = 512;

/// Bytes read from a file for detection.
const SNIFF_LEN: u64 = 64 * 1024;

const TEX_MARKERS: &[&str] = &["\\documentclass", "\\begin{", "\\section", "\\usepackage"];

/// Detect the source format of a file.
///
/// # Example
/// ```no_run
/// use paperblocks::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("source/2004.14974").unwrap();
/// println!("{}", format.extension());
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<SourceFormat> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }
    let mut head = Vec::new();
    File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;
    detect_format_from_bytes(&head)
}

/// Detect the source format from the leading bytes of a file.
///
/// Returns `Err(Error::UnknownFormat)` when nothing matches.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<SourceFormat> {
    if data.is_empty() {
        return Err(Error::UnknownFormat);
    }

    if data.starts_with(GZIP_MAGIC) {
        return Ok(if gzip_holds_tar(data) {
            SourceFormat::TarGz
        } else {
            SourceFormat::Gzip
        });
    }
    if has_tar_header(data) {
        return Ok(SourceFormat::Tar);
    }
    if data.starts_with(ZIP_MAGIC) || data.starts_with(ZIP_EMPTY_MAGIC) {
        return Ok(SourceFormat::Zip);
    }
    if data.starts_with(PDF_MAGIC) {
        return Ok(SourceFormat::Pdf);
    }

    match leading_text(data) {
        Some(text) => Ok(classify_text(text)),
        None => Err(Error::UnknownFormat),
    }
}

fn has_tar_header(data: &[u8]) -> bool {
    data.len() >= TAR_MAGIC_OFFSET + TAR_MAGIC.len()
        && &data[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()] == TAR_MAGIC
}

/// Decompress the first tar header's worth of bytes and look for the tar magic.
fn gzip_holds_tar(data: &[u8]) -> bool {
    let mut header = Vec::with_capacity(TAR_HEADER_LEN);
    let mut decoder = GzDecoder::new(data).take(TAR_HEADER_LEN as u64);
    // A truncated stream still yields whatever was decoded before the cut.
    let _ = decoder.read_to_end(&mut header);
    has_tar_header(&header)
}

/// The data as text, if it is UTF-8 (allowing a character cut at the end)
/// without NUL bytes.
fn leading_text(data: &[u8]) -> Option<&str> {
    if data.contains(&0) {
        return None;
    }
    match std::str::from_utf8(data) {
        Ok(text) => Some(text),
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&data[..e.valid_up_to()]).ok(),
        Err(_) => None,
    }
}

fn classify_text(text: &str) -> SourceFormat {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('{') {
        return SourceFormat::Json;
    }
    if TEX_MARKERS.iter().any(|marker| text.contains(marker)) {
        return SourceFormat::Tex;
    }
    SourceFormat::Text
}

/// Check if a file looks like structured paper JSON.
pub fn is_paper_json<P: AsRef<Path>>(path: P) -> bool {
    matches!(detect_format_from_path(path), Ok(SourceFormat::Json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn tar_block() -> Vec<u8> {
        let mut block = vec![0u8; TAR_HEADER_LEN];
        block[..8].copy_from_slice(b"main.tex");
        block[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5].copy_from_slice(TAR_MAGIC);
        block
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_detect_archives() {
        assert_eq!(detect_format_from_bytes(&tar_block()).unwrap(), SourceFormat::Tar);
        assert_eq!(detect_format_from_bytes(&gzip(&tar_block())).unwrap(), SourceFormat::TarGz);
        assert_eq!(detect_format_from_bytes(&gzip(b"\\documentclass{article}")).unwrap(), SourceFormat::Gzip);
        assert_eq!(detect_format_from_bytes(b"PK\x03\x04rest").unwrap(), SourceFormat::Zip);
    }

    #[test]
    fn test_detect_documents() {
        assert_eq!(detect_format_from_bytes(b"%PDF-1.7\n").unwrap(), SourceFormat::Pdf);
        assert_eq!(
            detect_format_from_bytes(b"% comment\n\\documentclass{article}").unwrap(),
            SourceFormat::Tex
        );
        assert_eq!(detect_format_from_bytes(b"  {\"title\": \"x\"}").unwrap(), SourceFormat::Json);
        assert_eq!(detect_format_from_bytes(b"just some notes").unwrap(), SourceFormat::Text);
    }

    #[test]
    fn test_detect_unknown() {
        assert!(matches!(detect_format_from_bytes(b""), Err(Error::UnknownFormat)));
        assert!(matches!(
            detect_format_from_bytes(&[0xff, 0xfe, 0x00, 0x01]),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_truncated_utf8_is_text() {
        let mut data = "résumé".as_bytes().to_vec();
        data.pop();
        assert_eq!(detect_format_from_bytes(&data).unwrap(), SourceFormat::Text);
    }

    #[test]
    fn test_extension_and_archive() {
        assert_eq!(SourceFormat::TarGz.to_string(), "tar.gz");
        assert!(SourceFormat::Zip.is_archive());
        assert!(!SourceFormat::Json.is_archive());
    }

    #[test]
    fn test_detect_missing_path() {
        let result = detect_format_from_path("/definitely/not/here.json");
        assert!(matches!(result, Err(Error::InputNotFound(_))));
    }
}
