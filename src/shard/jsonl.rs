//! JSON Lines encoding of block shards.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::ContentBlock;

/// Write blocks to `writer`, one JSON record per line.
pub fn write_blocks<W: Write>(writer: &mut W, blocks: &[ContentBlock]) -> Result<()> {
    for block in blocks {
        serde_json::to_writer(&mut *writer, block)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Create `path` and write `blocks` to it.
pub fn write_shard(path: &Path, blocks: &[ContentBlock]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_blocks(&mut writer, blocks)?;
    writer.flush()?;
    Ok(())
}

/// Read a shard back into blocks.
///
/// Blank lines are ignored. Any line that is not a valid block record fails
/// the whole file with [`Error::SchemaMismatch`].
pub fn read_shard(path: &Path) -> Result<Vec<ContentBlock>> {
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut blocks = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let block: ContentBlock =
            serde_json::from_str(&line).map_err(|e| Error::SchemaMismatch {
                path: path.to_path_buf(),
                line: index + 1,
                detail: e.to_string(),
            })?;
        if !block.has_single_payload() {
            return Err(Error::SchemaMismatch {
                path: path.to_path_buf(),
                line: index + 1,
                detail: "block must carry exactly one of text and image".to_string(),
            });
        }
        blocks.push(block);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockType, DocumentIdentity, ImageSize};
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc_0.jsonl");
        let id = DocumentIdentity::new("h", "doc");
        let blocks = vec![
            ContentBlock::text(&id, 0, "20240101", "hello".into(), BlockType::Text),
            ContentBlock::image(&id, 1, "20240101", vec![9, 9], ImageSize::new(2, 1)),
        ];

        write_shard(&path, &blocks).unwrap();
        assert_eq!(read_shard(&path).unwrap(), blocks);
    }

    #[test]
    fn test_schema_mismatch_reports_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "\n{\"foo\": 1}\n").unwrap();

        match read_shard(&path) {
            Err(Error::SchemaMismatch { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_read_missing_shard() {
        let dir = tempdir().unwrap();
        let result = read_shard(&dir.path().join("none.jsonl"));
        assert!(matches!(result, Err(Error::InputNotFound(_))));
    }
}
