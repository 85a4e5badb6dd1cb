//! Fixed-size batching of block streams into shards.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::ContentBlock;

use super::jsonl::write_shard;

/// Default number of blocks per shard.
pub const DEFAULT_SPLIT_SIZE: usize = 200;

/// Options for shard output.
#[derive(Debug, Clone)]
pub struct ShardOptions {
    /// Blocks per shard
    pub split_size: usize,

    /// File extension of shard files
    pub extension: String,
}

impl ShardOptions {
    /// Create new shard options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of blocks per shard.
    pub fn with_split_size(mut self, size: usize) -> Self {
        self.split_size = size;
        self
    }

    /// Set the shard file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

impl Default for ShardOptions {
    fn default() -> Self {
        Self {
            split_size: DEFAULT_SPLIT_SIZE,
            extension: "jsonl".to_string(),
        }
    }
}

/// Destination for completed shards.
pub trait ShardSink {
    /// Persist shard number `index`. Called once per shard, in index order.
    fn write_shard(&mut self, index: usize, blocks: &[ContentBlock]) -> Result<()>;
}

impl ShardSink for Vec<Vec<ContentBlock>> {
    fn write_shard(&mut self, _index: usize, blocks: &[ContentBlock]) -> Result<()> {
        self.push(blocks.to_vec());
        Ok(())
    }
}

/// Writes shards as `{stem}_{index}.{ext}` files in one directory.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    dir: PathBuf,
    stem: String,
    extension: String,
    written: Vec<PathBuf>,
}

impl JsonLinesSink {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
            extension: extension.into(),
            written: Vec::new(),
        }
    }

    /// Sink for shards named after `output`: its directory and file stem.
    pub fn for_output(output: &Path, options: &ShardOptions) -> Self {
        let dir = output
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = output
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "shard".to_string());
        Self::new(dir, stem, options.extension.clone())
    }

    /// Path of shard number `index`.
    pub fn shard_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", self.stem, index, self.extension))
    }

    /// Files written so far, in shard order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.written
    }
}

impl ShardSink for JsonLinesSink {
    fn write_shard(&mut self, index: usize, blocks: &[ContentBlock]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.shard_path(index);
        write_shard(&path, blocks)?;
        log::info!("batch {} done, {} generated", index, path.display());
        self.written.push(path);
        Ok(())
    }
}

/// Accumulates blocks and flushes a shard every `split_size` blocks.
///
/// Every block lands in exactly one shard. All shards hold `split_size`
/// blocks except possibly the last; no empty shard is ever written.
pub struct BlockBatcher<S: ShardSink> {
    sink: S,
    split_size: usize,
    buffer: Vec<ContentBlock>,
    shard_index: usize,
    block_count: u64,
}

impl<S: ShardSink> BlockBatcher<S> {
    /// Create a batcher. A zero split size is rejected.
    pub fn new(sink: S, split_size: usize) -> Result<Self> {
        if split_size == 0 {
            return Err(Error::InvalidConfig(
                "split size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            sink,
            split_size,
            buffer: Vec::with_capacity(split_size),
            shard_index: 0,
            block_count: 0,
        })
    }

    /// Accept one block, flushing if the shard is full.
    pub fn push(&mut self, block: ContentBlock) -> Result<()> {
        self.buffer.push(block);
        self.block_count += 1;
        if self.buffer.len() >= self.split_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Accept every block of `blocks`.
    pub fn extend<I>(&mut self, blocks: I) -> Result<()>
    where
        I: IntoIterator<Item = ContentBlock>,
    {
        for block in blocks {
            self.push(block)?;
        }
        Ok(())
    }

    /// Number of shards written so far.
    pub fn shard_count(&self) -> usize {
        self.shard_index
    }

    /// Number of blocks accepted so far.
    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.sink.write_shard(self.shard_index, &self.buffer)?;
        self.buffer.clear();
        self.shard_index += 1;
        Ok(())
    }

    /// Flush the remainder and return the sink.
    pub fn finish(mut self) -> Result<S> {
        self.flush()?;
        Ok(self.sink)
    }
}

/// Shard `blocks` into files named after `output`.
pub fn write_shards(
    blocks: Vec<ContentBlock>,
    output: &Path,
    options: &ShardOptions,
) -> Result<Vec<PathBuf>> {
    let sink = JsonLinesSink::for_output(output, options);
    let mut batcher = BlockBatcher::new(sink, options.split_size)?;
    batcher.extend(blocks)?;
    Ok(batcher.finish()?.into_paths())
}
