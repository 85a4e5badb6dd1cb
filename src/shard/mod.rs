//! Sharding of block streams and consolidation of shard files.

mod batcher;
mod concat;
mod failure_log;
mod jsonl;
mod pack;

pub use batcher::{
    write_shards, BlockBatcher, JsonLinesSink, ShardOptions, ShardSink, DEFAULT_SPLIT_SIZE,
};
pub use concat::{
    consolidate, consolidated_name, discover_shards, ConsolidateOptions, ConsolidateSummary,
    ShardDiscovery, DEFAULT_TARGET_BYTES,
};
pub use failure_log::{load_failure_log, FailureLog, FailureRecord};
pub use jsonl::{read_shard, write_blocks, write_shard};
pub use pack::{pack_first_fit_decreasing, Bin};
