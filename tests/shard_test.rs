//! Integration tests for sharding and consolidation.

use std::path::Path;

use paperblocks::model::{BlockType, ContentBlock, DocumentIdentity};
use paperblocks::shard::{
    consolidate, discover_shards, load_failure_log, pack_first_fit_decreasing, read_shard,
    write_shard, write_shards, ConsolidateOptions, ShardOptions,
};
use paperblocks::Error;
use tempfile::tempdir;

fn blocks(file_id: &str, n: u64) -> Vec<ContentBlock> {
    let identity = DocumentIdentity::new("0cc175b9c0f1b6a831c399e269772661", file_id);
    (0..n)
        .map(|i| {
            ContentBlock::text(&identity, i, "20240501", format!("block {}", i), BlockType::Text)
        })
        .collect()
}

fn block_count(path: &Path) -> usize {
    read_shard(path).unwrap().len()
}

#[test]
fn test_write_shards_2050_by_200() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("paper.jsonl");
    let paths = write_shards(blocks("paper", 2050), &output, &ShardOptions::new()).unwrap();

    assert_eq!(paths.len(), 11);
    for (i, path) in paths.iter().enumerate() {
        assert_eq!(path, &dir.path().join(format!("paper_{}.jsonl", i)));
    }
    for path in &paths[..10] {
        assert_eq!(block_count(path), 200);
    }
    assert_eq!(block_count(&paths[10]), 50);

    let last = read_shard(&paths[10]).unwrap();
    assert_eq!(last[0].block_id, 2000);
    assert_eq!(last[49].block_id, 2049);
}

#[test]
fn test_write_shards_exact_multiple() {
    let dir = tempdir().unwrap();
    let paths = write_shards(blocks("p", 200), &dir.path().join("p.jsonl"), &ShardOptions::new())
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(block_count(&paths[0]), 200);
}

#[test]
fn test_write_shards_zero_split_rejected() {
    let dir = tempdir().unwrap();
    let options = ShardOptions::new().with_split_size(0);
    let result = write_shards(blocks("p", 3), &dir.path().join("p.jsonl"), &options);
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn test_first_fit_decreasing() {
    let items = vec![("a", 4), ("b", 6), ("c", 3), ("d", 5), ("e", 2), ("f", 1)];
    let bins = pack_first_fit_decreasing(items, 10);

    let contents: Vec<Vec<&str>> = bins.iter().map(|b| b.items.clone()).collect();
    assert_eq!(contents, vec![vec!["b", "a"], vec!["d", "c", "e"], vec!["f"]]);
    assert!(bins.iter().all(|b| b.size <= 10));
}

#[test]
fn test_oversized_item_gets_own_bin() {
    let bins = pack_first_fit_decreasing(vec![("huge", 50), ("small", 3)], 10);
    assert_eq!(bins.len(), 2);
    assert_eq!(bins[0].items, vec!["huge"]);
    assert_eq!(bins[0].size, 50);
}

#[test]
fn test_consolidate_single_group() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir_all(input.join("nested")).unwrap();
    write_shard(&input.join("a_0.jsonl"), &blocks("a", 3)).unwrap();
    write_shard(&input.join("b_0.jsonl"), &blocks("b", 2)).unwrap();
    write_shard(&input.join("nested/c_0.jsonl"), &blocks("c", 4)).unwrap();
    std::fs::write(input.join("notes.txt"), "ignored").unwrap();

    let discovery = discover_shards(&input, "jsonl");
    assert_eq!(discovery.paths.len(), 3);
    assert!(discovery.errors.is_empty());

    let output = dir.path().join("out");
    let summary = consolidate(&input, &output, &ConsolidateOptions::new()).unwrap();

    assert_eq!(summary.inputs, 3);
    assert_eq!(summary.merged, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.blocks, 9);
    assert_eq!(summary.outputs, vec![output.join("shard_00000.jsonl")]);
    assert_eq!(block_count(&summary.outputs[0]), 9);
    assert!(!summary.failure_log.exists());
}

#[test]
fn test_consolidate_records_failure_and_continues() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir_all(&input).unwrap();
    write_shard(&input.join("a_0.jsonl"), &blocks("a", 3)).unwrap();
    write_shard(&input.join("b_0.jsonl"), &blocks("b", 2)).unwrap();
    write_shard(&input.join("c_0.jsonl"), &blocks("c", 1)).unwrap();
    let bad = input.join("bad_0.jsonl");
    std::fs::write(&bad, "{not json\n").unwrap();

    // A one-byte target puts every file in its own group.
    let output = dir.path().join("out");
    let options = ConsolidateOptions::new().with_target_bytes(1);
    let summary = consolidate(&input, &output, &options).unwrap();

    assert_eq!(summary.inputs, 4);
    assert_eq!(summary.merged, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.blocks, 6);
    assert_eq!(
        summary.outputs,
        vec![
            output.join("shard_00000.jsonl"),
            output.join("shard_00001.jsonl"),
            output.join("shard_00002.jsonl"),
        ]
    );
    assert!(!output.join("shard_00003.jsonl").exists());

    let records = load_failure_log(&summary.failure_log).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_kind, "schema_mismatch");
    assert_eq!(records[0].file, bad.display().to_string());
    assert!(records[0].destination.ends_with("shard_00003.jsonl"));
    assert!(records[0].traceback.contains("line 1"));
}

#[test]
fn test_consolidate_skips_its_own_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir_all(&input).unwrap();
    write_shard(&input.join("a_0.jsonl"), &blocks("a", 2)).unwrap();

    let output = input.join("merged");
    let first = consolidate(&input, &output, &ConsolidateOptions::new()).unwrap();
    assert_eq!(first.merged, 1);

    let second = consolidate(&input, &output, &ConsolidateOptions::new()).unwrap();
    assert_eq!(second.inputs, 1);
    assert_eq!(block_count(&second.outputs[0]), 2);
}

#[test]
fn test_consolidate_missing_input() {
    let dir = tempdir().unwrap();
    let result = consolidate(
        &dir.path().join("missing"),
        &dir.path().join("out"),
        &ConsolidateOptions::new(),
    );
    assert!(matches!(result, Err(Error::InputNotFound(_))));
}

#[cfg(unix)]
#[test]
fn test_consolidate_survives_symlink_loop() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir_all(input.join("sub")).unwrap();
    write_shard(&input.join("a_0.jsonl"), &blocks("a", 2)).unwrap();
    std::os::unix::fs::symlink("..", input.join("sub/loop")).unwrap();

    let output = dir.path().join("out");
    let summary = consolidate(&input, &output, &ConsolidateOptions::new()).unwrap();

    assert_eq!(summary.merged, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.outputs, vec![output.join("shard_00000.jsonl")]);
    assert_eq!(block_count(&summary.outputs[0]), 2);

    let records = load_failure_log(&summary.failure_log).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].file.ends_with("loop"));
}

#[test]
fn test_consolidate_leaves_no_partial_file_in_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir_all(&input).unwrap();
    write_shard(&input.join("a_0.jsonl"), &blocks("a", 2)).unwrap();

    let mut half_good = Vec::new();
    paperblocks::shard::write_blocks(&mut half_good, &blocks("b", 3)).unwrap();
    half_good.extend_from_slice(b"{truncated\n");
    std::fs::write(input.join("b_0.jsonl"), half_good).unwrap();

    let output = dir.path().join("out");
    let summary = consolidate(&input, &output, &ConsolidateOptions::new()).unwrap();

    assert_eq!(summary.merged, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.outputs.len(), 1);
    let merged = read_shard(&summary.outputs[0]).unwrap();
    assert_eq!(merged.len(), 2);
    assert!(merged.iter().all(|b| b.file_id == "a"));
}
