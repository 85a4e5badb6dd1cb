//! paperblocks CLI - paper linearization and block sharding tool

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use paperblocks::convert::batch::read_input_list;
use paperblocks::segment::image_extension;
use paperblocks::shard::{read_shard, DEFAULT_SPLIT_SIZE, DEFAULT_TARGET_BYTES};
use paperblocks::{
    consolidate, detect_format_from_path, run_batch, BatchOptions, Category, ConsolidateOptions,
    ConvertOptions, ConverterRegistry, JsonFormat, Paperblocks, SegmentOptions, SegmentStats,
    ShardOptions,
};

#[derive(Parser)]
#[command(name = "paperblocks")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Linearize papers and write typed content block shards", long_about = None)]
struct Cli {
    /// Write logs to a timestamped file in this directory instead of stderr
    #[arg(long, global = true, value_name = "DIR", env = "PAPERBLOCKS_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a paper as its linear markdown document
    #[command(alias = "md")]
    Markdown {
        /// Input paper file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Leave out the footnote and reference appendices
        #[arg(long)]
        no_appendix: bool,
    },

    /// Segment one paper into blocks and write shards
    Blocks {
        /// Input paper file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Blocks per shard
        #[arg(short = 's', long, env = "PAPERBLOCKS_SPLIT_SIZE", default_value_t = DEFAULT_SPLIT_SIZE)]
        split_size: usize,

        /// Directory relative figure paths are resolved against
        #[arg(long, value_name = "DIR")]
        image_root: Option<PathBuf>,

        /// Print the blocks as JSON instead of writing shards
        #[arg(long)]
        json: bool,
    },

    /// Process many papers (a file or a .txt list of paths)
    Batch {
        /// Input paper file or path list
        #[arg(value_name = "FILE|LIST")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Blocks per shard
        #[arg(short = 's', long, env = "PAPERBLOCKS_SPLIT_SIZE", default_value_t = DEFAULT_SPLIT_SIZE)]
        split_size: usize,

        /// Directory relative figure paths are resolved against
        /// (default: each document's own directory)
        #[arg(long, value_name = "DIR")]
        image_root: Option<PathBuf>,

        /// Process one document at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Consolidate shard files into size-bounded files
    Concat {
        /// Directory holding shard files
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Approximate byte size of each consolidated file
        #[arg(long, env = "PAPERBLOCKS_TARGET_BYTES", default_value_t = DEFAULT_TARGET_BYTES)]
        target_bytes: u64,

        /// Failure log path (defaults to failures.jsonl in the output directory)
        #[arg(long, value_name = "FILE")]
        failure_log: Option<PathBuf>,
    },

    /// Detect the format of a paper source file
    Detect {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show segmentation statistics for a paper
    Info {
        /// Input paper file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize a shard file
    Inspect {
        /// Shard file
        #[arg(value_name = "SHARD")]
        input: PathBuf,

        /// Write figure images into this directory
        #[arg(long, value_name = "DIR")]
        images: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_dir.as_deref()) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Markdown {
            input,
            output,
            no_appendix,
        } => cmd_markdown(&input, output.as_deref(), no_appendix),
        Commands::Blocks {
            input,
            output,
            split_size,
            image_root,
            json,
        } => cmd_blocks(&input, output.as_deref(), split_size, image_root, json),
        Commands::Batch {
            input,
            output,
            split_size,
            image_root,
            sequential,
        } => cmd_batch(&input, &output, split_size, image_root, sequential),
        Commands::Concat {
            input,
            output,
            target_bytes,
            failure_log,
        } => cmd_concat(&input, &output, target_bytes, failure_log),
        Commands::Detect { input } => cmd_detect(&input),
        Commands::Info { input, json } => cmd_info(&input, json),
        Commands::Inspect { input, images } => cmd_inspect(&input, images.as_deref()),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(log_dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if let Some(dir) = log_dir {
        fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
        let path = dir.join(format!("paperblocks_{}.log", stamp));
        let file = fs::File::create(&path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn cmd_markdown(
    input: &Path,
    output: Option<&Path>,
    no_appendix: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Paperblocks::new();
    if no_appendix {
        builder = builder.without_appendix();
    }
    let markdown = builder.parse(input)?.to_markdown()?;

    if let Some(path) = output {
        fs::write(path, &markdown)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", markdown);
    }

    Ok(())
}

fn cmd_blocks(
    input: &Path,
    output: Option<&Path>,
    split_size: usize,
    image_root: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Paperblocks::new().with_split_size(split_size);
    // Relative figure paths default to the paper's own directory.
    let root = image_root.or_else(|| input.parent().map(Path::to_path_buf));
    if let Some(root) = root {
        builder = builder.with_image_root(root);
    }
    let result = builder.parse(input)?;

    if json {
        println!("{}", result.to_json(JsonFormat::Lines)?);
        return Ok(());
    }

    let output_dir = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;
    let target = output_dir.join(format!("{}.jsonl", result.identity().file_id));

    let pb = spinner("Segmenting...");
    let shards = result.write_shards(&target)?;
    pb.finish_and_clear();

    println!("{} {}", "Document".green().bold(), result.identity().file_id);
    println!("  {}: {}", "Hash".bold(), result.identity().file_hash);
    for (i, shard) in shards.iter().enumerate() {
        let branch = if i + 1 == shards.len() { "└─" } else { "├─" };
        println!("  {} {}", branch.dimmed(), shard.display());
    }

    Ok(())
}

fn cmd_batch(
    input: &Path,
    output: &Path,
    split_size: usize,
    image_root: Option<PathBuf>,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = read_input_list(input)?;
    let mut convert = ConvertOptions::new()
        .with_shard_options(ShardOptions::new().with_split_size(split_size));
    if let Some(root) = image_root {
        convert = convert.with_segment_options(SegmentOptions::new().with_image_root(root));
    }
    let mut options = BatchOptions::new().with_convert_options(convert);
    if sequential {
        options = options.sequential();
    }

    let pb = spinner(&format!("Processing {} documents...", inputs.len()));
    let registry = ConverterRegistry::with_defaults();
    let summary = run_batch(&registry, &inputs, output, &options)?;
    pb.finish_and_clear();

    println!("{}", "Batch Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Processed".bold(), summary.processed);
    println!("{}: {}", "Failed".bold(), summary.failed);
    println!("{}: {}", "Blocks".bold(), summary.blocks);
    println!("{}: {}", "Shards".bold(), summary.shards);
    println!("{}: {}", "Figures".bold(), summary.stats.figure_count);
    println!("{}: {}", "Failed images".bold(), summary.stats.failed_images);

    for failure in &summary.failures {
        println!(
            "  {} {} ({}): {}",
            "✗".red(),
            failure.input.display(),
            failure.error_kind,
            failure.error
        );
    }

    Ok(())
}

fn cmd_concat(
    input: &Path,
    output: &Path,
    target_bytes: u64,
    failure_log: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = ConsolidateOptions::new().with_target_bytes(target_bytes);
    if let Some(path) = failure_log {
        options = options.with_failure_log(path);
    }

    let pb = spinner("Consolidating shards...");
    let summary = consolidate(input, output, &options)?;
    pb.finish_and_clear();

    println!(
        "{} {} files merged into {} ({} blocks)",
        "Done!".green().bold(),
        summary.merged,
        summary.outputs.len(),
        summary.blocks
    );
    if summary.failed > 0 {
        println!(
            "{} {} files failed, see {}",
            "Warning:".yellow().bold(),
            summary.failed,
            summary.failure_log.display()
        );
    }

    Ok(())
}

fn cmd_detect(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let format = detect_format_from_path(input)?;
    let kind = if format.is_archive() { "archive" } else { "document" };
    println!("{}: {} ({})", input.display(), format.to_string().cyan(), kind);
    Ok(())
}

fn cmd_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Paperblocks::new();
    if let Some(root) = input.parent() {
        builder = builder.with_image_root(root);
    }
    let result = builder.parse(input)?;
    let stats = result.to_blocks_with_stats().stats;

    if json {
        let value = serde_json::json!({
            "file_id": result.identity().file_id,
            "file_hash": result.identity().file_hash,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let paper = result.paper();
    println!("{}", "Paper Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Id".bold(), result.identity().file_id);
    println!("{}: {}", "Hash".bold(), result.identity().file_hash);
    if !paper.title.is_empty() {
        println!("{}: {}", "Title".bold(), paper.title);
    }
    let authors = paper.author_line();
    if !authors.is_empty() {
        println!("{}: {}", "Authors".bold(), authors);
    }

    println!();
    println!("{}", "Block Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Blocks".bold(), stats.block_count);
    println!("{}: {}", "Text".bold(), stats.text_blocks);
    println!("{}: {}", "Tables".bold(), stats.table_blocks);
    println!("{}: {}", "Images".bold(), stats.image_blocks);
    println!("{}: {}", "Figures".bold(), stats.figure_count);
    println!("{}: {}", "Sections".bold(), stats.section_count);
    println!("{}: {}", "Footnotes".bold(), stats.footnote_count);
    println!("{}: {}", "References".bold(), stats.reference_count);
    println!("{}: {}", "Characters".bold(), stats.text_length);
    if stats.failed_images > 0 {
        println!("{}: {}", "Failed images".yellow().bold(), stats.failed_images);
    }

    Ok(())
}

fn cmd_inspect(input: &Path, images: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let blocks = read_shard(input)?;

    let stats = SegmentStats::from_blocks(&blocks);
    let mut documents: BTreeMap<&str, usize> = BTreeMap::new();
    for block in &blocks {
        *documents.entry(block.file_id.as_str()).or_default() += 1;
    }

    println!("{}", "Shard Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Blocks".bold(), blocks.len());
    println!("{}: {}", "Documents".bold(), documents.len());
    println!("  {} text: {}", "├─".dimmed(), stats.text_blocks);
    println!("  {} table: {}", "├─".dimmed(), stats.table_blocks);
    println!("  {} figure: {}", "└─".dimmed(), stats.image_blocks);

    let Some(dir) = images else {
        return Ok(());
    };
    fs::create_dir_all(dir)?;

    let mut count = 0;
    for block in blocks.iter().filter(|b| b.category == Category::Figure) {
        let Some(data) = block.image.as_deref().filter(|d| !d.is_empty()) else {
            continue;
        };
        let ext = image_extension(data).unwrap_or("bin");
        let filename = format!("{}_{}.{}", block.file_id, block.block_id, ext);
        fs::write(dir.join(&filename), data)?;
        println!("{} {}", "Extracted".green(), filename);
        count += 1;
    }
    println!("\n{} {} images extracted", "Done!".green().bold(), count);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "paperblocks".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Paper linearization and content block sharding tool");
    println!();
    println!("License: MIT");
}
