use std::sync::Arc;

use anyhow::{anyhow, Context};
use colored::Colorize;
use strata_chunk::{ChunkingOptions, DirectoryImporter, StreamReconstructor};
use strata_extract::{ExtractOptions, ExtractionPipeline, LoggingProgressSink};
use strata_node::{BlobRef, DirectoryNode};
use strata_store::{BlobStore, FileBlobStore};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let store = FileBlobStore::open(&cli.store)
        .with_context(|| format!("opening store at {}", cli.store.display()))?;
    let store: Arc<dyn BlobStore> = Arc::new(store);
    match cli.command {
        Command::Add(args) => cmd_add(store, args, &cli.format).await,
        Command::Extract(args) => cmd_extract(store, args, cli.verbose).await,
        Command::Cat(args) => cmd_cat(store, args).await,
        Command::Ls(args) => cmd_ls(store, args, &cli.format).await,
    }
}

async fn cmd_add(store: Arc<dyn BlobStore>, args: AddArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let mut options = ChunkingOptions::default();
    if let Some(min) = args.min_size {
        options.leaf.min_size = min;
    }
    if let Some(target) = args.target_size {
        options.leaf.target_size = target;
    }
    if let Some(max) = args.max_size {
        options.leaf.max_size = max;
    }

    let summary = DirectoryImporter::new(store.as_ref(), options)?
        .import(&args.path)
        .await
        .with_context(|| format!("importing {}", args.path.display()))?;
    let root = format_blob_ref(&summary.root);

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "root": root,
                "files": summary.files,
                "directories": summary.directories,
                "bytes": summary.bytes,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{} Imported {}", "✓".green().bold(), args.path.display().to_string().bold());
            println!("  Files: {}  Directories: {}  Bytes: {}", summary.files, summary.directories, summary.bytes);
            println!("  Root: {}", root.yellow());
        }
    }
    Ok(())
}

async fn cmd_extract(store: Arc<dyn BlobStore>, args: ExtractArgs, verbose: bool) -> anyhow::Result<()> {
    let mut options = match &args.config {
        Some(path) => ExtractOptions::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ExtractOptions::default(),
    };
    options.verify_output |= args.verify;
    options.verbose_output |= verbose;
    let options = options.with_progress_sink(Arc::new(LoggingProgressSink));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping extraction");
            on_interrupt.cancel();
        }
    });

    let stats = ExtractionPipeline::new(store, options)?
        .extract_directory(&args.root, &args.out, cancel)
        .await?;

    println!(
        "{} Extracted {} files ({} bytes) to {} in {:.2}s",
        "✓".green().bold(),
        stats.files_written,
        stats.extracted_bytes,
        args.out.display().to_string().bold(),
        stats.elapsed.as_secs_f64()
    );
    Ok(())
}

async fn cmd_cat(store: Arc<dyn BlobStore>, args: CatArgs) -> anyhow::Result<()> {
    let (dir, name) = match args.path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", args.path.as_str()),
    };
    let listing = resolve_dir(store.as_ref(), args.root, dir).await?;
    let file = listing
        .file(name)
        .ok_or_else(|| anyhow!("no file named {}", args.path))?;

    let mut stdout = tokio::io::stdout();
    StreamReconstructor::new(store.clone())
        .verify(args.verify)
        .copy_to(file.data, &mut stdout)
        .await?;
    Ok(())
}

async fn cmd_ls(store: Arc<dyn BlobStore>, args: LsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let listing = resolve_dir(store.as_ref(), args.root, args.path.as_deref().unwrap_or("")).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
        OutputFormat::Text => {
            for dir in &listing.directories {
                println!("{}  {:>12}  {}", "dir ".blue(), dir.length, format!("{}/", dir.name).blue().bold());
            }
            for file in &listing.files {
                let name = if file.flags.mode_bits() & 0o111 != 0 {
                    file.name.green().bold()
                } else {
                    file.name.normal()
                };
                println!("{}  {:>12}  {}", file.flags.to_string().dimmed(), file.length, name);
            }
            if listing.is_empty() {
                println!("{}", "(empty)".dimmed());
            }
        }
    }
    Ok(())
}

/// Follow slash-separated directory names down from `root`.
async fn resolve_dir(store: &dyn BlobStore, root: BlobRef, path: &str) -> anyhow::Result<DirectoryNode> {
    let mut node = DirectoryNode::read(store, &root).await?;
    for part in path.split('/').filter(|p| !p.is_empty()) {
        let next = node
            .directory(part)
            .map(|d| d.node)
            .ok_or_else(|| anyhow!("no directory named {part} in {path}"))?;
        node = DirectoryNode::read(store, &next).await?;
    }
    Ok(node)
}
