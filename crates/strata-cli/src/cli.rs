use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use strata_node::BlobRef;
use strata_types::ObjectId;

#[derive(Parser)]
#[command(
    name = "strata",
    about = "Strata: content-defined chunking and tree extraction",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Blob store directory
    #[arg(long, global = true, default_value = ".strata")]
    pub store: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Chunk a directory into the store and print its root reference
    Add(AddArgs),
    /// Write a stored directory tree to disk
    Extract(ExtractArgs),
    /// Stream a stored file to stdout
    Cat(CatArgs),
    /// List a stored directory
    Ls(LsArgs),
}

#[derive(Args)]
pub struct AddArgs {
    pub path: PathBuf,
    /// Smallest leaf in bytes
    #[arg(long)]
    pub min_size: Option<usize>,
    /// Average leaf in bytes
    #[arg(long)]
    pub target_size: Option<usize>,
    /// Largest leaf in bytes
    #[arg(long)]
    pub max_size: Option<usize>,
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Root reference printed by `add`
    #[arg(value_parser = parse_blob_ref)]
    pub root: BlobRef,
    pub out: PathBuf,
    /// TOML file with extraction options
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Check every chunk and file against its hash
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args)]
pub struct CatArgs {
    #[arg(value_parser = parse_blob_ref)]
    pub root: BlobRef,
    /// Slash-separated path of the file inside the tree
    pub path: String,
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(value_parser = parse_blob_ref)]
    pub root: BlobRef,
    /// Slash-separated directory path inside the tree
    pub path: Option<String>,
}

/// Parse `<hash>:<locator>`.
pub fn parse_blob_ref(s: &str) -> Result<BlobRef, String> {
    let (hash, locator) = s
        .split_once(':')
        .ok_or_else(|| "expected <hash>:<locator>".to_string())?;
    let hash: ObjectId = hash.parse().map_err(|e| format!("bad hash: {e}"))?;
    let locator: ObjectId = locator.parse().map_err(|e| format!("bad locator: {e}"))?;
    Ok(BlobRef::new(hash, locator))
}

/// Inverse of [`parse_blob_ref`].
pub fn format_blob_ref(blob: &BlobRef) -> String {
    format!("{}:{}", blob.hash, blob.locator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ref() -> String {
        let blob = BlobRef::new(ObjectId::from_bytes(b"hash"), ObjectId::from_bytes(b"locator"));
        format_blob_ref(&blob)
    }

    #[test]
    fn blob_ref_text_roundtrip() {
        let text = sample_ref();
        let parsed = parse_blob_ref(&text).unwrap();
        assert_eq!(format_blob_ref(&parsed), text);
    }

    #[test]
    fn blob_ref_requires_separator() {
        assert!(parse_blob_ref(&ObjectId::from_bytes(b"x").to_hex()).is_err());
        assert!(parse_blob_ref("zz:zz").is_err());
    }

    #[test]
    fn parse_add() {
        let cli = Cli::try_parse_from(["strata", "add", "src", "--target-size", "4096"]).unwrap();
        if let Command::Add(args) = cli.command {
            assert_eq!(args.path, PathBuf::from("src"));
            assert_eq!(args.target_size, Some(4096));
            assert_eq!(args.min_size, None);
        } else {
            panic!("wrong command");
        }
        assert_eq!(cli.store, PathBuf::from(".strata"));
    }

    #[test]
    fn parse_extract() {
        let root = sample_ref();
        let cli = Cli::try_parse_from([
            "strata", "--store", "/tmp/s", "extract", &root, "out", "--verify", "--config", "x.toml",
        ])
        .unwrap();
        assert_eq!(cli.store, PathBuf::from("/tmp/s"));
        if let Command::Extract(args) = cli.command {
            assert!(args.verify);
            assert_eq!(args.out, PathBuf::from("out"));
            assert_eq!(args.config, Some(PathBuf::from("x.toml")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_extract_rejects_bad_ref() {
        assert!(Cli::try_parse_from(["strata", "extract", "nope", "out"]).is_err());
    }

    #[test]
    fn parse_cat() {
        let root = sample_ref();
        let cli = Cli::try_parse_from(["strata", "cat", &root, "docs/readme.md"]).unwrap();
        if let Command::Cat(args) = cli.command {
            assert_eq!(args.path, "docs/readme.md");
            assert!(!args.verify);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_ls_json() {
        let root = sample_ref();
        let cli = Cli::try_parse_from(["strata", "--format", "json", "ls", &root]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        if let Command::Ls(args) = cli.command {
            assert!(args.path.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_verbose() {
        let root = sample_ref();
        let cli = Cli::try_parse_from(["strata", "-v", "ls", &root]).unwrap();
        assert!(cli.verbose);
    }
}
