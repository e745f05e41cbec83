//! CLI command definitions for textsieve.
//!
//! `run` filters JSONL records between two locations, `sample` writes the
//! built-in sample dataset somewhere to try it on.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::filter::MissingTextPolicy;
use crate::pipeline::{LocalPipelineExecutor, PipelineConfig};
use crate::sample::{write_sample, SAMPLE_FILENAME};
use crate::storage::{Compression, Location};

/// Length filter for JSONL text datasets on local disk or S3.
#[derive(Parser, Debug)]
#[command(name = "textsieve")]
#[command(about = "Filter JSONL text records by length between local or S3 locations")]
#[command(version)]
#[command(
    long_about = "textsieve streams JSONL records from an input location, keeps those whose text is long enough, and writes rejected records to a separate exclusion file.\n\nExample usage:\n  textsieve sample --output s3://my-bucket/data/\n  textsieve run --input s3://my-bucket/data/sample.jsonl --output s3://my-bucket/data/"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Filter records from an input location into accepted and excluded outputs.
    Run(RunArgs),

    /// Write the four-record sample dataset to a location.
    Sample(SampleArgs),
}

/// Arguments for `textsieve run`.
///
/// Every option left unset falls back to the config file, then to the
/// `TEXTSIEVE_*` environment, then to the built-in default.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Input location: JSONL file, directory, or s3://bucket/prefix.
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output location for both output files.
    #[arg(short, long)]
    pub output: Option<String>,

    /// YAML pipeline configuration file.
    #[arg(short, long, env = "TEXTSIEVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Field holding the record text.
    #[arg(long)]
    pub text_key: Option<String>,

    /// Field holding the record id.
    #[arg(long)]
    pub id_key: Option<String>,

    /// Minimum text length in characters.
    #[arg(long)]
    pub min_chars: Option<usize>,

    /// What to do with records that have no text field.
    #[arg(long, value_enum)]
    pub missing_text: Option<MissingTextPolicy>,

    /// File name for accepted records.
    #[arg(long)]
    pub accepted_filename: Option<String>,

    /// File name for excluded records.
    #[arg(long)]
    pub excluded_filename: Option<String>,

    /// Drop rejected records instead of writing them out.
    #[arg(long)]
    pub no_exclusions: bool,

    /// Output compression.
    #[arg(long, value_enum)]
    pub compression: Option<Compression>,

    /// Input compression; inferred from file extensions when unset.
    #[arg(long, value_enum)]
    pub input_compression: Option<Compression>,

    /// Only read input files whose name matches this glob.
    #[arg(long)]
    pub glob: Option<String>,

    /// Do not descend into nested directories or prefixes.
    #[arg(long)]
    pub no_recursive: bool,

    /// Stop after this many input records.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output JSON to stdout instead of a text summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

impl RunArgs {
    /// Resolves the effective configuration: defaults, config file,
    /// environment, then flags.
    pub fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        let base = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        let config = base.merge_env()?;
        Ok(self.apply(config))
    }

    /// Overrides `config` with every flag that was given.
    pub fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(key) = &self.text_key {
            config.text_key = key.clone();
        }
        if let Some(key) = &self.id_key {
            config.id_key = key.clone();
        }
        if let Some(min_chars) = self.min_chars {
            config.min_chars = min_chars;
        }
        if let Some(policy) = self.missing_text {
            config.missing_text = policy;
        }
        if let Some(name) = &self.accepted_filename {
            config.accepted_filename = name.clone();
        }
        if let Some(name) = &self.excluded_filename {
            config.excluded_filename = name.clone();
        }
        if self.no_exclusions {
            config.write_exclusions = false;
        }
        if let Some(compression) = self.compression {
            config.compression = compression;
        }
        if let Some(compression) = self.input_compression {
            config.input_compression = Some(compression);
        }
        if let Some(glob) = &self.glob {
            config.glob = Some(glob.clone());
        }
        if self.no_recursive {
            config.recursive = false;
        }
        if let Some(limit) = self.limit {
            config.limit = Some(limit);
        }
        config
    }
}

/// Arguments for `textsieve sample`.
#[derive(Parser, Debug)]
pub struct SampleArgs {
    /// Location to write the sample file under.
    #[arg(short, long)]
    pub output: String,

    /// Name of the sample file.
    #[arg(short, long, default_value = SAMPLE_FILENAME)]
    pub filename: String,

    /// Output JSON to stdout instead of a text summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_filter_command(args).await,
        Commands::Sample(args) => run_sample_command(args).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn run_filter_command(args: RunArgs) -> anyhow::Result<()> {
    let config = args.load_config()?;
    info!(
        input = %config.input,
        output = %config.output,
        min_chars = config.min_chars,
        "Loaded pipeline configuration"
    );

    let executor = LocalPipelineExecutor::new(config)?;
    let summary = executor.run().await?;

    if args.json {
        let json_output = serde_json::to_string_pretty(&summary)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
    } else {
        println!("✓ Filter run completed");
        println!("{summary}");
    }
    Ok(())
}

/// JSON output for the sample command.
#[derive(Debug, Serialize)]
struct SampleOutput {
    status: String,
    uri: String,
    records: u64,
    sha256: String,
}

async fn run_sample_command(args: SampleArgs) -> anyhow::Result<()> {
    let location = Location::parse(&args.output)?;
    let summary = write_sample(&location, &args.filename).await?;

    if args.json {
        let output = SampleOutput {
            status: "success".to_string(),
            uri: summary.uri,
            records: summary.records,
            sha256: summary.sha256,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("✓ Wrote {} sample records to {}", summary.records, summary.uri);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Run(args) => args,
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_run_flags() {
        let args = run_args(&[
            "textsieve",
            "run",
            "--input",
            "s3://bucket/data/sample.jsonl",
            "--output",
            "s3://bucket/data/",
            "--min-chars",
            "12",
            "--missing-text",
            "fail",
            "--compression",
            "gzip",
            "--no-exclusions",
            "--json",
        ]);

        assert_eq!(args.input.as_deref(), Some("s3://bucket/data/sample.jsonl"));
        assert_eq!(args.min_chars, Some(12));
        assert_eq!(args.missing_text, Some(MissingTextPolicy::Fail));
        assert_eq!(args.compression, Some(Compression::Gzip));
        assert!(args.no_exclusions);
        assert!(args.json);
    }

    #[test]
    fn test_flags_override_config() {
        let args = run_args(&[
            "textsieve",
            "run",
            "-i",
            "in.jsonl",
            "--text-key",
            "body",
            "--no-recursive",
            "--limit",
            "5",
        ]);
        let base = PipelineConfig::default()
            .with_input("from-file.jsonl")
            .with_output("from-file-out")
            .with_min_chars(40);

        let config = args.apply(base);
        assert_eq!(config.input, "in.jsonl");
        assert_eq!(config.output, "from-file-out");
        assert_eq!(config.text_key, "body");
        assert_eq!(config.min_chars, 40);
        assert!(!config.recursive);
        assert_eq!(config.limit, Some(5));
        assert!(config.write_exclusions);
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let args = RunArgs::default();
        let base = PipelineConfig::default().with_compression(Compression::Zstd);
        assert_eq!(args.apply(base.clone()), base);
    }

    #[test]
    fn test_parse_sample() {
        let cli = Cli::try_parse_from(["textsieve", "sample", "-o", "./data", "-l", "debug"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Sample(args) => {
                assert_eq!(args.output, "./data");
                assert_eq!(args.filename, "sample.jsonl");
            }
            other => panic!("expected sample command, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_compression() {
        assert!(Cli::try_parse_from(["textsieve", "run", "--compression", "brotli"]).is_err());
    }

    #[tokio::test]
    async fn test_run_with_cli_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let data_arg = data.display().to_string();

        let sample = Cli::try_parse_from(["textsieve", "sample", "--output", data_arg.as_str()]).unwrap();
        run_with_cli(sample).await.unwrap();

        let input = data.join("sample.jsonl").display().to_string();
        let run = Cli::try_parse_from([
            "textsieve",
            "run",
            "--input",
            input.as_str(),
            "--output",
            data_arg.as_str(),
            "--json",
        ])
        .unwrap();
        run_with_cli(run).await.unwrap();

        let excluded = std::fs::read_to_string(data.join("excluded.jsonl")).unwrap();
        assert_eq!(excluded.lines().count(), 1);
        assert!(excluded.contains("Short."));
        let filtered = std::fs::read_to_string(data.join("filtered.jsonl")).unwrap();
        assert_eq!(filtered.lines().count(), 3);
    }
}
