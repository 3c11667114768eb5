use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use qarchive_core::{
    transpile, Archive, ArchiveSchema, Container, LeafPolicy, LoadOptions, MemoryContainer,
    TranspileOptions,
};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "qarchive")]
#[command(about = "Inspect Q-Chem archive containers and transpile their schema to JSON Schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transpile a container-schema document to JSON Schema
    Transpile {
        /// Input container-schema file
        input: PathBuf,

        /// Output schema file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not decorate nodes with x-init / x-repr
        #[arg(long)]
        no_extras: bool,

        /// Max nesting depth of the source document
        #[arg(long, default_value_t = 64)]
        max_depth: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// List the jobs stored in a container
    Jobs {
        /// Container file (JSON rendition of the archive tree)
        container: PathBuf,

        /// Read every leaf while loading
        #[arg(long)]
        eager: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Print every value of a field, collected across all jobs
    Query {
        /// Container file (JSON rendition of the archive tree)
        container: PathBuf,

        /// Field name, e.g. `energy`
        field: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

/// One row of `qarchive jobs`.
#[derive(Serialize)]
struct JobSummary {
    slot: String,
    kind: String,
    sort_index: Option<u64>,
    energy: Option<f64>,
    iterations: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Transpile {
            input,
            output,
            no_extras,
            max_depth,
            format,
        } => {
            let source = read_json(&input)?;
            let options = TranspileOptions {
                add_extras: !no_extras,
                max_depth,
                ..TranspileOptions::default()
            };

            let result = transpile(&source, &options)
                .map_err(|e| anyhow::Error::from(e).context("Transpilation failed"))?;

            for unknown in &result.passthrough {
                eprintln!(
                    "Warning: unrecognized type `{}` at {} was copied unchanged",
                    unknown.type_name, unknown.path
                );
            }

            write_json(&result.schema, output.as_ref(), format)?;
        }
        Commands::Jobs {
            container,
            eager,
            format,
        } => {
            let options = LoadOptions {
                leaf_policy: if eager {
                    LeafPolicy::Eager
                } else {
                    LeafPolicy::Lazy
                },
                ..LoadOptions::default()
            };
            let archive = open_archive(&container, &options)?;

            let summaries: Vec<JobSummary> = archive
                .jobs()
                .iter()
                .map(|job| {
                    let energy = match job.energy() {
                        Ok(energy) => Some(energy),
                        Err(e) => {
                            tracing::warn!(job = %job.node().source(), error = %e, "job has no energy");
                            None
                        }
                    };
                    let slot = job
                        .node()
                        .source()
                        .parent()
                        .map(|slot| slot.name().to_string())
                        .unwrap_or_default();
                    JobSummary {
                        slot,
                        kind: job.kind().to_string(),
                        sort_index: job.sort_index(),
                        energy,
                        iterations: job.iterations().len(),
                    }
                })
                .collect();

            write_json(&summaries, None, format)?;
        }
        Commands::Query {
            container,
            field,
            format,
        } => {
            let archive = open_archive(&container, &LoadOptions::default())?;
            let values = archive
                .index()
                .read(&field)
                .map_err(|e| anyhow::Error::from(e).context("Query failed"))?;
            let values: Vec<Value> = values.iter().map(|v| v.to_json()).collect();

            write_json(&values, None, format)?;
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse JSON from: {}", path.display()))
}

fn open_archive(path: &Path, options: &LoadOptions) -> Result<Archive> {
    let tree = read_json(path)?;
    let container = MemoryContainer::from_json(&tree)
        .with_context(|| format!("Not a valid container tree: {}", path.display()))?;
    let container: Arc<dyn Container> = Arc::new(container);
    let schema = ArchiveSchema::qchem().context("Failed to build the Q-Chem schema tables")?;

    Archive::open(container, &schema, options)
        .map_err(|e| anyhow::Error::from(e).context("Failed to load archive"))
}

fn write_json<T: Serialize>(val: &T, path: Option<&PathBuf>, format: OutputFormat) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;

    Ok(())
}
