use clap::{Parser, Subcommand};
use pickemall::apply::{BatchError, Executor};
use pickemall::codec::{ImageCropper, Quality};
use pickemall::{config, listing, logging, operation, output};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "pickemall")]
#[command(about = "Review a directory of JPEGs and apply crop/pick decisions in bulk")]
#[command(long_about = "\
Review a directory of JPEGs and apply crop/pick decisions in bulk

List the images under a directory, decide for each one whether to crop it or
keep it, and write those decisions to an operations file:

  {
    \"operations\": [
      { \"type\": \"crop\", \"filename\": \"beach.jpg\",
        \"crop\": { \"x\": 0.1, \"y\": 0.1, \"w\": 0.5, \"h\": 0.5 } },
      { \"type\": \"pick\", \"filename\": \"trips/dunes.jpg\" }
    ]
  }

Applying the file writes into the output directory, never into the source:

  output/
  ├── beach.jpg-3f2a9c0d1e4b5a69.jpg   # crop: <name>-<crop id>.jpg
  └── trips/dunes.jpg                  # pick: unchanged copy

Crop rectangles are fractions of the image width and height. The crop id is
derived from the rectangle, so re-applying the same file overwrites the same
outputs.

Run 'pickemall gen-config' to generate a documented pickemall.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./pickemall.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the JPEGs under a directory with their dimensions
    Ls {
        /// Directory to list
        root: PathBuf,
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply a file of crop/pick operations
    Apply {
        /// JSON operations file
        operations: PathBuf,
        /// Directory the operation filenames are relative to
        #[arg(long)]
        source: PathBuf,
        /// Directory receiving cropped and picked files
        #[arg(long)]
        output: PathBuf,
        /// Operations applied at once (default: processing.max_processes, else CPU cores)
        #[arg(long, short)]
        jobs: Option<usize>,
    },
    /// Print a stock pickemall.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose).map_err(|e| e as Box<dyn std::error::Error>)?;

    let cwd = std::env::current_dir()?;
    let config = config::load_config(cli.config.as_deref(), &cwd)?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Command::Ls { root, json } => {
            let jobs = config::effective_threads(&config.processing);
            let dir = listing::list_images(&root, jobs)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dir)?);
            } else {
                output::print_listing(&dir);
            }
        }
        Command::Apply {
            operations,
            source,
            output: output_dir,
            jobs,
        } => {
            let content = std::fs::read_to_string(&operations)?;
            let ops = operation::decode_batch(&content)?;

            let jobs = jobs.unwrap_or_else(|| config::effective_threads(&config.processing));
            let executor = Executor::new(source, output_dir, jobs);
            let cropper = ImageCropper::new(Quality::new(config.crop.quality));

            match executor.apply(&cropper, &ops) {
                Ok(report) => output::print_batch_report(&report),
                Err(e) => {
                    if let BatchError::Incomplete { report, .. } = &e {
                        output::print_batch_report(report);
                    }
                    return Err(e.into());
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
