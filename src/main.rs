use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use eqr_hourly::ProductFilter;
use log::info;
use std::path::PathBuf;

mod hourly_concat;
mod quarter_processor;

use quarter_processor::{QuarterProcessor, DEFAULT_CHUNK_SIZE};

#[derive(Parser)]
#[command(name = "eqr_rust_processor")]
#[command(about = "Break FERC EQR transactions down into hourly records")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Filter quarterly EQR archives and break transactions down by hour
    Hourly {
        /// Directory holding the CSV_<YYYY>Q<n>.zip archives
        #[arg(long)]
        data_dir: PathBuf,

        /// Directory for the hourly quarter files
        #[arg(long)]
        output_dir: PathBuf,

        /// Quarter to process, e.g. 2023Q1
        #[arg(short, long, conflicts_with = "all")]
        quarter: Option<String>,

        /// Process every quarter archive in the data directory
        #[arg(long)]
        all: bool,

        /// Product category to keep
        #[arg(short, long, value_enum, default_value = "energy")]
        category: Category,

        /// Records per intermediate chunk file
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Where to put the temporary chunk directory (system temp by default)
        #[arg(long)]
        temp_dir: Option<PathBuf>,

        /// Abort on the first record that cannot be broken down
        #[arg(long)]
        strict: bool,
    },
    /// Concatenate hourly quarter files into one CSV
    Concat {
        /// Directory holding the hourly quarter files
        #[arg(long)]
        input_dir: PathBuf,

        /// Final CSV file, replaced if it exists
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum Category {
    /// Energy delivered to the Mid-C and COB hubs
    Energy,
    /// Capacity, regulation and frequency response products
    Ancillary,
}

impl From<Category> for ProductFilter {
    fn from(category: Category) -> Self {
        match category {
            Category::Energy => ProductFilter::EnergyHubs,
            Category::Ancillary => ProductFilter::Ancillary,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Hourly {
            data_dir,
            output_dir,
            quarter,
            all,
            category,
            chunk_size,
            temp_dir,
            strict,
        } => {
            println!("🚀 EQR Hourly Breakdown - Rust Processor");
            println!("Rayon thread pool configured with {} threads", rayon::current_num_threads());
            println!("{}", "=".repeat(60));

            let processor = QuarterProcessor::new(data_dir, output_dir, category.into())
                .with_chunk_size(chunk_size)
                .with_temp_root(temp_dir)
                .with_strict(strict);

            let start = std::time::Instant::now();
            let summaries = match (quarter, all) {
                (Some(quarter), _) => vec![processor.process_quarter(&quarter)?],
                (None, true) => processor.process_all()?,
                (None, false) => bail!("Pass --quarter <YYYYQn> or --all"),
            };

            let rows: usize = summaries.iter().map(|s| s.breakdown.hourly_rows).sum();
            let rejected: usize = summaries.iter().map(|s| s.breakdown.rejected).sum();
            info!("{} quarters, {} hourly rows, {} rejected records", summaries.len(), rows, rejected);
            println!("\n✅ Processing complete in {:?}!", start.elapsed());
        }
        Command::Concat { input_dir, output } => {
            hourly_concat::concat_hourly_directory(&input_dir, &output)?;
        }
    }

    Ok(())
}
