// ==============================================================================
// main.rs - SNV Discovery Entry Point
// ==============================================================================
// Description: Command line entry point for discovery, pileup overlap,
//              quality-threshold and PyClone input subcommands
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-12
// Version: 1.1.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snv_discovery::overlap::{run_overlap, DEFAULT_MIN_ALT};
use snv_discovery::processor::DiscoveryProcessor;
use snv_discovery::pyclone::run_pyclone;
use snv_discovery::quality::run_quality;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Worker threads for per-sample parallel work (default: all cores)
    #[arg(long, env = "SNV_DISCOVERY_THREADS", global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Strict/loose SNV discovery with cross-sample false-positive removal
    Discover {
        /// YAML configuration file
        config: PathBuf,
    },

    /// Re-count union variants in mpileups and report cross-sample overlap
    Overlap {
        /// Union variants (SNV[\tSYMBOL], no header)
        union: PathBuf,

        /// mpileup of the comparison sample
        reference_pileup: PathBuf,

        /// mpileups of the other samples (name the matched normal normal.txt)
        #[arg(required = true)]
        pileups: Vec<PathBuf>,

        /// Minimum alt reads for a sample to count as supporting a variant
        #[arg(long, default_value_t = DEFAULT_MIN_ALT)]
        min_alt: u32,

        /// Output directory (default: rapports_<min_alt>)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Alt-read base/mapping quality histograms and per-variant thresholds
    Quality {
        /// Union variants (SNV[\tSYMBOL], no header)
        union: PathBuf,

        /// mpileups to analyse
        #[arg(required = true)]
        pileups: Vec<PathBuf>,

        #[arg(short, long, default_value = "q_scores")]
        output_dir: PathBuf,
    },

    /// Build a PyClone mutation table for one sample
    Pyclone {
        sample_name: String,

        /// Union variants with gene symbols
        union_symbols: PathBuf,

        /// <sample>_samtools_result.tsv from the overlap subcommand
        samtools_snv: PathBuf,

        /// TitanCNA segs.txt
        titan_segs: PathBuf,

        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snv_discovery=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if let Some(threads) = args.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            warn!("Could not configure {} worker threads: {}", threads, e);
        }
    }

    match args.command {
        Command::Discover { config } => {
            info!("SNV discovery starting with {:?}", config);
            let processor = DiscoveryProcessor::from_config_file(&config)?;
            let report = processor.process()?;
            info!(
                "Discovery complete: {} strict and {} combined union variants, results in {:?}",
                report.outcome.union_strict_no_fp.len(),
                report.outcome.union_combined.len(),
                report.results_dir
            );
        }

        Command::Overlap {
            union,
            reference_pileup,
            pileups,
            min_alt,
            output_dir,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(format!("rapports_{}", min_alt)));
            let run = run_overlap(&union, &reference_pileup, &pileups, min_alt, &output_dir)
                .context("Overlap report failed")?;
            info!(
                "Overlap report complete: {} files written to {:?}",
                run.written.len(),
                output_dir
            );
        }

        Command::Quality {
            union,
            pileups,
            output_dir,
        } => {
            let run = run_quality(&union, &pileups, &output_dir).context("Quality analysis failed")?;
            info!(
                "Quality analysis complete: {} files written to {:?}",
                run.written.len(),
                output_dir
            );
        }

        Command::Pyclone {
            sample_name,
            union_symbols,
            samtools_snv,
            titan_segs,
            output_dir,
        } => {
            let path = run_pyclone(&sample_name, &union_symbols, &samtools_snv, &titan_segs, &output_dir)
                .context("PyClone input build failed")?;
            info!("PyClone input written to {:?}", path);
        }
    }

    Ok(())
}
