//! Equalize images on a worker group and check the result against the
//! sequential reference.

use anyhow::{Context, Result};
use clap::Parser;
use parheq::pipeline::{equalize_file, first_mismatch, is_decode_failure, output_path};
use parheq::{coordinator, EqualizeParams, GroupConfig, Mode};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit status of the original tool's `return -1` on a load failure.
const DECODE_FAILURE_EXIT: u8 = 255;
const ENCODE_FAILURE_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about = "Distributed histogram equalization")]
struct Args {
    /// Input images
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for `<stem>_parallel.png` and `<stem>_sequential.png`
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Worker count, coordinator included (defaults to available cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Number of intensity levels
    #[arg(long, default_value_t = 256)]
    levels: usize,

    /// Multiplier applied to the CDF before truncation
    #[arg(long, default_value_t = 20.0)]
    scale: f64,

    /// Lowest output value
    #[arg(long, default_value_t = 1)]
    out_min: u32,

    /// Highest output value
    #[arg(long, default_value_t = 20)]
    out_max: u32,

    /// Longest a worker may wait in one collective, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Do not compare the parallel output with the sequential one
    #[arg(long, default_value_t = false)]
    skip_verify: bool,
}

enum Outcome {
    Success,
    EncodeFailed,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::EncodeFailed) => ExitCode::from(ENCODE_FAILURE_EXIT),
        Err(e) => {
            error!("{:#}", e);
            let decode_failed = e
                .downcast_ref::<parheq::runtime::Error>()
                .is_some_and(is_decode_failure);
            if decode_failed {
                error!("Failed to load image. Exiting...");
                ExitCode::from(DECODE_FAILURE_EXIT)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(args: &Args) -> Result<Outcome> {
    let mut group = GroupConfig::default().with_timeout(Duration::from_millis(args.timeout_ms));
    if let Some(workers) = args.workers {
        group = group.with_workers(workers);
    }
    let params = EqualizeParams::default()
        .with_levels(args.levels)
        .with_scale(args.scale)
        .with_output_range(args.out_min, args.out_max);

    let coordinator = coordinator(group, params).context("invalid configuration")?;
    info!("Running on {} workers", coordinator.group().size());

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("cannot create output directory {}", args.output_dir.display())
    })?;

    let mut outcome = Outcome::Success;
    for input in &args.inputs {
        let parallel_out = output_path(&args.output_dir, input, Mode::Distributed);
        let parallel = equalize_file(&coordinator, Mode::Distributed, input, &parallel_out)?;
        println!(
            "Parallel processing time: {:.3} ms",
            parallel.report.elapsed.as_secs_f64() * 1000.0
        );

        let sequential_out = output_path(&args.output_dir, input, Mode::Reference);
        let sequential = equalize_file(&coordinator, Mode::Reference, input, &sequential_out)?;
        println!(
            "Sequential processing time: {:.3} ms",
            sequential.report.elapsed.as_secs_f64() * 1000.0
        );

        if parallel.encode_error.is_some() || sequential.encode_error.is_some() {
            outcome = Outcome::EncodeFailed;
        }

        if !args.skip_verify {
            if let Some(idx) = first_mismatch(&parallel.buffer, &sequential.buffer) {
                anyhow::bail!(
                    "{}: parallel and sequential results differ at pixel {}",
                    input.display(),
                    idx
                );
            }
            info!("{}: parallel output matches sequential reference", input.display());
        }
    }

    Ok(outcome)
}
