//! Batch driver: plan jobs, run them sequentially or on a rayon pool, report.

use std::time::Instant;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tinyimg::{ImageProcessor, ProcessOptions, Recompressor, Tolerance};
use tracing::info;

use crate::Args;
use crate::batch::{self, BatchSummary, FileResult};
use crate::output::{self, Job};

type Processor = ImageProcessor<tinyimg::ImageCodec, tinyimg::FuzzMetric, Recompressor>;

/// Process every input named on the command line.
///
/// Returns `None` when the arguments name no image at all. Per-file failures
/// are recorded in the summary; only setup problems (bad glob, thread pool,
/// report file) return `Err`.
pub fn run(args: &Args, options: ProcessOptions) -> anyhow::Result<Option<BatchSummary>> {
    let jobs = output::plan(&args.files, args.keep)?;
    if jobs.is_empty() {
        info!("no image files found");
        return Ok(None);
    }

    let processor =
        ImageProcessor::new(options).with_lossless(Recompressor::new(args.lossless_preset));
    let eps = args.eps;
    info!(files = jobs.len(), %eps, workers = args.jobs, "starting");

    let summary = if jobs.len() == 1 {
        let result = process_one(&processor, &jobs[0], eps);
        print_single(&result);
        BatchSummary {
            results: vec![result],
        }
    } else {
        run_batch(&processor, &jobs, eps, args.jobs as usize)?
    };

    if args.report {
        summary.print_report();
    }

    if let Some(ref csv_path) = args.csv {
        summary.write_csv(csv_path)?;
        eprintln!("CSV report written to {}", csv_path.display());
    }

    if args.json {
        println!("{}", summary.to_json().context("serializing JSON summary")?);
    }

    if summary.error_count() > 0 && !args.report {
        eprintln!(
            "{} of {} files had errors",
            summary.error_count(),
            summary.results.len()
        );
    }

    Ok(Some(summary))
}

fn run_batch(
    processor: &Processor,
    jobs: &[Job],
    eps: Tolerance,
    workers: usize,
) -> anyhow::Result<BatchSummary> {
    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .context("progress bar template")?
            .progress_chars("=>-"),
    );

    let run_job = |job: &Job| {
        pb.set_message(
            job.input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let result = process_one(processor, job, eps);
        if let Some(ref err) = result.error {
            pb.println(format!("error: {err}"));
        }
        pb.inc(1);
        result
    };

    let results: Vec<FileResult> = if workers > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .with_context(|| format!("starting {workers} worker threads"))?;
        pool.install(|| jobs.par_iter().map(run_job).collect())
    } else {
        jobs.iter().map(run_job).collect()
    };

    pb.finish_and_clear();
    Ok(BatchSummary { results })
}

/// Process a single file, catching errors into a [`FileResult`].
fn process_one(processor: &Processor, job: &Job, eps: Tolerance) -> FileResult {
    let start = Instant::now();
    match processor.process(&job.input, &job.output, eps) {
        Ok(report) => FileResult::from_report(&job.input, &job.output, &report, start.elapsed()),
        Err(e) => FileResult::from_error(&job.input, &job.output, &e, start.elapsed()),
    }
}

fn print_single(result: &FileResult) {
    if let Some(ref err) = result.error {
        eprintln!("error: {err}");
    } else if result.skipped {
        if result.copied_original {
            eprintln!(
                "skipped: re-encoding would not be smaller, original copied to {}",
                result.output_path.display()
            );
        } else {
            eprintln!("skipped: re-encoding would not be smaller, file left unchanged");
        }
    } else if let Some(out_size) = result.output_size {
        let change = result
            .change_pct()
            .map(|pct| format!(" ({pct:+.1}%)"))
            .unwrap_or_default();
        eprintln!(
            "{} -> {} ({}, quality {}{change})",
            batch::format_size(result.input_size),
            batch::format_size(out_size),
            result.output_path.display(),
            result.quality.map(|q| q.to_string()).unwrap_or_default(),
        );
    }
}
