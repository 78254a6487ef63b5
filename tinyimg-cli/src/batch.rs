//! File expansion, deduplication, and batch reporting.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tinyimg::{ImageFormat, LosslessOutcome, ProcessError, ProcessReport};

/// Expand input arguments into a deduplicated list of files, in argument
/// order.
///
/// Handles:
/// - Glob patterns (containing `*`, `?`, `[`)
/// - Directories (recursive discovery of JPEG and PNG files)
/// - Plain paths, passed through even when missing so the failure is
///   reported per file
pub fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        if is_glob(pattern) {
            let before = files.len();
            let entries =
                glob::glob(pattern).with_context(|| format!("invalid glob pattern {pattern}"))?;
            for entry in entries {
                let path = entry.with_context(|| format!("expanding {pattern}"))?;
                if path.is_file() && is_image(&path) {
                    push_unique(path, &mut seen, &mut files);
                }
            }
            if files.len() == before {
                tracing::warn!(pattern = %pattern, "pattern matched no images");
            }
        } else {
            let path = PathBuf::from(pattern);
            if path.is_dir() {
                for_each_image_in_dir(&path, &mut seen, &mut files);
            } else {
                push_unique(path, &mut seen, &mut files);
            }
        }
    }

    Ok(files)
}

pub fn is_glob(arg: &str) -> bool {
    arg.contains('*') || arg.contains('?') || arg.contains('[')
}

/// Check if a file path has the extension of a format we can re-encode.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension)
        .is_some_and(ImageFormat::can_reencode)
}

fn push_unique(path: PathBuf, seen: &mut HashSet<PathBuf>, files: &mut Vec<PathBuf>) {
    let key = path.canonicalize().unwrap_or_else(|_| path.clone());
    if seen.insert(key) {
        files.push(path);
    }
}

/// Recursively find image files in a directory, in name order.
fn for_each_image_in_dir(dir: &Path, seen: &mut HashSet<PathBuf>, files: &mut Vec<PathBuf>) {
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(e) => e.flatten().map(|entry| entry.path()).collect(),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot read directory");
            return;
        }
    };
    entries.sort();

    for path in entries {
        if path.is_dir() {
            for_each_image_in_dir(&path, seen, files);
        } else if path.is_file() && is_image(&path) {
            push_unique(path, seen, files);
        }
    }
}

/// Result of processing a single file.
#[derive(Debug, Serialize)]
pub struct FileResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub input_size: u64,
    pub output_size: Option<u64>,
    pub quality: Option<u8>,
    pub iterations: Option<u32>,
    /// Bytes removed by the lossless pass.
    pub lossless_saved: u64,
    pub skipped: bool,
    /// Skipped, and the original was copied to a separate output path.
    pub copied_original: bool,
    pub error: Option<String>,
    /// Non-fatal problem, such as a failed lossless pass.
    pub warning: Option<String>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl FileResult {
    pub fn from_report(
        input: &Path,
        output: &Path,
        report: &ProcessReport,
        duration: Duration,
    ) -> Self {
        Self {
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            input_size: report.input_size,
            output_size: Some(report.output_size),
            quality: Some(report.quality.get()),
            iterations: Some(report.iterations),
            lossless_saved: report.lossless.saved(),
            skipped: report.skipped,
            copied_original: report.copied,
            error: None,
            warning: lossless_warning(&report.lossless),
            duration,
        }
    }

    pub fn from_error(input: &Path, output: &Path, error: &ProcessError, duration: Duration) -> Self {
        Self {
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            input_size: input.metadata().map(|m| m.len()).unwrap_or(0),
            output_size: None,
            quality: None,
            iterations: None,
            lossless_saved: 0,
            skipped: false,
            copied_original: false,
            error: Some(error.to_string()),
            warning: None,
            duration,
        }
    }

    pub fn status(&self) -> &'static str {
        if self.error.is_some() {
            "error"
        } else if self.skipped {
            "skipped"
        } else {
            "ok"
        }
    }

    pub fn change_pct(&self) -> Option<f64> {
        let out = self.output_size?;
        if self.input_size == 0 {
            return None;
        }
        Some((out as f64 - self.input_size as f64) / self.input_size as f64 * 100.0)
    }
}

fn lossless_warning(outcome: &LosslessOutcome) -> Option<String> {
    match outcome {
        LosslessOutcome::Failed(message) => Some(message.clone()),
        _ => None,
    }
}

/// Accumulated batch processing summary, in input order.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub results: Vec<FileResult>,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    processed: usize,
    skipped: usize,
    errors: usize,
    total_input_size: u64,
    total_output_size: u64,
    files: &'a [FileResult],
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: FileResult) {
        self.results.push(result);
    }

    pub fn total_input_size(&self) -> u64 {
        self.results
            .iter()
            .filter(|r| r.error.is_none())
            .map(|r| r.input_size)
            .sum()
    }

    pub fn total_output_size(&self) -> u64 {
        self.results.iter().filter_map(|r| r.output_size).sum()
    }

    pub fn success_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.error.is_none() && !r.skipped)
            .count()
    }

    pub fn skip_count(&self) -> usize {
        self.results.iter().filter(|r| r.skipped).count()
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }

    /// Print a human-readable summary table.
    pub fn print_report(&self) {
        if self.results.is_empty() {
            println!("No files processed.");
            return;
        }

        println!(
            "{:<40} {:>10} {:>10} {:>8} {:>4} {:>8}",
            "File", "Input", "Output", "Change", "Q", "Time"
        );
        println!("{}", "-".repeat(85));

        for r in &self.results {
            let name = r
                .input_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "?".to_string());
            let name = truncate_left(&name, 38);

            if let Some(err) = &r.error {
                println!("{:<40} {:>10} {}", name, format_size(r.input_size), err);
            } else if r.skipped {
                println!(
                    "{:<40} {:>10} {:>10}",
                    name,
                    format_size(r.input_size),
                    "skipped"
                );
            } else if let Some(out_size) = r.output_size {
                let change = r
                    .change_pct()
                    .map(|pct| format!("{pct:+.1}%"))
                    .unwrap_or_else(|| "N/A".to_string());
                let quality = r.quality.map(|q| q.to_string()).unwrap_or_default();
                println!(
                    "{:<40} {:>10} {:>10} {:>8} {:>4} {:>8}",
                    name,
                    format_size(r.input_size),
                    format_size(out_size),
                    change,
                    quality,
                    format_duration(r.duration),
                );
            }
        }

        println!("{}", "-".repeat(85));
        let total_in = self.total_input_size();
        let total_out = self.total_output_size();
        let change = if total_in > 0 {
            let pct = (total_out as f64 - total_in as f64) / total_in as f64 * 100.0;
            format!("{pct:+.1}%")
        } else {
            "N/A".to_string()
        };
        println!(
            "{} processed, {} skipped, {} errors | {} -> {} ({})",
            self.success_count(),
            self.skip_count(),
            self.error_count(),
            format_size(total_in),
            format_size(total_out),
            change,
        );
    }

    /// Write results as CSV.
    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating CSV report {}", path.display()))?;
        self.write_csv_to(&mut f)
            .with_context(|| format!("writing CSV report {}", path.display()))?;
        Ok(())
    }

    fn write_csv_to(&self, w: &mut impl Write) -> std::io::Result<()> {
        writeln!(
            w,
            "input,input_size,output,output_size,change_pct,quality,iterations,duration_ms,status"
        )?;
        for r in &self.results {
            writeln!(
                w,
                "{},{},{},{},{:.1},{},{},{},{}",
                csv_field(&r.input_path.display().to_string()),
                r.input_size,
                csv_field(&r.output_path.display().to_string()),
                r.output_size.unwrap_or(0),
                r.change_pct().unwrap_or(0.0),
                r.quality.map(|q| q.to_string()).unwrap_or_default(),
                r.iterations.map(|i| i.to_string()).unwrap_or_default(),
                r.duration.as_millis(),
                r.status(),
            )?;
        }
        Ok(())
    }

    /// Serialize counts, totals and per-file results as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonSummary {
            processed: self.success_count(),
            skipped: self.skip_count(),
            errors: self.error_count(),
            total_input_size: self.total_input_size(),
            total_output_size: self.total_output_size(),
            files: &self.results,
        })
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn truncate_left(name: &str, max: usize) -> String {
    let count = name.chars().count();
    if count <= max {
        return name.to_string();
    }
    let tail: String = name.chars().skip(count - (max - 2)).collect();
    format!("..{tail}")
}

fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{ms}ms")
    }
}

/// Format a byte size into a human-readable string.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
