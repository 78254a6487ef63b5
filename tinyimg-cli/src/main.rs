//! tinyimg: shrink images to the lowest quality that still looks the same.
//!
//! Accepts both the classic slash syntax (`/e 0.05 /k photo.jpg`) and regular
//! long options. Slash switches are rewritten to their long forms before clap
//! sees them.

mod batch;
mod output;
mod process;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use tinyimg::{
    ColorMode, ConfigError, EncodeSettings, ProcessOptions, QualityBounds, ResampleFilter,
    SearchConfig, Tolerance,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tinyimg", version, about = "Re-encode images at the lowest quality within a perceptual tolerance")]
pub struct Args {
    /// Input files, directories or glob patterns. Exactly two plain file
    /// paths are read as SOURCE DEST.
    pub files: Vec<String>,

    /// Largest acceptable difference from the original (0 = identical).
    #[arg(short, long, env = "TINYIMG_EPS", default_value_t = Tolerance::DEFAULT)]
    pub eps: Tolerance,

    /// Keep sources: write `<name>_tiny.<ext>` next to each input instead of
    /// overwriting it.
    #[arg(short, long)]
    pub keep: bool,

    // --- Search ---
    /// Lowest quality the search may return, exclusive.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub min_quality: u32,

    /// Highest quality the search may return.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub max_quality: u32,

    // --- Sizing ---
    /// Scale images wider than this down to fit.
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Scale images taller than this down to fit.
    #[arg(long)]
    pub max_height: Option<u32>,

    /// Resampling filter used when scaling.
    #[arg(long, value_enum, default_value = "lanczos")]
    pub filter: FilterArg,

    // --- Encoding ---
    /// Keep the decoded color type instead of reducing to grayscale or
    /// dropping an opaque alpha channel.
    #[arg(long)]
    pub preserve_color: bool,

    /// Skip the lossless recompression pass.
    #[arg(long)]
    pub no_lossless: bool,

    /// Lossless pass effort, 0 (fast) to 6 (smallest).
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=6))]
    pub lossless_preset: u8,

    /// Keep the original bytes if re-encoding would not make the file
    /// smaller. A separate destination receives a copy of the original.
    #[arg(long)]
    pub skip_if_larger: bool,

    /// Leave the ICC profile and EXIF out of re-encoded files.
    #[arg(long)]
    pub strip_metadata: bool,

    // --- Batch ---
    /// Number of files processed in parallel.
    #[arg(short = 'j', long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub jobs: u64,

    /// Print a summary table after processing.
    #[arg(long)]
    pub report: bool,

    /// Write a CSV report to this file.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Print the summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Resampling filter.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FilterArg {
    Lanczos,
    CatmullRom,
    Gaussian,
    Triangle,
    Nearest,
}

impl FilterArg {
    pub fn to_resample_filter(self) -> ResampleFilter {
        match self {
            FilterArg::Lanczos => ResampleFilter::Lanczos,
            FilterArg::CatmullRom => ResampleFilter::CatmullRom,
            FilterArg::Gaussian => ResampleFilter::Gaussian,
            FilterArg::Triangle => ResampleFilter::Triangle,
            FilterArg::Nearest => ResampleFilter::Nearest,
        }
    }
}

impl Args {
    /// Library options from the parsed flags.
    pub fn process_options(&self) -> Result<ProcessOptions, ConfigError> {
        let bounds = QualityBounds::new(self.min_quality, self.max_quality)?;

        let mut settings = EncodeSettings::default()
            .with_filter(self.filter.to_resample_filter())
            .with_color(if self.preserve_color {
                ColorMode::Preserve
            } else {
                ColorMode::Optimize
            })
            .with_strip_metadata(self.strip_metadata);
        if self.max_width.is_some() || self.max_height.is_some() {
            settings = settings.with_max_dimensions(
                self.max_width.unwrap_or(0),
                self.max_height.unwrap_or(0),
            );
        }

        Ok(ProcessOptions::default()
            .with_search(SearchConfig::default().with_bounds(bounds))
            .with_settings(settings)
            .with_lossless(!self.no_lossless)
            .with_skip_if_larger(self.skip_if_larger))
    }
}

/// Rewrite slash switches (`/e`, `/k`, `/?`) to their long-option forms.
pub fn translate_legacy<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "/e" => "--eps".to_string(),
            "/k" => "--keep".to_string(),
            "/?" => "--help".to_string(),
            _ => arg,
        })
        .collect()
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,tinyimg={level},tinyimg_cli={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse_from(translate_legacy(std::env::args()));
    init_tracing(args.verbose);

    if args.files.is_empty() {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let options = match args.process_options() {
        Ok(options) => options,
        Err(e) => Args::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    match process::run(&args, options) {
        Ok(None) => {
            print_usage();
            ExitCode::SUCCESS
        }
        Ok(Some(summary)) if summary.error_count() == 0 => ExitCode::SUCCESS,
        Ok(Some(_)) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!(
        "\
tinyimg {}: re-encode images at the lowest quality within a tolerance

USAGE:
    tinyimg [/e eps] [/k] source [dest]
    tinyimg [/e eps] [/k] source1 source2 ...

    /e eps    largest acceptable difference (default {})
    /k        keep sources, write <name>_tiny.<ext> beside each

Without /k, sources are overwritten in place. Two plain file paths are
read as source and destination.

EXAMPLES:
    tinyimg photo.jpg                       Shrink in place
    tinyimg /k /e 0.05 *.jpg                Write photo_tiny.jpg etc.
    tinyimg photos/ -j 8 --report           Whole directory, 8 workers

Run `tinyimg --help` for all options.",
        env!("CARGO_PKG_VERSION"),
        Tolerance::DEFAULT,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        let argv = std::iter::once("tinyimg")
            .chain(args.iter().copied())
            .map(String::from);
        Args::try_parse_from(translate_legacy(argv))
    }

    #[test]
    fn legacy_switches() {
        let args = parse(&["/e", "0.05", "/k", "a.jpg", "b.jpg"]).unwrap();
        assert_eq!(args.eps.get(), 0.05);
        assert!(args.keep);
        assert_eq!(args.files, ["a.jpg", "b.jpg"]);
    }

    #[test]
    fn legacy_help() {
        let err = parse(&["/?"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn malformed_eps_is_a_usage_error() {
        assert!(parse(&["/e", "abc", "a.jpg"]).is_err());
        assert!(parse(&["/e", "-0.1", "a.jpg"]).is_err());
        assert!(parse(&["a.jpg", "/e"]).is_err());
    }

    #[test]
    fn defaults() {
        let args = parse(&["a.jpg"]).unwrap();
        assert!(!args.keep);
        assert_eq!(args.jobs, 1);
        let options = args.process_options().unwrap();
        assert_eq!(options.search.bounds, QualityBounds::default());
        assert!(options.lossless);
        assert_eq!(options.settings, EncodeSettings::default());
    }

    #[test]
    fn quality_bounds_are_validated() {
        let args = parse(&["--min-quality", "50", "--max-quality", "51", "a.jpg"]).unwrap();
        assert_eq!(
            args.process_options().unwrap_err(),
            ConfigError::EmptySearchRange { min: 50, max: 51 }
        );
        assert!(parse(&["--max-quality", "101", "a.jpg"]).is_err());
    }

    #[test]
    fn size_box_and_filter() {
        let args = parse(&["--max-width", "800", "--filter", "catmull-rom", "a.png"]).unwrap();
        let settings = args.process_options().unwrap().settings;
        assert_eq!(settings.max_dimensions, Some((800, 0)));
        assert_eq!(settings.filter, ResampleFilter::CatmullRom);
    }

    #[test]
    fn strip_metadata_flag() {
        assert!(!parse(&["a.jpg"]).unwrap().process_options().unwrap().settings.strip_metadata);
        let args = parse(&["--strip-metadata", "a.jpg"]).unwrap();
        assert!(args.process_options().unwrap().settings.strip_metadata);
    }

    #[test]
    fn no_files_parses() {
        assert!(parse(&[]).unwrap().files.is_empty());
    }
}
