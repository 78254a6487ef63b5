//! Input → output path planning.

use std::path::{Path, PathBuf};

use crate::batch;

/// One file to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Turn the positional arguments into jobs.
///
/// Exactly two plain paths (no glob, not a directory) are SOURCE DEST.
/// Anything else is expanded into inputs, each written to `<stem>_tiny.<ext>`
/// when `keep` is set and back over itself otherwise.
pub fn plan(files: &[String], keep: bool) -> anyhow::Result<Vec<Job>> {
    if let [source, dest] = files {
        if is_plain_file_arg(source) && is_plain_file_arg(dest) {
            return Ok(vec![Job {
                input: PathBuf::from(source),
                output: PathBuf::from(dest),
            }]);
        }
    }

    let inputs = batch::expand_inputs(files)?;
    Ok(inputs
        .into_iter()
        .map(|input| {
            let output = if keep { tiny_path(&input) } else { input.clone() };
            Job { input, output }
        })
        .collect())
}

fn is_plain_file_arg(arg: &str) -> bool {
    !batch::is_glob(arg) && !Path::new(arg).is_dir()
}

/// `dir/photo.jpg` → `dir/photo_tiny.jpg`.
pub fn tiny_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}_tiny.{}", ext.to_string_lossy()),
        None => format!("{stem}_tiny"),
    };
    input.with_file_name(name)
}
