//! `compare` command implementation.

use anyhow::{Context, Result};
use dispatcher::{compare_files, FileComparison};
use serde::Serialize;
use tracing::info;

use crate::cli::CompareArgs;
use crate::error::CliError;

/// Comparison result for JSON output
#[derive(Serialize)]
struct CompareResult {
    left: String,
    right: String,
    identical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
    left_len: u64,
    right_len: u64,
}

impl CompareResult {
    fn new(args: &CompareArgs, comparison: FileComparison) -> Self {
        let (offset, left_len, right_len) = match comparison {
            FileComparison::Identical { len } => (None, len, len),
            FileComparison::Differ {
                offset,
                left_len,
                right_len,
            } => (Some(offset), left_len, right_len),
        };
        Self {
            left: args.left.display().to_string(),
            right: args.right.display().to_string(),
            identical: comparison.is_identical(),
            offset,
            left_len,
            right_len,
        }
    }
}

/// Execute the `compare` command
///
/// Fails with `FilesDiffer` when the files are not byte-for-byte equal.
pub fn run_compare(args: &CompareArgs) -> Result<()> {
    info!(left = %args.left.display(), right = %args.right.display(), "Comparing files");

    let comparison = compare_files(&args.left, &args.right)?;
    let result = CompareResult::new(args, comparison);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize comparison result")?;
        println!("{}", json);
    } else if result.identical {
        println!("✓ Files are identical ({} bytes)", result.left_len);
    } else {
        println!(
            "✗ Files differ at byte {} ({} vs {} bytes)",
            result.offset.unwrap_or_default(),
            result.left_len,
            result.right_len
        );
    }

    match result.offset {
        Some(offset) => Err(CliError::files_differ(&args.left, &args.right, offset).into()),
        None => Ok(()),
    }
}
