//! Byte-for-byte file comparison, used to check sink output against inputs

use std::fs;
use std::path::Path;

use crate::error::DispatcherError;

/// Result of comparing two files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileComparison {
    Identical { len: u64 },
    /// First offset at which the files differ; equals the shorter length
    /// when one file is a prefix of the other
    Differ { offset: u64, left_len: u64, right_len: u64 },
}

impl FileComparison {
    pub fn is_identical(&self) -> bool {
        matches!(self, Self::Identical { .. })
    }
}

pub fn compare_bytes(left: &[u8], right: &[u8]) -> FileComparison {
    let offset = left
        .iter()
        .zip(right)
        .position(|(a, b)| a != b)
        .unwrap_or(left.len().min(right.len()));

    if offset == left.len() && left.len() == right.len() {
        FileComparison::Identical {
            len: left.len() as u64,
        }
    } else {
        FileComparison::Differ {
            offset: offset as u64,
            left_len: left.len() as u64,
            right_len: right.len() as u64,
        }
    }
}

/// Compare two files byte for byte
pub fn compare_files(
    left: impl AsRef<Path>,
    right: impl AsRef<Path>,
) -> Result<FileComparison, DispatcherError> {
    let left = fs::read(left)?;
    let right = fs::read(right)?;
    Ok(compare_bytes(&left, &right))
}
