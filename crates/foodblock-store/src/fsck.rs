//! Integrity check over a JSON-lines block file.

use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};

use serde::Serialize;
use tracing::warn;

use foodblock_core::Block;
use foodblock_types::BlockHash;

use crate::error::StoreResult;

/// A problem found by [`check_lines`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FsckIssue {
    /// The line is not a well-formed block.
    Malformed { line: usize, reason: String },
    /// The stored hash does not match the content.
    HashMismatch {
        line: usize,
        stored: BlockHash,
        computed: BlockHash,
    },
    /// The content has no canonical form.
    Uncanonical { line: usize, reason: String },
    /// A ref names a block hash that is not in the file.
    Dangling {
        block: BlockHash,
        role: String,
        target: BlockHash,
    },
}

/// Result of checking a block file.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FsckReport {
    /// Non-blank lines read.
    pub checked: usize,
    /// Lines that decoded and hashed correctly.
    pub valid: usize,
    pub issues: Vec<FsckIssue>,
}

impl FsckReport {
    /// Returns `true` if no integrity problem was found.
    ///
    /// Dangling refs do not count: a file may legitimately be a partial
    /// view of a larger graph.
    pub fn is_clean(&self) -> bool {
        self.issues
            .iter()
            .all(|issue| matches!(issue, FsckIssue::Dangling { .. }))
    }
}

/// Check every line of a JSON-lines block file without stopping at the
/// first failure.
pub fn check_lines(reader: impl Read) -> StoreResult<FsckReport> {
    let mut report = FsckReport::default();
    let mut good: Vec<Block> = Vec::new();

    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        report.checked += 1;

        let block: Block = match serde_json::from_str(line.trim()) {
            Ok(block) => block,
            Err(e) => {
                warn!(line = line_no, error = %e, "malformed block line");
                report.issues.push(FsckIssue::Malformed {
                    line: line_no,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        match block.computed_hash() {
            Ok(computed) if computed == *block.hash() => {
                report.valid += 1;
                good.push(block);
            }
            Ok(computed) => {
                warn!(line = line_no, stored = %block.hash(), %computed, "hash mismatch");
                report.issues.push(FsckIssue::HashMismatch {
                    line: line_no,
                    stored: *block.hash(),
                    computed,
                });
            }
            Err(e) => report.issues.push(FsckIssue::Uncanonical {
                line: line_no,
                reason: e.to_string(),
            }),
        }
    }

    let known: HashSet<BlockHash> = good.iter().map(|b| *b.hash()).collect();
    for block in &good {
        for (role, target) in block.refs().iter() {
            for raw in target.hashes() {
                // Refs that are not hashes (principal names, external ids) are not checked.
                let Ok(target) = BlockHash::from_hex(raw) else {
                    continue;
                };
                if !known.contains(&target) {
                    report.issues.push(FsckIssue::Dangling {
                        block: *block.hash(),
                        role: role.clone(),
                        target,
                    });
                }
            }
        }
    }

    Ok(report)
}
