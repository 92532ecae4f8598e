//! Upline path parser — normalizes the raw `upline` string to a
//! declared immediate parent.
//!
//! Two encodings coexist in the source data, without a discriminator:
//!   - full path: "A-B-C" on node C means root A, parent B
//!   - parent only: "A" on node C means parent A (legacy imports)
//! The only tell is whether the last token equals the node's own id.
//! That heuristic can misread a parent-only string that happens to
//! contain separators, so such strings are flagged as ambiguous and
//! surfaced in the build diagnostics rather than guessed at further.
//!
//! RULE: the parser never fails and never validates existence — a parent
//! id pointing at nobody is the tree builder's problem.

use crate::types::UserId;

const SEPARATOR: char = '-';

/// Outcome of parsing one `upline` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedUpline {
    /// Empty/whitespace/missing upline: the node is a forest root.
    Root,
    Chain {
        /// Ancestors above the immediate parent, root first. Empty for
        /// parent-only encodings and two-token full paths.
        ancestors: Vec<UserId>,
        /// Declared immediate parent.
        parent: UserId,
        encoding: UplineEncoding,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplineEncoding {
    /// Last token equals the node's own id; path runs root-to-self.
    FullPath,
    /// Single-token legacy encoding: the token is the parent.
    ParentOnly,
    /// Multi-token string that does not end in the node's own id.
    /// Read as parent-only (first token is the parent) but counted so
    /// operators can audit the heuristic.
    ParentOnlyAmbiguous,
}

impl ParsedUpline {
    pub fn parent(&self) -> Option<&UserId> {
        match self {
            ParsedUpline::Root => None,
            ParsedUpline::Chain { parent, .. } => Some(parent),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            ParsedUpline::Chain {
                encoding: UplineEncoding::ParentOnlyAmbiguous,
                ..
            }
        )
    }

    /// Full ancestor chain, root first, immediate parent last.
    pub fn full_chain(&self) -> Vec<UserId> {
        match self {
            ParsedUpline::Root => Vec::new(),
            ParsedUpline::Chain {
                ancestors, parent, ..
            } => {
                let mut chain = ancestors.clone();
                chain.push(parent.clone());
                chain
            }
        }
    }
}

/// Parse one raw `upline` field for the node `own_id`.
///
/// Tokens are trimmed; empty tokens from doubled or trailing separators
/// are dropped. A token list that collapses to nothing (e.g. `"--"`) is
/// treated as a root, same as an empty string.
pub fn parse_upline(own_id: &str, raw: Option<&str>) -> ParsedUpline {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => return ParsedUpline::Root,
    };

    let parts: Vec<&str> = raw
        .split(SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [] => ParsedUpline::Root,
        // Sole token is the node itself: degenerate full path, no parent.
        [only] if *only == own_id => ParsedUpline::Root,
        [only] => ParsedUpline::Chain {
            ancestors: Vec::new(),
            parent: (*only).to_string(),
            encoding: UplineEncoding::ParentOnly,
        },
        [head @ .., last] if *last == own_id => {
            // Full path root-to-self: parent is the second-to-last token.
            let (ancestors, parent) = head.split_at(head.len() - 1);
            ParsedUpline::Chain {
                ancestors: ancestors.iter().map(|s| s.to_string()).collect(),
                parent: parent[0].to_string(),
                encoding: UplineEncoding::FullPath,
            }
        }
        [first, ..] => ParsedUpline::Chain {
            ancestors: Vec::new(),
            parent: (*first).to_string(),
            encoding: UplineEncoding::ParentOnlyAmbiguous,
        },
    }
}
