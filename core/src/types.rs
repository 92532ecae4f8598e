//! Shared primitive types used across the whole engine.

/// Externally assigned, stable affiliate identifier (e.g. "A1024").
pub type UserId = String;

/// Fund number as carried by the investment ledger.
pub type FundNo = i64;

/// Reward tier. Tier 1 is the investor's direct sponsor.
pub type Tier = u32;

/// Index of a node inside an [`crate::tree::OrgForest`] arena.
pub type NodeId = usize;
