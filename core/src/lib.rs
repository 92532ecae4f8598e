//! affiliate-core: organization hierarchy resolution and tiered reward
//! computation for a real-estate crowdfunding affiliate program.
//!
//! The crate ingests flat (user, upline-path, level) rows and an
//! append-only investment ledger, reconstructs the multi-level
//! organization as an arena forest, and computes the cascading reward
//! each ancestor is owed per investment from per-fund rate tables.
//!
//! RULES:
//!   - Only `store` talks to the database.
//!   - Only `upline` parses the raw upline string.
//!   - A built forest is immutable; rebuilds produce a new one.
//!   - Data-quality problems are counted in diagnostics, never fatal.
//!   - Paged fetches retry with bounded backoff and fail loudly when
//!     exhausted — partial data never masquerades as complete.

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod model;
pub mod navigate;
pub mod normalize;
pub mod reward;
pub mod store;
pub mod tree;
pub mod types;
pub mod upline;
