//! # dashsync-types
//!
//! Core types for dashboard synchronization. This crate defines the snapshot
//! model delivered to dashboard observers and the JSON payload returned by the
//! statistics endpoint.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature to decode payloads and
//!   encode snapshots
//! - **Always tagged**: Every [`Snapshot`] carries exactly one [`Freshness`]
//! - **Replace-only**: Snapshots are built once and never mutated after publication
//!
//! ## Features
//!
//! - `std` (default): Standard library support (wall-clock timestamps)
//! - `serde`: JSON serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use dashsync_types::{keys, Freshness, Snapshot};
//!
//! let snapshot = Snapshot::builder()
//!     .timestamp_ms(1_700_000_000_000)
//!     .stat(keys::CHILDREN, 120.0)
//!     .group("center-a", |g| g.children(40).present_today(31))
//!     .build();
//!
//! assert_eq!(snapshot.freshness, Freshness::Live);
//! assert_eq!(snapshot.stat(keys::CHILDREN), 120.0);
//! assert_eq!(snapshot.group_stats.len(), 1);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod failure;
mod millis;
mod payload;
mod snapshot;
mod stats;

pub use failure::*;
pub use millis::*;
pub use payload::*;
pub use snapshot::*;
pub use stats::*;

/// Upper bound applied to every percentage-style metric.
///
/// Percentages computed from partial data tend to overshoot; the dashboard
/// never reports more than this value.
pub const MAX_PERCENTAGE: f64 = 95.0;

/// Maximum number of activity records kept in a snapshot.
pub const MAX_RECENT_EVENTS: usize = 10;
