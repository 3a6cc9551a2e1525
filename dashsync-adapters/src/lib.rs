//! # dashsync-adapters
//!
//! Fetchers that pull dashboard statistics from remote endpoints and decode
//! them into [`StatsPayload`].
//!
//! ## Supported Sources
//!
//! - **HTTP** (`http` feature, default) - Bearer-authenticated `GET` against the
//!   statistics endpoint of the welfare-program API
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dashsync_adapters::http::HttpStatsSource;
//! use dashsync_adapters::token::TokenFn;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = HttpStatsSource::builder()
//!         .base_url("https://api.example.org")
//!         .token(TokenFn(|| std::env::var("SESSION_TOKEN").ok()))
//!         .build()?;
//!
//!     match source.fetch().await {
//!         Ok(payload) => println!("{} counters", payload.stats.len()),
//!         Err(e) if e.is_auth() => println!("please sign in again"),
//!         Err(e) => println!("offline: {}", e),
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod token;

#[cfg(feature = "http")]
pub mod http;

pub use error::FetchError;
pub use token::{NoToken, StaticToken, TokenFn, TokenProvider};

// Re-export types for convenience
pub use dashsync_types::{FailureKind, FetchFailure, StatsPayload};
