//! Service layer.
//!
//! - Results client (`UsaCyclingClient`)
//! - Race enumeration tiers (`TierOutcome`)

mod client;
mod strategies;

pub use client::UsaCyclingClient;
pub use strategies::TierOutcome;
