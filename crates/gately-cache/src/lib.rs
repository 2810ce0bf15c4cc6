//! Redirect cache tiers and the tiered cache that composes them.
//!
//! - [`MokaTier`] is the process-local tier: bounded by a cost budget,
//!   frequency-aware eviction, may drop anything at any time.
//! - [`RedisTier`] is the shared tier: every entry carries a fixed TTL.
//! - [`TieredCache`] searches its tiers in order and never lets a tier
//!   failure escape; to the caller a broken tier is just a miss.

pub mod moka;
pub mod redis;
pub mod tiered;

pub use self::moka::{EntryCost, LocalTierConfig, MokaTier};
pub use self::redis::{RedisTier, SharedTierConfig};
pub use tiered::TieredCache;
