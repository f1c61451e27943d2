//! Startup defaults, gathered into one config struct so the
//! CLI, the facade constructor, and tests all agree on them.

use std::time::Duration;

use crate::money::{Price, TICK_SIZE_CENTS};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub tick_size_cents: i64,
    /// Top-N levels returned by book snapshots.
    pub book_depth: usize,
    /// Whether a buy may drive cash negative without pre-reserving
    /// funds.
    pub allow_negative_cash: bool,
    /// Bounded per-subscriber event queue capacity.
    pub subscriber_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_size_cents: TICK_SIZE_CENTS,
            book_depth: 10,
            allow_negative_cash: true,
            subscriber_queue_capacity: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketSimConfig {
    pub initial_price: Price,
    pub interval: Duration,
    /// Standard deviation of the per-tick random walk, in cents.
    pub drift_sigma_cents: f64,
    pub tick_size_cents: i64,
}

impl Default for MarketSimConfig {
    fn default() -> Self {
        Self {
            initial_price: Price::from_dollars(100_000),
            interval: Duration::from_secs(2),
            drift_sigma_cents: 5_000.0,
            tick_size_cents: TICK_SIZE_CENTS,
        }
    }
}
