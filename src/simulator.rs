//! Market simulator: a background task that publishes a synthetic
//! `market_data` quote on a fixed interval. It only ever reads the
//! current book snapshot — it never places real orders or trades.

use std::sync::Arc;

use rand_distr::{Distribution, Normal};
use tokio_util::sync::CancellationToken;

use crate::bus::{Event, MarketDataSnapshot};
use crate::config::MarketSimConfig;
use crate::money::Price;
use crate::session_facade::TradingSessionFacade;

const SYMBOL: &str = "BTC-USD";

fn snap_to_tick(price: Price, tick_cents: i64) -> Price {
    if tick_cents <= 0 {
        return price;
    }
    let ticks = (price.0 as f64 / tick_cents as f64).round() as i64;
    Price(ticks * tick_cents)
}

/// Drives the random walk until `shutdown` fires. Intended to be
/// spawned as its own task alongside the HTTP/WS server.
pub async fn run(facade: Arc<TradingSessionFacade>, config: MarketSimConfig, shutdown: CancellationToken) {
    let normal = Normal::new(0.0, config.drift_sigma_cents.max(0.0))
        .expect("drift_sigma_cents must be finite and non-negative");
    let mut rng = rand::rng();
    let mut price = snap_to_tick(config.initial_price, config.tick_size_cents);
    let mut ticker = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("market simulator shutting down");
                break;
            }
            _ = ticker.tick() => {
                let drift = normal.sample(&mut rng).round() as i64;
                let mut next = Price(price.0 + drift);
                next = snap_to_tick(next, config.tick_size_cents);
                if !next.is_positive() {
                    next = Price(config.tick_size_cents.max(1));
                }
                price = next;

                let book = facade.get_book();
                facade.bus().broadcast(Event::MarketData(MarketDataSnapshot {
                    symbol: SYMBOL,
                    price,
                    book,
                }));
                tracing::trace!(%price, "market simulator tick");
            }
        }
    }
}
