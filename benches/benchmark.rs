use criterion::{Criterion, criterion_group, criterion_main};

use trading_sim::config::EngineConfig;
use trading_sim::engine::{self, CoreState};
use trading_sim::ids::AccountId;
use trading_sim::money::{Price, Qty};
use trading_sim::order::{NewOrderRequest, OrderKind, Side};

fn limit(side: Side, price: i64, qty: u64) -> NewOrderRequest {
    NewOrderRequest {
        side,
        kind: OrderKind::Limit,
        qty: Qty(qty),
        price: Some(Price(price)),
    }
}

fn market(side: Side, qty: u64) -> NewOrderRequest {
    NewOrderRequest {
        side,
        kind: OrderKind::Market,
        qty: Qty(qty),
        price: None,
    }
}

fn setup_state(depth: i64, orders_per_level: u64) -> CoreState {
    let mut state = CoreState::new(EngineConfig::default());
    let maker = AccountId::new();
    // Asks sit strictly above bids so seeding the book never crosses it.
    for level in 1..=depth {
        let ask_price = (depth + level) * 1_000;
        let bid_price = level * 1_000;
        for _ in 0..orders_per_level {
            engine::place_order(&mut state, maker, limit(Side::Sell, ask_price, 1)).unwrap();
            engine::place_order(&mut state, maker, limit(Side::Buy, bid_price, 1)).unwrap();
        }
    }
    state
}

fn bench_match_order(c: &mut Criterion) {
    let depth = 100;
    let orders_per_level = 10;

    c.bench_function("market order through 500 resting levels", |b| {
        b.iter_batched(
            || (setup_state(depth, orders_per_level), AccountId::new()),
            |(mut state, taker)| {
                engine::place_order(
                    &mut state,
                    taker,
                    market(Side::Buy, (depth as u64) * orders_per_level / 2),
                )
                .unwrap();
            },
            criterion::BatchSize::SmallInput,
        );
    });

    c.bench_function("limit crossing order sweeps the full ask side", |b| {
        b.iter_batched(
            || (setup_state(depth, orders_per_level), AccountId::new()),
            |(mut state, taker)| {
                engine::place_order(
                    &mut state,
                    taker,
                    limit(Side::Buy, depth * 2 * 1_000, (depth as u64) * orders_per_level),
                )
                .unwrap();
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_match_order);
criterion_main!(benches);
