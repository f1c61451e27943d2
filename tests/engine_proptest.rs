//! Property tests over random place/cancel sequences, checking the
//! invariants that must hold after every single operation rather than
//! just at the end of a scripted scenario.

use proptest::prelude::*;

use trading_sim::account::STARTING_CASH_CENTS;
use trading_sim::config::EngineConfig;
use trading_sim::engine::{self, CoreState};
use trading_sim::ids::{AccountId, OrderId};
use trading_sim::money::{Price, Qty};
use trading_sim::order::{NewOrderRequest, OrderKind, Side};

const ACCOUNT_COUNT: usize = 4;

#[derive(Debug, Clone)]
enum Action {
    Place {
        account: usize,
        side: Side,
        market: bool,
        whole_units: u64,
        price_tick: i64,
    },
    CancelOwn {
        account: usize,
        which: usize,
    },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => (0..ACCOUNT_COUNT, any::<bool>(), any::<bool>(), 1..20u64, 90..110i64).prop_map(
            |(account, buy, market, whole_units, price_tick)| Action::Place {
                account,
                side: if buy { Side::Buy } else { Side::Sell },
                market,
                whole_units,
                price_tick,
            }
        ),
        1 => (0..ACCOUNT_COUNT, 0..8usize)
            .prop_map(|(account, which)| Action::CancelOwn { account, which }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn invariants_hold_after_every_random_operation(
        actions in proptest::collection::vec(action_strategy(), 1..80)
    ) {
        let config = EngineConfig::default();
        let tick = config.tick_size_cents;
        let mut state = CoreState::new(config);
        let accounts: Vec<AccountId> = (0..ACCOUNT_COUNT).map(|_| AccountId::new()).collect();
        let mut owned: Vec<Vec<OrderId>> = vec![Vec::new(); ACCOUNT_COUNT];

        for action in actions {
            match action {
                Action::Place { account, side, market, whole_units, price_tick } => {
                    if whole_units == 0 {
                        continue;
                    }
                    let qty = Qty(whole_units * 1_000_000);
                    let req = if market {
                        NewOrderRequest { side, kind: OrderKind::Market, qty, price: None }
                    } else {
                        NewOrderRequest { side, kind: OrderKind::Limit, qty, price: Some(Price(price_tick * tick)) }
                    };
                    if let Ok(outcome) = engine::place_order(&mut state, accounts[account], req) {
                        if !outcome.status.is_terminal() {
                            owned[account].push(outcome.order_id);
                        }
                    }
                }
                Action::CancelOwn { account, which } => {
                    if owned[account].is_empty() {
                        continue;
                    }
                    let idx = which % owned[account].len();
                    let _ = engine::cancel_order(&mut state, accounts[account], owned[account][idx]);
                }
            }

            prop_assert!(!state.book.is_crossed(&state.store));

            let touched = accounts.iter().filter(|a| state.ledger.get(**a).is_some()).count() as i64;
            let total_cash: i64 = accounts
                .iter()
                .filter_map(|a| state.ledger.get(*a))
                .map(|a| a.cash_cents)
                .sum();
            prop_assert_eq!(total_cash, touched * STARTING_CASH_CENTS);

            let total_assets: i64 = accounts
                .iter()
                .filter_map(|a| state.ledger.get(*a))
                .map(|a| a.asset_units)
                .sum();
            prop_assert_eq!(total_assets, 0);

            for order in state.store.values() {
                if order.kind == OrderKind::Market {
                    prop_assert!(order.status.is_terminal());
                }
            }

            for id in state.book.all_ids() {
                let order = state.store.get(&id).expect("book index points at a live order");
                prop_assert!(!order.status.is_terminal());
                prop_assert_eq!(order.kind, OrderKind::Limit);
            }
        }
    }
}
