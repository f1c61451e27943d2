//! Trading session facade: the single entry point every caller
//! (the HTTP/WS transport, tests, the market simulator) goes through.
//! Owns the one lock that guards book+ledger+index mutation, and is
//! responsible for the "acquire lock, mutate, release, then emit"
//! rule — no event is ever published while the lock is held.

use std::sync::{Arc, Mutex};

use crate::account::AccountSnapshot;
use crate::bus::{Event, EventBus, OrdersSnapshot, Subscriber};
use crate::config::EngineConfig;
use crate::engine::{self, CoreState, MatchOutcome};
use crate::errors::{EngineError, EngineResult};
use crate::ids::{AccountId, OrderId};
use crate::order::{AmendRequest, NewOrderRequest, Order};
use crate::orderbook::BookSnapshot;
use crate::session::{SessionId, SessionRegistry};
use crate::trade::Trade;

/// Per-account balance/order snapshots plus the book snapshot a
/// mutation produced, captured while the lock is held and published
/// only after it's dropped.
struct MutationEffects {
    balances: Vec<(AccountId, AccountSnapshot)>,
    orders: Vec<(AccountId, OrdersSnapshot)>,
    book: BookSnapshot,
}

fn gather_effects(state: &CoreState, accounts: &[AccountId]) -> MutationEffects {
    let balances = accounts
        .iter()
        .filter_map(|&a| state.ledger.get(a).map(|acc| (a, acc.snapshot())))
        .collect();
    let orders = accounts
        .iter()
        .map(|&a| {
            let open = state.ledger.open_order_ids(a);
            let orders = open.iter().filter_map(|id| state.store.get(id).cloned()).collect();
            (a, OrdersSnapshot { account: a, orders })
        })
        .collect();
    let book = state.book.snapshot_struct(&state.store, state.config.book_depth);
    MutationEffects { balances, orders, book }
}

pub struct TradingSessionFacade {
    state: Mutex<CoreState>,
    bus: EventBus,
    sessions: Mutex<SessionRegistry>,
}

impl TradingSessionFacade {
    pub fn new(config: EngineConfig) -> Self {
        let capacity = config.subscriber_queue_capacity;
        Self {
            state: Mutex::new(CoreState::new(config)),
            bus: EventBus::new(capacity),
            sessions: Mutex::new(SessionRegistry::new()),
        }
    }

    fn publish_effects(&self, effects: MutationEffects, trades: &[Trade]) {
        for trade in trades {
            self.bus.publish_to_account(trade.buyer, Event::Fill(trade.clone()));
            self.bus.publish_to_account(trade.seller, Event::Fill(trade.clone()));
        }
        for (account, snapshot) in effects.balances {
            self.bus.publish_to_account(account, Event::BalanceUpdate(snapshot));
        }
        for (account, snapshot) in effects.orders {
            self.bus.publish_to_account(account, Event::OrdersUpdate(snapshot));
        }
        self.bus.broadcast(Event::OrderBookUpdate(effects.book));
    }

    /// Resolves a bearer session id to an account, minting a fresh
    /// session and account on first contact. Also seeds the new
    /// account's starting balances so `get_user` works immediately.
    pub fn resolve_session(&self, session_id: Option<&str>) -> (SessionId, AccountId, bool) {
        let (session, account, is_new) = self.sessions.lock().unwrap().resolve(session_id);
        self.state.lock().unwrap().ledger.get_or_create(account);
        (session, account, is_new)
    }

    pub fn place_order(&self, account: AccountId, req: NewOrderRequest) -> EngineResult<MatchOutcome> {
        let (outcome, effects) = {
            let mut state = self.state.lock().unwrap();
            let outcome = engine::place_order(&mut state, account, req)?;
            let accounts = engine::affected_accounts(&outcome.trades, account);
            let effects = gather_effects(&state, &accounts);
            (outcome, effects)
        };
        self.publish_effects(effects, &outcome.trades);
        Ok(outcome)
    }

    pub fn cancel_order(&self, account: AccountId, order_id: OrderId) -> EngineResult<Order> {
        let (cancelled, effects) = {
            let mut state = self.state.lock().unwrap();
            let cancelled = engine::cancel_order(&mut state, account, order_id)?;
            let effects = gather_effects(&state, &[account]);
            (cancelled, effects)
        };
        self.publish_effects(effects, &[]);
        Ok(cancelled)
    }

    pub fn amend_order(
        &self,
        account: AccountId,
        order_id: OrderId,
        req: AmendRequest,
    ) -> EngineResult<MatchOutcome> {
        let (outcome, effects) = {
            let mut state = self.state.lock().unwrap();
            let outcome = engine::amend_order(&mut state, account, order_id, req)?;
            let accounts = engine::affected_accounts(&outcome.trades, account);
            let effects = gather_effects(&state, &accounts);
            (outcome, effects)
        };
        self.publish_effects(effects, &outcome.trades);
        Ok(outcome)
    }

    pub fn get_user(&self, account: AccountId) -> EngineResult<AccountSnapshot> {
        let state = self.state.lock().unwrap();
        state
            .ledger
            .get(account)
            .map(|a| a.snapshot())
            .ok_or(EngineError::NotFound)
    }

    pub fn get_orders(&self, account: AccountId) -> Vec<Order> {
        let state = self.state.lock().unwrap();
        state
            .ledger
            .open_order_ids(account)
            .iter()
            .filter_map(|id| state.store.get(id).cloned())
            .collect()
    }

    pub fn get_trades(&self, account: AccountId) -> Vec<Trade> {
        let state = self.state.lock().unwrap();
        state
            .ledger
            .trades_for(account, &state.trades)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get_book(&self) -> BookSnapshot {
        let state = self.state.lock().unwrap();
        state.book.snapshot_struct(&state.store, state.config.book_depth)
    }

    pub fn subscribe(&self, account: AccountId) -> Arc<Subscriber> {
        self.bus.subscribe(account)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}
