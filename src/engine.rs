//! Matching engine: drives the order lifecycle and applies trades
//! atomically to the book and the ledger.
//!
//! Every public function here takes `&mut CoreState` and is meant to
//! run inside the single critical section the trading session facade
//! holds — a whole book+ledger+index mutation for one user action must
//! be linearizable, so nothing in this module does I/O or awaits.

use std::time::SystemTime;

use crate::account;
use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::ids::{AccountId, OrderId, SequenceGenerator, TradeId};
use crate::ledger::AccountLedger;
use crate::money::notional_cents;
use crate::order::{AmendRequest, NewOrderRequest, Order, OrderKind, OrderStatus, Side};
use crate::orderbook::{OrderBook, OrderStore};
use crate::trade::Trade;

/// Everything the matching engine mutates under the facade's single
/// lock: the order arena, the two-sided book, the account ledger, the
/// append-only trade log, and the global sequence counter.
pub struct CoreState {
    pub store: OrderStore,
    pub book: OrderBook,
    pub ledger: AccountLedger,
    pub trades: Vec<Trade>,
    pub sequence: SequenceGenerator,
    pub config: EngineConfig,
}

impl CoreState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: OrderStore::new(),
            book: OrderBook::new(),
            ledger: AccountLedger::new(),
            trades: Vec::new(),
            sequence: SequenceGenerator::new(),
            config,
        }
    }
}

/// Result of a `place_order`/`amend_order` matching pass: the order's
/// id and resulting status, plus every trade the pass produced.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub trades: Vec<Trade>,
}

fn validate_new_order(config: &EngineConfig, req: &NewOrderRequest) -> EngineResult<()> {
    if !req.qty.is_positive() {
        return Err(EngineError::Validation("quantity must be > 0".into()));
    }
    match req.kind {
        OrderKind::Limit => {
            let price = req
                .price
                .ok_or_else(|| EngineError::Validation("limit order requires a price".into()))?;
            if !price.is_positive() {
                return Err(EngineError::Validation("price must be > 0".into()));
            }
            if !price.is_tick_aligned(config.tick_size_cents) {
                return Err(EngineError::Validation(format!(
                    "price must be a multiple of the {}-cent tick",
                    config.tick_size_cents
                )));
            }
        }
        OrderKind::Market => {
            if req.price.is_some() {
                return Err(EngineError::Validation(
                    "market order must not specify a price".into(),
                ));
            }
        }
    }
    Ok(())
}

/// Only enforced when `allow_negative_cash` is false. Market orders
/// have no knowable worst-case cost before matching, so only limit
/// buys are pre-checked; that asymmetry is recorded in DESIGN.md.
fn check_funds(state: &CoreState, owner: AccountId, req: &NewOrderRequest) -> EngineResult<()> {
    if state.config.allow_negative_cash {
        return Ok(());
    }
    if req.side == Side::Buy {
        if let (OrderKind::Limit, Some(price)) = (req.kind, req.price) {
            let cost = notional_cents(price, req.qty);
            let cash = state
                .ledger
                .get(owner)
                .map(|a| a.cash_cents)
                .unwrap_or(account::STARTING_CASH_CENTS);
            if cash < cost {
                return Err(EngineError::Validation("insufficient cash".into()));
            }
        }
    }
    Ok(())
}

fn apply_trade_to_ledger(ledger: &mut AccountLedger, trade: &Trade) {
    let cost = notional_cents(trade.price, trade.qty);
    let delta_units = trade.qty.0 as i64;
    if let Some(buyer) = ledger.get_mut(trade.buyer) {
        buyer.cash_cents -= cost;
        buyer.asset_units += delta_units;
        buyer.trade_log.push(trade.id);
    }
    if let Some(seller) = ledger.get_mut(trade.seller) {
        seller.cash_cents += cost;
        seller.asset_units -= delta_units;
        seller.trade_log.push(trade.id);
    }
}

/// The matching loop: walks the opposite side's
/// best-priority resting orders, crossing while the price condition
/// holds (always true for a market taker), filling `min(remaining)`
/// at the maker's price, and applying each trade atomically to the
/// ledger before moving to the next resting order.
fn match_new_order(state: &mut CoreState, incoming: &mut Order) -> Vec<Trade> {
    let opposite = incoming.side.opposite();
    let mut trades = Vec::new();

    while incoming.remaining_qty.is_positive() {
        let Some(maker_id) = state.book.peek_best(opposite) else {
            break;
        };
        let maker_price = state
            .store
            .get(&maker_id)
            .and_then(|o| o.price)
            .expect("resting order must be a priced limit order");

        let crosses = match incoming.kind {
            OrderKind::Market => true,
            OrderKind::Limit => {
                let incoming_price = incoming.price.expect("limit order must carry a price");
                match incoming.side {
                    Side::Buy => maker_price <= incoming_price,
                    Side::Sell => maker_price >= incoming_price,
                }
            }
        };
        if !crosses {
            break;
        }

        let maker = state.store.get_mut(&maker_id).expect("book points at missing order");
        let qty = incoming.fillable_against(maker);
        maker.apply_fill(qty);
        let maker_status = maker.status;
        let maker_owner = maker.owner;
        incoming.apply_fill(qty);

        let (buy_order_id, sell_order_id, buyer, seller) = match incoming.side {
            Side::Buy => (incoming.id, maker_id, incoming.owner, maker_owner),
            Side::Sell => (maker_id, incoming.id, maker_owner, incoming.owner),
        };
        let trade = Trade {
            id: TradeId::new(),
            buy_order_id,
            sell_order_id,
            buyer,
            seller,
            price: maker_price,
            qty,
            timestamp: SystemTime::now(),
        };

        apply_trade_to_ledger(&mut state.ledger, &trade);
        state.trades.push(trade.clone());
        trades.push(trade);

        if maker_status.is_terminal() {
            state.book.remove(maker_id);
            if let Some(acc) = state.ledger.get_mut(maker_owner) {
                acc.open_orders.remove(&maker_id);
            }
        }
    }

    trades
}

/// Accepts a new order request: assigns id/sequence, validates, runs
/// it through the matching loop, then applies the post-pass lifecycle
/// rule (filled / resting-partial-or-pending / cancelled for residual
/// market orders).
pub fn place_order(
    state: &mut CoreState,
    owner: AccountId,
    req: NewOrderRequest,
) -> EngineResult<MatchOutcome> {
    validate_new_order(&state.config, &req)?;
    state.ledger.get_or_create(owner);
    check_funds(state, owner, &req)?;

    let sequence = state.sequence.next();
    let mut order = Order {
        id: OrderId::new(),
        owner,
        side: req.side,
        kind: req.kind,
        original_qty: req.qty,
        remaining_qty: req.qty,
        price: req.price,
        status: OrderStatus::Pending,
        created_at: SystemTime::now(),
        sequence,
    };

    let trades = match_new_order(state, &mut order);

    if order.remaining_qty.is_zero() {
        order.status = OrderStatus::Filled;
    } else if order.kind == OrderKind::Limit {
        if !trades.is_empty() {
            order.status = OrderStatus::Partial;
        }
        state.book.insert(&order);
        if let Some(acc) = state.ledger.get_mut(owner) {
            acc.open_orders.insert(order.id);
        }
    } else {
        // Market order with residual quantity: no liquidity left.
        order.status = OrderStatus::Cancelled;
    }

    let outcome = MatchOutcome {
        order_id: order.id,
        status: order.status,
        trades,
    };
    state.store.insert(order.id, order);
    Ok(outcome)
}

/// Cancels a resting order owned by `owner`. Terminal orders and
/// orders owned by someone else are rejected.
pub fn cancel_order(state: &mut CoreState, owner: AccountId, order_id: OrderId) -> EngineResult<Order> {
    let existing = state.store.get(&order_id).ok_or(EngineError::NotFound)?;
    if existing.owner != owner {
        return Err(EngineError::NotOwner);
    }
    if existing.status.is_terminal() {
        return Err(EngineError::NotCancellable);
    }

    state.book.remove(order_id);
    let order = state.store.get_mut(&order_id).expect("checked above");
    order.cancel();
    let cancelled = order.clone();

    if let Some(acc) = state.ledger.get_mut(owner) {
        acc.open_orders.remove(&order_id);
    }
    Ok(cancelled)
}

/// Amend = cancel-then-replace: the original id becomes terminal
/// `Cancelled` and a fresh id/sequence is accepted, which may
/// immediately cross the book.
pub fn amend_order(
    state: &mut CoreState,
    owner: AccountId,
    order_id: OrderId,
    req: AmendRequest,
) -> EngineResult<MatchOutcome> {
    let existing = state.store.get(&order_id).ok_or(EngineError::NotFound)?.clone();
    if existing.owner != owner {
        return Err(EngineError::NotOwner);
    }
    if existing.kind != OrderKind::Limit || existing.status.is_terminal() {
        return Err(EngineError::NotAmendable);
    }

    let new_qty = req.qty.unwrap_or(existing.remaining_qty);
    if !new_qty.is_positive() {
        return Err(EngineError::Validation("quantity must be > 0".into()));
    }
    let new_price = req.price.or(existing.price);
    let replacement = NewOrderRequest {
        side: existing.side,
        kind: OrderKind::Limit,
        qty: new_qty,
        price: new_price,
    };
    validate_new_order(&state.config, &replacement)?;

    cancel_order(state, owner, order_id)?;
    place_order(state, owner, replacement)
}

/// Accounts participating as maker or taker across a set of trades,
/// together with `extra` (typically the taker), for event-emission
/// fanout.
pub fn affected_accounts(trades: &[Trade], extra: AccountId) -> Vec<AccountId> {
    let mut accounts = vec![extra];
    for trade in trades {
        if !accounts.contains(&trade.buyer) {
            accounts.push(trade.buyer);
        }
        if !accounts.contains(&trade.seller) {
            accounts.push(trade.seller);
        }
    }
    accounts
}
