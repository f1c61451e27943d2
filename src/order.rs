//! Order data type and lifecycle state machine.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::ids::{AccountId, OrderId};
use crate::money::{Price, Qty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Partial,
    Filled,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

/// A resting or already-terminal order.
///
/// Invariant: `remaining_qty = original_qty - sum(fills.qty)`. A
/// market order (`kind == Market`) never rests in the book: it is
/// always either `Filled` or `Cancelled` once matching finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: AccountId,
    pub side: Side,
    pub kind: OrderKind,
    pub original_qty: Qty,
    pub remaining_qty: Qty,
    /// Present iff `kind == Limit`.
    pub price: Option<Price>,
    pub status: OrderStatus,
    pub created_at: SystemTime,
    pub sequence: u64,
}

impl Order {
    pub fn rests_in_book(&self) -> bool {
        self.kind == OrderKind::Limit && matches!(self.status, OrderStatus::Pending | OrderStatus::Partial)
    }

    /// `min(self.remaining_qty, other.remaining_qty)` — the only place
    /// fill quantity is ever computed.
    pub fn fillable_against(&self, other: &Order) -> Qty {
        self.remaining_qty.min(other.remaining_qty)
    }

    /// Applies a fill of `qty` to this order, transitioning its status.
    /// Returns the new status. Panics if `qty` exceeds `remaining_qty`
    /// — that would mean the matching loop computed an invalid fill.
    pub fn apply_fill(&mut self, qty: Qty) {
        self.remaining_qty = self
            .remaining_qty
            .checked_sub(qty)
            .expect("fill quantity exceeds remaining_qty");
        self.status = if self.remaining_qty.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::Partial
        };
    }

    pub fn cancel(&mut self) {
        debug_assert!(!self.status.is_terminal(), "cancelling a terminal order");
        self.status = OrderStatus::Cancelled;
    }
}

/// Inbound request to place a new order, prior to id/sequence
/// assignment and validation.
#[derive(Debug, Clone)]
pub struct NewOrderRequest {
    pub side: Side,
    pub kind: OrderKind,
    pub qty: Qty,
    pub price: Option<Price>,
}

/// Inbound request to amend a resting limit order. `None` fields leave
/// that attribute unchanged.
#[derive(Debug, Clone, Default)]
pub struct AmendRequest {
    pub price: Option<Price>,
    pub qty: Option<Qty>,
}
