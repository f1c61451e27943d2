//! Per-user account state: cash/asset balances, the set of
//! currently-open order ids, and the ordered log of trade ids this
//! account participated in.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::ids::{AccountId, OrderId, TradeId};

/// Starting cash balance for a freshly created account, in cents.
pub const STARTING_CASH_CENTS: i64 = 10_000_00;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Cents. May go negative only under `allow_negative_cash`.
    pub cash_cents: i64,
    /// Satoshi-equivalent units. May go negative — shorting is permitted.
    pub asset_units: i64,
    pub open_orders: HashSet<OrderId>,
    pub trade_log: Vec<TradeId>,
}

impl Account {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            cash_cents: STARTING_CASH_CENTS,
            asset_units: 0,
            open_orders: HashSet::new(),
            trade_log: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            cash_cents: self.cash_cents,
            asset_units: self.asset_units,
        }
    }
}

/// The `user_info`/`balance_update` wire payload: just the balances,
/// without the internal open-order/trade-log indices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub cash_cents: i64,
    pub asset_units: i64,
}
