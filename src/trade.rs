//! A [`Trade`] is a single crossing between a taker and a maker. The
//! maker's limit price is always the execution price. Trades are
//! append-only and never mutated once recorded.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::ids::{AccountId, OrderId, TradeId};
use crate::money::{Price, Qty};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub price: Price,
    pub qty: Qty,
    pub timestamp: SystemTime,
}
