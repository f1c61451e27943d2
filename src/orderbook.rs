//! Order book: two price-indexed priority ladders.
//!
//! Bids and asks are each a [`BTreeMap`] from price to a FIFO queue of
//! [`OrderId`]s resting at that price. The book never owns an [`Order`]
//! value directly — it only ever holds ids, and a side index
//! (`OrderId -> (Side, Price)`) gives O(queue-length-at-one-level)
//! removal instead of scanning every price level. The arena of actual
//! `Order` values lives in the [`OrderStore`] the caller supplies to
//! every read.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::ids::OrderId;
use crate::money::{Price, Qty};
use crate::order::{Order, Side};

/// The single owned arena of order values. The book and the matching
/// engine both address orders through this map rather than embedding
/// them in book positions.
pub type OrderStore = HashMap<OrderId, Order>;

/// Wire-shape snapshot of the top-N aggregated levels, best-first on
/// each side, used for both the initial `order_book` frame and every
/// `order_book_update` that follows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub bids: Vec<(Price, Qty)>,
    pub asks: Vec<(Price, Qty)>,
}

#[derive(Debug, Default)]
pub struct OrderBook {
    /// Buy orders, keyed by price ascending; best bid is the last entry.
    bids: BTreeMap<Price, VecDeque<OrderId>>,
    /// Sell orders, keyed by price ascending; best ask is the first entry.
    asks: BTreeMap<Price, VecDeque<OrderId>>,
    /// Where a resting order lives, for O(1) side/level lookup on cancel.
    index: HashMap<OrderId, (Side, Price)>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn side_map(&self, side: Side) -> &BTreeMap<Price, VecDeque<OrderId>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<Price, VecDeque<OrderId>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Best price level on `side` together with its aggregated resting
    /// quantity, or `None` if that side is empty.
    pub fn best(&self, side: Side, store: &OrderStore) -> Option<(Price, Qty)> {
        let level = match side {
            Side::Buy => self.bids.iter().next_back(),
            Side::Sell => self.asks.iter().next(),
        }?;
        let (&price, ids) = level;
        Some((price, aggregate(ids, store)))
    }

    pub fn best_bid(&self, store: &OrderStore) -> Option<(Price, Qty)> {
        self.best(Side::Buy, store)
    }

    pub fn best_ask(&self, store: &OrderStore) -> Option<(Price, Qty)> {
        self.best(Side::Sell, store)
    }

    /// Places a resting limit order. `order.price` must be `Some`; the
    /// order is appended to the tail of its price level's FIFO queue.
    pub fn insert(&mut self, order: &Order) {
        let price = order.price.expect("only limit orders rest in the book");
        self.side_map_mut(order.side)
            .entry(price)
            .or_default()
            .push_back(order.id);
        self.index.insert(order.id, (order.side, price));
    }

    /// Removes a resting order by id, pruning its level if it becomes
    /// empty. Returns `true` if the order was found.
    pub fn remove(&mut self, order_id: OrderId) -> bool {
        let Some((side, price)) = self.index.remove(&order_id) else {
            return false;
        };
        let book_side = self.side_map_mut(side);
        if let Some(level) = book_side.get_mut(&price) {
            if let Some(pos) = level.iter().position(|&id| id == order_id) {
                level.remove(pos);
            }
            if level.is_empty() {
                book_side.remove(&price);
            }
        }
        true
    }

    /// The best-priority resting order id on `side`, without removing
    /// it. Matching partially fills in place; the caller removes it
    /// via [`OrderBook::remove`] only once it is fully filled.
    pub fn peek_best(&self, side: Side) -> Option<OrderId> {
        let level = match side {
            Side::Buy => self.bids.iter().next_back(),
            Side::Sell => self.asks.iter().next(),
        }?;
        level.1.front().copied()
    }

    /// Best-price-first, then-FIFO iteration order of resting ids on
    /// `side`. Used for snapshotting; matching uses [`peek_best`]
    /// instead so it can re-check after each partial fill.
    pub fn ids_in_priority_order(&self, side: Side) -> Vec<OrderId> {
        let map = self.side_map(side);
        let levels: Box<dyn Iterator<Item = &VecDeque<OrderId>>> = match side {
            Side::Buy => Box::new(map.values().rev()),
            Side::Sell => Box::new(map.values()),
        };
        levels.flat_map(|q| q.iter().copied()).collect()
    }

    /// Top `depth` aggregated levels per side: `(bids, asks)`, each
    /// sorted best-first.
    pub fn snapshot(&self, store: &OrderStore, depth: usize) -> (Vec<(Price, Qty)>, Vec<(Price, Qty)>) {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(&p, ids)| (p, aggregate(ids, store)))
            .collect();
        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(&p, ids)| (p, aggregate(ids, store)))
            .collect();
        (bids, asks)
    }

    pub fn snapshot_struct(&self, store: &OrderStore, depth: usize) -> BookSnapshot {
        let (bids, asks) = self.snapshot(store, depth);
        BookSnapshot { bids, asks }
    }

    /// Every order id currently resting anywhere in the book.
    pub fn all_ids(&self) -> HashSet<OrderId> {
        self.index.keys().copied().collect()
    }

    pub fn is_crossed(&self, store: &OrderStore) -> bool {
        match (self.best_bid(store), self.best_ask(store)) {
            (Some((bid, _)), Some((ask, _))) => bid >= ask,
            _ => false,
        }
    }
}

fn aggregate(ids: &VecDeque<OrderId>, store: &OrderStore) -> Qty {
    ids.iter()
        .filter_map(|id| store.get(id))
        .fold(Qty::ZERO, |acc, o| acc + o.remaining_qty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AccountId;
    use crate::order::{OrderKind, OrderStatus};
    use std::time::SystemTime;

    fn limit(side: Side, price: i64, qty: u64) -> Order {
        Order {
            id: OrderId::new(),
            owner: AccountId::new(),
            side,
            kind: OrderKind::Limit,
            original_qty: Qty(qty),
            remaining_qty: Qty(qty),
            price: Some(Price(price)),
            status: OrderStatus::Pending,
            created_at: SystemTime::now(),
            sequence: 0,
        }
    }

    #[test]
    fn best_bid_and_ask_track_extremes() {
        let mut book = OrderBook::new();
        let mut store = OrderStore::new();
        for (side, price, qty) in [
            (Side::Buy, 100, 1),
            (Side::Buy, 110, 1),
            (Side::Sell, 200, 1),
            (Side::Sell, 190, 1),
        ] {
            let o = limit(side, price, qty);
            book.insert(&o);
            store.insert(o.id, o);
        }
        assert_eq!(book.best_bid(&store).unwrap().0, Price(110));
        assert_eq!(book.best_ask(&store).unwrap().0, Price(190));
    }

    #[test]
    fn fifo_preserved_within_a_level() {
        let mut book = OrderBook::new();
        let a = limit(Side::Sell, 100, 1);
        let b = limit(Side::Sell, 100, 1);
        book.insert(&a);
        book.insert(&b);
        assert_eq!(book.ids_in_priority_order(Side::Sell), vec![a.id, b.id]);
    }

    #[test]
    fn remove_prunes_empty_level() {
        let mut book = OrderBook::new();
        let mut store = OrderStore::new();
        let o = limit(Side::Buy, 100, 1);
        book.insert(&o);
        store.insert(o.id, o.clone());
        assert!(book.remove(o.id));
        assert!(book.best_bid(&store).is_none());
        assert!(!book.remove(o.id), "second remove should report not found");
    }

    #[test]
    fn snapshot_aggregates_quantity_per_level() {
        let mut book = OrderBook::new();
        let mut store = OrderStore::new();
        for qty in [3u64, 4] {
            let o = limit(Side::Buy, 100, qty);
            book.insert(&o);
            store.insert(o.id, o);
        }
        let (bids, _) = book.snapshot(&store, 10);
        assert_eq!(bids, vec![(Price(100), Qty(7))]);
    }
}
