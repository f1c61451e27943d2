//! Event bus: fanout of typed events to subscribers with bounded,
//! per-subscriber queues.
//!
//! Publishing never blocks and never touches the network: it pushes
//! onto a subscriber's own queue and wakes it with a [`tokio::sync::Notify`];
//! the subscriber's task (the transport layer, out of this crate's
//! scope) drains the queue and does the actual send. A plain
//! `tokio::sync::broadcast` channel can't express "drop the oldest
//! event of the same kind" or target only one account's subscribers
//! without every receiver filtering client-side, so each subscriber
//! gets its own queue instead.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::account::AccountSnapshot;
use crate::ids::{AccountId, SubscriberId};
use crate::money::Price;
use crate::order::Order;
use crate::orderbook::BookSnapshot;
use crate::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    UserInfo,
    OrderBook,
    OrderBookUpdate,
    Fill,
    BalanceUpdate,
    OrdersUpdate,
    MarketData,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketDataSnapshot {
    pub symbol: &'static str,
    pub price: Price,
    pub book: BookSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrdersSnapshot {
    pub account: AccountId,
    pub orders: Vec<Order>,
}

/// A single typed event, tagged with `#[serde(tag = "type", content =
/// "data")]` so the wire shape is `{"type": "fill", "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum Event {
    UserInfo(AccountSnapshot),
    OrderBook(BookSnapshot),
    OrderBookUpdate(BookSnapshot),
    Fill(Trade),
    BalanceUpdate(AccountSnapshot),
    OrdersUpdate(OrdersSnapshot),
    MarketData(MarketDataSnapshot),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::UserInfo(_) => EventKind::UserInfo,
            Event::OrderBook(_) => EventKind::OrderBook,
            Event::OrderBookUpdate(_) => EventKind::OrderBookUpdate,
            Event::Fill(_) => EventKind::Fill,
            Event::BalanceUpdate(_) => EventKind::BalanceUpdate,
            Event::OrdersUpdate(_) => EventKind::OrdersUpdate,
            Event::MarketData(_) => EventKind::MarketData,
        }
    }

    /// Whether this event is broadcast to every subscriber rather than
    /// routed to one account.
    pub fn is_broadcast(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::OrderBook | EventKind::OrderBookUpdate | EventKind::MarketData
        )
    }
}

struct QueueState {
    events: VecDeque<Event>,
    lag: bool,
}

/// One subscriber's inbox. An account may own several of these (e.g.
/// multiple browser tabs).
pub struct Subscriber {
    pub id: SubscriberId,
    pub account: AccountId,
    capacity: usize,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl Subscriber {
    fn push(&self, event: Event) {
        let mut state = self.state.lock().unwrap();
        if state.events.len() >= self.capacity {
            let kind = event.kind();
            match state.events.iter().position(|e| e.kind() == kind) {
                Some(pos) => {
                    state.events.remove(pos);
                }
                None => {
                    state.events.pop_front();
                }
            }
            state.lag = true;
        }
        state.events.push_back(event);
        drop(state);
        self.notify.notify_one();
    }

    /// Waits for and returns the next queued event.
    pub async fn recv(&self) -> Event {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if let Some(event) = state.events.pop_front() {
                    return event;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Drains and returns whether this subscriber dropped any events
    /// since the last call. The transport should re-request fresh
    /// snapshots (`get_user`/`get_orders`/`get_book`) when this is true.
    pub fn take_lag(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        std::mem::replace(&mut state.lag, false)
    }
}

/// Fanout registry. Cloned handles (`Arc<EventBus>`) are shared by the
/// facade (to publish) and the transport layer (to subscribe).
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Arc<Subscriber>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub fn subscribe(&self, account: AccountId) -> Arc<Subscriber> {
        let sub = Arc::new(Subscriber {
            id: SubscriberId::new(),
            account,
            capacity: self.capacity.max(1),
            state: Mutex::new(QueueState {
                events: VecDeque::new(),
                lag: false,
            }),
            notify: Notify::new(),
        });
        self.subscribers.lock().unwrap().push(sub.clone());
        sub
    }

    /// Removes a subscriber. The transport calls this lazily, on the
    /// first failed send — the bus itself never detects a dead
    /// connection.
    pub fn remove(&self, id: SubscriberId) {
        self.subscribers.lock().unwrap().retain(|s| s.id != id);
    }

    /// Sends `event` to every live subscriber.
    pub fn broadcast(&self, event: Event) {
        for sub in self.subscribers.lock().unwrap().iter() {
            sub.push(event.clone());
        }
    }

    /// Sends `event` only to subscribers of `account`.
    pub fn publish_to_account(&self, account: AccountId, event: Event) {
        for sub in self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.account == account)
        {
            sub.push(event.clone());
        }
    }

    /// Routes `event` using its own broadcast/account-scoped rule.
    /// Account-scoped events with no target account are dropped.
    pub fn publish(&self, event: Event, account: Option<AccountId>) {
        if event.is_broadcast() {
            self.broadcast(event);
        } else if let Some(account) = account {
            self.publish_to_account(account, event);
        }
    }
}
