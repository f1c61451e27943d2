//! Account ledger: owns every [`Account`], keyed by id. All
//! mutations happen through the matching engine's atomic application
//! path — nothing here computes a balance change on its own.

use std::collections::HashMap;

use crate::account::Account;
use crate::ids::{AccountId, OrderId, TradeId};
use crate::trade::Trade;

#[derive(Debug, Default)]
pub struct AccountLedger {
    accounts: HashMap<AccountId, Account>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the account for `id`, creating it with the starting
    /// balances if this is the first time it's seen.
    pub fn get_or_create(&mut self, id: AccountId) -> &mut Account {
        self.accounts.entry(id).or_insert_with(|| Account::new(id))
    }

    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn get_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.accounts.get_mut(&id)
    }

    /// Open (pending/partial) order ids for `id`, in no particular order.
    pub fn open_order_ids(&self, id: AccountId) -> Vec<OrderId> {
        self.accounts
            .get(&id)
            .map(|a| a.open_orders.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Trade ids this account has participated in, oldest first.
    pub fn trade_ids(&self, id: AccountId) -> Vec<TradeId> {
        self.accounts
            .get(&id)
            .map(|a| a.trade_log.clone())
            .unwrap_or_default()
    }

    /// Joins `trade_ids(id)` against `all_trades` (the global append-only
    /// log), preserving the account's recorded order (oldest-last-
    /// preserved; callers that want newest-first may reverse).
    pub fn trades_for<'a>(&self, id: AccountId, all_trades: &'a [Trade]) -> Vec<&'a Trade> {
        let wanted = self.trade_ids(id);
        let by_id: HashMap<TradeId, &Trade> = all_trades.iter().map(|t| (t.id, t)).collect();
        wanted.iter().filter_map(|tid| by_id.get(tid).copied()).collect()
    }
}
