//! Clock & id source: unique order/trade ids and the single
//! global sequence counter used both as the acceptance-order tie
//! breaker and as the `sequence` field stamped on every order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(OrderId);
uuid_id!(TradeId);
uuid_id!(AccountId);
uuid_id!(SubscriberId);

/// Monotonically increasing counter shared by every order acceptance.
///
/// This is the single source of truth for price-time priority: lower
/// sequence numbers were accepted earlier and win ties at the same
/// price level.
#[derive(Debug, Default)]
pub struct SequenceGenerator(AtomicU64);

impl SequenceGenerator {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Returns the next sequence number, starting at 1.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_strictly_increasing() {
        let gen = SequenceGenerator::new();
        let a = gen.next();
        let b = gen.next();
        let c = gen.next();
        assert!(a < b && b < c);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(OrderId::new(), OrderId::new());
    }
}
