//! Invoice numbering policies.
//!
//! Two strategies exist and a session uses exactly one of them:
//!
//! * [`CounterPolicy`] (default): a persisted, strictly increasing global
//!   sequence. Numbers never collide, but they reveal how many invoices were
//!   issued before.
//! * [`RandomPolicy`]: `INV-YYYYMMDD-NNNN` with four random digits. No state
//!   is kept across sessions, so two invoices on the same day collide with
//!   roughly a 1-in-9000 chance. Uniqueness is not guaranteed.
//!
//! Callers only ask for a number when the draft's number field is blank.

use std::rc::Rc;

use chrono::NaiveDate;
use rand::Rng;
use rand::rngs::ThreadRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{BlobStore, COUNTER_KEY};

pub const INVOICE_START: u64 = 303;

pub trait NumberingPolicy {
    fn next(&mut self, today: NaiveDate) -> String;
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumberingKind {
    #[default]
    Counter,
    Random,
}

pub fn build_policy(
    kind: NumberingKind,
    store: Rc<dyn BlobStore>,
    start: u64,
) -> Box<dyn NumberingPolicy> {
    match kind {
        NumberingKind::Counter => Box::new(CounterPolicy::new(store, start)),
        NumberingKind::Random => Box::new(RandomPolicy::new(rand::thread_rng())),
    }
}

pub struct CounterPolicy {
    store: Rc<dyn BlobStore>,
    start: u64,
}

impl CounterPolicy {
    pub fn new(store: Rc<dyn BlobStore>, start: u64) -> Self {
        Self { store, start }
    }

    /// Last issued value, or `start - 1` when absent, corrupt, negative or
    /// too large to increment.
    pub fn read(&self) -> u64 {
        let fallback = self.start.saturating_sub(1);
        let raw = match self.store.get(COUNTER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return fallback,
            Err(e) => {
                warn!("Reading invoice counter failed: {}", e);
                return fallback;
            }
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 && v < u64::MAX as f64 => v.floor() as u64,
            _ => {
                debug!(raw = %raw, "invoice counter corrupt, restarting sequence");
                fallback
            }
        }
    }

    /// Increments and persists. A failed write still hands out the number.
    pub fn increment(&self) -> u64 {
        let next = self
            .read()
            .checked_add(1)
            .unwrap_or_else(|| self.start.max(1));
        if let Err(e) = self.store.set(COUNTER_KEY, &next.to_string()) {
            warn!("Persisting invoice counter failed: {}", e);
        }
        next
    }
}

impl NumberingPolicy for CounterPolicy {
    fn next(&mut self, _today: NaiveDate) -> String {
        self.increment().to_string()
    }
}

pub struct RandomPolicy<R: Rng = ThreadRng> {
    rng: R,
}

impl<R: Rng> RandomPolicy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> NumberingPolicy for RandomPolicy<R> {
    fn next(&mut self, today: NaiveDate) -> String {
        let digits: u32 = self.rng.gen_range(1000..=9999);
        format!("INV-{}-{}", today.format("%Y%m%d"), digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn counter_starts_at_start_and_increases() {
        let store: Rc<dyn BlobStore> = Rc::new(MemoryStore::new());
        let mut policy = CounterPolicy::new(store.clone(), INVOICE_START);

        let first = policy.next(day());
        let second = policy.next(day());
        assert_eq!(first, "303");
        assert_eq!(second, "304");
        assert_eq!(store.get(COUNTER_KEY).unwrap().as_deref(), Some("304"));
    }

    #[test]
    fn counter_survives_across_policies() {
        let store: Rc<dyn BlobStore> = Rc::new(MemoryStore::new());
        CounterPolicy::new(store.clone(), INVOICE_START).next(day());
        let mut again = CounterPolicy::new(store, INVOICE_START);
        assert_eq!(again.next(day()), "304");
    }

    #[test]
    fn corrupt_or_negative_counter_restarts() {
        let store: Rc<dyn BlobStore> = Rc::new(MemoryStore::new());
        let policy = CounterPolicy::new(store.clone(), INVOICE_START);

        store.set(COUNTER_KEY, "garbage").unwrap();
        assert_eq!(policy.read(), 302);
        store.set(COUNTER_KEY, "-8").unwrap();
        assert_eq!(policy.read(), 302);
        store.set(COUNTER_KEY, "410").unwrap();
        assert_eq!(policy.increment(), 411);
    }

    #[test]
    fn oversized_counter_restarts_instead_of_overflowing() {
        let store: Rc<dyn BlobStore> = Rc::new(MemoryStore::new());
        let mut policy = CounterPolicy::new(store.clone(), INVOICE_START);

        store.set(COUNTER_KEY, "1e30").unwrap();
        assert_eq!(policy.read(), 302);
        assert_eq!(policy.next(day()), "303");

        store.set(COUNTER_KEY, "18446744073709551615").unwrap();
        assert_eq!(policy.next(day()), "303");
        assert_eq!(policy.next(day()), "304");
    }

    #[test]
    fn random_policy_uses_date_and_four_digits() {
        let mut policy = RandomPolicy::new(StdRng::seed_from_u64(7));
        let number = policy.next(day());
        let (prefix, digits) = number.rsplit_once('-').unwrap();
        assert_eq!(prefix, "INV-20240517");
        let digits: u32 = digits.parse().unwrap();
        assert!((1000..=9999).contains(&digits));
    }
}
