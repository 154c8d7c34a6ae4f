//! Shared test doubles and builders.
//!
//! Compiled for unit tests and, through the `test-support` feature, for the
//! integration tests under `tests/`.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::{
    Expense, ExpenseId, NewExpense, Price, ProductName, UserId, parse_client_timestamp,
};

/// Clock whose reading only changes when a test advances it.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) += TimeDelta::seconds(seconds);
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parse a fixture timestamp, panicking on malformed input.
pub fn utc(raw: &str) -> DateTime<Utc> {
    match parse_client_timestamp(raw) {
        Ok(parsed) => parsed,
        Err(error) => panic!("fixture timestamp {raw:?} is invalid: {error}"),
    }
}

/// Clock pinned to 2024-06-01T12:00:00Z.
pub fn fixed_clock() -> MutableClock {
    MutableClock::new(utc("2024-06-01T12:00:00Z"))
}

fn product(raw: &str) -> ProductName {
    match ProductName::new(raw) {
        Ok(name) => name,
        Err(error) => panic!("fixture product {raw:?} is invalid: {error}"),
    }
}

fn one_euro() -> Price {
    match Price::from_f64(1.0) {
        Ok(price) => price,
        Err(error) => panic!("fixture price is invalid: {error}"),
    }
}

/// Uncategorised expense priced at 1.00.
pub fn new_expense(user_id: UserId, product_name: &str, timestamp: &str) -> NewExpense {
    NewExpense {
        user_id,
        local_id: None,
        product: product(product_name),
        price: one_euro(),
        category_id: None,
        timestamp: utc(timestamp),
    }
}

/// Stored expense with every timestamp at 2024-01-01T00:00:00Z.
pub fn stored_expense(id: ExpenseId, user_id: UserId) -> Expense {
    let at = utc("2024-01-01T00:00:00Z");
    Expense {
        id,
        user_id,
        local_id: None,
        product: product("Coffee"),
        price: one_euro(),
        category_id: None,
        timestamp: at,
        created_at: at,
        updated_at: at,
        deleted_at: None,
    }
}
