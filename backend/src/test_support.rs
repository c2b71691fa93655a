//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled for `cfg(test)` and behind the `test-support` feature.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::{
    Canary, CanaryDomain, CanaryProfile, ConcernLevel, UserId, WarrantStatement,
};

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Start the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}",)
            }
        };
        *self.lock_clock() += delta;
    }

    /// Move the clock forward by `seconds`.
    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// A fixed, readable instant for time-travel tests.
pub fn fixed_now() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0) {
        chrono::LocalResult::Single(now) => now,
        _ => panic!("fixed test instant is valid"),
    }
}

/// A registered canary for `domain`, owned by `owner`, verified or not.
pub fn sample_canary(owner: &UserId, domain: &str, verified: bool) -> Canary {
    let domain = match CanaryDomain::new(domain) {
        Ok(domain) => domain,
        Err(error) => panic!("test domain {domain} is invalid: {error}"),
    };
    let profile = match CanaryProfile::new("Example", "Transparency report") {
        Ok(profile) => profile,
        Err(error) => panic!("test profile is invalid: {error}"),
    };
    let mut canary = Canary::register(owner.clone(), domain, profile, fixed_now());
    canary.verification.completed = verified;
    canary
}

/// A short, valid statement.
pub fn sample_statement() -> WarrantStatement {
    match WarrantStatement::new(ConcernLevel::None, "No warrants received.", "c2lnbmF0dXJl") {
        Ok(statement) => statement,
        Err(error) => panic!("test statement is invalid: {error}"),
    }
}
