// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{CancelToken, ChallengeAction, Error, LedgerConnection, TxReceipt};
use async_std::task;
use ethereum_types::H256;
use futures::future::FutureExt;
use futures::{pin_mut, select};
use log::warn;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Bounded exponential backoff applied to transient ledger failures.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total submission attempts before the failure propagates.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub base_delay_ms: u64,
    /// Upper bound on a single backoff delay.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 200,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (zero-based), with jitter drawn
    /// from the caller's seeded generator so that replays are deterministic.
    fn delay(&self, attempt: u32, rng: &mut StdRng) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.max_delay_ms);
        let jitter = if exp == 0 { 0 } else { rng.gen_range(0..=exp / 2) };
        Duration::from_millis(exp + jitter)
    }
}

/// Submits an action, retrying transient failures up to the configured bound.
/// Structural failures and cancellation propagate immediately.
pub async fn submit_with_retry<C: LedgerConnection + ?Sized>(
    connection: &C,
    challenge_id: H256,
    action: ChallengeAction,
    config: &RetryConfig,
    rng: &mut StdRng,
    cancel: &CancelToken,
) -> Result<TxReceipt, Error> {
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match connection.submit(challenge_id, action.clone()).await {
            Ok(receipt) => return Ok(receipt),
            Err(why) if why.is_transient() && attempt + 1 < config.max_attempts => {
                let delay = config.delay(attempt, rng);
                warn!(
                    "Submitting {} failed (attempt {}): {}; retrying in {:?}",
                    action.method(),
                    attempt + 1,
                    why,
                    delay,
                );
                attempt += 1;
                let sleep = task::sleep(delay).fuse();
                let cancelled = cancel.cancelled().fuse();
                pin_mut!(sleep, cancelled);
                select! {
                    _ = sleep => {}
                    _ = cancelled => return Err(Error::Cancelled),
                }
            }
            Err(why) => return Err(why),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn delays_grow_and_stay_bounded() {
        let config = RetryConfig::default();
        let mut rng = StdRng::seed_from_u64(7);

        let first = config.delay(0, &mut rng);
        let capped = config.delay(30, &mut rng);

        assert!(first >= Duration::from_millis(config.base_delay_ms));
        assert!(capped <= Duration::from_millis(config.max_delay_ms * 3 / 2));
    }

    #[test]
    fn jitter_is_deterministic_under_a_seed() {
        let config = RetryConfig::default();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        for attempt in 0..5 {
            assert_eq!(config.delay(attempt, &mut a), config.delay(attempt, &mut b));
        }
    }
}
