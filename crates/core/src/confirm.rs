//! Waiting for a broadcast transaction to show up in a block.

use std::{
    thread,
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::debug;

use crate::{config::RetryConfig, TxHash, TxResponse};

#[derive(Debug, Error)]
#[error("tx lookup failed: {0}")]
pub struct LookupError(pub String);

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("tx {hash} not found after {attempts} attempts ({elapsed:?})")]
    Timeout {
        hash: TxHash,
        attempts: usize,
        elapsed: Duration,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Single shot query of the tx index.
pub trait TxLookup {
    /// `Ok(None)` while the tx is not indexed yet.
    fn lookup_tx(&self, hash: &TxHash) -> Result<Option<TxResponse>, LookupError>;
}

impl<T: TxLookup + ?Sized> TxLookup for &T {
    fn lookup_tx(&self, hash: &TxHash) -> Result<Option<TxResponse>, LookupError> {
        (**self).lookup_tx(hash)
    }
}

/// Turns a tx hash into its confirmed response, or gives up.
pub trait TxConfirm {
    fn confirm(&self, hash: &TxHash) -> Result<TxResponse, ConfirmError>;
}

impl<T: TxConfirm + ?Sized> TxConfirm for &T {
    fn confirm(&self, hash: &TxHash) -> Result<TxResponse, ConfirmError> {
        (**self).confirm(hash)
    }
}

/// Polls a [`TxLookup`] with exponential backoff, bounded by attempts and by
/// wall clock time.
#[derive(Debug, Clone)]
pub struct PollingConfirm<L> {
    lookup: L,
    retries: RetryConfig,
}

impl<L> PollingConfirm<L> {
    pub fn new(lookup: L, retries: RetryConfig) -> Self {
        Self { lookup, retries }
    }

    pub fn retries(&self) -> &RetryConfig {
        &self.retries
    }
}

impl<L: TxLookup> TxConfirm for PollingConfirm<L> {
    fn confirm(&self, hash: &TxHash) -> Result<TxResponse, ConfirmError> {
        let started = Instant::now();
        let timeout = self.retries.timeout();
        let mut attempts = 0;

        while attempts < self.retries.max_retries {
            let found = self.lookup.lookup_tx(hash)?;
            attempts += 1;

            if let Some(response) = found {
                debug!(%hash, attempts, height = response.height, "tx confirmed");
                return Ok(response);
            }

            if attempts == self.retries.max_retries || started.elapsed() >= timeout {
                break;
            }

            // never sleep past the deadline
            let remaining = timeout.saturating_sub(started.elapsed());
            let delay = self.retries.backoff_for(attempts - 1).min(remaining);
            debug!(%hash, attempts, ?delay, "tx not indexed yet");

            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        Err(ConfirmError::Timeout {
            hash: *hash,
            attempts,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct AfterN {
        calls: Cell<usize>,
        found_on: usize,
    }

    impl TxLookup for AfterN {
        fn lookup_tx(&self, _: &TxHash) -> Result<Option<TxResponse>, LookupError> {
            self.calls.set(self.calls.get() + 1);

            if self.calls.get() >= self.found_on {
                Ok(Some(TxResponse {
                    height: 7,
                    ..Default::default()
                }))
            } else {
                Ok(None)
            }
        }
    }

    const HASH: TxHash = TxHash([0xab; 32]);

    #[test]
    fn keeps_polling_until_found() {
        let lookup = AfterN {
            calls: Cell::new(0),
            found_on: 3,
        };

        let confirm = PollingConfirm::new(&lookup, RetryConfig::immediate(5));
        let response = confirm.confirm(&HASH).unwrap();

        assert_eq!(response.height, 7);
        assert_eq!(lookup.calls.get(), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let lookup = AfterN {
            calls: Cell::new(0),
            found_on: usize::MAX,
        };

        let confirm = PollingConfirm::new(&lookup, RetryConfig::immediate(4));

        assert!(matches!(
            confirm.confirm(&HASH),
            Err(ConfirmError::Timeout { attempts: 4, .. })
        ));
        assert_eq!(lookup.calls.get(), 4);
    }

    #[test]
    fn gives_up_after_timeout() {
        let lookup = AfterN {
            calls: Cell::new(0),
            found_on: usize::MAX,
        };

        let retries = RetryConfig {
            timeout_ms: 0,
            ..RetryConfig::immediate(100)
        };

        let confirm = PollingConfirm::new(&lookup, retries);

        assert!(matches!(
            confirm.confirm(&HASH),
            Err(ConfirmError::Timeout { attempts: 1, .. })
        ));
    }

    #[test]
    fn backoff_is_cut_short_by_timeout() {
        let lookup = AfterN {
            calls: Cell::new(0),
            found_on: usize::MAX,
        };

        let retries = RetryConfig {
            max_retries: 10,
            backoff_unit_ms: 60_000,
            backoff_factor: 1,
            max_backoff_ms: 60_000,
            timeout_ms: 50,
        };

        let confirm = PollingConfirm::new(&lookup, retries);
        let started = Instant::now();

        match confirm.confirm(&HASH) {
            Err(ConfirmError::Timeout { attempts, .. }) => assert_eq!(attempts, 2),
            x => panic!("unexpected result {x:?}"),
        }

        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn lookup_errors_are_not_retried() {
        struct Broken;

        impl TxLookup for Broken {
            fn lookup_tx(&self, _: &TxHash) -> Result<Option<TxResponse>, LookupError> {
                Err(LookupError("connection refused".into()))
            }
        }

        let confirm = PollingConfirm::new(Broken, RetryConfig::immediate(10));

        assert!(matches!(
            confirm.confirm(&HASH),
            Err(ConfirmError::Lookup(_))
        ));
    }
}
