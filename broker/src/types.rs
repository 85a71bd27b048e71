//! Shared broker types: swap receipts and retry policy.

use std::thread;
use std::time::Duration;

use log::error;

/// Proof that a swap went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    /// Transaction signature (base58).
    pub signature: String,
    /// True when the router reported the signature; false when it is the
    /// locally computed signature of the submitted transaction.
    pub confirmed_by_router: bool,
}

impl SwapReceipt {
    /// Block explorer link for the transaction.
    pub fn explorer_url(&self) -> String {
        format!("https://solscan.io/tx/{}", self.signature)
    }
}

/// Bounded retry with a fixed delay between attempts.
///
/// `retries = 3` means one initial attempt plus three more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(3000),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Run `attempt` until it succeeds or the policy is exhausted.
    ///
    /// Each failure is logged with the attempts left. Returns `None` after the
    /// last failure.
    pub fn run<T, E, F>(&self, what: &str, mut attempt: F) -> Option<T>
    where
        E: std::fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut left = self.retries;
        loop {
            match attempt() {
                Ok(value) => return Some(value),
                Err(e) => {
                    error!("Failed to fetch {what} (attempts left: {left}): {e}");
                    if left == 0 {
                        error!("Max retries reached for {what}. Giving up.");
                        return None;
                    }
                    left -= 1;
                    thread::sleep(self.delay);
                }
            }
        }
    }
}
