//! Fixed-period tick loop.
//!
//! Ticks run one at a time on the calling thread. The first tick fires
//! immediately; each later tick fires one period after the previous deadline,
//! or right away if the previous tick overran it.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, warn};

/// Run `tick` every `period`, `max_ticks` times or forever when `None`.
///
/// A panicking tick is logged and the loop carries on. Returns the number of
/// ticks started.
pub fn run_loop<F>(period: Duration, max_ticks: Option<u64>, mut tick: F) -> u64
where
    F: FnMut(),
{
    let mut count = 0u64;
    let mut deadline = Instant::now();

    loop {
        if max_ticks.is_some_and(|max| count >= max) {
            return count;
        }

        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }

        count += 1;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(&mut tick)) {
            error!("Tick {count} panicked: {}", panic_message(payload.as_ref()));
        }

        deadline += period;
        let now = Instant::now();
        if deadline < now {
            warn!(
                "Tick {count} overran the {}s period; next tick starts now",
                period.as_secs_f64()
            );
            deadline = now;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
