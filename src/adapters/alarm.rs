//! Host one-shot alarm.
//!
//! Stands in for a board's hardware alarm: every `arm` spawns a sleeper
//! thread that runs the callback asynchronously, just as an alarm ISR
//! would.  `disarm` flags the pending sleeper so it exits without firing.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::warn;

use crate::ports::{AlarmCallback, OneShotAlarm};

#[derive(Default)]
pub struct ThreadAlarm {
    cancelled: Option<Arc<AtomicBool>>,
}

impl ThreadAlarm {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OneShotAlarm for ThreadAlarm {
    fn arm(&mut self, period_ms: u32, callback: AlarmCallback) {
        self.disarm();

        let cancelled = Arc::new(AtomicBool::new(false));
        self.cancelled = Some(Arc::clone(&cancelled));

        let spawned = thread::Builder::new()
            .name("alarm".into())
            .spawn(move || {
                thread::sleep(Duration::from_millis(u64::from(period_ms)));
                if !cancelled.load(Ordering::Acquire) {
                    callback();
                }
            });
        if let Err(e) = spawned {
            warn!("ThreadAlarm: could not spawn alarm thread: {}", e);
        }
    }

    fn disarm(&mut self) {
        if let Some(flag) = self.cancelled.take() {
            flag.store(true, Ordering::Release);
        }
    }
}

impl Drop for ThreadAlarm {
    fn drop(&mut self) {
        self.disarm();
    }
}
