// Path: crates/validators/src/window.rs
//! A TTL-bounded sliding window of recently observed values.
//!
//! The window keeps between `min_size` and `max_size` entries: nothing is
//! evicted below the minimum, everything beyond the maximum is evicted
//! immediately, and in between entries fall out once they outlive the TTL.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of wall-clock seconds, injectable for tests.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now(&self) -> u64;
}

/// The process clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Window configuration.
#[derive(Clone, Debug)]
pub struct WindowConfig {
    /// Entries never evicted by TTL below this count.
    pub min_size: usize,
    /// Hard bound on entry count.
    pub max_size: usize,
    /// Seconds after which an entry (beyond `min_size`) expires.
    pub ttl: u64,
}

/// The sliding window.
pub struct Window<T> {
    clock: Arc<dyn Clock>,
    config: WindowConfig,
    entries: VecDeque<(u64, T)>,
}

impl<T> Window<T> {
    /// An empty window reading time from `clock`.
    pub fn new(config: WindowConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            config,
            entries: VecDeque::new(),
        }
    }

    fn evict(&mut self) {
        let now = self.clock.now();
        while self.entries.len() > self.config.max_size {
            self.entries.pop_front();
        }
        while self.entries.len() > self.config.min_size {
            match self.entries.front() {
                Some((added, _)) if now.saturating_sub(*added) > self.config.ttl => {
                    self.entries.pop_front();
                }
                _ => break,
            }
        }
    }

    /// Appends a value, evicting whatever the bounds demand.
    pub fn add(&mut self, value: T) {
        self.entries.push_back((self.clock.now(), value));
        self.evict();
    }

    /// The oldest live value, after eviction.
    pub fn oldest(&mut self) -> Option<&T> {
        self.evict();
        self.entries.front().map(|(_, value)| value)
    }

    /// The number of live entries.
    pub fn len(&mut self) -> usize {
        self.evict();
        self.entries.len()
    }

    /// True when no live entries remain.
    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }
}

/// A hand-driven clock for deterministic tests.
#[derive(Default)]
pub struct ManualClock {
    now: std::sync::atomic::AtomicU64,
}

impl ManualClock {
    /// Advances the clock by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now
            .fetch_add(seconds, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}
