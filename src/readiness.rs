//! Readiness wait protocol.
//!
//! A page counts as ready once its marker element is present. Before
//! polling, a fixed base delay is slept; this delay is also the pacing
//! between consecutive page loads, which the target site requires.

use crate::browser::PageDriver;
use crate::error::{CaptureError, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    /// Base delay slept before polling
    pub wait: Duration,
    /// Upper bound on polling for the marker
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Base delay multiplier for the first reader page after a transition
    pub first_page_multiplier: u32,
    /// Present once an item's landing page has rendered
    pub landing_marker: String,
    /// Present once a reader page has rendered
    pub reader_marker: String,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(5),
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
            first_page_multiplier: 3,
            landing_marker: r#"link[type="image/x-icon"]"#.to_string(),
            reader_marker: r#"div[data-name="PageView"]"#.to_string(),
        }
    }
}

/// What kind of page is being waited for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Landing,
    /// `extended` is set for the first reader page of an item and for the
    /// first page captured after skipped ones. Background prefetching makes
    /// those loads slower.
    Reader { extended: bool },
}

/// Source of blocking pauses. Swappable so tests don't sleep.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

pub struct ReadinessWaiter<P = ThreadPacer> {
    config: ReadinessConfig,
    pacer: P,
}

impl ReadinessWaiter<ThreadPacer> {
    pub fn new(config: ReadinessConfig) -> Self {
        Self::with_pacer(config, ThreadPacer)
    }
}

impl<P: Pacer> ReadinessWaiter<P> {
    pub fn with_pacer(config: ReadinessConfig, pacer: P) -> Self {
        Self { config, pacer }
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Delay slept before polling for `kind`
    pub fn base_delay(&self, kind: PageKind) -> Duration {
        match kind {
            PageKind::Reader { extended: true } => self
                .config
                .wait
                .checked_mul(self.config.first_page_multiplier)
                .unwrap_or(Duration::MAX),
            _ => self.config.wait,
        }
    }

    pub fn marker(&self, kind: PageKind) -> &str {
        match kind {
            PageKind::Landing => &self.config.landing_marker,
            PageKind::Reader { .. } => &self.config.reader_marker,
        }
    }

    /// Number of polls after the first one before giving up
    fn poll_budget(&self) -> u32 {
        let interval = self.config.poll_interval.as_millis().max(1);
        let budget = self.config.timeout.as_millis().div_ceil(interval);
        budget.min(u32::MAX as u128) as u32
    }

    /// Sleep the base delay, then poll for the marker.
    ///
    /// A missing marker is fatal for the whole run: capturing an
    /// unrendered page would silently produce garbage.
    pub fn wait_until_ready<D: PageDriver>(&self, driver: &D, kind: PageKind) -> Result<()> {
        self.pacer.pause(self.base_delay(kind));

        let marker = self.marker(kind);
        let budget = self.poll_budget();
        for attempt in 0..=budget {
            match driver.has_element(marker) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                // A page mid-navigation can reject scripts; keep polling
                Err(e) => log::debug!("Marker probe for {} failed: {}", marker, e),
            }
            if attempt < budget {
                self.pacer.pause(self.config.poll_interval);
            }
        }

        Err(CaptureError::ReadinessTimeout {
            marker: marker.to_string(),
            timeout: self.config.timeout,
        })
    }
}
