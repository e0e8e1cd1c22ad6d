use foundation::time::Time;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedrawConfig {
    /// Flush deadline when no animation frame arrives.
    pub fallback_ms: f64,
}

impl Default for RedrawConfig {
    fn default() -> Self {
        Self { fallback_ms: 100.0 }
    }
}

/// How a pending redraw was flushed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlushSource {
    AnimationFrame,
    Timer,
}

/// Coalesces viewport-dependent redraw requests.
///
/// Any number of requests collapse into one pending redraw, flushed by the next
/// animation frame or, if frames are starved, by the timer once `fallback_ms`
/// has passed since the first request.
#[derive(Debug, Clone, PartialEq)]
pub struct RedrawScheduler {
    config: RedrawConfig,
    pending_since: Option<Time>,
    flushes: u64,
}

impl RedrawScheduler {
    pub fn new(config: RedrawConfig) -> Self {
        Self {
            config,
            pending_since: None,
            flushes: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    /// Marks a redraw as needed. Returns true if this opened a new pending redraw.
    pub fn request(&mut self, now: Time) -> bool {
        if self.pending_since.is_some() {
            return false;
        }
        self.pending_since = Some(now);
        true
    }

    /// Time at which the timer fallback fires, if a redraw is pending.
    pub fn deadline(&self) -> Option<Time> {
        self.pending_since
            .map(|t| Time(t.0 + self.config.fallback_ms / 1000.0))
    }

    /// Returns true when the caller must redraw now.
    pub fn on_animation_frame(&mut self, _now: Time) -> bool {
        self.flush(FlushSource::AnimationFrame)
    }

    /// Returns true when the fallback deadline has passed with a redraw pending.
    pub fn poll_timer(&mut self, now: Time) -> bool {
        match self.pending_since {
            Some(since) if now.millis_since(since) >= self.config.fallback_ms => {
                self.flush(FlushSource::Timer)
            }
            _ => false,
        }
    }

    fn flush(&mut self, source: FlushSource) -> bool {
        if self.pending_since.take().is_none() {
            return false;
        }
        self.flushes += 1;
        debug!(?source, flushes = self.flushes, "flushing redraw");
        true
    }
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new(RedrawConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::{RedrawConfig, RedrawScheduler};
    use foundation::time::Time;

    #[test]
    fn requests_coalesce_into_one_flush() {
        let mut s = RedrawScheduler::default();
        assert!(s.request(Time(0.0)));
        assert!(!s.request(Time(0.01)));
        assert!(s.on_animation_frame(Time(0.016)));
        assert!(!s.on_animation_frame(Time(0.032)));
        assert_eq!(s.flush_count(), 1);
    }

    #[test]
    fn timer_fallback_fires_after_deadline() {
        let mut s = RedrawScheduler::new(RedrawConfig { fallback_ms: 100.0 });
        s.request(Time(1.0));
        assert!(!s.poll_timer(Time(1.05)));
        assert!(s.is_pending());
        assert!(s.poll_timer(Time(1.1)));
        assert!(!s.is_pending());
        // The frame that arrives late has nothing left to do.
        assert!(!s.on_animation_frame(Time(1.2)));
    }

    #[test]
    fn timer_without_request_is_a_noop() {
        let mut s = RedrawScheduler::default();
        assert!(!s.poll_timer(Time(10.0)));
        assert_eq!(s.deadline(), None);
        s.request(Time(2.0));
        let deadline = s.deadline().unwrap();
        assert!((deadline.0 - 2.1).abs() < 1e-12);
    }
}
