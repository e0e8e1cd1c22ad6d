/// Event timestamp in seconds.
///
/// Hosts feed whatever monotonic clock they have (e.g. `performance.now() / 1000`);
/// nothing in the workspace reads a wall clock itself.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Time(pub f64);

impl Time {
    pub fn from_millis(ms: f64) -> Self {
        Time(ms / 1000.0)
    }

    pub fn as_millis(self) -> f64 {
        self.0 * 1000.0
    }

    /// Milliseconds elapsed since `earlier` (negative if `earlier` is in the future).
    pub fn millis_since(self, earlier: Time) -> f64 {
        (self.0 - earlier.0) * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn millis_since_is_signed() {
        let a = Time::from_millis(100.0);
        let b = Time::from_millis(116.0);
        assert!((b.millis_since(a) - 16.0).abs() < 1e-9);
        assert!((a.millis_since(b) + 16.0).abs() < 1e-9);
    }
}
