//! Duration representation for serialization.
//!
//! Fetch latencies are reported in whole milliseconds so that JSON consumers
//! see a plain integer.

use core::time::Duration;

/// Duration in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Milliseconds(pub u64);

impl Milliseconds {
    /// Create from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Create from seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1000)
    }

    /// Get the value in milliseconds.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Convert to a standard Duration.
    pub const fn to_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl From<Duration> for Milliseconds {
    fn from(d: Duration) -> Self {
        Self(d.as_millis() as u64)
    }
}

impl From<Milliseconds> for Duration {
    fn from(m: Milliseconds) -> Self {
        Duration::from_millis(m.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let d = Duration::from_millis(1500);
        let m = Milliseconds::from(d);
        assert_eq!(m.as_millis(), 1500);

        let d2: Duration = m.into();
        assert_eq!(d, d2);
    }

    #[test]
    fn sub_millisecond_durations_truncate() {
        let m = Milliseconds::from(Duration::from_micros(1_999));
        assert_eq!(m.as_millis(), 1);
    }

    #[test]
    fn from_secs() {
        assert_eq!(Milliseconds::from_secs(5).as_millis(), 5000);
        assert_eq!(
            Milliseconds::from_secs(2).to_duration(),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(Milliseconds::default().to_duration(), Duration::ZERO);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&Milliseconds::from_millis(42)).unwrap();
        assert_eq!(json, "42");
    }
}
