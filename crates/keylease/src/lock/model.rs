//! Lease lifecycle state

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smallest TTL a lease accepts
pub const MIN_TTL: Duration = Duration::from_millis(1);

/// Largest TTL a lease accepts (one year)
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Smallest renewal period, regardless of TTL and divisor
pub const MIN_RENEW_PERIOD: Duration = Duration::from_millis(1);

/// Lease state.
///
/// Transitions are linear: `Idle -> Held -> Released`. Locking again needs a
/// new lease and therefore a new owner token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseState {
    /// Created, not yet acquired
    #[default]
    Idle,
    /// Acquired in the store and being renewed
    Held,
    /// Release completed or attempted
    Released,
}

impl LeaseState {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaseState::Idle => "idle",
            LeaseState::Held => "held",
            LeaseState::Released => "released",
        }
    }
}

impl std::fmt::Display for LeaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Renewal period for a lease: `ttl / divisor`, never below [`MIN_RENEW_PERIOD`]
pub fn renew_period(ttl: Duration, divisor: u32) -> Duration {
    (ttl / divisor.max(1)).max(MIN_RENEW_PERIOD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_state() {
        assert_eq!(LeaseState::default(), LeaseState::Idle);
        assert_eq!(LeaseState::Held.to_string(), "held");
        assert_eq!(
            serde_json::to_string(&LeaseState::Released).unwrap(),
            "\"released\""
        );
    }

    #[test]
    fn test_renew_period() {
        assert_eq!(renew_period(Duration::from_secs(30), 3), Duration::from_secs(10));
        assert_eq!(renew_period(Duration::from_secs(3), 3), Duration::from_secs(1));
        assert_eq!(renew_period(Duration::from_millis(2), 3), MIN_RENEW_PERIOD);
        // A zero divisor is treated as one renewal per window
        assert_eq!(renew_period(Duration::from_secs(6), 0), Duration::from_secs(6));
        assert_eq!(renew_period(MAX_TTL, 1), MAX_TTL);
    }
}
