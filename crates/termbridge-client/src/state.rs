use std::time::Duration;

/// Connection lifecycle of one logical terminal widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and nothing scheduled. Initial state, and the terminal
    /// state after a user-initiated close.
    Disconnected,
    /// An attempt is in flight or a retry is pending.
    Connecting,
    Connected,
    /// Retry budget exhausted. Requires full reinitialization.
    GaveUp,
}

/// Backoff parameters for automatic reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            cap: Duration::from_millis(30000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (zero-based): `base * 2^attempt`,
    /// capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

/// Explicit reconnection state: one object owns the attempt counter and the
/// current state, and every transition goes through it.
#[derive(Debug)]
pub struct ReconnectState {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
    last_connection_id: Option<String>,
}

impl ReconnectState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            attempts: 0,
            last_connection_id: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_connection_id(&self) -> Option<&str> {
        self.last_connection_id.as_deref()
    }

    /// Start a connection attempt (first subscription or scheduled retry).
    /// Returns `false` once the machine has given up; a dead widget never
    /// dials out again.
    pub fn begin_attempt(&mut self) -> bool {
        match self.state {
            ConnectionState::GaveUp => false,
            _ => {
                self.state = ConnectionState::Connecting;
                true
            }
        }
    }

    /// A `connected` event arrived: the attempt counter resets, so the next
    /// failure starts the backoff ladder from the bottom.
    pub fn connection_established(&mut self, connection_id: &str) {
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        self.last_connection_id = Some(connection_id.to_string());
    }

    /// A protocol-layer failure (transport error, stream dropped). Returns
    /// the delay to wait before the next attempt, or `None` when the retry
    /// budget is exhausted and the state is now `GaveUp`.
    pub fn connection_failed(&mut self) -> Option<Duration> {
        if self.state == ConnectionState::GaveUp {
            return None;
        }
        if self.attempts < self.policy.max_attempts {
            let delay = self.policy.backoff_delay(self.attempts);
            self.attempts += 1;
            self.state = ConnectionState::Connecting;
            Some(delay)
        } else {
            self.state = ConnectionState::GaveUp;
            None
        }
    }

    /// User-initiated teardown. Never counts as a failure; any pending
    /// retry must be cancelled by the driver.
    pub fn user_closed(&mut self) {
        self.state = ConnectionState::Disconnected;
    }
}
