//! Violation Ledger Implementation

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Minimum time between two counted violations (seconds)
    pub cooldown_seconds: u64,
    /// Violations allowed before the attempt is terminated
    pub max_violations: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 10,
            max_violations: 3,
        }
    }
}

/// Ledger of counted violations for one exam attempt
#[derive(Debug, Clone)]
pub struct ViolationLedger {
    /// Violations counted so far
    pub count: u32,
    /// When the last violation was counted
    pub last_recorded_time: Option<Instant>,
    /// Limit that terminates the attempt
    pub max_allowed: u32,
    /// Cooldown between counted violations
    pub cooldown: Duration,
}

/// Why a report did not change the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// Previous violation was counted too recently
    Cooldown { remaining: Duration },
    /// Limit already reached, the attempt is over
    Closed,
}

/// Result of reporting a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Not counted
    Ignored(Suppression),
    /// Counted, attempt continues
    Counted { count: u32, max: u32 },
    /// Counted and the limit is reached (reported once)
    LimitReached { count: u32 },
}

impl PolicyOutcome {
    pub fn is_counted(&self) -> bool {
        !matches!(self, PolicyOutcome::Ignored(_))
    }
}

/// Violation policy for deduplication and termination
pub struct ViolationPolicy {
    ledger: ViolationLedger,
    /// Set once the limit is reached
    closed: bool,
}

impl ViolationPolicy {
    /// Create a new violation policy
    pub fn new(config: &PolicyConfig) -> Self {
        info!("Creating violation policy with config: {:?}", config);
        Self {
            ledger: ViolationLedger {
                count: 0,
                last_recorded_time: None,
                max_allowed: config.max_violations.max(1),
                cooldown: Duration::from_secs(config.cooldown_seconds),
            },
            closed: false,
        }
    }

    /// Report a violation observed at `now`
    pub fn record(&mut self, reason: &str, now: Instant) -> PolicyOutcome {
        if self.closed {
            debug!("Violation ignored, ledger closed: {}", reason);
            return PolicyOutcome::Ignored(Suppression::Closed);
        }

        // Check cooldown
        if let Some(last) = self.ledger.last_recorded_time {
            let since = now.saturating_duration_since(last);
            if since < self.ledger.cooldown {
                debug!("Violation suppressed: in cooldown period ({})", reason);
                metrics::counter!("proctor_violations_suppressed_total").increment(1);
                return PolicyOutcome::Ignored(Suppression::Cooldown {
                    remaining: self.ledger.cooldown - since,
                });
            }
        }

        self.ledger.count += 1;
        self.ledger.last_recorded_time = Some(now);
        metrics::counter!("proctor_violations_total").increment(1);

        warn!(
            "Proctoring violation recorded: {}. Count: {}/{}",
            reason, self.ledger.count, self.ledger.max_allowed
        );

        if self.ledger.count >= self.ledger.max_allowed {
            self.closed = true;
            warn!("Maximum proctoring violations reached");
            PolicyOutcome::LimitReached {
                count: self.ledger.count,
            }
        } else {
            PolicyOutcome::Counted {
                count: self.ledger.count,
                max: self.ledger.max_allowed,
            }
        }
    }

    /// Get the current violation count
    pub fn count(&self) -> u32 {
        self.ledger.count
    }

    pub fn max_allowed(&self) -> u32 {
        self.ledger.max_allowed
    }

    /// Whether the limit has been reached
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// One violation away from termination
    pub fn is_near_limit(&self) -> bool {
        self.ledger.count + 1 >= self.ledger.max_allowed
    }

    pub fn ledger(&self) -> &ViolationLedger {
        &self.ledger
    }
}

impl Default for ViolationPolicy {
    fn default() -> Self {
        Self::new(&PolicyConfig::default())
    }
}
