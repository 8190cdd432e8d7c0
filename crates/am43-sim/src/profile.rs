//! Simulated device profiles and fault plans.

use serde::{Deserialize, Serialize};

/// Initial state and behaviour of one simulated actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimProfile {
    /// Battery charge reported, 0-100 %.
    pub battery: u8,
    /// Starting position, 0 % open to 100 % closed.
    pub position: u8,
    /// Ambient light reported, 0-100.
    pub light: u8,
    /// PIN the actuator accepts.
    pub pin: u16,
    /// Reject motion and settings commands until a successful login.
    pub require_login: bool,
    /// Percentage points travelled towards the target per position request.
    /// Zero means the blind does not visibly move within one session.
    pub travel_per_poll: u8,
    /// Injected faults.
    pub faults: FaultPlan,
}

impl Default for SimProfile {
    fn default() -> Self {
        SimProfile {
            battery: 80,
            position: 0,
            light: 10,
            pin: am43_protocol::DEFAULT_PIN,
            require_login: false,
            travel_per_poll: 0,
            faults: FaultPlan::default(),
        }
    }
}

impl SimProfile {
    /// Profile reporting the given readings.
    pub fn with_readings(battery: u8, position: u8, light: u8) -> Self {
        SimProfile {
            battery,
            position,
            light,
            ..Default::default()
        }
    }

    /// Replace the fault plan.
    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Require a login with `pin` before motion commands.
    pub fn with_required_login(mut self, pin: u16) -> Self {
        self.pin = pin;
        self.require_login = true;
        self
    }

    /// Move `step` points towards the target on every position request.
    pub fn with_travel_per_poll(mut self, step: u8) -> Self {
        self.travel_per_poll = step;
        self
    }
}

/// Faults a simulated device injects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultPlan {
    /// Every connection attempt fails.
    pub unreachable: bool,
    /// The first N connection attempts fail.
    pub failed_connects: u32,
    /// Writes are accepted but nothing is ever notified.
    pub silent: bool,
    /// Writes are refused by the transport.
    pub reject_writes: bool,
    /// The first N replies are preceded by a corrupted copy.
    pub noisy_replies: u32,
    /// Probability (0.0-1.0) that any reply is preceded by a corrupted copy.
    pub noise: f64,
    /// Seed for the noise generator.
    pub seed: u64,
}

impl Default for FaultPlan {
    fn default() -> Self {
        FaultPlan {
            unreachable: false,
            failed_connects: 0,
            silent: false,
            reject_writes: false,
            noisy_replies: 0,
            noise: 0.0,
            seed: 0,
        }
    }
}

impl FaultPlan {
    /// No faults.
    pub fn none() -> Self {
        Self::default()
    }

    /// Device never answers a connect.
    pub fn unreachable() -> Self {
        FaultPlan {
            unreachable: true,
            ..Default::default()
        }
    }

    /// Device answers a connect only after `failures` failed attempts.
    pub fn failing_connects(failures: u32) -> Self {
        FaultPlan {
            failed_connects: failures,
            ..Default::default()
        }
    }

    /// Device connects but never notifies.
    pub fn silent() -> Self {
        FaultPlan {
            silent: true,
            ..Default::default()
        }
    }

    /// Transport refuses every write.
    pub fn rejecting_writes() -> Self {
        FaultPlan {
            reject_writes: true,
            ..Default::default()
        }
    }

    /// The first `count` replies are preceded by a corrupted copy.
    pub fn noisy(count: u32) -> Self {
        FaultPlan {
            noisy_replies: count,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_readings() {
        let profile = SimProfile::default();
        assert_eq!((profile.battery, profile.position, profile.light), (80, 0, 10));
        assert_eq!(profile.pin, 8888);
        assert_eq!(profile.faults, FaultPlan::none());
    }

    #[test]
    fn test_profile_from_yaml() {
        let yaml = r#"
battery: 55
faults:
  failed_connects: 1
  noise: 0.25
  seed: 7
"#;
        let profile: SimProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.battery, 55);
        assert_eq!(profile.light, 10);
        assert_eq!(profile.faults.failed_connects, 1);
        assert_eq!(profile.faults.noise, 0.25);
        assert!(!profile.faults.unreachable);
    }
}
