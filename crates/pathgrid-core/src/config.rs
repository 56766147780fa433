//! Tunable parameters for search, path storage and movement.
//!
//! Every field has a default matching the classic behavior (10,000
//! iteration cap, 1000 paths of up to 256 waypoints, 1000 units), so
//! `NavConfig::default()` is what most callers want. Configs can also be
//! loaded from JSON; missing fields fall back to their defaults.
//!
//! ```
//! use pathgrid_core::config::NavConfig;
//!
//! let config = NavConfig::from_json_str(r#"{ "max_iterations": 500 }"#).unwrap();
//! assert_eq!(config.max_iterations, 500);
//! assert_eq!(config.max_paths, 1000);
//! assert!(config.validate().is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};

/// Relative weights of the built-in steering behaviors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringWeights {
    /// Pull toward the unit's target.
    pub seek: f32,
    /// Push away from overlapping neighbours.
    pub avoidance: f32,
    /// Pull toward the unit's slot relative to its formation leader.
    pub formation: f32,
    /// Scale applied to forces queued with the `apply_*` steering calls.
    pub external: f32,
}

impl Default for SteeringWeights {
    fn default() -> Self {
        Self {
            seek: 1.0,
            avoidance: 1.5,
            formation: 0.8,
            external: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Hard cap on A* expansions per search.
    pub max_iterations: u32,
    /// Clip to the closest reachable cell instead of failing at the cap.
    pub allow_partial_paths: bool,
    /// Maximum number of live paths.
    pub max_paths: usize,
    /// Waypoint buffer capacity per path.
    pub max_waypoints: usize,
    /// Maximum number of registered units.
    pub max_units: usize,
    /// A unit this close to its target has arrived (world units).
    pub arrival_epsilon: f32,
    /// Seconds without progress before a moving unit is `Blocked`.
    pub blocked_timeout: f32,
    /// Neighbours are repelled inside `avoidance_range * (r1 + r2)`.
    pub avoidance_range: f32,
    /// Leader waits while a follower lags more than this many spacings.
    pub formation_max_lag: f32,
    /// Spacing used by every formation kind until overridden.
    pub formation_spacing: f32,
    pub steering: SteeringWeights,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            allow_partial_paths: false,
            max_paths: 1000,
            max_waypoints: 256,
            max_units: 1000,
            arrival_epsilon: 0.1,
            blocked_timeout: 1.0,
            avoidance_range: 1.5,
            formation_max_lag: 2.0,
            formation_spacing: 3.0,
            steering: SteeringWeights::default(),
        }
    }
}

impl NavConfig {
    /// Parse a JSON config; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> NavResult<Self> {
        let config: NavConfig = serde_json::from_str(json)?;
        let problems = config.validate();
        if problems.is_empty() {
            Ok(config)
        } else {
            Err(NavError::Config(problems.join("; ")))
        }
    }

    pub fn to_json_string(&self) -> NavResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Return a list of human-readable problems (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_iterations == 0 {
            errors.push("max_iterations must be at least 1".to_string());
        }
        if self.max_paths == 0 {
            errors.push("max_paths must be at least 1".to_string());
        }
        if self.max_waypoints == 0 {
            errors.push("max_waypoints must be at least 1".to_string());
        }
        if self.max_units == 0 {
            errors.push("max_units must be at least 1".to_string());
        }
        if !(self.arrival_epsilon.is_finite() && self.arrival_epsilon > 0.0) {
            errors.push(format!(
                "arrival_epsilon must be positive, got {}",
                self.arrival_epsilon
            ));
        }
        if !(self.blocked_timeout.is_finite() && self.blocked_timeout > 0.0) {
            errors.push(format!(
                "blocked_timeout must be positive, got {}",
                self.blocked_timeout
            ));
        }
        if !(self.avoidance_range.is_finite() && self.avoidance_range >= 1.0) {
            errors.push(format!(
                "avoidance_range must be >= 1.0, got {}",
                self.avoidance_range
            ));
        }
        if !(self.formation_max_lag.is_finite() && self.formation_max_lag > 0.0) {
            errors.push("formation_max_lag must be positive".to_string());
        }
        if !(self.formation_spacing.is_finite() && self.formation_spacing > 0.0) {
            errors.push("formation_spacing must be positive".to_string());
        }

        let w = &self.steering;
        for (name, value) in [
            ("seek", w.seek),
            ("avoidance", w.avoidance),
            ("formation", w.formation),
            ("external", w.external),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(format!("steering.{name} weight must be >= 0, got {value}"));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(NavConfig::default().validate().is_empty());
    }

    #[test]
    fn zero_capacities_are_reported() {
        let config = NavConfig {
            max_paths: 0,
            max_units: 0,
            ..NavConfig::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("max_paths"));
    }

    #[test]
    fn negative_weight_is_reported() {
        let mut config = NavConfig::default();
        config.steering.avoidance = -1.0;
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("steering.avoidance")));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            NavConfig::from_json_str(r#"{ "allow_partial_paths": true, "steering": { "seek": 2.0 } }"#)
                .unwrap();
        assert!(config.allow_partial_paths);
        assert_eq!(config.steering.seek, 2.0);
        assert_eq!(config.steering.avoidance, 1.5);
        assert_eq!(config.max_waypoints, 256);
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        let err = NavConfig::from_json_str(r#"{ "max_units": 0 }"#).unwrap_err();
        assert!(matches!(err, NavError::Config(ref msg) if msg.contains("max_units")));
    }

    #[test]
    fn json_round_trip() {
        let config = NavConfig::default();
        let json = config.to_json_string().unwrap();
        assert_eq!(NavConfig::from_json_str(&json).unwrap(), config);
    }
}
