//! Reliability scores
//!
//! A descriptor's score rises geometrically while probes keep succeeding
//! and decays quickly once they fail. `Thresholds` decides which scores
//! make it into the published list and which earn the stability marker.

use serde::{Deserialize, Serialize};

pub const GAIN: f64 = 1.5;
pub const DECAY: f64 = 0.7;
pub const P: f64 = 1.5;
pub const Q: f64 = 1.3;
pub const MIN_DROP: f64 = 2.0;
pub const MAX_SCORE: f64 = 100.0;

pub const DEFAULT_ACCEPT_SCORE: f64 = 5.0;
pub const DEFAULT_STABLE_SCORE: f64 = 50.0;

/// Score update rule applied after every probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorePolicy {
    pub gain: f64,
    pub decay: f64,
    pub p: f64,
    pub q: f64,
    pub min_drop: f64,
    pub max: f64,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            gain: GAIN,
            decay: DECAY,
            p: P,
            q: Q,
            min_drop: MIN_DROP,
            max: MAX_SCORE,
        }
    }
}

impl ScorePolicy {
    /// Score after a successful probe
    pub fn on_success(&self, current: f64) -> f64 {
        (sanitize(current) * self.q + self.gain * self.p).min(self.max)
    }

    /// Score after a failed probe
    pub fn on_failure(&self, current: f64) -> f64 {
        (sanitize(current) * self.decay - self.min_drop).max(0.0)
    }

    pub fn apply(&self, current: f64, reachable: bool) -> f64 {
        if reachable {
            self.on_success(current)
        } else {
            self.on_failure(current)
        }
    }
}

fn sanitize(score: f64) -> f64 {
    if score.is_finite() {
        score.max(0.0)
    } else {
        0.0
    }
}

/// Accept and stable gates for the published list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub accept: f64,
    pub stable: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            accept: DEFAULT_ACCEPT_SCORE,
            stable: DEFAULT_STABLE_SCORE,
        }
    }
}

impl Thresholds {
    pub fn new(accept: f64, stable: f64) -> Self {
        Self { accept, stable }
    }

    /// Zero (never probed, or probed without success) is never accepted,
    /// whatever the configured threshold.
    pub fn accepts(&self, score: f64) -> bool {
        score > 0.0 && score >= self.accept
    }

    pub fn is_stable(&self, score: f64) -> bool {
        self.accepts(score) && score >= self.stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_grows_until_cap() {
        let policy = ScorePolicy::default();
        let mut score = 0.0;
        let mut rounds = 0;
        while score < DEFAULT_STABLE_SCORE {
            score = policy.on_success(score);
            rounds += 1;
        }
        assert!(rounds > 2, "stability should take several probes");
        for _ in 0..50 {
            score = policy.on_success(score);
        }
        assert_eq!(score, MAX_SCORE);
    }

    #[test]
    fn test_failure_decays_to_zero() {
        let policy = ScorePolicy::default();
        let mut score = MAX_SCORE;
        score = policy.on_failure(score);
        assert!(score < MAX_SCORE * DECAY);
        for _ in 0..20 {
            score = policy.on_failure(score);
        }
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_non_finite_scores_reset() {
        let policy = ScorePolicy::default();
        assert_eq!(policy.on_failure(f64::NAN), 0.0);
        assert_eq!(policy.on_success(f64::NAN), GAIN * P);
    }

    #[test]
    fn test_zero_never_accepted() {
        let lenient = Thresholds::new(0.0, 50.0);
        assert!(!lenient.accepts(0.0));
        assert!(lenient.accepts(0.1));

        let thresholds = Thresholds::default();
        assert!(!thresholds.accepts(4.9));
        assert!(thresholds.accepts(5.0));
        assert!(!thresholds.is_stable(49.9));
        assert!(thresholds.is_stable(50.0));
    }
}
