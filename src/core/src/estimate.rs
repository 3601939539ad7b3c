//! Exponentially damped online estimate
//!
//! `new = damping × old + (1 − damping) × observation`
//!
//! Belief propagation damps its messages and beliefs with this recurrence and the
//! reputation ledger uses it for the Bayesian-style score update. Each caller keeps
//! its own damping constant.

/// Blend an observation into a running estimate.
///
/// `damping` is clamped to [0, 1]; 1.0 ignores the observation, 0.0 replaces the
/// estimate with it.
#[inline]
pub fn damped_update(old: f64, observation: f64, damping: f64) -> f64 {
    let damping = damping.clamp(0.0, 1.0);
    damping * old + (1.0 - damping) * observation
}
