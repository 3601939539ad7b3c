//! Belief propagation
//!
//! Loopy, damped message passing over unexpired edges. Each edge carries a
//! message derived from its sender's belief:
//!
//! ```text
//! message = belief(from) × (1 − |risk|) × (0.5 if risk ≥ 0 else 1.0)
//! ```
//!
//! so strong edges attenuate more and a betrayal-flagged edge passes on half
//! of what an equally strong vouch would. A node's belief moves towards the
//! mean of its incoming messages (the prior when it has none). Messages and
//! beliefs are both damped against their previous values, and all messages of
//! an iteration are computed from the previous iteration's beliefs.

use std::collections::BTreeMap;
use tracing::debug;
use trustmesh_core::{damped_update, AnomalyReason, AnomalyScore, NodeId, Timestamp};
use trustmesh_graph::Graph;

/// Belief propagation configuration
#[derive(Debug, Clone)]
pub struct BeliefConfig {
    /// Initial belief and belief of nodes without incoming messages
    pub prior: f64,

    /// Weight kept from the previous message value
    pub message_damping: f64,

    /// Weight kept from the previous belief
    pub belief_damping: f64,

    /// Convergence threshold on the largest belief change
    pub epsilon: f64,

    /// Iteration cap
    pub max_iterations: usize,

    /// Nodes with `1 − belief` above this are reported
    pub divergence_cutoff: f64,
}

impl Default for BeliefConfig {
    fn default() -> Self {
        Self {
            prior: 0.5,
            message_damping: 0.5,
            belief_damping: 0.5,
            epsilon: 1e-4,
            max_iterations: 100,
            divergence_cutoff: 0.3,
        }
    }
}

/// Result of one inference run
#[derive(Debug, Clone, PartialEq)]
pub struct BeliefOutcome {
    pub beliefs: BTreeMap<NodeId, f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Largest belief change in the final iteration
    pub max_delta: f64,
}

impl BeliefOutcome {
    pub fn belief(&self, node: NodeId) -> Option<f64> {
        self.beliefs.get(&node).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BeliefPropagation {
    config: BeliefConfig,
}

impl BeliefPropagation {
    pub fn new(config: BeliefConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BeliefConfig {
        &self.config
    }

    /// Run inference over edges unexpired at `now`
    pub fn run(&self, graph: &Graph, now: Timestamp) -> BeliefOutcome {
        let prior = self.config.prior.clamp(0.0, 1.0);
        let mut beliefs: BTreeMap<NodeId, f64> = graph.nodes().map(|n| (n, prior)).collect();

        if beliefs.is_empty() {
            return BeliefOutcome {
                beliefs,
                iterations: 0,
                converged: true,
                max_delta: 0.0,
            };
        }

        let edges: Vec<(NodeId, NodeId, f64)> = graph
            .active_edges(now)
            .map(|e| (e.from, e.to, e.risk))
            .collect();
        let mut messages = vec![prior; edges.len()];

        let mut iterations = 0;
        let mut converged = false;
        let mut max_delta = 0.0;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let mut incoming: BTreeMap<NodeId, (f64, usize)> = BTreeMap::new();
            for (message, &(from, to, risk)) in messages.iter_mut().zip(&edges) {
                let sender = beliefs.get(&from).copied().unwrap_or(prior);
                let raw = Self::edge_message(sender, risk);
                *message = damped_update(*message, raw, self.config.message_damping);

                let slot = incoming.entry(to).or_insert((0.0, 0));
                slot.0 += *message;
                slot.1 += 1;
            }

            max_delta = 0.0;
            for (node, belief) in beliefs.iter_mut() {
                let target = match incoming.get(node) {
                    Some(&(sum, count)) => sum / count as f64,
                    None => prior,
                };
                let updated = damped_update(*belief, target, self.config.belief_damping).clamp(0.0, 1.0);
                max_delta = f64::max(max_delta, (updated - *belief).abs());
                *belief = updated;
            }

            if max_delta < self.config.epsilon {
                converged = true;
                break;
            }
        }

        debug!(
            nodes = beliefs.len(),
            edges = edges.len(),
            iterations,
            converged,
            max_delta,
            "Belief propagation finished"
        );

        BeliefOutcome {
            beliefs,
            iterations,
            converged,
            max_delta,
        }
    }

    /// Nodes whose belief fell more than the cutoff below certainty
    pub fn anomalies(&self, outcome: &BeliefOutcome) -> Vec<AnomalyScore> {
        outcome
            .beliefs
            .iter()
            .filter(|(_, &belief)| 1.0 - belief > self.config.divergence_cutoff)
            .map(|(&node, &belief)| {
                AnomalyScore::new(node, 1.0 - belief, AnomalyReason::BeliefDivergence)
            })
            .collect()
    }

    /// Scale each edge's risk by the mean belief of its endpoints
    pub fn feedback(&self, graph: &mut Graph, outcome: &BeliefOutcome) {
        let prior = self.config.prior;
        graph.reweight_edges(|edge| {
            let from = outcome.belief(edge.from).unwrap_or(prior);
            let to = outcome.belief(edge.to).unwrap_or(prior);
            edge.risk * (from + to) / 2.0
        });
    }

    fn edge_message(sender_belief: f64, risk: f64) -> f64 {
        let attenuation = if risk >= 0.0 { 0.5 } else { 1.0 };
        sender_belief * (1.0 - risk.abs()) * attenuation
    }
}
