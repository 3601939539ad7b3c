//! Prioritised anomaly alerts
//!
//! Bounded FIFO log of alerts plus a broadcast channel for live subscribers
//! (the enforcement layer). Oldest alerts are evicted first.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use trustmesh_core::{AnomalyScore, ALERT_THRESHOLD, CRITICAL_THRESHOLD};

pub const DEFAULT_ALERT_CAPACITY: usize = 1000;

/// Alert priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertPriority {
    /// P0: score >= 0.9
    Critical = 0,
    /// P1: score >= 0.7
    Warning = 1,
    /// P2: everything else
    Info = 2,
}

impl AlertPriority {
    pub fn for_score(score: f64) -> Self {
        if score >= CRITICAL_THRESHOLD {
            AlertPriority::Critical
        } else if score >= ALERT_THRESHOLD {
            AlertPriority::Warning
        } else {
            AlertPriority::Info
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub priority: AlertPriority,
    pub anomaly: AnomalyScore,
}

impl Alert {
    pub fn from_anomaly(anomaly: AnomalyScore) -> Self {
        Self {
            timestamp: Utc::now(),
            priority: AlertPriority::for_score(anomaly.score),
            anomaly,
        }
    }
}

pub struct AlertLog {
    alerts: Mutex<VecDeque<Alert>>,
    capacity: usize,
    sender: broadcast::Sender<Alert>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ALERT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            alerts: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            sender,
        }
    }

    /// Record an anomaly, log it by priority and notify subscribers
    pub fn emit(&self, anomaly: AnomalyScore) -> Alert {
        let alert = Alert::from_anomaly(anomaly);
        let node = alert.anomaly.node;
        let score = alert.anomaly.score;
        let reason = alert.anomaly.reason;

        match alert.priority {
            AlertPriority::Critical => {
                error!(%node, score, %reason, "P0 critical anomaly");
            }
            AlertPriority::Warning => {
                warn!(%node, score, %reason, "P1 anomaly warning");
            }
            AlertPriority::Info => {
                info!(%node, score, %reason, "P2 anomaly");
            }
        }

        {
            let mut alerts = self.alerts.lock();
            if alerts.len() >= self.capacity {
                alerts.pop_front();
            }
            alerts.push_back(alert.clone());
        }

        // No subscribers is fine
        let _ = self.sender.send(alert.clone());
        alert
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.sender.subscribe()
    }

    pub fn critical(&self) -> Vec<Alert> {
        self.filtered(|a| a.priority == AlertPriority::Critical)
    }

    /// Alerts at `min_priority` or more urgent
    pub fn at_least(&self, min_priority: AlertPriority) -> Vec<Alert> {
        self.filtered(|a| a.priority <= min_priority)
    }

    pub fn count_by_priority(&self, priority: AlertPriority) -> usize {
        self.alerts
            .lock()
            .iter()
            .filter(|a| a.priority == priority)
            .count()
    }

    /// Newest `limit` alerts, newest first
    pub fn recent(&self, limit: usize) -> Vec<Alert> {
        self.alerts.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.alerts.lock().clear();
    }

    fn filtered<F: Fn(&Alert) -> bool>(&self, predicate: F) -> Vec<Alert> {
        self.alerts
            .lock()
            .iter()
            .filter(|a| predicate(a))
            .cloned()
            .collect()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}
