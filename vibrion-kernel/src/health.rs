use crate::mqtt::ConnState;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub motors_tracked: u32,
    pub log_entries: u32,
    pub mqtt_connected: bool,
    pub mqtt_status: String,
    pub mqtt_reconnects: u32,
}

/// Suivi de la connectivité transport, partagé entre la boucle MQTT
/// (écriture) et l'API REST (lecture)
#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    mqtt_reconnects: Arc<AtomicU32>,
    mqtt_state: Arc<parking_lot::Mutex<ConnState>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            mqtt_reconnects: Arc::new(AtomicU32::new(0)),
            mqtt_state: Arc::new(parking_lot::Mutex::new(ConnState::Connecting)),
        }
    }

    pub fn mark_connected(&self) {
        *self.mqtt_state.lock() = ConnState::Connected;
    }

    pub fn mark_disconnected(&self) {
        *self.mqtt_state.lock() = ConnState::Disconnected;
    }

    pub fn increment_reconnects(&self) {
        self.mqtt_reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        *self.mqtt_state.lock() == ConnState::Connected
    }

    pub fn get_health(&self, motors_tracked: u32, log_entries: u32) -> KernelHealth {
        let state = *self.mqtt_state.lock();
        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            motors_tracked,
            log_entries,
            mqtt_connected: state == ConnState::Connected,
            mqtt_status: state.as_str().to_string(),
            mqtt_reconnects: self.mqtt_reconnects.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_transitions() {
        let tracker = HealthTracker::new();
        assert!(!tracker.is_connected());

        tracker.mark_connected();
        assert!(tracker.is_connected());
        assert_eq!(tracker.get_health(2, 5).mqtt_status, "connected");

        tracker.mark_disconnected();
        tracker.increment_reconnects();
        let health = tracker.get_health(2, 5);
        assert!(!health.mqtt_connected);
        assert_eq!(health.mqtt_reconnects, 1);
        assert_eq!(health.motors_tracked, 2);
    }
}
