use crate::models::EventLogEntry;
use std::collections::VecDeque;

/// Journal d'audit des transitions d'état, append-only.
/// Cap configurable : au-delà, les entrées les plus anciennes sont évincées
/// (la source originale gardait tout indéfiniment, croissance non bornée).
#[derive(Debug)]
pub struct EventLog {
    cap: usize,
    entries: VecDeque<EventLogEntry>,
}

impl EventLog {
    pub fn new(cap: usize) -> Self {
        Self { cap, entries: VecDeque::new() }
    }

    /// Reconstruit le journal depuis les entrées persistées, en appliquant le cap
    pub fn from_entries(cap: usize, entries: Vec<EventLogEntry>) -> Self {
        let mut log = Self::new(cap);
        for entry in entries {
            log.append(entry);
        }
        log
    }

    /// Ajout O(1) amorti, n'échoue jamais
    pub fn append(&mut self, entry: EventLogEntry) {
        if self.entries.len() >= self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot cloné, ordre d'arrivée
    pub fn snapshot(&self) -> Vec<EventLogEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MotorStatus;

    fn entry(n: usize) -> EventLogEntry {
        EventLogEntry {
            id: format!("log-{n}-MOTOR-001"),
            timestamp: "2023-11-14T22:13:20Z".to_string(),
            motor: "Pompe A".to_string(),
            status: MotorStatus::Nominal,
            confidence: 0.9,
            temperature: Some(42.5),
            vibration: Some(1.2),
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let mut log = EventLog::new(10);
        log.append(entry(1));
        log.append(entry(2));
        let snap = log.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].id, "log-1-MOTOR-001");
        assert_eq!(snap[1].id, "log-2-MOTOR-001");
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut log = EventLog::new(3);
        for n in 0..5 {
            log.append(entry(n));
        }
        let snap = log.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[0].id, "log-2-MOTOR-001");
        assert_eq!(snap[2].id, "log-4-MOTOR-001");
    }

    #[test]
    fn test_from_entries_applies_cap() {
        let entries: Vec<_> = (0..5).map(entry).collect();
        let log = EventLog::from_entries(2, entries);
        assert_eq!(log.len(), 2);
        assert_eq!(log.snapshot()[0].id, "log-3-MOTOR-001");
    }
}
