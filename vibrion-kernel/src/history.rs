use serde::Serialize;
use std::collections::HashMap;

/// Trois séquences parallèles bornées pour les graphiques d'un moteur.
/// Invariant : les trois ont toujours la même longueur ≤ fenêtre.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MotorSeries {
    pub temperature: Vec<Option<f64>>,
    pub vibration: Vec<Option<f64>>,
    pub timestamps: Vec<String>,
}

impl MotorSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }
}

/// Fenêtre glissante FIFO des derniers échantillons par moteur.
/// Série créée paresseusement à la première télémétrie acceptée,
/// détruite à la suppression du moteur.
#[derive(Debug)]
pub struct HistoryBuffer {
    window: usize,
    series: HashMap<String, MotorSeries>,
}

impl HistoryBuffer {
    pub fn new(window: usize) -> Self {
        Self { window, series: HashMap::new() }
    }

    /// Ajoute un échantillon, en évinçant le plus ancien si la fenêtre est pleine
    pub fn append(
        &mut self,
        motor_id: &str,
        temperature: Option<f64>,
        vibration: Option<f64>,
        label: String,
    ) {
        let series = self.series.entry(motor_id.to_string()).or_default();
        if series.len() >= self.window {
            series.temperature.remove(0);
            series.vibration.remove(0);
            series.timestamps.remove(0);
        }
        series.temperature.push(temperature);
        series.vibration.push(vibration);
        series.timestamps.push(label);
    }

    /// Supprime entièrement la série d'un moteur
    pub fn remove(&mut self, motor_id: &str) {
        self.series.remove(motor_id);
    }

    /// Snapshot cloné ; None si aucune télémétrie acceptée pour ce moteur
    pub fn snapshot(&self, motor_id: &str) -> Option<MotorSeries> {
        self.series.get(motor_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_eviction_keeps_most_recent() {
        let mut buf = HistoryBuffer::new(60);
        for i in 0..65 {
            buf.append("MOTOR-001", Some(i as f64), Some(1.0), format!("t{i}"));
        }
        let series = buf.snapshot("MOTOR-001").unwrap();
        assert_eq!(series.len(), 60);
        // le premier échantillon retenu est le 6e ajouté (index 5)
        assert_eq!(series.temperature[0], Some(5.0));
        assert_eq!(series.timestamps[0], "t5");
        assert_eq!(series.temperature[59], Some(64.0));
    }

    #[test]
    fn test_parallel_sequences_stay_equal_length() {
        let mut buf = HistoryBuffer::new(3);
        buf.append("MOTOR-001", Some(1.0), None, "a".into());
        buf.append("MOTOR-001", None, Some(2.0), "b".into());
        buf.append("MOTOR-001", Some(3.0), Some(3.0), "c".into());
        buf.append("MOTOR-001", Some(4.0), Some(4.0), "d".into());

        let series = buf.snapshot("MOTOR-001").unwrap();
        assert_eq!(series.temperature.len(), 3);
        assert_eq!(series.vibration.len(), 3);
        assert_eq!(series.timestamps.len(), 3);
        assert_eq!(series.vibration[0], Some(2.0));
    }

    #[test]
    fn test_remove_deletes_series() {
        let mut buf = HistoryBuffer::new(60);
        buf.append("MOTOR-001", Some(1.0), Some(1.0), "a".into());
        buf.remove("MOTOR-001");
        assert!(buf.snapshot("MOTOR-001").is_none());
    }
}
