use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

/// États possibles d'un moteur surveillé.
/// `Disconnected` tant qu'aucune télémétrie n'est arrivée,
/// `Unknown` si le payload ne précise pas de statut reconnu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotorStatus {
    Disconnected,
    Nominal,
    Warning,
    Fault,
    Unknown,
}

impl MotorStatus {
    /// Mappe la chaîne du payload vers un statut ; tout inconnu devient Unknown
    pub fn from_wire(s: &str) -> Self {
        match s {
            "Disconnected" => MotorStatus::Disconnected,
            "Nominal" => MotorStatus::Nominal,
            "Warning" => MotorStatus::Warning,
            "Fault" => MotorStatus::Fault,
            _ => MotorStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MotorStatus::Disconnected => "Disconnected",
            MotorStatus::Nominal => "Nominal",
            MotorStatus::Warning => "Warning",
            MotorStatus::Fault => "Fault",
            MotorStatus::Unknown => "Unknown",
        }
    }
}

/// État vivant d'un moteur dans le registre.
/// Les mesures restent à None tant qu'aucune télémétrie n'a été acceptée.
#[derive(Debug, Clone, PartialEq)]
pub struct Motor {
    pub id: String,
    pub name: String,
    pub location: String,
    pub status: MotorStatus,
    pub temperature: Option<f64>,
    pub vibration: Option<f64>,
    pub confidence: f64,
    pub last_updated: Option<OffsetDateTime>,
}

impl Motor {
    /// Nouveau moteur, aucune télémétrie reçue
    pub fn new(id: &str, name: &str, location: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            location: location.to_string(),
            status: MotorStatus::Disconnected,
            temperature: None,
            vibration: None,
            confidence: 0.0,
            last_updated: None,
        }
    }
}

/// Échantillon de télémétrie décodé et normalisé (voir ingest.rs pour le décodage)
#[derive(Debug, Clone)]
pub struct TelemetrySample {
    pub motor_id: String,
    pub temperature: Option<f64>,
    pub vibration: Option<f64>,
    pub status: MotorStatus,
    pub confidence: f64,
    pub timestamp: OffsetDateTime,
}

/// Entrée immuable du journal d'audit, append-only.
/// Référence le moteur par nom d'affichage : supprimer le moteur
/// ne supprime pas ses entrées passées.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: String,
    pub timestamp: String,
    pub motor: String,
    pub status: MotorStatus,
    pub confidence: f64,
    pub temperature: Option<f64>,
    pub vibration: Option<f64>,
}

impl EventLogEntry {
    /// Construit une entrée de journal depuis un échantillon accepté.
    /// L'ID composite temps+moteur suffit : jamais dédupliqué ni muté.
    pub fn from_sample(sample: &TelemetrySample, motor_name: &str) -> Self {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        Self {
            id: format!("log-{}-{}", nanos, sample.motor_id),
            timestamp: sample
                .timestamp
                .format(&Rfc3339)
                .unwrap_or_default(),
            motor: motor_name.to_string(),
            status: sample.status,
            confidence: sample.confidence,
            temperature: sample.temperature,
            vibration: sample.vibration,
        }
    }
}

/// Label horaire court pour l'axe X des graphiques (ex: "14:03:27")
pub fn time_label(ts: OffsetDateTime) -> String {
    let fmt = format_description!("[hour]:[minute]:[second]");
    ts.format(fmt).unwrap_or_default()
}
