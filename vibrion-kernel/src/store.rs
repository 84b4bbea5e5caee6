/**
 * MOTOR STORE - Persistance JSON du registre et du journal
 *
 * RÔLE :
 * Sérialise le registre moteurs et le journal d'audit vers deux blobs
 * JSON locaux (motors.json + eventlog.json), réécrits en entier après
 * chaque mutation effective, rechargés en entier au démarrage.
 *
 * FONCTIONNEMENT :
 * - Chargement tolérant : fichier absent → état vide ; last_updated
 *   illisible → None plutôt que d'échouer tout le chargement
 * - Un échec d'écriture est loggé, jamais fatal : l'état mémoire reste
 *   autoritaire pour le process en cours
 */

use crate::models::{EventLogEntry, Motor, MotorStatus};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::fs;

/// Représentation disque d'un moteur : last_updated en RFC3339 ou null
#[derive(Debug, Serialize, Deserialize)]
struct PersistedMotor {
    id: String,
    name: String,
    location: String,
    status: MotorStatus,
    temperature: Option<f64>,
    vibration: Option<f64>,
    confidence: f64,
    last_updated: Option<String>,
}

impl PersistedMotor {
    fn from_motor(m: &Motor) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            location: m.location.clone(),
            status: m.status,
            temperature: m.temperature,
            vibration: m.vibration,
            confidence: m.confidence,
            last_updated: m
                .last_updated
                .and_then(|ts| ts.format(&Rfc3339).ok()),
        }
    }

    fn into_motor(self) -> Motor {
        // timestamp persisté illisible : coercé à None, le moteur reste chargé
        let last_updated = self.last_updated.as_deref().and_then(|s| {
            let parsed = OffsetDateTime::parse(s, &Rfc3339).ok();
            if parsed.is_none() {
                eprintln!("[store] invalid last_updated for motor {}: {s:?}", self.id);
            }
            parsed
        });
        Motor {
            id: self.id,
            name: self.name,
            location: self.location,
            status: self.status,
            temperature: self.temperature,
            vibration: self.vibration,
            confidence: self.confidence,
            last_updated,
        }
    }
}

pub struct MotorStore {
    motors_path: PathBuf,
    log_path: PathBuf,
}

impl MotorStore {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        let dir = data_dir.into();
        Self {
            motors_path: dir.join("motors.json"),
            log_path: dir.join("eventlog.json"),
        }
    }

    /// Charge registre et journal ; tout problème dégrade vers l'état vide
    pub async fn load(&self) -> (Vec<Motor>, Vec<EventLogEntry>) {
        let motors = match fs::read_to_string(&self.motors_path).await {
            Ok(content) => match serde_json::from_str::<Vec<PersistedMotor>>(&content) {
                Ok(persisted) => persisted.into_iter().map(PersistedMotor::into_motor).collect(),
                Err(e) => {
                    eprintln!("[store] motors.json invalide, démarrage à vide: {e}");
                    Vec::new()
                }
            },
            Err(_) => {
                println!("[store] no existing motors file, starting fresh");
                Vec::new()
            }
        };

        let entries = match fs::read_to_string(&self.log_path).await {
            Ok(content) => match serde_json::from_str::<Vec<EventLogEntry>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    eprintln!("[store] eventlog.json invalide, journal vide: {e}");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        (motors, entries)
    }

    /// Réécrit les deux blobs en entier
    pub async fn save(&self, motors: &[Motor], entries: &[EventLogEntry]) -> Result<()> {
        let persisted: Vec<PersistedMotor> = motors.iter().map(PersistedMotor::from_motor).collect();
        let motors_json = serde_json::to_string_pretty(&persisted)?;
        fs::write(&self.motors_path, motors_json).await?;

        let log_json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.log_path, log_json).await?;
        Ok(())
    }
}
