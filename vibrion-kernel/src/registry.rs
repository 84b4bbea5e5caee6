/**
 * MOTOR REGISTRY - Registre autoritaire des moteurs surveillés
 *
 * RÔLE :
 * Map en mémoire id moteur → état vivant. Source de vérité unique pour
 * l'ingestion, la réconciliation d'abonnements et l'API REST.
 *
 * FONCTIONNEMENT :
 * - add : rejette en silence les doublons (par id OU par nom), warning loggé
 * - remove : idempotent, supprimer un id absent est un no-op
 * - apply_telemetry : ne mute que si au moins un champ diffère réellement
 *   (évite persistances et entrées de journal redondantes) et rejette les
 *   échantillons plus vieux que le dernier accepté (livraison désordonnée)
 *
 * ARCHITECTURE : structure possédée exclusivement par la task engine
 * (écrivain unique) ; les lecteurs reçoivent des snapshots clonés.
 */

use crate::models::{Motor, TelemetrySample};
use std::collections::{HashMap, HashSet};

/// Résultat d'une tentative d'ajout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Un moteur avec le même id ou le même nom existe déjà
    Duplicate,
}

/// Résultat de l'application d'un échantillon de télémétrie
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Au moins un champ a changé ; porte le nom d'affichage pour le journal
    Applied { name: String },
    /// Livraison dupliquée : aucun champ ne diffère
    Unchanged,
    /// Timestamp plus ancien que le dernier accepté, échantillon rejeté
    Stale,
    /// Id absent du registre
    UnknownMotor,
}

#[derive(Debug, Default)]
pub struct MotorRegistry {
    motors: HashMap<String, Motor>,
}

impl MotorRegistry {
    pub fn new() -> Self {
        Self { motors: HashMap::new() }
    }

    /// Reconstruit le registre depuis les moteurs persistés
    pub fn from_motors(motors: Vec<Motor>) -> Self {
        let motors = motors.into_iter().map(|m| (m.id.clone(), m)).collect();
        Self { motors }
    }

    /// Ajoute un moteur ; doublon (id ou nom) = no-op loggé
    pub fn add(&mut self, id: &str, name: &str, location: &str) -> AddOutcome {
        if self.motors.contains_key(id) || self.motors.values().any(|m| m.name == name) {
            eprintln!("[registry] motor already exists: {id}");
            return AddOutcome::Duplicate;
        }
        self.motors.insert(id.to_string(), Motor::new(id, name, location));
        println!("[registry] added motor {id} ({name})");
        AddOutcome::Added
    }

    /// Supprime un moteur ; id absent = no-op
    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.motors.remove(id).is_some();
        if removed {
            println!("[registry] removed motor {id}");
        }
        removed
    }

    /// Applique un échantillon décodé sur le moteur correspondant.
    /// Invariant : last_updated est monotone non décroissant.
    pub fn apply_telemetry(&mut self, sample: &TelemetrySample) -> ApplyOutcome {
        let Some(motor) = self.motors.get_mut(&sample.motor_id) else {
            return ApplyOutcome::UnknownMotor;
        };

        if let Some(last) = motor.last_updated {
            if sample.timestamp < last {
                return ApplyOutcome::Stale;
            }
        }

        let changed = motor.temperature != sample.temperature
            || motor.vibration != sample.vibration
            || motor.status != sample.status
            || motor.confidence != sample.confidence
            || motor.last_updated != Some(sample.timestamp);

        if !changed {
            return ApplyOutcome::Unchanged;
        }

        motor.temperature = sample.temperature;
        motor.vibration = sample.vibration;
        motor.status = sample.status;
        motor.confidence = sample.confidence;
        motor.last_updated = Some(sample.timestamp);

        ApplyOutcome::Applied { name: motor.name.clone() }
    }

    /// Ids actuellement suivis (ensemble désiré pour la réconciliation)
    pub fn ids(&self) -> HashSet<String> {
        self.motors.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.motors.len()
    }

    /// Snapshot cloné, trié par id pour des lectures stables
    pub fn snapshot(&self) -> Vec<Motor> {
        let mut list: Vec<Motor> = self.motors.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }
}
