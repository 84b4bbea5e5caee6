/**
 * TELEMETRY INGESTOR - Décodage tolérant des messages capteurs
 *
 * RÔLE :
 * Transforme un payload brut (topic devices/{motor_id}/data) en
 * TelemetrySample normalisé, ou en erreur typée — jamais de panique
 * sur entrée malformée, le message fautif est simplement jeté et loggé.
 *
 * FONCTIONNEMENT :
 * - motor_id obligatoire, tout le reste optionnel avec défauts explicites
 * - temperature/vibration : nombre OU chaîne numérique ; échec de coercition
 *   d'un champ → None, sans bloquer les autres champs
 * - status inconnu → Unknown, confidence absente → 0
 * - timestamp Unix secondes si présent, sinon heure de réception
 */

use crate::models::{MotorStatus, TelemetrySample};
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload has no motor_id")]
    MissingMotorId,
}

/// Schéma fil brut : champs volontairement laxistes, la normalisation
/// se fait dans decode()
#[derive(Debug, Deserialize)]
struct TelemetryIn {
    #[serde(default)]
    motor_id: Option<String>,
    #[serde(default)]
    temperature: Option<Value>,
    #[serde(default)]
    vibration: Option<Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Coercition nombre-ou-chaîne ; NaN/inf traités comme absents
fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Décode un payload en échantillon normalisé
pub fn decode(payload: &[u8], received_at: OffsetDateTime) -> Result<TelemetrySample, DecodeError> {
    let raw: TelemetryIn = serde_json::from_slice(payload)?;

    let motor_id = match raw.motor_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(DecodeError::MissingMotorId),
    };

    let timestamp = raw
        .timestamp
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or(received_at);

    Ok(TelemetrySample {
        motor_id,
        temperature: coerce_number(raw.temperature.as_ref()),
        vibration: coerce_number(raw.vibration.as_ref()),
        status: MotorStatus::from_wire(raw.status.as_deref().unwrap_or("Unknown")),
        confidence: coerce_number(raw.confidence.as_ref()).unwrap_or(0.0),
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_800_000_000).unwrap()
    }

    #[test]
    fn test_decode_full_payload() {
        let payload = br#"{"motor_id":"MOTOR-001","temperature":42.5,"vibration":1.2,"status":"Nominal","confidence":0.9,"timestamp":1700000000}"#;
        let sample = decode(payload, now()).unwrap();
        assert_eq!(sample.motor_id, "MOTOR-001");
        assert_eq!(sample.temperature, Some(42.5));
        assert_eq!(sample.vibration, Some(1.2));
        assert_eq!(sample.status, MotorStatus::Nominal);
        assert_eq!(sample.confidence, 0.9);
        assert_eq!(sample.timestamp.unix_timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_decode_defaults() {
        let payload = br#"{"motor_id":"MOTOR-001"}"#;
        let sample = decode(payload, now()).unwrap();
        assert_eq!(sample.temperature, None);
        assert_eq!(sample.vibration, None);
        assert_eq!(sample.status, MotorStatus::Unknown);
        assert_eq!(sample.confidence, 0.0);
        // pas de timestamp dans le payload : heure de réception
        assert_eq!(sample.timestamp, now());
    }

    #[test]
    fn test_decode_numeric_strings() {
        let payload = br#"{"motor_id":"MOTOR-001","temperature":"42.5","vibration":" 1.2 "}"#;
        let sample = decode(payload, now()).unwrap();
        assert_eq!(sample.temperature, Some(42.5));
        assert_eq!(sample.vibration, Some(1.2));
    }

    #[test]
    fn test_non_numeric_field_does_not_block_others() {
        let payload = br#"{"motor_id":"MOTOR-001","temperature":"hot","vibration":1.2}"#;
        let sample = decode(payload, now()).unwrap();
        assert_eq!(sample.temperature, None);
        assert_eq!(sample.vibration, Some(1.2));
    }

    #[test]
    fn test_nan_string_is_treated_as_absent() {
        // "NaN".parse::<f64>() réussit : il faut le filtrer explicitement,
        // sinon NaN != NaN casse la détection de doublons
        let payload = br#"{"motor_id":"MOTOR-001","temperature":"NaN"}"#;
        let sample = decode(payload, now()).unwrap();
        assert_eq!(sample.temperature, None);
    }

    #[test]
    fn test_missing_motor_id_is_rejected() {
        assert!(matches!(
            decode(br#"{"temperature":42.5}"#, now()),
            Err(DecodeError::MissingMotorId)
        ));
        assert!(matches!(
            decode(br#"{"motor_id":""}"#, now()),
            Err(DecodeError::MissingMotorId)
        ));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(decode(b"not json", now()), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_unknown_status_maps_to_unknown() {
        let payload = br#"{"motor_id":"MOTOR-001","status":"exploded"}"#;
        let sample = decode(payload, now()).unwrap();
        assert_eq!(sample.status, MotorStatus::Unknown);
    }
}
