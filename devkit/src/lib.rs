/*!
# Vibrion DevKit - Stubs et Utilitaires pour Développement

Bibliothèque facilitant le développement autour du kernel Vibrion avec:
- Stub MQTT pour tests sans broker (avec injection de pannes)
- Builders de messages télémétrie conformes au format fil
- Harness de tests avec assertions sur les messages échangés
*/

pub mod mqtt_stub;
pub mod test_utils;

pub use mqtt_stub::{MockMqttClient, VibrionMessageBuilder};
pub use test_utils::TestHarness;
