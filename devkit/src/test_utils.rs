/*!
Test Harness pour le kernel Vibrion

Facilite l'écriture de tests autour du flux télémétrie avec:
- Setup automatique du mock MQTT
- Injection de télémétrie au format fil
- Assertions sur les messages et abonnements échangés
*/

use crate::mqtt_stub::{MockMqttClient, VibrionMessageBuilder};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use anyhow::Result;

/// Harness de test complet pour le flux télémétrie Vibrion
pub struct TestHarness {
    pub mqtt_client: MockMqttClient,
    expectations: Vec<Expectation>,
}

#[derive(Debug)]
struct Expectation {
    topic: String,
    expected_count: usize,
}

impl TestHarness {
    /// Crée un nouveau harness de test
    pub fn new() -> Self {
        env_logger::try_init().ok(); // Init logging pour tests

        Self {
            mqtt_client: MockMqttClient::new(),
            expectations: Vec::new(),
        }
    }

    /// Ajoute une expectation: on s'attend à recevoir N messages sur un topic
    pub fn expect_messages(&mut self, topic: &str, count: usize) -> &mut Self {
        self.expectations.push(Expectation {
            topic: topic.to_string(),
            expected_count: count,
        });
        self
    }

    /// Simule l'arrivée d'une télémétrie complète sur le topic du moteur
    pub async fn send_telemetry(
        &self,
        motor_id: &str,
        temperature: f64,
        vibration: f64,
        status: &str,
        confidence: f64,
        timestamp: i64,
    ) -> Result<()> {
        let payload = VibrionMessageBuilder::telemetry_v1(
            motor_id, temperature, vibration, status, confidence, timestamp,
        );
        let payload_bytes = serde_json::to_vec(&payload)?;

        self.mqtt_client
            .simulate_incoming(VibrionMessageBuilder::data_topic(motor_id), payload_bytes)
            .await?;
        log::info!("📊 Sent telemetry for motor: {}", motor_id);
        Ok(())
    }

    /// Simule l'arrivée d'un payload brut arbitraire (tests de robustesse)
    pub async fn send_raw(&self, topic: &str, payload: &[u8]) -> Result<()> {
        self.mqtt_client.simulate_incoming(topic, payload.to_vec()).await?;
        log::info!("📨 Sent raw payload on {}", topic);
        Ok(())
    }

    /// Attend et vérifie qu'un message a été publié sur un topic
    pub async fn wait_for_message(&self, topic: &str, timeout_ms: u64) -> Result<Option<Value>> {
        let start = std::time::Instant::now();

        while start.elapsed() < Duration::from_millis(timeout_ms) {
            if let Some(msg) = self.mqtt_client.get_last_json_message::<Value>(topic)? {
                log::info!("✅ Received expected message on {}", topic);
                return Ok(Some(msg));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        log::warn!("⏰ Timeout waiting for message on {}", topic);
        Ok(None)
    }

    /// Vérifie toutes les expectations configurées
    pub fn verify_expectations(&self) -> Result<()> {
        log::info!("🔍 Verifying {} expectations...", self.expectations.len());

        for expectation in &self.expectations {
            let messages = self.mqtt_client.find_messages_by_topic(&expectation.topic);
            let actual_count = messages.len();

            if actual_count != expectation.expected_count {
                anyhow::bail!(
                    "Expectation failed for topic '{}': expected {} messages, got {}",
                    expectation.topic, expectation.expected_count, actual_count
                );
            }

            log::info!("✅ Topic '{}': {} messages as expected",
                      expectation.topic, actual_count);
        }

        Ok(())
    }

    /// Assert qu'un champ a une valeur spécifique dans le dernier message
    pub fn assert_field_equals(&self, topic: &str, field: &str, expected: &Value) -> Result<()> {
        if let Some(msg) = self.mqtt_client.get_last_json_message::<Value>(topic)? {
            if let Some(actual) = msg.get(field) {
                if actual == expected {
                    return Ok(());
                }
                anyhow::bail!("Field '{}' mismatch: expected {:?}, got {:?}", field, expected, actual);
            }
        }

        anyhow::bail!("Field '{}' not found in latest message on {}", field, topic);
    }

    /// Stats sur les messages collectés
    pub fn get_stats(&self) -> TestStats {
        let messages = self.mqtt_client.get_published_messages();
        let mut topic_counts = HashMap::new();

        for msg in &messages {
            *topic_counts.entry(msg.topic.clone()).or_insert(0) += 1;
        }

        TestStats {
            total_messages: messages.len(),
            topic_counts,
            subscriptions: self.mqtt_client.get_subscriptions(),
        }
    }

    /// Reset le harness pour un nouveau test
    pub fn reset(&mut self) {
        self.mqtt_client.clear();
        self.expectations.clear();
        log::info!("🧹 Test harness reset");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct TestStats {
    pub total_messages: usize,
    pub topic_counts: HashMap<String, usize>,
    pub subscriptions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_harness_basic_functionality() {
        let mut harness = TestHarness::new();

        harness.expect_messages("devices/MOTOR-001/data", 1);

        let test_data = VibrionMessageBuilder::telemetry_v1("MOTOR-001", 42.5, 1.2, "Nominal", 0.9, 1_700_000_000);
        harness.mqtt_client.publish("devices/MOTOR-001/data", rumqttc::QoS::AtLeastOnce, false,
                                   serde_json::to_vec(&test_data).unwrap()).await.unwrap();

        harness.verify_expectations().unwrap();
        harness.assert_field_equals("devices/MOTOR-001/data", "status", &Value::String("Nominal".into())).unwrap();

        let stats = harness.get_stats();
        assert_eq!(stats.total_messages, 1);
    }

    #[tokio::test]
    async fn test_send_telemetry_reaches_receiver() {
        let harness = TestHarness::new();
        let mut receiver = harness.mqtt_client.setup_receiver();

        harness.send_telemetry("MOTOR-001", 42.5, 1.2, "Nominal", 0.9, 1_700_000_000).await.unwrap();

        let msg = receiver.recv().await.unwrap();
        assert_eq!(msg.topic, "devices/MOTOR-001/data");
        let parsed: Value = serde_json::from_slice(&msg.payload).unwrap();
        assert_eq!(parsed["temperature"], 42.5);
    }
}
