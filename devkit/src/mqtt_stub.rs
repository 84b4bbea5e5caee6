/*!
Mock MQTT Client pour développement sans broker

Permet de développer et tester le kernel sans démarrer un broker MQTT réel.
Enregistre publications et abonnements, simule la réception de messages,
et sait injecter des pannes subscribe/unsubscribe pour tester les retries
de réconciliation.
*/

use rumqttc::QoS;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct MockMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// Mock MQTT Client qui simule rumqttc::AsyncClient
#[derive(Clone)]
pub struct MockMqttClient {
    published_messages: Arc<Mutex<Vec<MockMessage>>>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    message_sender: Arc<Mutex<Option<mpsc::UnboundedSender<MockMessage>>>>,
    subscribe_calls: Arc<AtomicUsize>,
    fail_subscribes: Arc<AtomicBool>,
    fail_unsubscribes: Arc<AtomicBool>,
}

impl MockMqttClient {
    pub fn new() -> Self {
        Self {
            published_messages: Arc::new(Mutex::new(Vec::new())),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            message_sender: Arc::new(Mutex::new(None)),
            subscribe_calls: Arc::new(AtomicUsize::new(0)),
            fail_subscribes: Arc::new(AtomicBool::new(false)),
            fail_unsubscribes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Configuration d'un channel pour recevoir les messages simulés
    pub fn setup_receiver(&self) -> mpsc::UnboundedReceiver<MockMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.message_sender.lock().unwrap() = Some(sender);
        receiver
    }

    /// Force l'échec des prochains appels subscribe (test des retries)
    pub fn set_fail_subscribes(&self, fail: bool) {
        self.fail_subscribes.store(fail, Ordering::Relaxed);
    }

    /// Force l'échec des prochains appels unsubscribe
    pub fn set_fail_unsubscribes(&self, fail: bool) {
        self.fail_unsubscribes.store(fail, Ordering::Relaxed);
    }

    /// Simule la publication d'un message (compatible avec AsyncClient)
    pub async fn publish<S, V>(&self, topic: S, qos: QoS, retain: bool, payload: V) -> Result<()>
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        let message = MockMessage {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain,
        };

        self.published_messages.lock().unwrap().push(message.clone());

        log::info!("📤 [MOCK] Published to {}: {} bytes", message.topic, message.payload.len());
        Ok(())
    }

    /// Simule l'abonnement à un topic (compatible avec AsyncClient)
    pub async fn subscribe<S: Into<String>>(&self, topic: S, _qos: QoS) -> Result<()> {
        self.subscribe_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_subscribes.load(Ordering::Relaxed) {
            anyhow::bail!("simulated subscribe failure");
        }

        let topic = topic.into();
        let mut subs = self.subscriptions.lock().unwrap();
        if !subs.contains(&topic) {
            subs.push(topic.clone());
        }
        log::info!("📥 [MOCK] Subscribed to {}", topic);
        Ok(())
    }

    /// Simule le désabonnement d'un topic
    pub async fn unsubscribe<S: Into<String>>(&self, topic: S) -> Result<()> {
        if self.fail_unsubscribes.load(Ordering::Relaxed) {
            anyhow::bail!("simulated unsubscribe failure");
        }

        let topic = topic.into();
        self.subscriptions.lock().unwrap().retain(|t| t != &topic);
        log::info!("📥 [MOCK] Unsubscribed from {}", topic);
        Ok(())
    }

    /// Simule la réception d'un message (pour tests)
    pub async fn simulate_incoming<S, V>(&self, topic: S, payload: V) -> Result<()>
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        let message = MockMessage {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtLeastOnce,
            retain: false,
        };

        if let Some(sender) = self.message_sender.lock().unwrap().as_ref() {
            sender.send(message.clone()).map_err(|e| anyhow::anyhow!("Send error: {}", e))?;
        }

        log::info!("📨 [MOCK] Simulated incoming: {}", message.topic);
        Ok(())
    }

    /// Récupère tous les messages publiés (pour assertions de tests)
    pub fn get_published_messages(&self) -> Vec<MockMessage> {
        self.published_messages.lock().unwrap().clone()
    }

    /// Récupère les abonnements courants (pour assertions de tests)
    pub fn get_subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// Nombre total d'appels subscribe reçus (réussis ou non)
    pub fn subscribe_call_count(&self) -> usize {
        self.subscribe_calls.load(Ordering::Relaxed)
    }

    /// Trouve les messages publiés sur un topic donné
    pub fn find_messages_by_topic(&self, topic: &str) -> Vec<MockMessage> {
        self.published_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|msg| msg.topic == topic)
            .cloned()
            .collect()
    }

    /// Parse le dernier message d'un topic en JSON
    pub fn get_last_json_message<T>(&self, topic: &str) -> Result<Option<T>>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let messages = self.find_messages_by_topic(topic);
        if let Some(last_msg) = messages.last() {
            let parsed: T = serde_json::from_slice(&last_msg.payload)?;
            Ok(Some(parsed))
        } else {
            Ok(None)
        }
    }

    /// Reset tous les messages enregistrés
    pub fn clear(&self) {
        self.published_messages.lock().unwrap().clear();
        self.subscriptions.lock().unwrap().clear();
        self.subscribe_calls.store(0, Ordering::Relaxed);
    }
}

impl Default for MockMqttClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper pour créer des messages de télémétrie au format fil Vibrion
pub struct VibrionMessageBuilder;

impl VibrionMessageBuilder {
    /// Topic de données d'un moteur
    pub fn data_topic(motor_id: &str) -> String {
        format!("devices/{motor_id}/data")
    }

    /// Crée un message télémétrie complet (timestamp Unix secondes)
    pub fn telemetry_v1(
        motor_id: &str,
        temperature: f64,
        vibration: f64,
        status: &str,
        confidence: f64,
        timestamp: i64,
    ) -> Value {
        serde_json::json!({
            "motor_id": motor_id,
            "temperature": temperature,
            "vibration": vibration,
            "status": status,
            "confidence": confidence,
            "timestamp": timestamp
        })
    }

    /// Crée un message télémétrie daté de maintenant
    pub fn telemetry_now(
        motor_id: &str,
        temperature: f64,
        vibration: f64,
        status: &str,
        confidence: f64,
    ) -> Value {
        Self::telemetry_v1(
            motor_id,
            temperature,
            vibration,
            status,
            confidence,
            chrono::Utc::now().timestamp(),
        )
    }

    /// Message minimal : uniquement l'id moteur, le kernel applique les défauts
    pub fn telemetry_minimal(motor_id: &str) -> Value {
        serde_json::json!({ "motor_id": motor_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio;

    #[tokio::test]
    async fn test_mock_client_publish_subscribe() {
        let client = MockMqttClient::new();

        // Test abonnement
        client.subscribe("devices/MOTOR-001/data", QoS::AtLeastOnce).await.unwrap();
        assert_eq!(client.get_subscriptions(), vec!["devices/MOTOR-001/data"]);

        // Test publication
        let payload = b"test message";
        client.publish("devices/MOTOR-001/data", QoS::AtLeastOnce, false, payload.to_vec()).await.unwrap();

        // Vérifier le message publié
        let messages = client.get_published_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, "devices/MOTOR-001/data");
        assert_eq!(messages[0].payload, payload);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_topic() {
        let client = MockMqttClient::new();
        client.subscribe("devices/MOTOR-001/data", QoS::AtLeastOnce).await.unwrap();
        client.subscribe("devices/MOTOR-002/data", QoS::AtLeastOnce).await.unwrap();

        client.unsubscribe("devices/MOTOR-001/data").await.unwrap();
        assert_eq!(client.get_subscriptions(), vec!["devices/MOTOR-002/data"]);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let client = MockMqttClient::new();

        client.set_fail_subscribes(true);
        assert!(client.subscribe("devices/MOTOR-001/data", QoS::AtLeastOnce).await.is_err());
        assert!(client.get_subscriptions().is_empty());
        assert_eq!(client.subscribe_call_count(), 1);

        client.set_fail_subscribes(false);
        client.subscribe("devices/MOTOR-001/data", QoS::AtLeastOnce).await.unwrap();
        assert_eq!(client.get_subscriptions(), vec!["devices/MOTOR-001/data"]);

        client.set_fail_unsubscribes(true);
        assert!(client.unsubscribe("devices/MOTOR-001/data").await.is_err());
        // le topic reste abonné après l'échec
        assert_eq!(client.get_subscriptions(), vec!["devices/MOTOR-001/data"]);
    }

    #[tokio::test]
    async fn test_json_message_parsing() {
        let client = MockMqttClient::new();

        let test_data = VibrionMessageBuilder::telemetry_v1("MOTOR-001", 42.5, 1.2, "Nominal", 0.9, 1_700_000_000);
        let payload = serde_json::to_vec(&test_data).unwrap();
        client.publish("devices/MOTOR-001/data", QoS::AtLeastOnce, false, payload).await.unwrap();

        let parsed: Option<serde_json::Value> = client.get_last_json_message("devices/MOTOR-001/data").unwrap();
        assert!(parsed.is_some());
        assert_eq!(parsed.unwrap()["motor_id"], "MOTOR-001");
    }

    #[test]
    fn test_message_builders() {
        let msg = VibrionMessageBuilder::telemetry_v1("MOTOR-001", 42.5, 1.2, "Nominal", 0.9, 1_700_000_000);
        assert_eq!(msg["motor_id"], "MOTOR-001");
        assert_eq!(msg["temperature"], 42.5);
        assert_eq!(msg["timestamp"], 1_700_000_000i64);

        let minimal = VibrionMessageBuilder::telemetry_minimal("MOTOR-002");
        assert_eq!(minimal["motor_id"], "MOTOR-002");
        assert!(minimal.get("temperature").is_none());

        assert_eq!(VibrionMessageBuilder::data_topic("MOTOR-001"), "devices/MOTOR-001/data");
    }
}
