//! Colle de test : branche le MockMqttClient du devkit sur la couture
//! transport du kernel. Compilé uniquement avec cfg(test).

use crate::reconcile::SubscriptionTransport;
use anyhow::Result;
use rumqttc::QoS;
use std::collections::HashSet;
use vibrion_devkit::MockMqttClient;

impl SubscriptionTransport for MockMqttClient {
    async fn subscribe(&self, topic: &str) -> Result<()> {
        MockMqttClient::subscribe(self, topic, QoS::AtLeastOnce).await
    }

    async fn unsubscribe(&self, topic: &str) -> Result<()> {
        MockMqttClient::unsubscribe(self, topic).await
    }
}

/// Ensemble d'ids moteurs pour les tests de réconciliation
pub fn ids(list: &[&str]) -> HashSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}
