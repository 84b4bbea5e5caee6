/**
 * SUBSCRIPTION RECONCILER - Delta minimal d'abonnements MQTT
 *
 * RÔLE :
 * Maintient l'ensemble des topics abonnés en miroir exact du registre
 * moteurs, sans jamais tout se réabonner : uniquement le delta
 * (désiré − courant) à abonner et (courant − désiré) à désabonner.
 *
 * FONCTIONNEMENT :
 * - L'ensemble "courant" local n'est mis à jour QUE sur succès transport ;
 *   un subscribe raté sera retenté à la prochaine passe (toute mutation
 *   du registre ou reconnexion déclenche une passe)
 * - Déconnexion : l'état broker devient inconnu, on vide l'ensemble local
 *   pour que la reconnexion réabonne tout
 */

use anyhow::Result;
use rumqttc::{AsyncClient, QoS};
use std::collections::HashSet;
use std::future::Future;

/// Topic de données d'un moteur
pub fn motor_topic(motor_id: &str) -> String {
    format!("devices/{motor_id}/data")
}

/// Couture transport : le vrai client rumqttc en production,
/// le MockMqttClient du devkit dans les tests
pub trait SubscriptionTransport {
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<()>> + Send;
    fn unsubscribe(&self, topic: &str) -> impl Future<Output = Result<()>> + Send;
}

impl SubscriptionTransport for AsyncClient {
    async fn subscribe(&self, topic: &str) -> Result<()> {
        AsyncClient::subscribe(self, topic, QoS::AtLeastOnce).await?;
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<()> {
        AsyncClient::unsubscribe(self, topic).await?;
        Ok(())
    }
}

pub struct Reconciler<T> {
    transport: T,
    /// Topics que l'on croit abonnés côté broker
    subscribed: HashSet<String>,
    connected: bool,
}

impl<T: SubscriptionTransport> Reconciler<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            subscribed: HashSet::new(),
            connected: false,
        }
    }

    pub fn mark_connected(&mut self) {
        self.connected = true;
    }

    /// La fermeture de connexion perd implicitement tous les abonnements
    /// côté broker : on oublie l'ensemble local pour tout réabonner ensuite
    pub fn mark_disconnected(&mut self) {
        self.connected = false;
        self.subscribed.clear();
    }

    /// Une passe de réconciliation vers l'ensemble désiré.
    /// Topics disjoints par id moteur : l'ordre unsubscribe/subscribe
    /// n'affecte pas la correction.
    pub async fn sync(&mut self, motor_ids: &HashSet<String>) {
        if !self.connected {
            return;
        }

        let desired: HashSet<String> = motor_ids.iter().map(|id| motor_topic(id)).collect();
        let to_remove: Vec<String> = self.subscribed.difference(&desired).cloned().collect();
        let to_add: Vec<String> = desired.difference(&self.subscribed).cloned().collect();

        for topic in to_remove {
            match self.transport.unsubscribe(&topic).await {
                Ok(()) => {
                    self.subscribed.remove(&topic);
                    println!("[reconcile] unsubscribed from {topic}");
                }
                Err(e) => eprintln!("[reconcile] unsubscribe failed for {topic}: {e}"),
            }
        }

        for topic in to_add {
            match self.transport.subscribe(&topic).await {
                Ok(()) => {
                    self.subscribed.insert(topic.clone());
                    println!("[reconcile] subscribed to {topic}");
                }
                Err(e) => eprintln!("[reconcile] subscribe failed for {topic}: {e}"),
            }
        }
    }

    #[cfg(test)]
    pub fn subscribed_topics(&self) -> &HashSet<String> {
        &self.subscribed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::ids;
    use vibrion_devkit::MockMqttClient;

    #[tokio::test]
    async fn test_sync_mirrors_registry_exactly() {
        let mock = MockMqttClient::new();
        let mut rec = Reconciler::new(mock.clone());
        rec.mark_connected();

        rec.sync(&ids(&["MOTOR-001", "MOTOR-002"])).await;
        let mut topics = mock.get_subscriptions();
        topics.sort();
        assert_eq!(topics, vec!["devices/MOTOR-001/data", "devices/MOTOR-002/data"]);

        // retrait d'un moteur : seul son topic est désabonné
        rec.sync(&ids(&["MOTOR-002"])).await;
        assert_eq!(mock.get_subscriptions(), vec!["devices/MOTOR-002/data"]);
        assert_eq!(rec.subscribed_topics().len(), 1);
    }

    #[tokio::test]
    async fn test_no_churn_when_set_is_unchanged() {
        let mock = MockMqttClient::new();
        let mut rec = Reconciler::new(mock.clone());
        rec.mark_connected();

        rec.sync(&ids(&["MOTOR-001"])).await;
        rec.sync(&ids(&["MOTOR-001"])).await;
        // pas de résabonnement : un seul appel subscribe au total
        assert_eq!(mock.subscribe_call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_subscribe_is_retried_next_pass() {
        let mock = MockMqttClient::new();
        let mut rec = Reconciler::new(mock.clone());
        rec.mark_connected();

        mock.set_fail_subscribes(true);
        rec.sync(&ids(&["MOTOR-001"])).await;
        assert!(mock.get_subscriptions().is_empty());
        assert!(rec.subscribed_topics().is_empty());

        mock.set_fail_subscribes(false);
        rec.sync(&ids(&["MOTOR-001"])).await;
        assert_eq!(mock.get_subscriptions(), vec!["devices/MOTOR-001/data"]);
    }

    #[tokio::test]
    async fn test_disconnect_clears_tracked_set() {
        let mock = MockMqttClient::new();
        let mut rec = Reconciler::new(mock.clone());
        rec.mark_connected();

        rec.sync(&ids(&["MOTOR-001"])).await;
        rec.mark_disconnected();
        assert!(rec.subscribed_topics().is_empty());

        // pas de passe tant que la connexion n'est pas rétablie
        rec.sync(&ids(&["MOTOR-001"])).await;
        assert_eq!(mock.subscribe_call_count(), 1);

        rec.mark_connected();
        rec.sync(&ids(&["MOTOR-001"])).await;
        assert_eq!(mock.subscribe_call_count(), 2);
    }
}
