/**
 * CONNECTION MANAGER - Cycle de vie de la connexion broker unique
 *
 * RÔLE :
 * Possède l'eventloop rumqttc et pilote la machine d'états
 * Disconnected → Connecting → Connected (→ Disconnected sur erreur).
 * Chaque message entrant est transmis tel quel à la task engine ;
 * aucun décodage ici, le chemin de réception doit rester réactif.
 *
 * FONCTIONNEMENT :
 * - ConnAck → health connected + ConnectionUp (réconciliation complète
 *   des moteurs connus avant la connexion)
 * - Erreur/fermeture → health disconnected + ConnectionDown (l'engine
 *   vide l'ensemble d'abonnements local, l'état broker étant inconnu) ;
 *   rumqttc retente la connexion au poll suivant
 */

use crate::config::KernelConfig;
use crate::engine::EngineHandle;
use crate::health::HealthTracker;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions};
use std::time::Duration;
use tokio::task;

/// États de la connexion transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnState::Disconnected => "disconnected",
            ConnState::Connecting => "connecting",
            ConnState::Connected => "connected",
        }
    }
}

pub fn create_mqtt_client(cfg: &KernelConfig) -> (AsyncClient, EventLoop) {
    let mut opts = MqttOptions::new("vibrion-kernel", &cfg.mqtt.host, cfg.mqtt.port);
    opts.set_keep_alive(Duration::from_secs(15));
    AsyncClient::new(opts, 10)
}

pub fn spawn_mqtt_listener(mut eventloop: EventLoop, engine: EngineHandle, health: HealthTracker) {
    task::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    println!("[mqtt] connected to broker");
                    health.mark_connected();
                    if engine.connection_up().await.is_err() {
                        return;
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(p))) => {
                    if engine.ingest(p.topic.clone(), p.payload.to_vec()).await.is_err() {
                        eprintln!("[mqtt] engine gone, stopping listener");
                        return;
                    }
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    println!("[mqtt] broker closed the connection");
                    health.mark_disconnected();
                    let _ = engine.connection_down().await;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("[mqtt] connection error: {e:?}");
                    health.mark_disconnected();
                    health.increment_reconnects();
                    let _ = engine.connection_down().await;
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}
