/**
 * VIBRION KERNEL - Point d'entrée principal du moteur de télémétrie
 *
 * RÔLE :
 * Orchestration de tous les modules : config, persistance, engine
 * écrivain unique, connexion MQTT, réconciliation, API REST.
 *
 * ARCHITECTURE : ingestion event-driven via MQTT + task engine possédant
 * l'état + API REST de lecture/CRUD. L'état survit aux redémarrages via
 * deux blobs JSON (motors.json + eventlog.json).
 */

mod config;
mod engine;
mod eventlog;
mod health;
mod history;
mod http;
mod ingest;
mod models;
mod mqtt;
mod reconcile;
mod registry;
mod store;
#[cfg(test)]
mod testsupport;

use crate::config::load_config;
use crate::engine::spawn_engine;
use crate::health::HealthTracker;
use crate::store::MotorStore;

use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    let cfg = load_config().await;

    std::fs::create_dir_all(&cfg.data_dir).unwrap_or_else(|e| {
        eprintln!("[kernel] warning: failed to create data dir: {e}");
    });

    // État persisté : registre + journal rechargés en entier
    let store = MotorStore::new(&cfg.data_dir);
    let (motors, entries) = store.load().await;
    println!("[kernel] loaded {} motors, {} log entries", motors.len(), entries.len());

    // Connexion broker unique, partagée entre réconciliation et réception
    let (client, eventloop) = mqtt::create_mqtt_client(&cfg);

    let health = HealthTracker::new();

    // Task écrivain unique : toutes les mutations passent par son canal
    let engine = spawn_engine(cfg.history_window, cfg.log_cap, store, motors, entries, client);

    // La boucle MQTT alimente l'engine (messages + transitions de connexion)
    mqtt::spawn_mqtt_listener(eventloop, engine.clone(), health.clone());

    // HTTP
    let app = http::build_router(http::AppState { engine, health });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    println!("[kernel] listening on http://{addr}");
    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
