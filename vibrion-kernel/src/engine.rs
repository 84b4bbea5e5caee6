/**
 * TELEMETRY ENGINE - Task écrivain unique de l'état moteurs
 *
 * RÔLE :
 * Possède exclusivement le registre, l'historique et le journal ;
 * toutes les mutations (ingestion MQTT comme CRUD utilisateur) passent
 * par son canal de commandes, ce qui sérialise les écritures sans verrous
 * fins et élimine les entrelacements remove/apply_telemetry.
 *
 * FONCTIONNEMENT :
 * - EngineHandle (clonable) = façade mpsc + oneshot pour les réponses
 * - Mutation effective → passe de réconciliation des abonnements
 *   (add/remove) puis persistance des deux blobs
 * - Échantillon accepté → mise à jour registre + append historique
 *   + entrée de journal + persistance
 * - Les lecteurs ne reçoivent que des snapshots clonés
 */

use crate::eventlog::EventLog;
use crate::history::{HistoryBuffer, MotorSeries};
use crate::ingest;
use crate::models::{time_label, EventLogEntry, Motor, TelemetrySample};
use crate::reconcile::{Reconciler, SubscriptionTransport};
use crate::registry::{AddOutcome, ApplyOutcome, MotorRegistry};
use crate::store::MotorStore;
use anyhow::{anyhow, Result};
use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot};

enum EngineCommand {
    AddMotor {
        id: String,
        name: String,
        location: String,
        resp: oneshot::Sender<AddOutcome>,
    },
    RemoveMotor {
        id: String,
        resp: oneshot::Sender<bool>,
    },
    Ingest {
        topic: String,
        payload: Vec<u8>,
    },
    ConnectionUp,
    ConnectionDown,
    Motors {
        resp: oneshot::Sender<Vec<Motor>>,
    },
    History {
        motor_id: String,
        resp: oneshot::Sender<Option<MotorSeries>>,
    },
    Log {
        resp: oneshot::Sender<Vec<EventLogEntry>>,
    },
}

/// Façade clonable vers la task engine
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    async fn send(&self, cmd: EngineCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| anyhow!("engine task stopped"))
    }

    pub async fn add_motor(&self, id: &str, name: &str, location: &str) -> Result<AddOutcome> {
        let (resp, rx) = oneshot::channel();
        self.send(EngineCommand::AddMotor {
            id: id.to_string(),
            name: name.to_string(),
            location: location.to_string(),
            resp,
        })
        .await?;
        Ok(rx.await?)
    }

    /// Idempotent : retourne false si l'id était déjà absent
    pub async fn remove_motor(&self, id: &str) -> Result<bool> {
        let (resp, rx) = oneshot::channel();
        self.send(EngineCommand::RemoveMotor { id: id.to_string(), resp }).await?;
        Ok(rx.await?)
    }

    pub async fn ingest(&self, topic: String, payload: Vec<u8>) -> Result<()> {
        self.send(EngineCommand::Ingest { topic, payload }).await
    }

    pub async fn connection_up(&self) -> Result<()> {
        self.send(EngineCommand::ConnectionUp).await
    }

    pub async fn connection_down(&self) -> Result<()> {
        self.send(EngineCommand::ConnectionDown).await
    }

    pub async fn motors(&self) -> Result<Vec<Motor>> {
        let (resp, rx) = oneshot::channel();
        self.send(EngineCommand::Motors { resp }).await?;
        Ok(rx.await?)
    }

    pub async fn history(&self, motor_id: &str) -> Result<Option<MotorSeries>> {
        let (resp, rx) = oneshot::channel();
        self.send(EngineCommand::History { motor_id: motor_id.to_string(), resp }).await?;
        Ok(rx.await?)
    }

    pub async fn log(&self) -> Result<Vec<EventLogEntry>> {
        let (resp, rx) = oneshot::channel();
        self.send(EngineCommand::Log { resp }).await?;
        Ok(rx.await?)
    }
}

struct Engine<T: SubscriptionTransport> {
    registry: MotorRegistry,
    history: HistoryBuffer,
    log: EventLog,
    store: MotorStore,
    reconciler: Reconciler<T>,
    rx: mpsc::Receiver<EngineCommand>,
}

/// Démarre la task engine avec l'état rechargé du disque
pub fn spawn_engine<T>(
    history_window: usize,
    log_cap: usize,
    store: MotorStore,
    motors: Vec<Motor>,
    entries: Vec<EventLogEntry>,
    transport: T,
) -> EngineHandle
where
    T: SubscriptionTransport + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(256);
    let engine = Engine {
        registry: MotorRegistry::from_motors(motors),
        history: HistoryBuffer::new(history_window),
        log: EventLog::from_entries(log_cap, entries),
        store,
        reconciler: Reconciler::new(transport),
        rx,
    };
    tokio::spawn(engine.run());
    EngineHandle { tx }
}

impl<T: SubscriptionTransport + Send> Engine<T> {
    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            self.handle(cmd).await;
        }
        println!("[engine] command channel closed, stopping");
    }

    async fn handle(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::AddMotor { id, name, location, resp } => {
                let outcome = self.registry.add(&id, &name, &location);
                if outcome == AddOutcome::Added {
                    self.reconciler.sync(&self.registry.ids()).await;
                    self.persist().await;
                }
                let _ = resp.send(outcome);
            }
            EngineCommand::RemoveMotor { id, resp } => {
                let removed = self.registry.remove(&id);
                if removed {
                    self.history.remove(&id);
                    self.reconciler.sync(&self.registry.ids()).await;
                    self.persist().await;
                }
                let _ = resp.send(removed);
            }
            EngineCommand::Ingest { topic, payload } => {
                match ingest::decode(&payload, OffsetDateTime::now_utc()) {
                    Ok(sample) => self.apply_sample(sample).await,
                    Err(e) => eprintln!("[engine] dropped message on {topic}: {e}"),
                }
            }
            EngineCommand::ConnectionUp => {
                println!("[engine] transport up, reconciling {} motors", self.registry.len());
                self.reconciler.mark_connected();
                // réabonne tous les moteurs connus avant la connexion
                self.reconciler.sync(&self.registry.ids()).await;
            }
            EngineCommand::ConnectionDown => {
                self.reconciler.mark_disconnected();
            }
            EngineCommand::Motors { resp } => {
                let _ = resp.send(self.registry.snapshot());
            }
            EngineCommand::History { motor_id, resp } => {
                let _ = resp.send(self.history.snapshot(&motor_id));
            }
            EngineCommand::Log { resp } => {
                let _ = resp.send(self.log.snapshot());
            }
        }
    }

    async fn apply_sample(&mut self, sample: TelemetrySample) {
        match self.registry.apply_telemetry(&sample) {
            ApplyOutcome::Applied { name } => {
                self.history.append(
                    &sample.motor_id,
                    sample.temperature,
                    sample.vibration,
                    time_label(sample.timestamp),
                );
                self.log.append(EventLogEntry::from_sample(&sample, &name));
                self.persist().await;
            }
            ApplyOutcome::Unchanged => {}
            ApplyOutcome::Stale => {
                eprintln!("[engine] rejected stale sample for {}", sample.motor_id)
            }
            ApplyOutcome::UnknownMotor => {
                eprintln!("[engine] telemetry for unknown motor {}, dropped", sample.motor_id)
            }
        }
    }

    async fn persist(&self) {
        let motors = self.registry.snapshot();
        let entries = self.log.snapshot();
        if let Err(e) = self.store.save(&motors, &entries).await {
            eprintln!("[engine] persistence failed, in-memory state kept: {e}");
        }
    }
}
