use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KernelConfig {
    #[serde(default = "default_mqtt")]
    pub mqtt: MqttConf,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Taille de la fenêtre glissante d'historique par moteur
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Nombre max d'entrées du journal d'audit (les plus anciennes sont évincées)
    #[serde(default = "default_log_cap")]
    pub log_cap: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

fn default_mqtt() -> MqttConf {
    MqttConf { host: "localhost".into(), port: 1883 }
}
fn default_http_port() -> u16 {
    8080
}
fn default_data_dir() -> String {
    "./data".into()
}
fn default_history_window() -> usize {
    60
}
fn default_log_cap() -> usize {
    1000
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            mqtt: default_mqtt(),
            http_port: default_http_port(),
            data_dir: default_data_dir(),
            history_window: default_history_window(),
            log_cap: default_log_cap(),
        }
    }
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("VIBRION_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            return KernelConfig::default();
        }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            eprintln!("[kernel] config invalide: {e}");
            KernelConfig::default()
        })
    } else {
        eprintln!("[kernel] pas de kernel.yaml, usage config par défaut");
        KernelConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let cfg: KernelConfig = serde_yaml::from_str("mqtt:\n  host: broker.local\n  port: 1884\n").unwrap();
        assert_eq!(cfg.mqtt.host, "broker.local");
        assert_eq!(cfg.mqtt.port, 1884);
        assert_eq!(cfg.history_window, 60);
        assert_eq!(cfg.log_cap, 1000);
        assert_eq!(cfg.http_port, 8080);
    }
}
