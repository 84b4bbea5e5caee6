/**
 * VIBRION PROBE - Publisher de télémétrie synthétique
 *
 * RÔLE :
 * Binaire autonome qui simule des capteurs moteurs pour développer le
 * kernel sans matériel réel : publie périodiquement des échantillons
 * plausibles (dérive sinusoïdale + seuils de statut) sur les topics
 * devices/{motor_id}/data.
 *
 * UTILISATION :
 * VIBRION_PROBE_MOTORS="MOTOR-001,MOTOR-002" cargo run -p vibrion-probe
 *
 * CONFIGURATION (variables d'environnement) :
 * - VIBRION_PROBE_BROKER_HOST (défaut: localhost)
 * - VIBRION_PROBE_BROKER_PORT (défaut: 1883)
 * - VIBRION_PROBE_MOTORS      (défaut: MOTOR-001)
 * - VIBRION_PROBE_INTERVAL_SECS (défaut: 5)
 */

use rumqttc::{AsyncClient, MqttOptions, QoS};
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

/// Un échantillon plausible pour un moteur au tick donné.
/// Phase décalée par moteur pour que les courbes ne se superposent pas.
fn synth_sample(motor_index: usize, tick: u64) -> (f64, f64, &'static str, f64) {
    let phase = motor_index as f64 * 1.3;
    let t = tick as f64 * 0.12 + phase;

    let temperature = 42.0 + 6.0 * t.sin() + 1.5 * (t * 3.7).sin();
    let vibration = 1.1 + 0.45 * (t * 0.8).cos() + 0.1 * (t * 5.1).sin();

    let status = if temperature > 48.0 {
        "Warning"
    } else if vibration > 1.55 {
        "Fault"
    } else {
        "Nominal"
    };
    // plus le signal s'éloigne du régime nominal, moins on est confiant
    let confidence = (0.95 - 0.04 * (temperature - 42.0).abs() / 6.0).clamp(0.5, 1.0);

    (temperature, vibration, status, confidence)
}

#[tokio::main]
async fn main() {
    let host = std::env::var("VIBRION_PROBE_BROKER_HOST").unwrap_or_else(|_| "localhost".into());
    let port: u16 = std::env::var("VIBRION_PROBE_BROKER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1883);
    let motors: Vec<String> = std::env::var("VIBRION_PROBE_MOTORS")
        .unwrap_or_else(|_| "MOTOR-001".into())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let interval: u64 = std::env::var("VIBRION_PROBE_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);

    println!("[probe] publishing for {} motors to {host}:{port} every {interval}s", motors.len());

    let mut opts = MqttOptions::new("vibrion-probe", &host, port);
    opts.set_keep_alive(Duration::from_secs(15));
    let (client, mut eventloop) = AsyncClient::new(opts, 10);

    // Boucle de connexion en tâche de fond : le publisher ne fait qu'émettre
    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                eprintln!("[probe] MQTT erreur: {e:?}");
                sleep(Duration::from_secs(2)).await;
            }
        }
    });

    let mut tick: u64 = 0;
    loop {
        for (i, motor_id) in motors.iter().enumerate() {
            let (temperature, vibration, status, confidence) = synth_sample(i, tick);
            let payload = serde_json::json!({
                "motor_id": motor_id,
                "temperature": temperature,
                "vibration": vibration,
                "status": status,
                "confidence": confidence,
                "timestamp": OffsetDateTime::now_utc().unix_timestamp(),
            });

            let topic = format!("devices/{motor_id}/data");
            match client.publish(&topic, QoS::AtLeastOnce, false, payload.to_string()).await {
                Ok(()) => println!("[probe] {motor_id}: temp={temperature:.1} vib={vibration:.2} status={status}"),
                Err(e) => eprintln!("[probe] publish failed for {motor_id}: {e:?}"),
            }
        }

        tick += 1;
        sleep(Duration::from_secs(interval)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synth_sample_stays_plausible() {
        for tick in 0..500 {
            let (temp, vib, status, confidence) = synth_sample(0, tick);
            assert!((30.0..60.0).contains(&temp));
            assert!((0.0..3.0).contains(&vib));
            assert!(matches!(status, "Nominal" | "Warning" | "Fault"));
            assert!((0.5..=1.0).contains(&confidence));
        }
    }

    #[test]
    fn test_motors_have_distinct_phases() {
        let (t0, _, _, _) = synth_sample(0, 10);
        let (t1, _, _, _) = synth_sample(1, 10);
        assert_ne!(t0, t1);
    }
}
