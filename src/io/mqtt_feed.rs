//! Push-based status feed over MQTT
//!
//! Drop-in replacement for the simulated feed: a backend publishes seat
//! status changes on a topic and they reach the session as ordinary
//! proposals. Payloads are either one change or an array of changes:
//!
//! ```json
//! {"seat_id": "3B", "status": "occupied"}
//! [{"seat_id": "3B", "status": "occupied"}, {"seat_id": "4A", "status": "available"}]
//! ```

use crate::infra::config::Config;
use crate::services::feed::{shutdown_requested, FeedContext, FeedTask, StatusFeed};
use crate::services::selection::StatusChange;
use anyhow::Context;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusPayload {
    One(StatusChange),
    Many(Vec<StatusChange>),
}

/// Decode one MQTT payload into status changes
pub fn parse_status_payload(payload: &[u8]) -> anyhow::Result<Vec<StatusChange>> {
    let text = std::str::from_utf8(payload).context("payload is not UTF-8")?;
    let parsed: StatusPayload = serde_json::from_str(text).context("payload is not a status change")?;
    Ok(match parsed {
        StatusPayload::One(change) => vec![change],
        StatusPayload::Many(changes) => changes,
    })
}

#[derive(Debug, Clone)]
pub struct MqttFeedSettings {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
}

impl MqttFeedSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.mqtt_host().to_string(),
            port: config.mqtt_port(),
            topic: config.mqtt_topic().to_string(),
            username: config.mqtt_username().map(str::to_string),
            password: config.mqtt_password().map(str::to_string),
            client_id: format!("seatview-{}", std::process::id()),
        }
    }
}

pub struct MqttStatusFeed {
    settings: MqttFeedSettings,
    task: Option<FeedTask>,
}

impl MqttStatusFeed {
    pub fn new(settings: MqttFeedSettings) -> Self {
        Self { settings, task: None }
    }
}

impl StatusFeed for MqttStatusFeed {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    fn subscribe(&mut self, ctx: FeedContext) -> anyhow::Result<()> {
        if self.task.is_some() {
            anyhow::bail!("mqtt feed was already subscribed");
        }
        let settings = self.settings.clone();

        let mut mqttoptions = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        mqttoptions.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            mqttoptions.set_credentials(username, password);
        }

        let task = FeedTask::spawn(move |mut shutdown| async move {
            let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);
            let proposals = ctx.proposals;

            loop {
                tokio::select! {
                    _ = shutdown_requested(&mut shutdown) => {
                        let _ = client.disconnect().await;
                        break;
                    }
                    result = eventloop.poll() => match result {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            // Subscribe on every (re)connect
                            if let Err(e) = client.subscribe(&settings.topic, QoS::AtLeastOnce).await {
                                error!(error = %e, "mqtt_subscribe_failed");
                            }
                            info!(host = %settings.host, topic = %settings.topic, "mqtt_feed_connected");
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let changes = match parse_status_payload(&publish.payload) {
                                Ok(changes) => changes,
                                Err(e) => {
                                    warn!(topic = %publish.topic, error = %format!("{:#}", e), "mqtt_payload_rejected");
                                    continue;
                                }
                            };
                            for change in changes {
                                debug!(seat_id = %change.seat_id, status = %change.status.as_str(), "mqtt_proposal");
                                match proposals.try_send(change) {
                                    Ok(()) => {}
                                    Err(TrySendError::Full(change)) => {
                                        warn!(seat_id = %change.seat_id, "mqtt_proposal_dropped");
                                    }
                                    Err(TrySendError::Closed(_)) => return,
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "mqtt_feed_error");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
            debug!("mqtt_feed_stopped");
        })?;

        info!(host = %self.settings.host, port = %self.settings.port, topic = %self.settings.topic, "mqtt_feed_started");
        self.task = Some(task);
        Ok(())
    }

    fn dispose(&mut self) {
        if self.task.take().is_some() {
            info!("mqtt_feed_disposed");
        }
    }
}
