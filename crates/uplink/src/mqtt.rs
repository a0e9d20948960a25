//! MQTT Uplink

use crate::{Delivery, Uplink, UplinkError};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// MQTT uplink configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker host
    pub broker_host: String,
    /// MQTT port
    pub broker_port: u16,
    /// Client identifier; generated when empty
    pub client_id: String,
    /// Topic records are published to
    pub topic: String,
    /// Keep-alive interval
    pub keep_alive_secs: u64,
    /// How long a publish may wait for the broker's PUBACK
    pub ack_timeout_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: String::new(),
            topic: "bridge/records".to_string(),
            keep_alive_secs: 30,
            ack_timeout_secs: 10,
        }
    }
}

/// Session activity relayed from the event loop task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEvent {
    /// A publish left with this packet id
    Sent(u16),
    /// The broker acknowledged this packet id
    Acked(u16),
    /// The connection dropped
    Lost,
}

/// Publishes each record as one QoS 1 message.
///
/// A delivery succeeds only once the broker acknowledges it. Delivery fails
/// fast while the broker session is down, so the forwarder requeues instead
/// of waiting on the connection.
pub struct MqttUplink {
    config: MqttConfig,
    client: Option<AsyncClient>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    connected: Arc<AtomicBool>,
}

impl MqttUplink {
    /// Create an unconnected uplink
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            client: None,
            events: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the MQTT session. Must run inside a tokio runtime.
    pub fn connect(&mut self) -> Result<(), UplinkError> {
        let client_id = if self.config.client_id.is_empty() {
            format!("bridge-{}", Uuid::new_v4())
        } else {
            self.config.client_id.clone()
        };
        if self.config.broker_host.is_empty() {
            return Err(UplinkError::Connection("broker host not set".to_string()));
        }

        let mut options = MqttOptions::new(
            client_id,
            self.config.broker_host.clone(),
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs.max(5)));

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let connected = Arc::clone(&self.connected);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // Spawn event loop handler
        tokio::spawn(async move {
            loop {
                let event = match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT session established");
                        connected.store(true, Ordering::Relaxed);
                        continue;
                    }
                    Ok(Event::Incoming(Packet::PubAck(ack))) => SessionEvent::Acked(ack.pkid),
                    Ok(Event::Outgoing(Outgoing::Publish(pkid))) => SessionEvent::Sent(pkid),
                    Ok(Event::Incoming(incoming)) => {
                        debug!("MQTT incoming: {:?}", incoming);
                        continue;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        if connected.swap(false, Ordering::Relaxed) {
                            error!("MQTT session lost: {}", e);
                            let _ = events_tx.send(SessionEvent::Lost);
                        } else {
                            debug!("MQTT connect error: {}", e);
                        }
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        continue;
                    }
                };
                if events_tx.send(event).is_err() {
                    debug!("MQTT uplink dropped, event loop exiting");
                    break;
                }
            }
        });

        self.client = Some(client);
        self.events = Some(events_rx);
        info!(
            "MQTT uplink to {}:{} topic {}",
            self.config.broker_host, self.config.broker_port, self.config.topic
        );
        Ok(())
    }

    /// Check whether the broker session is up
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Wait for the first publish sent after this call to be acknowledged.
///
/// Acks for other packet ids are ignored; a lost session or an expired
/// `timeout` fails the delivery.
async fn await_ack(
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    timeout: Duration,
) -> Result<u16, UplinkError> {
    let wait = async {
        let mut sent = None;
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Sent(pkid) if sent.is_none() => sent = Some(pkid),
                SessionEvent::Acked(pkid) if sent == Some(pkid) => return Ok(pkid),
                SessionEvent::Lost => {
                    return Err(UplinkError::Connection("broker session lost".to_string()))
                }
                _ => {}
            }
        }
        Err(UplinkError::Connection("event loop stopped".to_string()))
    };

    tokio::time::timeout(timeout, wait).await.map_err(|_| {
        warn!("No PUBACK within {:?}", timeout);
        UplinkError::Publish(format!("no PUBACK within {:?}", timeout))
    })?
}

#[async_trait]
impl Uplink for MqttUplink {
    async fn deliver(&mut self, record: &str) -> Result<Delivery, UplinkError> {
        if !self.is_connected() {
            return Err(UplinkError::Connection("broker session down".to_string()));
        }
        let (Some(client), Some(events)) = (self.client.as_ref(), self.events.as_mut()) else {
            return Err(UplinkError::Connection("Not connected".to_string()));
        };

        // Anything left over belongs to an earlier, already failed delivery
        while events.try_recv().is_ok() {}

        client
            .publish(&self.config.topic, QoS::AtLeastOnce, false, record.as_bytes().to_vec())
            .await
            .map_err(|e| UplinkError::Publish(e.to_string()))?;

        let timeout = Duration::from_secs(self.config.ack_timeout_secs.max(1));
        let pkid = await_ack(events, timeout).await?;
        debug!("PUBACK for packet {}", pkid);
        Ok(Delivery::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_before_connect_fails() {
        let mut uplink = MqttUplink::new(MqttConfig::default());
        let err = uplink.deliver("record").await.unwrap_err();
        assert!(matches!(err, UplinkError::Connection(_)));
    }

    #[tokio::test]
    async fn test_deliver_fails_until_session_up() {
        let mut uplink = MqttUplink::new(MqttConfig {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1,
            ..Default::default()
        });
        uplink.connect().unwrap();
        assert!(!uplink.is_connected());
        assert!(uplink.deliver("record").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_ack_times_out() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(SessionEvent::Sent(7)).unwrap();

        let err = await_ack(&mut rx, Duration::from_secs(10)).await.unwrap_err();
        assert!(matches!(err, UplinkError::Publish(_)));
    }

    #[tokio::test]
    async fn test_ack_matched_by_packet_id() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        for event in [
            SessionEvent::Sent(7),
            SessionEvent::Acked(6),
            SessionEvent::Sent(8),
            SessionEvent::Acked(7),
        ] {
            tx.send(event).unwrap();
        }

        assert_eq!(await_ack(&mut rx, Duration::from_secs(10)).await, Ok(7));
    }

    #[tokio::test]
    async fn test_session_loss_before_ack_fails() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(SessionEvent::Sent(7)).unwrap();
        tx.send(SessionEvent::Lost).unwrap();

        let err = await_ack(&mut rx, Duration::from_secs(10)).await.unwrap_err();
        assert!(matches!(err, UplinkError::Connection(_)));
    }

    #[test]
    fn test_empty_host_rejected() {
        let mut uplink = MqttUplink::new(MqttConfig {
            broker_host: String::new(),
            ..Default::default()
        });
        assert!(uplink.connect().is_err());
    }
}
