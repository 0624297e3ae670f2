//! MQTT remote control
//!
//! Connects to a broker, subscribes to one topic and forwards every payload
//! that parses as a [`Command`] to the frame loop.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};

use crate::control::{parse_command, Command};

pub const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "cubetune/control";
const CLIENT_ID: &str = "cubetune";

/// MQTT client that receives commands on a background thread
pub struct MqttClient {
    receiver: Receiver<Command>,
    _thread: thread::JoinHandle<()>,
}

impl MqttClient {
    /// Connect and subscribe. Fails if the broker cannot be reached.
    pub fn new(host: &str, topic: &str) -> Result<Self, String> {
        let host = if host.is_empty() { DEFAULT_HOST } else { host };
        let topic = if topic.is_empty() { DEFAULT_TOPIC } else { topic };

        let mut options = MqttOptions::new(CLIENT_ID, host, DEFAULT_PORT);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut connection) = Client::new(options, 10);
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| format!("Failed to subscribe to topic '{}': {}", topic, e))?;

        // Fail fast when the broker is unreachable
        match connection.iter().next() {
            Some(Ok(_)) => {},
            Some(Err(e)) => {
                return Err(format!(
                    "Failed to connect to MQTT broker at {}:{} - {}",
                    host, DEFAULT_PORT, e
                ));
            },
            None => {
                return Err(format!(
                    "Failed to connect to MQTT broker at {}:{} - connection closed",
                    host, DEFAULT_PORT
                ));
            },
        }

        let (sender, receiver) = mpsc::channel();
        let topic_owned = topic.to_string();
        let handle = thread::spawn(move || {
            // The client handle must outlive the event loop
            let _client = client;
            Self::message_loop(connection, &sender, &topic_owned);
        });

        info!("MQTT: connected to {}:{}, subscribed to '{}'", host, DEFAULT_PORT, topic);

        Ok(Self {
            receiver,
            _thread: handle,
        })
    }

    fn message_loop(mut connection: Connection, sender: &Sender<Command>, topic: &str) {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == topic => {
                    let Ok(text) = std::str::from_utf8(&publish.payload) else {
                        continue;
                    };
                    match parse_command(text) {
                        Some(command) => {
                            debug!("MQTT command: {:?}", command);
                            if sender.send(command).is_err() {
                                // Frame loop gone
                                break;
                            }
                        },
                        None => debug!("MQTT: ignoring '{}'", text.trim()),
                    }
                },
                Ok(_) => {},
                Err(e) => {
                    // rumqttc reconnects on the next poll
                    warn!("MQTT error: {}", e);
                    thread::sleep(Duration::from_secs(1));
                },
            }
        }
    }

    /// Drain pending commands (non-blocking)
    pub fn poll(&self) -> Vec<Command> {
        self.receiver.try_iter().collect()
    }
}

/// Split `HOST[:TOPIC]`
pub fn parse_target(spec: &str) -> (String, String) {
    match spec.split_once(':') {
        Some((host, topic)) => (host.to_string(), topic.to_string()),
        None => (spec.to_string(), String::new()),
    }
}
