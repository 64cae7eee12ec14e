use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use uuid::Uuid;

use crate::error::{SimError, SimResult};
use crate::state::VehicleRole;
use crate::vehicle::profile::VehicleProfile;
use crate::vehicle::state::ControlInput;
use crate::world::HeistWorld;

pub type SharedWorld = Arc<Mutex<HeistWorld>>;

const PLAYER_SPACING: f32 = 4.0; // m between player spawn slots along X

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Input {
        #[serde(default)]
        throttle: f32,
        #[serde(default)]
        brake: f32,
        #[serde(default)]
        steer: f32,
        #[serde(default)]
        nitro: bool,
    },
    Ping,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome { vehicle_id: Uuid },
    Pong,
}

impl ServerMessage {
    fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

pub async fn bind(addr: &str) -> SimResult<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| SimError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Accept loop. Every connection drives one player car built from `profile`.
pub async fn serve(listener: TcpListener, world: SharedWorld, profile: Arc<VehicleProfile>) {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("WebSocket listening on ws://{}", addr);
    }

    let mut slot: usize = 0;
    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        let spawn_at = Point3::new(slot as f32 * PLAYER_SPACING, 0.0, 0.0);
        slot += 1;

        tokio::spawn(handle_connection(raw, Arc::clone(&world), Arc::clone(&profile), spawn_at, peer.to_string()));
    }
}

async fn handle_connection(
    raw: TcpStream,
    world: SharedWorld,
    profile: Arc<VehicleProfile>,
    spawn_at: Point3<f32>,
    peer: String,
) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(%peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // outgoing replies (welcome, pong) and world events share one writer
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let (vehicle_id, mut events) = {
        let mut game = world.lock().await;
        let events = game.subscribe();
        let id = game.spawn_vehicle(VehicleRole::Player, profile, spawn_at);
        (id, events)
    };
    tracing::info!(%peer, %vehicle_id, "player connected");

    if let Some(welcome) = (ServerMessage::Welcome { vehicle_id }).to_json() {
        let _ = tx.send(welcome);
    }

    let writer = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                biased;
                reply = rx.recv() => match reply {
                    Some(text) => text,
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(event) => match event.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(error = %e, "event serialization failed");
                            continue;
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "client lagging, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match ClientMessage::parse(&text) {
            Some(ClientMessage::Ping) => {
                if let Some(pong) = ServerMessage::Pong.to_json() {
                    let _ = tx.send(pong);
                }
            }
            Some(ClientMessage::Input { throttle, brake, steer, nitro }) => {
                let input = ControlInput::new(throttle, brake, steer, nitro);
                let mut game = world.lock().await;
                if let Err(e) = game.set_player_input(vehicle_id, input) {
                    tracing::warn!(%vehicle_id, error = %e, "input rejected");
                }
            }
            None => tracing::debug!(%peer, "ignoring unrecognised message"),
        }
    }

    tracing::info!(%peer, %vehicle_id, "player disconnected");
    writer.abort();
    let mut game = world.lock().await;
    if let Err(e) = game.despawn(vehicle_id) {
        tracing::warn!(%vehicle_id, error = %e, "despawn on disconnect failed");
    }
}
