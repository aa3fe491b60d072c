use std::collections::HashMap;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use warp::ws::Message;

use super::phase::Phase;
use super::prompts::PromptDeck;
use super::room::{Ballot, Recognition, Room};
use super::signaling::ServerMessage;
use super::snapshot::{DraftSnapshot, RoomSnapshot};
use crate::config::SessionConfig;
use crate::error::{GameError, Result};

pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Which broadcasts follow a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Broadcast {
    Room,
    Draft,
    Both,
}

struct Connection {
    sender: ConnectionSender,
    room_code: Option<String>,
}

struct RoomEntry {
    room: Mutex<Room>,
    /// Destroys the room if nobody ever joins it
    reaper: Option<JoinHandle<()>>,
}

pub struct SessionServer {
    rooms: RwLock<HashMap<String, Arc<RoomEntry>>>,
    connections: RwLock<HashMap<String, Connection>>,
    prompts: PromptDeck,
    config: SessionConfig,
}

/// Draws random 6-digit codes until one is free
pub fn allocate_code(
    attempts: u32,
    is_taken: impl Fn(&str) -> bool,
    mut draw: impl FnMut() -> String,
) -> Result<String> {
    for _ in 0..attempts {
        let code = draw();
        if !is_taken(&code) {
            return Ok(code);
        }
        tracing::debug!(room_code = %code, "Room code collision, retrying");
    }
    Err(GameError::RoomCreateFailed(attempts))
}

fn random_room_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

fn random_connection_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

impl SessionServer {
    pub fn new(config: SessionConfig, prompts: PromptDeck) -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            prompts,
            config,
        })
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn room_exists(&self, code: &str) -> bool {
        self.rooms.read().await.contains_key(code)
    }

    /// Registers a new connection and returns its opaque id, which doubles as
    /// the participant id
    pub async fn connect(&self, sender: ConnectionSender) -> String {
        let conn_id = random_connection_id();
        self.connections.write().await.insert(
            conn_id.clone(),
            Connection {
                sender,
                room_code: None,
            },
        );
        tracing::debug!(conn_id = %conn_id, "Connection registered");
        conn_id
    }

    /// Treated as an implicit leave
    pub async fn disconnect(&self, conn_id: &str) {
        let room_code = {
            let mut connections = self.connections.write().await;
            connections.remove(conn_id).and_then(|c| c.room_code)
        };
        if let Some(code) = room_code {
            self.leave_room_by_code(conn_id, &code).await;
        }
        tracing::debug!(conn_id = %conn_id, "Connection removed");
    }

    pub async fn create_room(self: &Arc<Self>) -> Result<String> {
        let mut rooms = self.rooms.write().await;
        let code = allocate_code(
            self.config.room_code_attempts,
            |code| rooms.contains_key(code),
            random_room_code,
        )?;

        let reaper = (!self.config.empty_room_ttl.is_zero()).then(|| {
            let server = Arc::clone(self);
            let code = code.clone();
            let ttl = self.config.empty_room_ttl;
            tokio::spawn(async move {
                sleep(ttl).await;
                server.reap_if_empty(&code).await;
            })
        });

        rooms.insert(
            code.clone(),
            Arc::new(RoomEntry {
                room: Mutex::new(Room::new(code.clone())),
                reaper,
            }),
        );

        tracing::info!(room_code = %code, "Room created");
        Ok(code)
    }

    async fn reap_if_empty(&self, code: &str) {
        let mut rooms = self.rooms.write().await;
        let Some(entry) = rooms.get(code) else {
            return;
        };
        let mut room = entry.room.lock().await;
        if room.is_empty() {
            room.close();
            drop(room);
            rooms.remove(code);
            tracing::info!(room_code = %code, "Reaped room nobody joined");
        }
    }

    async fn entry(&self, code: &str) -> Option<Arc<RoomEntry>> {
        self.rooms.read().await.get(code).cloned()
    }

    async fn room_code_of(&self, conn_id: &str) -> Result<String> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .and_then(|c| c.room_code.clone())
            .ok_or(GameError::NotInRoom)
    }

    pub async fn join_room(&self, conn_id: &str, code: &str, name: &str) -> Result<RoomSnapshot> {
        let code = code.trim();
        let entry = self
            .entry(code)
            .await
            .ok_or_else(|| GameError::RoomNotFound(code.to_string()))?;
        if name.trim().is_empty() {
            return Err(GameError::NameRequired);
        }

        if let Ok(previous) = self.room_code_of(conn_id).await {
            if previous != code {
                self.leave_room(conn_id).await?;
            }
        }

        let mut room = entry.room.lock().await;
        room.join(conn_id, name)?;

        {
            let mut connections = self.connections.write().await;
            if let Some(connection) = connections.get_mut(conn_id) {
                connection.room_code = Some(code.to_string());
            }
        }

        self.broadcast(&room, Broadcast::Room).await;
        Ok(RoomSnapshot::of(&room))
    }

    pub async fn leave_room(&self, conn_id: &str) -> Result<()> {
        let code = {
            let mut connections = self.connections.write().await;
            connections
                .get_mut(conn_id)
                .and_then(|c| c.room_code.take())
        };
        if let Some(code) = code {
            self.leave_room_by_code(conn_id, &code).await;
        }
        Ok(())
    }

    async fn leave_room_by_code(&self, conn_id: &str, code: &str) {
        let Some(entry) = self.entry(code).await else {
            return;
        };

        let now_empty = {
            let mut room = entry.room.lock().await;
            if !room.leave(conn_id) {
                return;
            }
            self.broadcast(&room, Broadcast::Room).await;
            if room.is_empty() {
                room.close();
            }
            room.is_closed()
        };

        if now_empty {
            self.destroy_room(code).await;
        }
    }

    async fn destroy_room(&self, code: &str) {
        let removed = self.rooms.write().await.remove(code);
        if let Some(entry) = removed {
            if let Some(reaper) = &entry.reaper {
                reaper.abort();
            }
            tracing::info!(room_code = %code, "Room destroyed");
        }
    }

    /// Runs a room operation for the caller's current room, then broadcasts
    async fn mutate<T>(
        &self,
        conn_id: &str,
        broadcast: Broadcast,
        op: impl FnOnce(&mut Room) -> Result<T>,
    ) -> Result<T> {
        let code = self.room_code_of(conn_id).await?;
        let entry = self
            .entry(&code)
            .await
            .ok_or(GameError::RoomNotFound(code))?;

        let mut room = entry.room.lock().await;
        let value = op(&mut *room)?;
        self.broadcast(&room, broadcast).await;
        Ok(value)
    }

    pub async fn set_game_mode(&self, conn_id: &str, mode: &str) -> Result<()> {
        self.mutate(conn_id, Broadcast::Room, |room| room.set_mode(conn_id, mode))
            .await
    }

    pub async fn start_draft(&self, conn_id: &str) -> Result<()> {
        self.mutate(conn_id, Broadcast::Both, |room| room.start_draft(conn_id))
            .await
    }

    pub async fn submit_pick(
        &self,
        conn_id: &str,
        teammates: &[String],
        second_in_command: Option<&str>,
    ) -> Result<()> {
        self.mutate(conn_id, Broadcast::Draft, |room| {
            room.submit_pick(conn_id, teammates, second_in_command)
                .map(|_| ())
        })
        .await
    }

    pub async fn end_draft(&self, conn_id: &str) -> Result<()> {
        self.mutate(conn_id, Broadcast::Both, |room| {
            room.end_draft(conn_id, &self.prompts, &mut rand::thread_rng())
        })
        .await
    }

    pub async fn continue_reveal(&self, conn_id: &str) -> Result<()> {
        self.mutate(conn_id, Broadcast::Both, |room| room.continue_reveal(conn_id))
            .await
    }

    pub async fn view_roles(&self, conn_id: &str) -> Result<Vec<Recognition>> {
        let code = self.room_code_of(conn_id).await?;
        let entry = self
            .entry(&code)
            .await
            .ok_or(GameError::RoomNotFound(code))?;
        let room = entry.room.lock().await;
        room.view_roles(conn_id)
    }

    pub async fn advance_voting(&self, conn_id: &str) -> Result<Phase> {
        let code = self.room_code_of(conn_id).await?;
        let entry = self
            .entry(&code)
            .await
            .ok_or(GameError::RoomNotFound(code))?;

        let mut room = entry.room.lock().await;
        let phase = room.advance(conn_id)?;
        let broadcast = if phase == Phase::Results {
            Broadcast::Both
        } else {
            Broadcast::Draft
        };
        self.broadcast(&room, broadcast).await;
        Ok(phase)
    }

    pub async fn cast_vote(&self, conn_id: &str, ballot: Ballot) -> Result<()> {
        self.mutate(conn_id, Broadcast::Draft, |room| room.cast_vote(conn_id, ballot))
            .await
    }

    pub async fn show_tally(&self, conn_id: &str) -> Result<()> {
        self.mutate(conn_id, Broadcast::Draft, |room| room.show_tally(conn_id))
            .await
    }

    pub async fn complete_voting(&self, conn_id: &str) -> Result<()> {
        self.mutate(conn_id, Broadcast::Both, |room| room.complete_voting(conn_id))
            .await
    }

    pub async fn back_to_lobby(&self, conn_id: &str) -> Result<()> {
        self.mutate(conn_id, Broadcast::Both, |room| room.back_to_lobby(conn_id))
            .await
    }

    /// Sends to every roster member; called with the room lock held so
    /// members see snapshots in mutation order
    async fn broadcast(&self, room: &Room, which: Broadcast) {
        let mut messages = Vec::with_capacity(2);
        if matches!(which, Broadcast::Room | Broadcast::Both) {
            messages.push(ServerMessage::RoomState(RoomSnapshot::of(room)));
        }
        if matches!(which, Broadcast::Draft | Broadcast::Both) {
            messages.push(ServerMessage::DraftState(DraftSnapshot::of(room)));
        }

        let frames: Vec<Message> = messages.iter().filter_map(|m| encode(m).ok()).collect();

        let connections = self.connections.read().await;
        for player in room.players() {
            let Some(connection) = connections.get(&player.id) else {
                continue;
            };
            for frame in &frames {
                if connection.sender.send(frame.clone()).is_err() {
                    tracing::debug!(
                        room_code = %room.code(),
                        conn_id = %player.id,
                        "Dropping broadcast for closed connection"
                    );
                    break;
                }
            }
        }
    }
}

pub fn encode<T: Serialize>(message: &T) -> Result<Message> {
    let text = serde_json::to_string(message).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize outbound message");
        GameError::from(e)
    })?;
    Ok(Message::text(text))
}
