use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::room::{Ballot, Recognition};
use super::server::{encode, ConnectionSender, SessionServer};
use super::snapshot::{DraftSnapshot, RoomSnapshot};
use crate::error::{GameError, Result};

/// Requests sent by a participant; every one is answered with an ack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "room:create")]
    CreateRoom,

    #[serde(rename = "room:join")]
    JoinRoom {
        #[serde(default)]
        code: String,
        #[serde(default)]
        name: String,
    },

    #[serde(rename = "room:leave")]
    LeaveRoom,

    #[serde(rename = "room:setGameMode")]
    SetGameMode {
        #[serde(default)]
        mode: String,
    },

    #[serde(rename = "draft:start")]
    StartDraft,

    #[serde(rename = "draft:pick")]
    SubmitPick {
        #[serde(default)]
        teammates: Vec<String>,
        #[serde(default, rename = "secondInCommand")]
        second_in_command: Option<String>,
    },

    #[serde(rename = "draft:end")]
    EndDraft,

    #[serde(rename = "reveal:continue")]
    ContinueReveal,

    #[serde(rename = "reveal:mine")]
    ViewRoles,

    #[serde(rename = "voting:next")]
    AdvanceVoting,

    #[serde(rename = "vote:cast")]
    CastVote {
        #[serde(default)]
        round: Option<usize>,
        #[serde(default)]
        choice: String,
        #[serde(default)]
        comment: Option<String>,
    },

    /// Older clients vote on the current round with `pick`/`because`
    #[serde(rename = "voting:vote")]
    LegacyVote {
        #[serde(default)]
        pick: String,
        #[serde(default)]
        because: Option<String>,
    },

    #[serde(rename = "vote:results")]
    ShowTally,

    #[serde(rename = "voting:complete")]
    CompleteVoting,

    #[serde(rename = "admin:backToLobby")]
    BackToLobby,
}

/// A request frame: the message plus an optional id echoed in the ack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    #[serde(flatten)]
    pub message: ClientMessage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "ack")]
    Ack(Ack),

    #[serde(rename = "room:state")]
    RoomState(RoomSnapshot),

    #[serde(rename = "draft:state")]
    DraftState(DraftSnapshot),
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_vote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Recognition>>,
}

impl Ack {
    fn ok() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    fn failed(error: &GameError) -> Self {
        Self {
            ok: false,
            error: Some(error.code()),
            ..Default::default()
        }
    }
}

/// One per WebSocket connection
pub struct SignalingHandler {
    server: Arc<SessionServer>,
    sender: ConnectionSender,
    conn_id: String,
}

impl SignalingHandler {
    pub async fn new(server: Arc<SessionServer>, sender: ConnectionSender) -> Self {
        let conn_id = server.connect(sender.clone()).await;
        Self {
            server,
            sender,
            conn_id,
        }
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    /// Parses one text frame and answers it
    pub async fn handle_text(&mut self, text: &str) {
        tracing::debug!(conn_id = %self.conn_id, raw_message = %text, "Received message");

        match serde_json::from_str::<ClientEnvelope>(text) {
            Ok(envelope) => self.handle_message(envelope).await,
            Err(e) => {
                tracing::warn!(
                    conn_id = %self.conn_id,
                    error = %e,
                    raw_message = %text,
                    "Failed to parse client message"
                );
                // Still echo the ack id when the frame carried one.
                let ack_id = serde_json::from_str::<Value>(text)
                    .ok()
                    .and_then(|v| v.get("ack").and_then(Value::as_u64));
                let mut ack = Ack::failed(&GameError::BadRequest(e.to_string()));
                ack.ack = ack_id;
                self.reply(ack);
            }
        }
    }

    pub async fn handle_message(&mut self, envelope: ClientEnvelope) {
        let mut ack = match self.dispatch(envelope.message).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::debug!(conn_id = %self.conn_id, error = %e, "Request rejected");
                Ack::failed(&e)
            }
        };
        ack.ack = envelope.ack;
        self.reply(ack);
    }

    async fn dispatch(&mut self, message: ClientMessage) -> Result<Ack> {
        let server = &self.server;
        let id = self.conn_id.as_str();

        match message {
            ClientMessage::CreateRoom => {
                let code = server.create_room().await?;
                Ok(Ack {
                    code: Some(code),
                    ..Ack::ok()
                })
            }
            ClientMessage::JoinRoom { code, name } => {
                let room = server.join_room(id, &code, &name).await?;
                Ok(Ack {
                    room: Some(room),
                    self_id: Some(id.to_string()),
                    ..Ack::ok()
                })
            }
            ClientMessage::LeaveRoom => server.leave_room(id).await.map(|_| Ack::ok()),
            ClientMessage::SetGameMode { mode } => {
                server.set_game_mode(id, &mode).await.map(|_| Ack::ok())
            }
            ClientMessage::StartDraft => server.start_draft(id).await.map(|_| Ack::ok()),
            ClientMessage::SubmitPick {
                teammates,
                second_in_command,
            } => server
                .submit_pick(id, &teammates, second_in_command.as_deref())
                .await
                .map(|_| Ack::ok()),
            ClientMessage::EndDraft => server.end_draft(id).await.map(|_| Ack::ok()),
            ClientMessage::ContinueReveal => server.continue_reveal(id).await.map(|_| Ack::ok()),
            ClientMessage::ViewRoles => {
                let roles = server.view_roles(id).await?;
                Ok(Ack {
                    roles: Some(roles),
                    ..Ack::ok()
                })
            }
            ClientMessage::AdvanceVoting => server.advance_voting(id).await.map(|_| Ack::ok()),
            ClientMessage::CastVote {
                round,
                choice,
                comment,
            } => server
                .cast_vote(
                    id,
                    Ballot {
                        round,
                        choice,
                        comment,
                    },
                )
                .await
                .map(|_| Ack::ok()),
            ClientMessage::LegacyVote { pick, because } => {
                let ballot = Ballot {
                    round: None,
                    choice: pick.clone(),
                    comment: because,
                };
                match server.cast_vote(id, ballot).await {
                    Ok(()) => Ok(Ack {
                        your_vote: Some(pick),
                        ..Ack::ok()
                    }),
                    Err(GameError::InvalidChoice(choice)) => Err(GameError::InvalidPick(choice)),
                    Err(e) => Err(e),
                }
            }
            ClientMessage::ShowTally => server.show_tally(id).await.map(|_| Ack::ok()),
            ClientMessage::CompleteVoting => server.complete_voting(id).await.map(|_| Ack::ok()),
            ClientMessage::BackToLobby => server.back_to_lobby(id).await.map(|_| Ack::ok()),
        }
    }

    fn reply(&self, ack: Ack) {
        let Ok(frame) = encode(&ServerMessage::Ack(ack)) else {
            return;
        };
        if self.sender.send(frame).is_err() {
            tracing::debug!(conn_id = %self.conn_id, "Ack dropped, connection closed");
        }
    }

    pub async fn cleanup(&self) {
        self.server.disconnect(&self.conn_id).await;
    }
}
