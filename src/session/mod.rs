pub mod phase;
pub mod prompts;
pub mod room;
pub mod schedule;
pub mod scoring;
pub mod server;
pub mod signaling;
pub mod snapshot;

pub use phase::{Action, Phase};
pub use prompts::PromptDeck;
pub use room::{Ballot, Player, Room};
pub use schedule::{generate_schedule, GameMode, Pairing};
pub use scoring::{score, Pick, ScoreBoard};
pub use server::SessionServer;
pub use signaling::{ClientEnvelope, ClientMessage, ServerMessage, SignalingHandler};
pub use snapshot::{DraftSnapshot, RoomSnapshot};
