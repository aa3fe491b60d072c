use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lobby,
    Draft,
    Reveal,
    Voting,
    Results,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Lobby,
        Phase::Draft,
        Phase::Reveal,
        Phase::Voting,
        Phase::Results,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Lobby => "lobby",
            Phase::Draft => "draft",
            Phase::Reveal => "reveal",
            Phase::Voting => "voting",
            Phase::Results => "results",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every room operation that is gated by phase or host status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SetMode,
    StartDraft,
    SubmitPick,
    EndDraft,
    ContinueReveal,
    ViewRoles,
    Advance,
    CastVote,
    ShowTally,
    CompleteVoting,
    BackToLobby,
}

impl Action {
    pub fn host_only(self) -> bool {
        !matches!(self, Action::SubmitPick | Action::CastVote | Action::ViewRoles)
    }

    pub fn allowed_phases(self) -> &'static [Phase] {
        match self {
            Action::SetMode => &[Phase::Lobby],
            Action::SubmitPick => &[Phase::Draft],
            Action::EndDraft => &[Phase::Draft],
            Action::ContinueReveal => &[Phase::Reveal],
            Action::ViewRoles => &[Phase::Reveal, Phase::Voting, Phase::Results],
            Action::Advance | Action::CastVote | Action::ShowTally | Action::CompleteVoting => {
                &[Phase::Voting]
            }
            Action::StartDraft | Action::BackToLobby => &Phase::ALL,
        }
    }

    pub fn wrong_phase_error(self) -> GameError {
        match self {
            Action::SetMode => GameError::NotInLobby,
            Action::SubmitPick | Action::EndDraft => GameError::NotInDraft,
            Action::ContinueReveal | Action::ViewRoles => GameError::NotInReveal,
            Action::Advance | Action::CastVote | Action::ShowTally | Action::CompleteVoting => {
                GameError::NotInVoting
            }
            // Allowed everywhere, never reached.
            Action::StartDraft | Action::BackToLobby => GameError::NotInLobby,
        }
    }

    pub fn check_phase(self, phase: Phase) -> Result<(), GameError> {
        if self.allowed_phases().contains(&phase) {
            Ok(())
        } else {
            Err(self.wrong_phase_error())
        }
    }
}
