use std::collections::{BTreeMap, HashSet};
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::phase::{Action, Phase};
use super::prompts::PromptDeck;
use super::schedule::{generate_schedule, GameMode, Pairing};
use super::scoring::{score, Contest, Pick, RoundVotes, ScoreBoard};
use crate::error::{GameError, Result};

pub const MAX_TEAMMATES: usize = 2;
pub const MAX_COMMENT_CHARS: usize = 280;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
}

/// A scheduled round with the prompt shown to voters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    #[serde(flatten)]
    pub pairing: Pairing,
    pub prompt_template: String,
}

impl Contest for Matchup {
    fn contenders(&self) -> (&str, &str) {
        self.pairing.contenders()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VotingState {
    pub current_round: usize,
    pub votes: RoundVotes,
    pub comments: BTreeMap<usize, BTreeMap<String, String>>,
}

/// How a leader drafted a given player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickRole {
    Member,
    SecondInCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recognition {
    pub leader_id: String,
    pub leader_name: String,
    pub role: PickRole,
}

/// A vote as submitted by a participant
#[derive(Debug, Clone, Default)]
pub struct Ballot {
    /// Defaults to the current round
    pub round: Option<usize>,
    pub choice: String,
    pub comment: Option<String>,
}

/// Phase plus the data that only exists in that phase
#[derive(Debug, Clone)]
enum Stage {
    Lobby,
    Draft,
    Reveal {
        schedule: Vec<Matchup>,
    },
    Voting {
        schedule: Vec<Matchup>,
        voting: VotingState,
    },
    Results {
        schedule: Vec<Matchup>,
        voting: VotingState,
        results: ScoreBoard,
    },
}

#[derive(Debug, Clone)]
pub struct Room {
    code: String,
    players: Vec<Player>,
    host_id: Option<String>,
    mode: GameMode,
    picks: BTreeMap<String, Pick>,
    stage: Stage,
    closed: bool,
}

impl Room {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            players: Vec::new(),
            host_id: None,
            mode: GameMode::default(),
            picks: BTreeMap::new(),
            stage: Stage::Lobby,
            closed: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        match self.stage {
            Stage::Lobby => Phase::Lobby,
            Stage::Draft => Phase::Draft,
            Stage::Reveal { .. } => Phase::Reveal,
            Stage::Voting { .. } => Phase::Voting,
            Stage::Results { .. } => Phase::Results,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn host_id(&self) -> Option<&str> {
        self.host_id.as_deref()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }

    pub fn player_name(&self, id: &str) -> Option<&str> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.as_str())
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Marks the room as torn down; later joins see it as missing
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn picks(&self) -> &BTreeMap<String, Pick> {
        &self.picks
    }

    pub fn schedule(&self) -> &[Matchup] {
        match &self.stage {
            Stage::Lobby | Stage::Draft => &[],
            Stage::Reveal { schedule }
            | Stage::Voting { schedule, .. }
            | Stage::Results { schedule, .. } => schedule,
        }
    }

    pub fn voting(&self) -> Option<&VotingState> {
        match &self.stage {
            Stage::Voting { voting, .. } | Stage::Results { voting, .. } => Some(voting),
            _ => None,
        }
    }

    pub fn results(&self) -> Option<&ScoreBoard> {
        match &self.stage {
            Stage::Results { results, .. } => Some(results),
            _ => None,
        }
    }

    pub fn join(&mut self, id: &str, name: &str) -> Result<()> {
        if self.closed {
            return Err(GameError::RoomNotFound(self.code.clone()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::NameRequired);
        }

        match self.players.iter_mut().find(|p| p.id == id) {
            Some(existing) => existing.name = name.to_string(),
            None => self.players.push(Player {
                id: id.to_string(),
                name: name.to_string(),
            }),
        }
        if self.host_id.is_none() {
            self.host_id = Some(id.to_string());
        }

        tracing::info!(room_code = %self.code, player_id = %id, "Player joined room");
        Ok(())
    }

    /// Returns false when `id` was not on the roster
    pub fn leave(&mut self, id: &str) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        if self.players.len() == before {
            return false;
        }

        self.picks.remove(id);
        if self.host_id.as_deref() == Some(id) {
            self.host_id = self.players.first().map(|p| p.id.clone());
            tracing::info!(
                room_code = %self.code,
                new_host = ?self.host_id,
                "Host left, reassigned"
            );
        }

        tracing::info!(room_code = %self.code, player_id = %id, "Player left room");
        true
    }

    fn authorize(&self, caller: &str, action: Action) -> Result<()> {
        if !self.is_member(caller) {
            return Err(GameError::NotInRoom);
        }
        if action.host_only() && self.host_id.as_deref() != Some(caller) {
            return Err(GameError::NotHost);
        }
        action.check_phase(self.phase())
    }

    fn transition(&mut self, next: impl FnOnce(Stage) -> Stage) {
        let from = self.phase();
        let current = mem::replace(&mut self.stage, Stage::Lobby);
        self.stage = next(current);
        tracing::info!(room_code = %self.code, from = %from, to = %self.phase(), "Phase changed");
    }

    pub fn set_mode(&mut self, caller: &str, mode: &str) -> Result<()> {
        self.authorize(caller, Action::SetMode)?;
        self.mode = mode.parse()?;
        tracing::info!(room_code = %self.code, mode = %self.mode, "Game mode changed");
        Ok(())
    }

    pub fn start_draft(&mut self, caller: &str) -> Result<()> {
        self.authorize(caller, Action::StartDraft)?;
        self.picks.clear();
        self.transition(|_| Stage::Draft);
        Ok(())
    }

    /// Stores the caller's pick after dropping anything invalid in it
    pub fn submit_pick(
        &mut self,
        caller: &str,
        teammates: &[String],
        second_in_command: Option<&str>,
    ) -> Result<Pick> {
        self.authorize(caller, Action::SubmitPick)?;

        let eligible = |id: &str| id != caller && self.is_member(id);

        let second_in_command = second_in_command
            .filter(|&id| eligible(id))
            .map(str::to_string);

        let mut seen = HashSet::new();
        let teammates: Vec<String> = teammates
            .iter()
            .filter(|id| eligible(id.as_str()))
            .filter(|id| seen.insert(id.as_str()))
            .take(MAX_TEAMMATES)
            .filter(|id| second_in_command.as_deref() != Some(id.as_str()))
            .cloned()
            .collect();

        let pick = Pick {
            teammates,
            second_in_command,
        };
        tracing::debug!(room_code = %self.code, leader = %caller, pick = ?pick, "Pick stored");
        self.picks.insert(caller.to_string(), pick.clone());
        Ok(pick)
    }

    pub fn end_draft<R: Rng + ?Sized>(
        &mut self,
        caller: &str,
        prompts: &PromptDeck,
        rng: &mut R,
    ) -> Result<()> {
        self.authorize(caller, Action::EndDraft)?;

        let schedule: Vec<Matchup> = generate_schedule(self.mode, &self.member_ids(), rng)
            .into_iter()
            .map(|pairing| Matchup {
                pairing,
                prompt_template: prompts.choose(rng),
            })
            .collect();

        tracing::info!(
            room_code = %self.code,
            mode = %self.mode,
            rounds = schedule.len(),
            "Schedule generated"
        );
        self.transition(|_| Stage::Reveal { schedule });
        Ok(())
    }

    pub fn continue_reveal(&mut self, caller: &str) -> Result<()> {
        self.authorize(caller, Action::ContinueReveal)?;

        self.transition(|stage| match stage {
            Stage::Reveal { schedule } => Stage::Voting {
                schedule,
                voting: VotingState::default(),
            },
            other => other,
        });
        if self.schedule().is_empty() {
            // Nothing to vote on.
            self.finish_voting();
        }
        Ok(())
    }

    /// Moves to the next round, or to results after the last one
    pub fn advance(&mut self, caller: &str) -> Result<Phase> {
        self.authorize(caller, Action::Advance)?;

        if let Stage::Voting { schedule, voting } = &mut self.stage {
            if voting.current_round + 1 < schedule.len() {
                voting.current_round += 1;
                tracing::info!(
                    room_code = %self.code,
                    round = voting.current_round,
                    "Voting advanced"
                );
                return Ok(Phase::Voting);
            }
        }

        self.finish_voting();
        Ok(self.phase())
    }

    pub fn cast_vote(&mut self, caller: &str, ballot: Ballot) -> Result<()> {
        self.authorize(caller, Action::CastVote)?;

        let Stage::Voting { schedule, voting } = &mut self.stage else {
            return Err(GameError::NotInVoting);
        };

        let round = ballot.round.unwrap_or(voting.current_round);
        if round != voting.current_round {
            return Err(GameError::NoMatchup);
        }
        let matchup = schedule.get(round).ok_or(GameError::NoMatchup)?;
        let (a, b) = matchup.contenders();

        if ballot.choice != a && ballot.choice != b {
            return Err(GameError::InvalidChoice(ballot.choice));
        }
        if caller == a || caller == b {
            return Err(GameError::CannotVoteSelfMatchup);
        }

        let ballots = voting.votes.entry(round).or_default();
        if ballots.contains_key(caller) {
            return Err(GameError::AlreadyVoted(round));
        }
        ballots.insert(caller.to_string(), ballot.choice.clone());

        if let Some(comment) = ballot.comment.filter(|c| !c.trim().is_empty()) {
            let comment: String = comment.chars().take(MAX_COMMENT_CHARS).collect();
            voting
                .comments
                .entry(round)
                .or_default()
                .insert(caller.to_string(), comment);
        }

        tracing::debug!(
            room_code = %self.code,
            round,
            voter = %caller,
            choice = %ballot.choice,
            "Vote recorded"
        );
        Ok(())
    }

    pub fn show_tally(&self, caller: &str) -> Result<()> {
        self.authorize(caller, Action::ShowTally)
    }

    /// Ends voting early
    pub fn complete_voting(&mut self, caller: &str) -> Result<()> {
        self.authorize(caller, Action::CompleteVoting)?;
        self.finish_voting();
        Ok(())
    }

    pub fn back_to_lobby(&mut self, caller: &str) -> Result<()> {
        self.authorize(caller, Action::BackToLobby)?;
        self.picks.clear();
        self.transition(|_| Stage::Lobby);
        Ok(())
    }

    /// Leaders that drafted the caller, for the reveal screen
    pub fn view_roles(&self, caller: &str) -> Result<Vec<Recognition>> {
        self.authorize(caller, Action::ViewRoles)?;
        Ok(self.picked_by(caller))
    }

    pub fn picked_by(&self, id: &str) -> Vec<Recognition> {
        let mut roles: Vec<Recognition> = self
            .picks
            .iter()
            .filter_map(|(leader, pick)| {
                let role = if pick.second_in_command.as_deref() == Some(id) {
                    PickRole::SecondInCommand
                } else if pick.teammates.iter().any(|t| t == id) {
                    PickRole::Member
                } else {
                    return None;
                };
                Some(Recognition {
                    leader_id: leader.clone(),
                    leader_name: self.player_name(leader).unwrap_or(leader).to_string(),
                    role,
                })
            })
            .collect();
        roles.sort_by(|x, y| x.leader_name.cmp(&y.leader_name));
        roles
    }

    fn finish_voting(&mut self) {
        let Stage::Voting { schedule, voting } = &self.stage else {
            return;
        };

        let picks = &self.picks;
        let results = score_or_empty(&self.code, || score(picks, schedule, &voting.votes));

        self.transition(|stage| match stage {
            Stage::Voting { schedule, voting } => Stage::Results {
                schedule,
                voting,
                results,
            },
            other => other,
        });
    }
}

/// A panicking scorer yields an empty board so the room still reaches results
fn score_or_empty(room_code: &str, scorer: impl FnOnce() -> ScoreBoard) -> ScoreBoard {
    panic::catch_unwind(AssertUnwindSafe(scorer)).unwrap_or_else(|_| {
        tracing::error!(room_code = %room_code, "Scoring failed, storing empty results");
        ScoreBoard::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn room_with(players: &[&str]) -> Room {
        let mut room = Room::new("123456");
        for id in players {
            room.join(id, &format!("{id}-name")).unwrap();
        }
        room
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn to_voting(room: &mut Room, host: &str) {
        let mut rng = StdRng::seed_from_u64(42);
        room.start_draft(host).unwrap();
        room.end_draft(host, &PromptDeck::default(), &mut rng).unwrap();
        room.continue_reveal(host).unwrap();
    }

    fn current_contenders(room: &Room) -> (String, String) {
        let round = room.voting().unwrap().current_round;
        let (a, b) = room.schedule()[round].contenders();
        (a.to_string(), b.to_string())
    }

    fn outsider(room: &Room) -> String {
        let (a, b) = current_contenders(room);
        room.member_ids()
            .into_iter()
            .find(|id| *id != a && *id != b)
            .unwrap()
    }

    #[test]
    fn test_first_joiner_is_host() {
        let room = room_with(&["h", "p1"]);
        assert_eq!(room.host_id(), Some("h"));
        assert_eq!(room.phase(), Phase::Lobby);
        assert_eq!(room.mode(), GameMode::Standard);
    }

    #[test]
    fn test_join_requires_name() {
        let mut room = Room::new("000001");
        assert!(matches!(room.join("a", "   "), Err(GameError::NameRequired)));
        assert!(room.is_empty());
    }

    #[test]
    fn test_rejoin_updates_name_in_place() {
        let mut room = room_with(&["h", "p1"]);
        room.join("h", " Renamed ").unwrap();
        assert_eq!(room.players().len(), 2);
        assert_eq!(room.players()[0].name, "Renamed");
    }

    #[test]
    fn test_closed_room_rejects_join() {
        let mut room = Room::new("000002");
        room.close();
        assert!(matches!(room.join("a", "Ann"), Err(GameError::RoomNotFound(_))));
    }

    #[test]
    fn test_host_leaving_promotes_next_player() {
        let mut room = room_with(&["h", "p1", "p2"]);
        assert!(room.leave("h"));
        assert_eq!(room.host_id(), Some("p1"));
        assert!(!room.leave("h"));

        room.leave("p1");
        room.leave("p2");
        assert!(room.is_empty());
        assert_eq!(room.host_id(), None);
    }

    #[test]
    fn test_leaving_removes_own_pick() {
        let mut room = room_with(&["h", "p1", "p2"]);
        room.start_draft("h").unwrap();
        room.submit_pick("p1", &ids(&["p2"]), None).unwrap();
        room.leave("p1");
        assert!(!room.picks().contains_key("p1"));
    }

    #[test]
    fn test_set_mode_rules() {
        let mut room = room_with(&["h", "p1"]);
        assert!(matches!(room.set_mode("p1", "extended"), Err(GameError::NotHost)));
        assert!(matches!(room.set_mode("h", "blitz"), Err(GameError::InvalidMode(_))));
        assert!(matches!(room.set_mode("ghost", "extended"), Err(GameError::NotInRoom)));

        room.set_mode("h", "ROUND_ROBIN").unwrap();
        assert_eq!(room.mode(), GameMode::RoundRobin);

        room.start_draft("h").unwrap();
        assert!(matches!(room.set_mode("h", "standard"), Err(GameError::NotInLobby)));
    }

    #[test]
    fn test_only_host_starts_draft() {
        let mut room = room_with(&["h", "p1"]);
        assert!(matches!(room.start_draft("p1"), Err(GameError::NotHost)));
        room.start_draft("h").unwrap();
        assert_eq!(room.phase(), Phase::Draft);
    }

    #[test]
    fn test_pick_outside_draft_rejected() {
        let mut room = room_with(&["h", "p1"]);
        let result = room.submit_pick("p1", &ids(&["h"]), None);
        assert!(matches!(result, Err(GameError::NotInDraft)));
    }

    #[test]
    fn test_pick_is_sanitized() {
        let mut room = room_with(&["h", "p1", "p2", "p3", "p4"]);
        room.start_draft("h").unwrap();

        let pick = room
            .submit_pick("p1", &ids(&["p1", "ghost", "p2", "p2", "p3", "p4"]), Some("p1"))
            .unwrap();
        assert_eq!(pick.teammates, ids(&["p2", "p3"]));
        assert_eq!(pick.second_in_command, None);

        let pick = room
            .submit_pick("p1", &ids(&["p2", "p3"]), Some("p2"))
            .unwrap();
        assert_eq!(pick.teammates, ids(&["p3"]));
        assert_eq!(pick.second_in_command.as_deref(), Some("p2"));

        let pick = room.submit_pick("p1", &[], Some("ghost")).unwrap();
        assert_eq!(pick, Pick::default());
        assert_eq!(room.picks().get("p1"), Some(&Pick::default()));
    }

    #[test]
    fn test_start_draft_clears_previous_picks() {
        let mut room = room_with(&["h", "p1"]);
        room.start_draft("h").unwrap();
        room.submit_pick("p1", &ids(&["h"]), None).unwrap();
        room.start_draft("h").unwrap();
        assert!(room.picks().is_empty());
    }

    #[test]
    fn test_end_draft_builds_schedule_with_prompts() {
        let mut room = room_with(&["h", "p1", "p2", "p3"]);
        room.set_mode("h", "extended").unwrap();
        room.start_draft("h").unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let deck = PromptDeck::new(vec!["{A} or {B}?".to_string()]);
        assert!(matches!(room.end_draft("p1", &deck, &mut rng), Err(GameError::NotHost)));
        room.end_draft("h", &deck, &mut rng).unwrap();

        assert_eq!(room.phase(), Phase::Reveal);
        assert_eq!(room.schedule().len(), 8);
        assert!(room.schedule().iter().all(|m| m.prompt_template == "{A} or {B}?"));
        assert!(room.voting().is_none());
    }

    #[test]
    fn test_end_draft_requires_draft_phase() {
        let mut room = room_with(&["h", "p1"]);
        let mut rng = StdRng::seed_from_u64(1);
        let result = room.end_draft("h", &PromptDeck::default(), &mut rng);
        assert!(matches!(result, Err(GameError::NotInDraft)));
    }

    #[test]
    fn test_continue_reveal_starts_round_zero() {
        let mut room = room_with(&["h", "p1", "p2"]);
        room.start_draft("h").unwrap();
        assert!(matches!(room.continue_reveal("h"), Err(GameError::NotInReveal)));

        to_voting(&mut room, "h");
        assert_eq!(room.phase(), Phase::Voting);
        let voting = room.voting().unwrap();
        assert_eq!(voting.current_round, 0);
        assert!(voting.votes.is_empty());
    }

    #[test]
    fn test_single_player_goes_straight_to_results() {
        let mut room = room_with(&["h"]);
        to_voting(&mut room, "h");
        assert_eq!(room.phase(), Phase::Results);
        assert!(room.schedule().is_empty());
    }

    #[test]
    fn test_vote_validation() {
        let mut room = room_with(&["h", "p1", "p2", "p3"]);
        to_voting(&mut room, "h");
        let (a, b) = current_contenders(&room);
        let voter = outsider(&room);

        let bad = room.cast_vote(
            &voter,
            Ballot {
                choice: "nobody".into(),
                ..Default::default()
            },
        );
        assert!(matches!(bad, Err(GameError::InvalidChoice(_))));

        let own = room.cast_vote(
            &a,
            Ballot {
                choice: b.clone(),
                ..Default::default()
            },
        );
        assert!(matches!(own, Err(GameError::CannotVoteSelfMatchup)));

        let stale = room.cast_vote(
            &voter,
            Ballot {
                round: Some(3),
                choice: a.clone(),
                ..Default::default()
            },
        );
        assert!(matches!(stale, Err(GameError::NoMatchup)));

        room.cast_vote(
            &voter,
            Ballot {
                round: Some(0),
                choice: a.clone(),
                comment: Some("x".repeat(400)),
            },
        )
        .unwrap();

        let again = room.cast_vote(
            &voter,
            Ballot {
                choice: b.clone(),
                ..Default::default()
            },
        );
        assert!(matches!(again, Err(GameError::AlreadyVoted(0))));

        let voting = room.voting().unwrap();
        assert_eq!(voting.votes[&0][&voter], a);
        assert_eq!(voting.votes[&0].len(), 1);
        assert_eq!(voting.comments[&0][&voter].chars().count(), MAX_COMMENT_CHARS);
    }

    #[test]
    fn test_host_contender_cannot_vote_own_matchup() {
        let mut room = room_with(&["h", "p1"]);
        to_voting(&mut room, "h");
        // Two players: every round is h vs p1.
        let result = room.cast_vote(
            "h",
            Ballot {
                choice: "p1".into(),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(GameError::CannotVoteSelfMatchup)));
    }

    #[test]
    fn test_blank_comment_not_stored() {
        let mut room = room_with(&["h", "p1", "p2", "p3"]);
        to_voting(&mut room, "h");
        let (a, _) = current_contenders(&room);
        let voter = outsider(&room);
        room.cast_vote(
            &voter,
            Ballot {
                choice: a,
                comment: Some("   ".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(room.voting().unwrap().comments.is_empty());
    }

    #[test]
    fn test_advance_walks_rounds_then_scores() {
        let mut room = room_with(&["h", "p1", "p2"]);
        to_voting(&mut room, "h");
        let total = room.schedule().len();
        assert_eq!(total, 3);

        assert!(matches!(room.advance("p1"), Err(GameError::NotHost)));
        for expected in 1..total {
            assert_eq!(room.advance("h").unwrap(), Phase::Voting);
            assert_eq!(room.voting().unwrap().current_round, expected);
        }
        assert_eq!(room.advance("h").unwrap(), Phase::Results);
        assert!(room.results().is_some());
        assert!(matches!(room.advance("h"), Err(GameError::NotInVoting)));
    }

    #[test]
    fn test_results_match_scoring_engine() {
        let mut room = room_with(&["h", "p1", "p2", "p3"]);
        room.start_draft("h").unwrap();
        room.submit_pick("h", &ids(&["p1"]), Some("p2")).unwrap();
        room.submit_pick("p3", &ids(&["p1", "p2"]), None).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        room.end_draft("h", &PromptDeck::default(), &mut rng).unwrap();
        room.continue_reveal("h").unwrap();

        let (a, _) = current_contenders(&room);
        let voter = outsider(&room);
        room.cast_vote(
            &voter,
            Ballot {
                choice: a,
                ..Default::default()
            },
        )
        .unwrap();

        let expected = score(
            room.picks(),
            room.schedule(),
            &room.voting().unwrap().votes,
        );
        room.complete_voting("h").unwrap();

        assert_eq!(room.phase(), Phase::Results);
        assert_eq!(room.results(), Some(&expected));
        assert_eq!(expected.team_totals.len(), 2);
    }

    #[test]
    fn test_complete_voting_requires_voting() {
        let mut room = room_with(&["h", "p1"]);
        assert!(matches!(room.complete_voting("h"), Err(GameError::NotInVoting)));
    }

    #[test]
    fn test_back_to_lobby_soft_resets() {
        let mut room = room_with(&["h", "p1", "p2"]);
        room.set_mode("h", "extended").unwrap();
        room.start_draft("h").unwrap();
        room.submit_pick("p1", &ids(&["p2"]), Some("h")).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        room.end_draft("h", &PromptDeck::default(), &mut rng).unwrap();
        room.continue_reveal("h").unwrap();
        room.complete_voting("h").unwrap();

        assert!(matches!(room.back_to_lobby("p1"), Err(GameError::NotHost)));
        room.back_to_lobby("h").unwrap();

        assert_eq!(room.phase(), Phase::Lobby);
        assert!(room.picks().is_empty());
        assert!(room.schedule().is_empty());
        assert!(room.voting().is_none());
        assert!(room.results().is_none());
        assert_eq!(room.mode(), GameMode::Extended);
        assert_eq!(room.players().len(), 3);
        assert_eq!(room.host_id(), Some("h"));
    }

    #[test]
    fn test_picked_by_lists_leaders() {
        let mut room = room_with(&["h", "p1", "p2"]);
        room.start_draft("h").unwrap();
        room.submit_pick("h", &ids(&["p2"]), None).unwrap();
        room.submit_pick("p1", &[], Some("p2")).unwrap();

        assert!(matches!(room.view_roles("p2"), Err(GameError::NotInReveal)));

        let mut rng = StdRng::seed_from_u64(4);
        room.end_draft("h", &PromptDeck::default(), &mut rng).unwrap();
        let roles = room.view_roles("p2").unwrap();

        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].leader_id, "h");
        assert_eq!(roles[0].role, PickRole::Member);
        assert_eq!(roles[1].leader_id, "p1");
        assert_eq!(roles[1].role, PickRole::SecondInCommand);
        assert!(room.picked_by("h").is_empty());
    }

    #[test]
    fn test_show_tally_is_host_only() {
        let mut room = room_with(&["h", "p1", "p2"]);
        to_voting(&mut room, "h");
        assert!(room.show_tally("h").is_ok());
        assert!(matches!(room.show_tally("p1"), Err(GameError::NotHost)));
    }

    #[test]
    fn test_panicking_scorer_leaves_empty_board() {
        let board = score_or_empty("123456", || panic!("bad tally"));
        assert_eq!(board, ScoreBoard::default());
    }

    #[test]
    fn test_score_or_empty_passes_results_through() {
        let mut expected = ScoreBoard::default();
        expected.personal_totals.insert("p1".to_string(), 2.5);
        let board = score_or_empty("123456", || expected.clone());
        assert_eq!(board, expected);
    }
}
