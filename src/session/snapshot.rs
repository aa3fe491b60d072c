use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::phase::Phase;
use super::prompts::render_prompt;
use super::room::{Player, Room};
use super::schedule::{pair_key, GameMode};
use super::scoring::{Contest, Pick, ScoreBoard};

/// Full room view broadcast as `room:state`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: String,
    pub host_id: Option<String>,
    pub host_name: Option<String>,
    pub players: Vec<Player>,
    pub game: GameView,
    pub draft: DraftSnapshot,
    pub results: Option<ScoreBoard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub mode: GameMode,
    pub planned_rounds: usize,
}

/// Draft and voting progress, broadcast as `draft:state`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    pub phase: Phase,
    pub picks: BTreeMap<String, Pick>,
    pub voting: Option<VotingView>,
    pub meta: Option<ScheduleMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingView {
    pub index: usize,
    pub total: usize,
    pub current: Option<[String; 2]>,
    pub prompt: Option<String>,
    pub votes_received: usize,
    pub votes_total: usize,
    pub tally: Option<BTreeMap<String, usize>>,
    pub voters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleMeta {
    pub candidate_counts: BTreeMap<String, usize>,
    pub used_repeats: bool,
    pub total_rounds: usize,
    pub mode: GameMode,
}

impl RoomSnapshot {
    pub fn of(room: &Room) -> Self {
        Self {
            code: room.code().to_string(),
            host_id: room.host_id().map(str::to_string),
            host_name: room
                .host_id()
                .and_then(|id| room.player_name(id))
                .map(str::to_string),
            players: room.players().to_vec(),
            game: GameView {
                mode: room.mode(),
                planned_rounds: room.mode().planned_rounds(room.players().len()),
            },
            draft: DraftSnapshot::of(room),
            results: room.results().cloned(),
        }
    }
}

impl DraftSnapshot {
    pub fn of(room: &Room) -> Self {
        let voting = match room.phase() {
            Phase::Voting => voting_view(room),
            _ => None,
        };

        Self {
            phase: room.phase(),
            picks: room.picks().clone(),
            voting,
            meta: room.voting().map(|_| schedule_meta(room)),
        }
    }
}

fn voting_view(room: &Room) -> Option<VotingView> {
    let state = room.voting()?;
    let round = state.current_round;
    let ballots = state.votes.get(&round);
    let matchup = room.schedule().get(round);

    let mut view = VotingView {
        index: round,
        total: room.schedule().len(),
        current: None,
        prompt: None,
        votes_received: ballots.map_or(0, |b| b.len()),
        votes_total: room.players().len(),
        tally: None,
        voters: ballots
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default(),
    };

    if let Some(matchup) = matchup {
        let (a, b) = matchup.contenders();
        let mut tally = BTreeMap::from([(a.to_string(), 0), (b.to_string(), 0)]);
        for choice in ballots.into_iter().flat_map(|b| b.values()) {
            if let Some(count) = tally.get_mut(choice) {
                *count += 1;
            }
        }

        view.current = Some([a.to_string(), b.to_string()]);
        view.prompt = Some(render_prompt(
            &matchup.prompt_template,
            room.player_name(a).unwrap_or(a),
            room.player_name(b).unwrap_or(b),
        ));
        view.tally = Some(tally);
    }

    Some(view)
}

fn schedule_meta(room: &Room) -> ScheduleMeta {
    let schedule = room.schedule();

    let mut counts: BTreeMap<String, usize> =
        room.players().iter().map(|p| (p.id.clone(), 0)).collect();
    let mut unique = HashSet::new();
    for matchup in schedule {
        let (a, b) = matchup.contenders();
        *counts.entry(a.to_string()).or_insert(0) += 1;
        *counts.entry(b.to_string()).or_insert(0) += 1;
        unique.insert(pair_key(a, b));
    }

    ScheduleMeta {
        candidate_counts: counts,
        used_repeats: unique.len() < schedule.len(),
        total_rounds: schedule.len(),
        mode: room.mode(),
    }
}
