//! Turns final picks, the schedule and the collected votes into points.
//!
//! Rules:
//! - Pre-round: +1 to a player for every leader that drafted them as a team
//!   member, +2 for every leader that made them 2IC.
//! - Each round: +1 to a contender per vote received; +0.5 to every voter who
//!   backed a winner (a tie makes both contenders winners); +1 to a leader
//!   whose team holds exactly one of the two contenders when that contender
//!   wins.
//! - Team total: teammates' personal totals plus 1.5x the 2IC's. The leader's
//!   own personal total does not count toward their team.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::schedule::Pairing;

pub type VoteMap = BTreeMap<String, String>;
pub type RoundVotes = BTreeMap<usize, VoteMap>;

const TEAMMATE_POINTS: f64 = 1.0;
const SECOND_IN_COMMAND_POINTS: f64 = 2.0;
const VOTE_POINTS: f64 = 1.0;
const WINNING_VOTER_POINTS: f64 = 0.5;
const LEADER_WIN_BONUS: f64 = 1.0;
const SECOND_IN_COMMAND_MULTIPLIER: f64 = 1.5;

/// A leader's drafted team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pick {
    pub teammates: Vec<String>,
    pub second_in_command: Option<String>,
}

impl Pick {
    pub fn includes(&self, id: &str) -> bool {
        self.second_in_command.as_deref() == Some(id) || self.teammates.iter().any(|t| t == id)
    }
}

/// Anything with two contenders can be scored
pub trait Contest {
    fn contenders(&self) -> (&str, &str);
}

impl Contest for Pairing {
    fn contenders(&self) -> (&str, &str) {
        (&self.contender_a, &self.contender_b)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBoard {
    pub personal_totals: BTreeMap<String, f64>,
    pub team_totals: BTreeMap<String, f64>,
}

impl ScoreBoard {
    pub fn personal(&self, id: &str) -> f64 {
        self.personal_totals.get(id).copied().unwrap_or(0.0)
    }

    pub fn team(&self, leader: &str) -> f64 {
        self.team_totals.get(leader).copied().unwrap_or(0.0)
    }

    fn add(&mut self, id: &str, points: f64) {
        *self.personal_totals.entry(id.to_string()).or_insert(0.0) += points;
    }
}

pub fn score<C: Contest>(
    teams: &BTreeMap<String, Pick>,
    schedule: &[C],
    votes: &RoundVotes,
) -> ScoreBoard {
    let mut board = ScoreBoard::default();

    let mut everyone: BTreeSet<&str> = BTreeSet::new();
    for (leader, pick) in teams {
        everyone.insert(leader);
        everyone.extend(pick.teammates.iter().map(String::as_str));
        everyone.extend(pick.second_in_command.as_deref());
    }
    for contest in schedule {
        let (a, b) = contest.contenders();
        everyone.insert(a);
        everyone.insert(b);
    }
    for ballots in votes.values() {
        for (voter, choice) in ballots {
            everyone.insert(voter);
            everyone.insert(choice);
        }
    }
    for id in everyone {
        board.personal_totals.insert(id.to_string(), 0.0);
    }

    for pick in teams.values() {
        for teammate in &pick.teammates {
            board.add(teammate, TEAMMATE_POINTS);
        }
        if let Some(sic) = &pick.second_in_command {
            board.add(sic, SECOND_IN_COMMAND_POINTS);
        }
    }

    let no_votes = VoteMap::new();
    for (round, contest) in schedule.iter().enumerate() {
        let (a, b) = contest.contenders();
        let ballots = votes.get(&round).unwrap_or(&no_votes);

        let mut a_count = 0usize;
        let mut b_count = 0usize;
        for choice in ballots.values() {
            if choice == a {
                a_count += 1;
            } else if choice == b {
                b_count += 1;
            } else {
                continue;
            }
            board.add(choice, VOTE_POINTS);
        }

        let is_winner = |id: &str| {
            if a_count > b_count {
                id == a
            } else if b_count > a_count {
                id == b
            } else {
                id == a || id == b
            }
        };

        for (voter, choice) in ballots {
            if is_winner(choice) {
                board.add(voter, WINNING_VOTER_POINTS);
            }
        }

        for (leader, pick) in teams {
            let on_team = match (pick.includes(a), pick.includes(b)) {
                (true, false) => a,
                (false, true) => b,
                _ => continue,
            };
            if is_winner(on_team) {
                board.add(leader, LEADER_WIN_BONUS);
            }
        }
    }

    for (leader, pick) in teams {
        let mut total: f64 = pick.teammates.iter().map(|t| board.personal(t)).sum();
        if let Some(sic) = &pick.second_in_command {
            total += SECOND_IN_COMMAND_MULTIPLIER * board.personal(sic);
        }
        board.team_totals.insert(leader.clone(), total);
    }

    board
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(teammates: &[&str], sic: Option<&str>) -> Pick {
        Pick {
            teammates: teammates.iter().map(|s| s.to_string()).collect(),
            second_in_command: sic.map(str::to_string),
        }
    }

    fn ballots(entries: &[(&str, &str)]) -> VoteMap {
        entries
            .iter()
            .map(|(voter, choice)| (voter.to_string(), choice.to_string()))
            .collect()
    }

    fn reference_inputs() -> (BTreeMap<String, Pick>, Vec<Pairing>, RoundVotes) {
        let teams = BTreeMap::from([
            ("L1".to_string(), pick(&["P4"], Some("P3"))),
            ("L2".to_string(), pick(&["P5"], None)),
        ]);
        let schedule = vec![Pairing::new("P3", "P4"), Pairing::new("P5", "P3")];
        let votes = RoundVotes::from([
            (0, ballots(&[("L1", "P3"), ("L2", "P4"), ("P5", "P3")])),
            (1, ballots(&[("L1", "P3"), ("L2", "P5"), ("P4", "P5")])),
        ]);
        (teams, schedule, votes)
    }

    #[test]
    fn test_reference_scenario() {
        let (teams, schedule, votes) = reference_inputs();
        let board = score(&teams, &schedule, &votes);

        assert_eq!(board.personal("P3"), 5.0);
        assert_eq!(board.personal("P4"), 2.5);
        assert_eq!(board.personal("P5"), 3.5);
        assert_eq!(board.personal("L1"), 1.5);
        assert_eq!(board.personal("L2"), 1.5);
        assert_eq!(board.personal_totals.len(), 5);

        assert_eq!(board.team("L1"), 10.0);
        assert_eq!(board.team("L2"), 3.5);
        assert_eq!(board.team_totals.len(), 2);
    }

    #[test]
    fn test_score_is_pure() {
        let (teams, schedule, votes) = reference_inputs();
        let (teams_before, schedule_before, votes_before) =
            (teams.clone(), schedule.clone(), votes.clone());

        let first = score(&teams, &schedule, &votes);
        let second = score(&teams, &schedule, &votes);

        assert_eq!(first, second);
        assert_eq!(teams, teams_before);
        assert_eq!(schedule, schedule_before);
        assert_eq!(votes, votes_before);
    }

    #[test]
    fn test_tie_rewards_both_sides() {
        // L1 has A on the team, L2 has B; one vote each.
        let teams = BTreeMap::from([
            ("L1".to_string(), pick(&["A"], None)),
            ("L2".to_string(), pick(&[], Some("B"))),
        ]);
        let schedule = vec![Pairing::new("A", "B")];
        let votes = RoundVotes::from([(0, ballots(&[("V1", "A"), ("V2", "B")]))]);

        let board = score(&teams, &schedule, &votes);

        assert_eq!(board.personal("V1"), 0.5);
        assert_eq!(board.personal("V2"), 0.5);
        assert_eq!(board.personal("L1"), 1.0);
        assert_eq!(board.personal("L2"), 1.0);
        // A: teammate +1, one vote +1. B: 2IC +2, one vote +1.
        assert_eq!(board.personal("A"), 2.0);
        assert_eq!(board.personal("B"), 3.0);
        assert_eq!(board.team("L2"), 4.5);
    }

    #[test]
    fn test_round_without_votes_is_a_tie() {
        let teams = BTreeMap::from([("L".to_string(), pick(&["A"], None))]);
        let schedule = vec![Pairing::new("A", "B")];
        let board = score(&teams, &schedule, &RoundVotes::new());

        assert_eq!(board.personal("L"), 1.0);
        assert_eq!(board.personal("B"), 0.0);
    }

    #[test]
    fn test_both_or_neither_contender_on_team_earns_no_bonus() {
        let teams = BTreeMap::from([
            ("Both".to_string(), pick(&["A"], Some("B"))),
            ("Neither".to_string(), pick(&["C"], None)),
        ]);
        let schedule = vec![Pairing::new("A", "B")];
        let votes = RoundVotes::from([(0, ballots(&[("C", "A")]))]);

        let board = score(&teams, &schedule, &votes);

        assert_eq!(board.personal("Both"), 0.0);
        assert_eq!(board.personal("Neither"), 0.0);
        assert_eq!(board.personal("C"), 1.5);
    }

    #[test]
    fn test_leader_as_contender_keeps_bonus() {
        let teams = BTreeMap::from([("L".to_string(), pick(&["A"], None))]);
        let schedule = vec![Pairing::new("A", "L")];
        let votes = RoundVotes::from([(0, ballots(&[("V", "A")]))]);

        let board = score(&teams, &schedule, &votes);

        assert_eq!(board.personal("L"), 1.0);
        assert_eq!(board.personal("A"), 2.0);
    }

    #[test]
    fn test_votes_for_non_contenders_are_ignored() {
        let schedule = vec![Pairing::new("A", "B")];
        let votes = RoundVotes::from([(0, ballots(&[("V1", "Z"), ("V2", "A")]))]);

        let board = score(&BTreeMap::new(), &schedule, &votes);

        assert_eq!(board.personal("Z"), 0.0);
        assert_eq!(board.personal("V1"), 0.0);
        assert_eq!(board.personal("V2"), 0.5);
        assert_eq!(board.personal("A"), 1.0);
        assert!(board.personal_totals.contains_key("Z"));
    }

    #[test]
    fn test_empty_inputs() {
        let board = score::<Pairing>(&BTreeMap::new(), &[], &RoundVotes::new());
        assert_eq!(board, ScoreBoard::default());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ScoreBoard::default()).unwrap();
        assert!(json.get("personalTotals").is_some());
        assert!(json.get("teamTotals").is_some());
    }
}
