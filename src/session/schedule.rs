use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// How many head-to-head rounds a game runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// One Hamiltonian cycle: everyone plays twice
    #[default]
    Standard,
    /// Twice as many rounds as players, pairs kept unique where possible
    Extended,
    /// Every pair meets once
    RoundRobin,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Standard => "standard",
            GameMode::Extended => "extended",
            GameMode::RoundRobin => "round_robin",
        }
    }

    /// Round count shown in the lobby, independent of the generated schedule
    pub fn planned_rounds(self, players: usize) -> usize {
        match self {
            GameMode::Standard => players,
            GameMode::Extended => players * 2,
            GameMode::RoundRobin => players * players.saturating_sub(1) / 2,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(GameMode::Standard),
            "extended" => Ok(GameMode::Extended),
            "round_robin" => Ok(GameMode::RoundRobin),
            _ => Err(GameError::InvalidMode(s.to_string())),
        }
    }
}

/// Two contenders facing each other in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pairing {
    pub contender_a: String,
    pub contender_b: String,
}

impl Pairing {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            contender_a: a.into(),
            contender_b: b.into(),
        }
    }

    pub fn key(&self) -> (&str, &str) {
        pair_key(&self.contender_a, &self.contender_b)
    }
}

/// Order-independent identity of a pair
pub fn pair_key<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Builds the ordered list of matchups for a roster.
///
/// The result is randomized on every call; pass a seeded generator for
/// reproducible output.
pub fn generate_schedule<R: Rng + ?Sized>(
    mode: GameMode,
    ids: &[String],
    rng: &mut R,
) -> Vec<Pairing> {
    if ids.len() < 2 {
        return Vec::new();
    }

    match mode {
        GameMode::RoundRobin => {
            let mut pairs = round_robin_pairs(ids);
            pairs.shuffle(rng);
            pairs
        }
        GameMode::Extended => extended_schedule(ids, rng),
        GameMode::Standard => {
            let mut edges = cycle_edges(ids, rng);
            edges.shuffle(rng);
            edges
        }
    }
}

fn round_robin_pairs(ids: &[String]) -> Vec<Pairing> {
    let mut pairs = Vec::with_capacity(ids.len() * (ids.len() - 1) / 2);
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            pairs.push(Pairing::new(a.clone(), b.clone()));
        }
    }
    pairs
}

/// Closed walk over a random permutation: n edges, wrapping around
fn cycle_edges<R: Rng + ?Sized>(ids: &[String], rng: &mut R) -> Vec<Pairing> {
    let n = ids.len();
    if n < 2 {
        return Vec::new();
    }

    let mut perm = ids.to_vec();
    perm.shuffle(rng);

    (0..n)
        .map(|i| Pairing::new(perm[i].clone(), perm[(i + 1) % n].clone()))
        .collect()
}

struct ExtendedBuilder<'a> {
    target: usize,
    used: HashSet<(String, String)>,
    degree: HashMap<&'a str, usize>,
    schedule: Vec<Pairing>,
}

impl<'a> ExtendedBuilder<'a> {
    fn new(ids: &'a [String]) -> Self {
        Self {
            target: ids.len() * 2,
            used: HashSet::new(),
            degree: ids.iter().map(|id| (id.as_str(), 0)).collect(),
            schedule: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.schedule.len() >= self.target
    }

    fn degree_of(&self, id: &str) -> usize {
        self.degree.get(id).copied().unwrap_or(0)
    }

    fn owned_key(a: &str, b: &str) -> (String, String) {
        let (x, y) = pair_key(a, b);
        (x.to_string(), y.to_string())
    }

    /// Accepts the pair only if it is new
    fn try_add_unique(&mut self, pairing: Pairing) -> bool {
        if pairing.contender_a == pairing.contender_b {
            return false;
        }
        if !self
            .used
            .insert(Self::owned_key(&pairing.contender_a, &pairing.contender_b))
        {
            return false;
        }
        self.push(pairing);
        true
    }

    fn push(&mut self, pairing: Pairing) {
        for id in [&pairing.contender_a, &pairing.contender_b] {
            if let Some(d) = self.degree.get_mut(id.as_str()) {
                *d += 1;
            }
        }
        self.schedule.push(pairing);
    }
}

const EXTENDED_CYCLE_ATTEMPTS: usize = 6;

fn extended_schedule<R: Rng + ?Sized>(ids: &[String], rng: &mut R) -> Vec<Pairing> {
    let mut builder = ExtendedBuilder::new(ids);

    // Whole cycles first: each accepted cycle raises every degree evenly.
    for _ in 0..EXTENDED_CYCLE_ATTEMPTS {
        if builder.is_full() {
            break;
        }
        let mut edges = cycle_edges(ids, rng);
        edges.shuffle(rng);
        for edge in edges {
            if builder.is_full() {
                break;
            }
            builder.try_add_unique(edge);
        }
    }

    // Then unused pairs, lowest degree first.
    let mut tried: HashSet<(String, String)> = HashSet::new();
    while !builder.is_full() {
        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort_by_key(|id| builder.degree_of(id));

        let mut added = false;
        'scan: for i in 0..sorted.len() {
            for j in (i + 1)..sorted.len() {
                let key = ExtendedBuilder::owned_key(sorted[i], sorted[j]);
                if !tried.insert(key.clone()) {
                    continue;
                }
                if !builder.used.contains(&key)
                    && builder.try_add_unique(Pairing::new(sorted[i].clone(), sorted[j].clone()))
                {
                    added = true;
                    break 'scan;
                }
            }
        }
        if !added {
            break;
        }
    }

    // Unique pairs exhausted: repeat the least-loaded pair.
    while !builder.is_full() {
        let mut best: Option<(usize, usize, usize)> = None;
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let load = builder.degree_of(&ids[i]) + builder.degree_of(&ids[j]);
                if best.map_or(true, |(score, _, _)| load < score) {
                    best = Some((load, i, j));
                }
            }
        }
        match best {
            Some((_, i, j)) => builder.push(Pairing::new(ids[i].clone(), ids[j].clone())),
            None => break,
        }
    }

    let mut schedule = builder.schedule;
    schedule.shuffle(rng);
    schedule
}
