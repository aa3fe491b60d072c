use std::fs;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{GameError, Result};

/// Used when a deck is empty
pub const FALLBACK_TEMPLATE: &str = "{A} vs {B}";

const BUILTIN_PROMPTS: &[&str] = &[
    "Who would survive longer on a desert island: {A} or {B}?",
    "Who is more likely to become famous: {A} or {B}?",
    "Who would win a cooking contest: {A} or {B}?",
    "Who would you call to help you move house: {A} or {B}?",
    "Who is the better karaoke partner: {A} or {B}?",
    "Who would lead the group out of a zombie apocalypse: {A} or {B}?",
    "Who gives the better advice: {A} or {B}?",
    "Who is more likely to get lost with a map in hand: {A} or {B}?",
    "Who would win a staring contest: {A} or {B}?",
    "Who would you trust with your secrets: {A} or {B}?",
    "Who is more likely to start a side business: {A} or {B}?",
    "Who would make the better reality TV contestant: {A} or {B}?",
];

/// Prompt templates attached to matchups; `{A}` and `{B}` are replaced by
/// the contenders' display names.
#[derive(Debug, Clone)]
pub struct PromptDeck {
    templates: Vec<String>,
}

impl Default for PromptDeck {
    fn default() -> Self {
        Self::new(BUILTIN_PROMPTS.iter().map(|p| p.to_string()).collect())
    }
}

impl PromptDeck {
    pub fn new(templates: Vec<String>) -> Self {
        Self { templates }
    }

    /// One template per non-blank line
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| GameError::PromptsUnreadable {
            path: path.to_string(),
            source,
        })?;
        let templates: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self::new(templates))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.templates
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| FALLBACK_TEMPLATE.to_string())
    }
}

pub fn render_prompt(template: &str, name_a: &str, name_b: &str) -> String {
    template.replace("{A}", name_a).replace("{B}", name_b)
}
