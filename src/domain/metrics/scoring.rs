//! Heuristic quality scores (sentiment, readability, coherence)

use std::fmt::Debug;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static VOWEL_GROUPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[aeiouy]+").expect("static regex is valid"));

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "amazing",
    "wonderful",
    "fantastic",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "horrible",
    "poor",
    "disappointing",
];

/// Quality scores in [0, 1]; `None` means the score was not computed
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityScores {
    pub sentiment: Option<f64>,
    pub readability: Option<f64>,
    pub coherence: Option<f64>,
}

impl QualityScores {
    pub fn zero() -> Self {
        Self {
            sentiment: Some(0.0),
            readability: Some(0.0),
            coherence: Some(0.0),
        }
    }
}

/// Scores response text. Must be pure: identical text yields identical scores.
pub trait QualityScorer: Send + Sync + Debug {
    fn score(&self, text: &str) -> QualityScores;
}

/// Lexicon and statistics based scorer, no model calls
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    /// Lexicon polarity mapped from [-1, 1] to [0, 1]; no hits is neutral (0.5)
    pub fn sentiment(&self, text: &str) -> f64 {
        let (mut positive, mut negative) = (0u32, 0u32);

        for word in text.unicode_words() {
            let word = word.to_lowercase();

            if POSITIVE_WORDS.contains(&word.as_str()) {
                positive += 1;
            } else if NEGATIVE_WORDS.contains(&word.as_str()) {
                negative += 1;
            }
        }

        let hits = positive + negative;

        if hits == 0 {
            return 0.5;
        }

        let polarity = (positive as f64 - negative as f64) / hits as f64;
        (polarity + 1.0) / 2.0
    }

    /// Simplified Flesch Reading Ease normalized to [0, 1]
    pub fn readability(&self, text: &str) -> f64 {
        let words: Vec<&str> = text.unicode_words().collect();

        if words.is_empty() {
            return 0.0;
        }

        let sentences = text.unicode_sentences().count().max(1) as f64;
        let word_count = words.len() as f64;
        let syllables: u32 = words.iter().map(|w| count_syllables(w)).sum();

        let score = 206.835
            - 1.015 * (word_count / sentences)
            - 84.6 * (syllables as f64 / word_count);

        score.clamp(0.0, 100.0) / 100.0
    }

    /// Consistency of sentence lengths; lower variance reads as more coherent
    pub fn coherence(&self, text: &str) -> f64 {
        let lengths: Vec<f64> = text
            .unicode_sentences()
            .map(|s| s.unicode_words().count())
            .filter(|&n| n > 0)
            .map(|n| n as f64)
            .collect();

        match lengths.len() {
            0 => 0.0,
            1 => 1.0,
            n => {
                let mean = lengths.iter().sum::<f64>() / n as f64;
                let variance =
                    lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n as f64;

                1.0 / (1.0 + variance / mean.max(1.0))
            }
        }
    }
}

impl QualityScorer for HeuristicScorer {
    fn score(&self, text: &str) -> QualityScores {
        if text.unicode_words().next().is_none() {
            return QualityScores::zero();
        }

        QualityScores {
            sentiment: Some(self.sentiment(text)),
            readability: Some(self.readability(text)),
            coherence: Some(self.coherence(text)),
        }
    }
}

/// Vowel-group syllable count with a silent trailing `e`, at least one per word
fn count_syllables(word: &str) -> u32 {
    let word = word.to_lowercase();
    let mut count = VOWEL_GROUPS.find_iter(&word).count() as i64;

    if word.ends_with('e') {
        count -= 1;
    }

    count.max(1) as u32
}
