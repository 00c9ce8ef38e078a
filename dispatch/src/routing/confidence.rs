//! Routing confidence: match strength + query length + domain specificity.

use super::scorer::DomainScores;
use serde::Serialize;

/// The three additive components and their capped total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    pub match_strength: f64,
    pub query_length: f64,
    pub specificity: f64,
    pub total: f64,
}

impl ConfidenceBreakdown {
    /// Confidence attached to priority overrides.
    pub fn certain() -> Self {
        Self {
            match_strength: 0.0,
            query_length: 0.0,
            specificity: 0.0,
            total: 1.0,
        }
    }
}

/// 0.0 to 0.6 from the winning domain's raw keyword count.
pub fn match_strength(top_score: usize) -> f64 {
    match top_score {
        0 => 0.0,
        1..=2 => 0.2 + 0.1 * top_score as f64,
        3..=4 => 0.4 + 0.05 * (top_score - 2) as f64,
        _ => 0.6,
    }
}

/// 0.0 to 0.2 from the whitespace-separated word count.
pub fn query_length(query: &str) -> f64 {
    match query.split_whitespace().count() {
        0..=4 => 0.0,
        5..=9 => 0.1,
        _ => 0.2,
    }
}

/// 0.0 to 0.2 from how far the winner is ahead of the runner-up.
pub fn specificity(top: usize, runner_up: usize) -> f64 {
    if top > runner_up * 2 {
        0.2
    } else if top > runner_up {
        0.1
    } else {
        0.0
    }
}

pub fn calculate_confidence(query: &str, scores: &DomainScores) -> ConfidenceBreakdown {
    let (top, runner_up) = scores.top_two();
    let match_strength = round2(match_strength(top));
    let query_length = round2(query_length(query));
    let specificity = round2(specificity(top, runner_up));
    ConfidenceBreakdown {
        match_strength,
        query_length,
        specificity,
        total: round2((match_strength + query_length + specificity).min(1.0)),
    }
}

// Keeps band comparisons (>= 0.3, >= 0.7) free of float noise
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::scorer::DomainScorer;

    #[test]
    fn test_match_strength_steps() {
        let expected = [0.0, 0.3, 0.4, 0.45, 0.5, 0.6, 0.6];
        for (score, want) in expected.iter().enumerate() {
            assert!((match_strength(score) - want).abs() < 1e-9, "score {}", score);
        }
    }

    #[test]
    fn test_match_strength_is_monotonic() {
        for score in 0..20 {
            assert!(match_strength(score + 1) >= match_strength(score));
        }
    }

    #[test]
    fn test_query_length_bands() {
        assert_eq!(query_length("visa"), 0.0);
        assert_eq!(query_length("one two three four five"), 0.1);
        assert_eq!(query_length("a b c d e f g h i j"), 0.2);
        assert_eq!(query_length("   "), 0.0);
    }

    #[test]
    fn test_specificity() {
        assert_eq!(specificity(3, 1), 0.2);
        assert_eq!(specificity(2, 1), 0.1);
        assert_eq!(specificity(1, 1), 0.0);
        assert_eq!(specificity(1, 0), 0.2);
        assert_eq!(specificity(0, 0), 0.0);
    }

    #[test]
    fn test_total_is_rounded_and_capped() {
        let scorer = DomainScorer::new();
        let query = "kitas work permit immigration sponsor visa passport question for my family next month";
        let breakdown = calculate_confidence(query, &scorer.score(query));
        assert_eq!(breakdown.match_strength, 0.6);
        assert_eq!(breakdown.query_length, 0.2);
        assert_eq!(breakdown.specificity, 0.2);
        assert_eq!(breakdown.total, 1.0);

        let breakdown = calculate_confidence("visa", &scorer.score("visa"));
        assert_eq!(breakdown.total, 0.5);
    }
}
