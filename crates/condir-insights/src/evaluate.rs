//! Heuristic scoring of generated sales notes.
//!
//! Every dimension is an integer in `0..=10`; `overall` is their mean.

use serde::Serialize;

const ACTION_KEYWORDS: [&str; 6] = [
    "approach",
    "mention",
    "highlight",
    "discuss",
    "opportunity",
    "recommend",
];
const DOMAIN_KEYWORDS: [&str; 5] = ["roofing", "material", "product", "quality", "service"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InsightScores {
    pub specificity: u8,
    pub actionability: u8,
    pub relevance: u8,
    pub clarity: u8,
    pub length: u8,
    pub overall: f64,
}

/// One stored insight with its scores, as written to the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatedInsight {
    pub contractor_name: String,
    pub insight: String,
    pub scores: InsightScores,
}

/// Mean of each dimension across a set of evaluations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreAverages {
    pub specificity: f64,
    pub actionability: f64,
    pub relevance: f64,
    pub clarity: f64,
    pub length: f64,
    pub overall: f64,
}

impl ScoreAverages {
    #[must_use]
    pub fn from_scores<'a>(scores: impl IntoIterator<Item = &'a InsightScores>) -> Self {
        let mut sum = Self::default();
        let mut n = 0_u32;
        for s in scores {
            sum.specificity += f64::from(s.specificity);
            sum.actionability += f64::from(s.actionability);
            sum.relevance += f64::from(s.relevance);
            sum.clarity += f64::from(s.clarity);
            sum.length += f64::from(s.length);
            sum.overall += s.overall;
            n += 1;
        }
        if n == 0 {
            return sum;
        }
        let n = f64::from(n);
        Self {
            specificity: sum.specificity / n,
            actionability: sum.actionability / n,
            relevance: sum.relevance / n,
            clarity: sum.clarity / n,
            length: sum.length / n,
            overall: sum.overall / n,
        }
    }

    /// `(label, value)` pairs in report order.
    #[must_use]
    pub fn rows(&self) -> [(&'static str, f64); 6] {
        [
            ("Specificity", self.specificity),
            ("Actionability", self.actionability),
            ("Relevance", self.relevance),
            ("Clarity", self.clarity),
            ("Length", self.length),
            ("Overall", self.overall),
        ]
    }
}

/// Scores `insight` against the contractor it was written for.
#[must_use]
pub fn evaluate_insight(insight: &str, name: &str, rating: Option<f64>) -> InsightScores {
    let specificity = score_specificity(insight, name, rating);
    let actionability = score_actionability(insight);
    let relevance = score_relevance(insight);
    let clarity = score_clarity(insight);
    let length = score_length(insight);

    let overall = [specificity, actionability, relevance, clarity, length]
        .iter()
        .copied()
        .map(f64::from)
        .sum::<f64>()
        / 5.0;

    InsightScores {
        specificity,
        actionability,
        relevance,
        clarity,
        length,
        overall,
    }
}

fn score_specificity(insight: &str, name: &str, rating: Option<f64>) -> u8 {
    let mut score = 0;
    if let Some(rating) = rating.filter(|r| r.abs() > 0.0) {
        if insight.contains(&rating_text(rating)) {
            score += 3;
        }
    }
    if name.split_whitespace().any(|part| insight.contains(part)) {
        score += 2;
    }
    score
}

fn score_actionability(insight: &str) -> u8 {
    let lower = insight.to_lowercase();
    let hits = ACTION_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    u8::try_from(hits * 3).map_or(10, |s| s.min(10))
}

fn score_relevance(insight: &str) -> u8 {
    let lower = insight.to_lowercase();
    let hits = DOMAIN_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    u8::try_from(5 + hits).map_or(10, |s| s.min(10))
}

fn score_clarity(insight: &str) -> u8 {
    let sentences = sentences(insight);
    if sentences.is_empty() {
        return 10;
    }
    let words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
    if words > 30 * sentences.len() {
        7
    } else {
        10
    }
}

fn score_length(insight: &str) -> u8 {
    let sentences = sentences(insight).len();
    let words = insight.split_whitespace().count();
    if (2..=4).contains(&sentences) && (50..=120).contains(&words) {
        10
    } else if (1..=5).contains(&sentences) && (30..=150).contains(&words) {
        7
    } else {
        4
    }
}

fn sentences(text: &str) -> Vec<&str> {
    text.split('.').filter(|s| !s.trim().is_empty()).collect()
}

/// Whole ratings keep one decimal (`5.0`), matching how they are usually
/// quoted back in prose.
fn rating_text(rating: f64) -> String {
    if rating.is_finite() && rating.fract().abs() < f64::EPSILON {
        format!("{rating:.1}")
    } else {
        rating.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRONG: &str = "Summit Roofing holds a 4.8 rating and Master Elite status, which \
        signals consistent quality on every roofing job they take on across the borough. \
        Approach them about bundling premium shingle product lines with their repair service \
        work so their crews can stock materials from fewer suppliers. Highlight fast delivery windows and \
        discuss volume pricing as the clearest opportunity for a recurring account.";

    #[test]
    fn strong_insight_scores_high() {
        let scores = evaluate_insight(STRONG, "Summit Roofing", Some(4.8));
        assert_eq!(scores.specificity, 5);
        assert_eq!(scores.actionability, 10);
        assert_eq!(scores.relevance, 10);
        assert_eq!(scores.clarity, 10);
        assert_eq!(scores.length, 10);
        assert!((scores.overall - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn whole_rating_is_matched_with_one_decimal() {
        let scores = evaluate_insight("Rated 5.0 by homeowners.", "Nobody", Some(5.0));
        assert_eq!(scores.specificity, 3);
        let scores = evaluate_insight("Rated 5 by homeowners.", "Nobody", Some(5.0));
        assert_eq!(scores.specificity, 0);
    }

    #[test]
    fn zero_rating_earns_nothing() {
        let scores = evaluate_insight("Rated 0.0 overall.", "Nobody", Some(0.0));
        assert_eq!(scores.specificity, 0);
    }

    #[test]
    fn name_match_is_case_sensitive() {
        assert_eq!(score_specificity("talk to summit", "Summit Roofing", None), 0);
        assert_eq!(score_specificity("talk to Summit", "Summit Roofing", None), 2);
    }

    #[test]
    fn actionability_counts_distinct_keywords() {
        assert_eq!(score_actionability("Mention the warranty. Mention it again."), 3);
        assert_eq!(score_actionability("APPROACH and Discuss"), 6);
        assert_eq!(score_actionability("nothing here"), 0);
    }

    #[test]
    fn relevance_starts_at_five() {
        assert_eq!(score_relevance("hello"), 5);
        assert_eq!(score_relevance("Roofing materials"), 7);
    }

    #[test]
    fn long_sentences_lose_clarity() {
        let long = vec!["word"; 31].join(" ");
        assert_eq!(score_clarity(&format!("{long}.")), 7);
        assert_eq!(score_clarity("Short one. Another."), 10);
        assert_eq!(score_clarity(""), 10);
    }

    #[test]
    fn length_bands() {
        let forty = format!("{}.", vec!["word"; 40].join(" "));
        assert_eq!(score_length(&forty), 7);
        assert_eq!(score_length("Too short."), 4);
    }

    #[test]
    fn averages_over_empty_set_are_zero() {
        let none: Vec<InsightScores> = Vec::new();
        assert_eq!(ScoreAverages::from_scores(&none), ScoreAverages::default());
    }

    #[test]
    fn averages_take_the_mean() {
        let a = evaluate_insight(STRONG, "Summit Roofing", Some(4.8));
        let b = evaluate_insight("Too short.", "Nobody", None);
        let avg = ScoreAverages::from_scores(&[a, b]);
        assert!((avg.relevance - 7.5).abs() < f64::EPSILON);
        assert_eq!(avg.rows()[0].0, "Specificity");
    }
}
