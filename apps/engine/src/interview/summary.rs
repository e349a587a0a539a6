//! Summary generation — aggregates per-response evaluations into the final
//! report returned on completion.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::evaluation::{rubric_for, SCALE_MIDPOINT};
use crate::interview::profile::{recommendation_for, TypeProfile};
use crate::interview::session::ResponseRecord;

/// Qualitative lists are deduplicated and capped at this many entries,
/// preserving first-seen order.
const QUALITATIVE_CAP: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ScoreStatistics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    /// Derived from standard-deviation bands.
    pub consistency: &'static str,
    /// Derived from first-vs-last per-response score.
    pub trend: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewSummary {
    pub overall_score: f64,
    pub dimension_averages: BTreeMap<String, f64>,
    pub recommendation: String,
    pub strengths: Vec<String>,
    pub growth_areas: Vec<String>,
    pub statistics: Option<ScoreStatistics>,
    pub questions_asked: usize,
    pub responses_evaluated: usize,
}

pub fn build_summary(
    profile: &TypeProfile,
    responses: &[ResponseRecord],
    questions_asked: usize,
) -> InterviewSummary {
    let dimensions = rubric_for(profile.kind).dimensions;

    let mut dimension_averages = BTreeMap::new();
    for dim in dimensions {
        let average = if responses.is_empty() {
            SCALE_MIDPOINT
        } else {
            responses
                .iter()
                .map(|r| {
                    // A dimension the evaluator skipped counts as midpoint,
                    // not zero — absence of signal is not a failing grade.
                    r.evaluation
                        .scores
                        .get(*dim)
                        .copied()
                        .unwrap_or(SCALE_MIDPOINT)
                })
                .sum::<f64>()
                / responses.len() as f64
        };
        dimension_averages.insert(dim.to_string(), average);
    }

    let overall_score = if dimension_averages.is_empty() {
        SCALE_MIDPOINT
    } else {
        dimension_averages.values().sum::<f64>() / dimension_averages.len() as f64
    };

    let per_response: Vec<f64> = responses.iter().map(|r| r.evaluation.overall()).collect();

    InterviewSummary {
        overall_score,
        recommendation: recommendation_for(profile, overall_score).to_string(),
        dimension_averages,
        strengths: dedup_capped(responses.iter().flat_map(|r| r.evaluation.strengths.iter())),
        growth_areas: dedup_capped(responses.iter().flat_map(|r| r.evaluation.growth_areas.iter())),
        statistics: score_statistics(&per_response),
        questions_asked,
        responses_evaluated: responses.len(),
    }
}

/// First-seen order, case-insensitive dedup, capped.
fn dedup_capped<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let key = item.trim().to_lowercase();
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        out.push(item.clone());
        if out.len() == QUALITATIVE_CAP {
            break;
        }
    }
    out
}

fn score_statistics(scores: &[f64]) -> Option<ScoreStatistics> {
    if scores.is_empty() {
        return None;
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let consistency = if std_dev < 0.3 {
        "highly consistent"
    } else if std_dev < 0.7 {
        "consistent"
    } else if std_dev < 1.2 {
        "variable"
    } else {
        "erratic"
    };

    let delta = scores.last().unwrap() - scores.first().unwrap();
    let trend = if delta > 0.5 {
        "improving"
    } else if delta < -0.5 {
        "declining"
    } else {
        "steady"
    };

    Some(ScoreStatistics {
        mean,
        min,
        max,
        std_dev,
        consistency,
        trend,
    })
}
