//! Interview type capability records.
//!
//! Each interview type is a data record (greeting, question budget,
//! follow-up policy, recommendation bands, retention) consumed by one
//! generic state machine — type behavior lives here, not in subclasses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewKind {
    Screening,
    Behavioral,
    Technical,
}

impl std::fmt::Display for InterviewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InterviewKind::Screening => "screening",
            InterviewKind::Behavioral => "behavioral",
            InterviewKind::Technical => "technical",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for InterviewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "screening" => Ok(InterviewKind::Screening),
            "behavioral" => Ok(InterviewKind::Behavioral),
            "technical" => Ok(InterviewKind::Technical),
            other => Err(format!("unknown interview type: {other}")),
        }
    }
}

/// How a type decides whether to probe deeper on the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpPolicy {
    /// Behavioral: fire when the evaluator tags a missing STAR component.
    MissingStarComponent,
    /// Screening: fire on the evaluator's vagueness judgment — never on raw
    /// answer length.
    VaguenessProbe,
    /// Technical: fire on even question indices when the evaluator lists
    /// unresolved topics.
    EvenIndexUnresolvedTopic,
}

/// Per-type configuration composed into the generic state machine.
#[derive(Debug)]
pub struct TypeProfile {
    pub kind: InterviewKind,
    pub greeting: &'static str,
    pub completion_message: &'static str,
    pub max_questions: usize,
    pub duration_limit_minutes: i64,
    pub follow_up_policy: FollowUpPolicy,
    /// Descending (threshold, label) bands; the first band whose threshold
    /// the overall score meets supplies the recommendation.
    pub recommendation_bands: &'static [(f64, &'static str)],
    /// Quiet period after completion before the session is evicted.
    pub completed_retention_minutes: i64,
}

static SCREENING_PROFILE: TypeProfile = TypeProfile {
    kind: InterviewKind::Screening,
    greeting: "Welcome to your screening interview practice! I'll ask about your \
        background, motivation, and logistics — the questions a recruiter would \
        open with. Say hello when you're ready to begin.",
    completion_message: "That completes the screening round — thank you! Here is \
        your performance summary.",
    max_questions: 6,
    duration_limit_minutes: 15,
    follow_up_policy: FollowUpPolicy::VaguenessProbe,
    recommendation_bands: &[
        (4.0, "Advance to full interview"),
        (3.5, "Advance with minor reservations"),
        (3.0, "Borderline — second screen advised"),
        (0.0, "Do not advance"),
    ],
    completed_retention_minutes: 30,
};

static BEHAVIORAL_PROFILE: TypeProfile = TypeProfile {
    kind: InterviewKind::Behavioral,
    greeting: "Welcome to your behavioral interview practice! I'll ask about real \
        situations from your experience — strong answers cover the situation, \
        your task, the actions you took, and the result. Say hello when you're \
        ready to begin.",
    completion_message: "That completes the behavioral round — thank you for the \
        stories! Here is your performance summary.",
    max_questions: 8,
    duration_limit_minutes: 30,
    follow_up_policy: FollowUpPolicy::MissingStarComponent,
    recommendation_bands: &[
        (4.0, "Strong hire signal"),
        (3.4, "Hire signal"),
        (2.8, "Mixed signal — probe further"),
        (0.0, "Needs development"),
    ],
    completed_retention_minutes: 45,
};

static TECHNICAL_PROFILE: TypeProfile = TypeProfile {
    kind: InterviewKind::Technical,
    greeting: "Welcome to your technical interview practice! Questions start from \
        fundamentals and ramp up — explain your reasoning as you go, the way you \
        would at a whiteboard. Say hello when you're ready to begin.",
    completion_message: "That completes the technical round — thank you! Here is \
        your performance summary.",
    max_questions: 8,
    duration_limit_minutes: 45,
    follow_up_policy: FollowUpPolicy::EvenIndexUnresolvedTopic,
    recommendation_bands: &[
        (4.2, "Strong technical hire"),
        (3.5, "Solid technical performance"),
        (3.0, "Adequate with gaps"),
        (0.0, "Below bar"),
    ],
    completed_retention_minutes: 60,
};

pub fn profile_for(kind: InterviewKind) -> &'static TypeProfile {
    match kind {
        InterviewKind::Screening => &SCREENING_PROFILE,
        InterviewKind::Behavioral => &BEHAVIORAL_PROFILE,
        InterviewKind::Technical => &TECHNICAL_PROFILE,
    }
}

/// The recommendation label for an overall score under this profile's bands.
pub fn recommendation_for(profile: &TypeProfile, overall: f64) -> &'static str {
    profile
        .recommendation_bands
        .iter()
        .find(|(threshold, _)| overall >= *threshold)
        .map(|(_, label)| *label)
        .unwrap_or(profile.recommendation_bands.last().map(|(_, l)| *l).unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_from_str() {
        assert_eq!("screening".parse::<InterviewKind>().unwrap(), InterviewKind::Screening);
        assert_eq!(" Technical ".parse::<InterviewKind>().unwrap(), InterviewKind::Technical);
        assert!("vibes".parse::<InterviewKind>().is_err());
    }

    #[test]
    fn test_bands_are_descending_for_every_profile() {
        for kind in [
            InterviewKind::Screening,
            InterviewKind::Behavioral,
            InterviewKind::Technical,
        ] {
            let bands = profile_for(kind).recommendation_bands;
            for pair in bands.windows(2) {
                assert!(pair[0].0 > pair[1].0, "{kind}: bands not descending");
            }
            assert_eq!(bands.last().unwrap().0, 0.0, "{kind}: no catch-all band");
        }
    }

    #[test]
    fn test_recommendation_band_selection() {
        let profile = profile_for(InterviewKind::Screening);
        assert_eq!(recommendation_for(profile, 4.3), "Advance to full interview");
        assert_eq!(recommendation_for(profile, 3.7), "Advance with minor reservations");
        assert_eq!(recommendation_for(profile, 3.0), "Borderline — second screen advised");
        assert_eq!(recommendation_for(profile, 1.2), "Do not advance");
    }

    #[test]
    fn test_thresholds_are_type_specific() {
        // 3.45 reads differently per type on purpose.
        assert_eq!(
            recommendation_for(profile_for(InterviewKind::Behavioral), 3.45),
            "Hire signal"
        );
        assert_eq!(
            recommendation_for(profile_for(InterviewKind::Technical), 3.45),
            "Adequate with gaps"
        );
    }
}
