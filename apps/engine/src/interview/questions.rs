//! Question banks and selection policies.
//!
//! Every type rotates through a fixed category list with
//! `category = list[index % len]` and picks within the category with
//! `(index / len) % questions_in_category`. Technical interviews
//! additionally bucket difficulty by fractional position in the question
//! budget and draw from a domain detected once from the job description.

use serde::{Deserialize, Serialize};

use crate::interview::profile::InterviewKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Basic,
    Intermediate,
    Advanced,
}

/// First 30% of the budget is basic, the next 40% intermediate, the rest
/// advanced.
pub fn difficulty_for_position(index: usize, max_questions: usize) -> Difficulty {
    if max_questions == 0 {
        return Difficulty::Basic;
    }
    let fraction = index as f64 / max_questions as f64;
    if fraction < 0.3 {
        Difficulty::Basic
    } else if fraction < 0.7 {
        Difficulty::Intermediate
    } else {
        Difficulty::Advanced
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    General,
    Backend,
    Frontend,
    Data,
    Devops,
}

const DOMAIN_KEYWORDS: &[(Domain, &[&str])] = &[
    (
        Domain::Backend,
        &["backend", "api", "server", "microservice", "database", "distributed"],
    ),
    (
        Domain::Frontend,
        &["frontend", "react", "css", "javascript", "typescript", "accessibility"],
    ),
    (
        Domain::Data,
        &["data engineer", "etl", "pipeline", "warehouse", "analytics", "spark", "sql"],
    ),
    (
        Domain::Devops,
        &["devops", "kubernetes", "docker", "terraform", "ci/cd", "infrastructure", "sre"],
    ),
];

/// Keyword-matches a technical domain from the job description. Matched once
/// per session and cached; ties break toward the earlier entry above.
pub fn detect_domain(jd_text: &str) -> Domain {
    let haystack = jd_text.to_lowercase();
    let mut best = Domain::General;
    let mut best_hits = 0usize;
    for (domain, keywords) in DOMAIN_KEYWORDS {
        let hits = keywords
            .iter()
            .map(|kw| haystack.matches(kw).count())
            .sum::<usize>();
        if hits > best_hits {
            best = *domain;
            best_hits = hits;
        }
    }
    best
}

/// A question chosen by the rotation policy.
#[derive(Debug, Clone)]
pub struct SelectedQuestion {
    pub category: &'static str,
    pub difficulty: Option<Difficulty>,
    pub text: &'static str,
}

// ────────────────────────────────────────────────────────────────────────────
// Screening bank
// ────────────────────────────────────────────────────────────────────────────

const SCREENING_BANK: &[(&str, &[&str])] = &[
    (
        "background",
        &[
            "Walk me through your background and what you're doing today.",
            "Which part of your experience is most relevant to this role?",
        ],
    ),
    (
        "motivation",
        &[
            "What draws you to this role in particular?",
            "What are you looking for in your next position that you don't have today?",
        ],
    ),
    (
        "logistics",
        &[
            "What is your availability to start, and do you have constraints we should know about?",
            "Are you interviewing elsewhere, and where are you in those processes?",
        ],
    ),
    (
        "expectations",
        &[
            "What are your compensation expectations for this role?",
            "What does a successful first six months look like to you?",
        ],
    ),
];

// ────────────────────────────────────────────────────────────────────────────
// Behavioral bank
// ────────────────────────────────────────────────────────────────────────────

const BEHAVIORAL_BANK: &[(&str, &[&str])] = &[
    (
        "leadership",
        &[
            "Tell me about a time you led a project without formal authority.",
            "Describe a time you had to make an unpopular decision.",
        ],
    ),
    (
        "teamwork",
        &[
            "Tell me about a time you relied on a teammate to deliver something critical.",
            "Describe a time you helped a struggling colleague.",
        ],
    ),
    (
        "conflict",
        &[
            "Tell me about a disagreement with a coworker and how it was resolved.",
            "Describe a time you received pushback on a technical decision.",
        ],
    ),
    (
        "problem_solving",
        &[
            "Tell me about the hardest problem you've debugged.",
            "Describe a time you had to deliver with incomplete information.",
        ],
    ),
    (
        "adaptability",
        &[
            "Tell me about a time priorities changed under you mid-project.",
            "Describe a time you had to learn something unfamiliar fast.",
        ],
    ),
];

// ────────────────────────────────────────────────────────────────────────────
// Technical bank: domain → topic → difficulty tier
// ────────────────────────────────────────────────────────────────────────────

struct TechnicalTopic {
    name: &'static str,
    basic: &'static [&'static str],
    intermediate: &'static [&'static str],
    advanced: &'static [&'static str],
}

const GENERAL_TOPICS: &[TechnicalTopic] = &[
    TechnicalTopic {
        name: "fundamentals",
        basic: &["Explain the difference between a process and a thread."],
        intermediate: &["How does a hash map handle collisions, and what does that cost?"],
        advanced: &["When would you choose a B-tree over a hash index, and why?"],
    },
    TechnicalTopic {
        name: "debugging",
        basic: &["How do you approach a bug you can't reproduce locally?"],
        intermediate: &["A service's latency doubled overnight with no deploy. Where do you look?"],
        advanced: &["How would you hunt a memory leak that only appears after days of uptime?"],
    },
    TechnicalTopic {
        name: "design",
        basic: &["What makes an API easy to use correctly?"],
        intermediate: &["Design a rate limiter for a public API. What are the trade-offs?"],
        advanced: &["How would you evolve a schema that's serving live traffic without downtime?"],
    },
    TechnicalTopic {
        name: "testing",
        basic: &["What belongs in a unit test versus an integration test?"],
        intermediate: &["How do you test code with a hard external dependency, like a payment API?"],
        advanced: &["How would you make a flaky test suite trustworthy again?"],
    },
];

const BACKEND_TOPICS: &[TechnicalTopic] = &[
    TechnicalTopic {
        name: "api_design",
        basic: &["What does idempotency mean for an HTTP endpoint, and why does it matter?"],
        intermediate: &["How would you paginate a large, frequently-changing result set?"],
        advanced: &["Design versioning for a public API with third-party consumers you can't break."],
    },
    TechnicalTopic {
        name: "data_storage",
        basic: &["When would you pick a relational database over a document store?"],
        intermediate: &["Explain a situation where a database index makes writes slower."],
        advanced: &["How would you shard a table that has outgrown one primary?"],
    },
    TechnicalTopic {
        name: "scaling",
        basic: &["What does horizontal scaling mean, and what breaks first when you do it?"],
        intermediate: &["Where would you add caching in a read-heavy service, and what can go stale?"],
        advanced: &["How do you keep two services' views of the same data consistent?"],
    },
    TechnicalTopic {
        name: "reliability",
        basic: &["What is a health check actually checking?"],
        intermediate: &["What is a retry storm and how do you prevent one?"],
        advanced: &["Walk me through designing a graceful-degradation plan for a hard dependency."],
    },
];

const FRONTEND_TOPICS: &[TechnicalTopic] = &[
    TechnicalTopic {
        name: "rendering",
        basic: &["What happens between typing a URL and seeing a page?"],
        intermediate: &["When does client-side rendering hurt more than it helps?"],
        advanced: &["How would you diagnose and fix a slow first contentful paint?"],
    },
    TechnicalTopic {
        name: "state_management",
        basic: &["Where should UI state live, and when does it need to move up?"],
        intermediate: &["How do you keep server state and client state from drifting apart?"],
        advanced: &["Design optimistic updates for an editor used by multiple people at once."],
    },
    TechnicalTopic {
        name: "performance",
        basic: &["What makes a web page feel slow even when the network is fast?"],
        intermediate: &["How would you cut a JavaScript bundle that has grown past your budget?"],
        advanced: &["How do you keep a long-lived single-page app from leaking memory?"],
    },
    TechnicalTopic {
        name: "accessibility",
        basic: &["What does semantic HTML buy you?"],
        intermediate: &["How do you make a custom dropdown usable with a keyboard and screen reader?"],
        advanced: &["How would you retrofit accessibility onto a large app with none?"],
    },
];

const DATA_TOPICS: &[TechnicalTopic] = &[
    TechnicalTopic {
        name: "modeling",
        basic: &["What's the difference between a fact table and a dimension table?"],
        intermediate: &["When would you denormalize a warehouse schema on purpose?"],
        advanced: &["How would you model slowly-changing dimensions for auditable history?"],
    },
    TechnicalTopic {
        name: "pipelines",
        basic: &["What makes a data pipeline idempotent, and why do you want that?"],
        intermediate: &["How do you backfill a year of data without disturbing daily runs?"],
        advanced: &["Design exactly-once delivery into a warehouse from an at-least-once stream."],
    },
    TechnicalTopic {
        name: "quality",
        basic: &["How do you detect that an upstream feed silently changed shape?"],
        intermediate: &["Where do data quality checks belong in a pipeline, and what do they assert?"],
        advanced: &["How would you quantify and communicate confidence in a critical report?"],
    },
    TechnicalTopic {
        name: "query_optimization",
        basic: &["What does a query planner do with your SQL?"],
        intermediate: &["A dashboard query went from seconds to minutes. How do you investigate?"],
        advanced: &["When do you pre-aggregate versus compute on read, and what does it cost?"],
    },
];

const DEVOPS_TOPICS: &[TechnicalTopic] = &[
    TechnicalTopic {
        name: "deployment",
        basic: &["What's the difference between a rolling deploy and a blue-green deploy?"],
        intermediate: &["How would you structure a safe rollback for a deploy that migrates data?"],
        advanced: &["Design progressive delivery for a change with unknown blast radius."],
    },
    TechnicalTopic {
        name: "observability",
        basic: &["What's the difference between logs, metrics, and traces?"],
        intermediate: &["Which service-level indicators would you pick for a checkout flow?"],
        advanced: &["How do you find the cause of a latency regression across twenty services?"],
    },
    TechnicalTopic {
        name: "automation",
        basic: &["What belongs in CI for every commit, and what can wait?"],
        intermediate: &["How do you keep infrastructure-as-code from drifting from reality?"],
        advanced: &["Design a paved road that makes the secure path the easy path for teams."],
    },
    TechnicalTopic {
        name: "incident_response",
        basic: &["What do you do in the first five minutes of a production incident?"],
        intermediate: &["How do you run a blameless postmortem that actually changes things?"],
        advanced: &["How would you rehearse failure for a system that cannot afford surprises?"],
    },
];

fn technical_topics(domain: Domain) -> &'static [TechnicalTopic] {
    match domain {
        Domain::General => GENERAL_TOPICS,
        Domain::Backend => BACKEND_TOPICS,
        Domain::Frontend => FRONTEND_TOPICS,
        Domain::Data => DATA_TOPICS,
        Domain::Devops => DEVOPS_TOPICS,
    }
}

/// Selects the question for `index` under the type's rotation policy.
pub fn select_question(
    kind: InterviewKind,
    index: usize,
    max_questions: usize,
    domain: Domain,
) -> SelectedQuestion {
    match kind {
        InterviewKind::Screening => rotate(SCREENING_BANK, index),
        InterviewKind::Behavioral => rotate(BEHAVIORAL_BANK, index),
        InterviewKind::Technical => {
            let topics = technical_topics(domain);
            let topic = &topics[index % topics.len()];
            let difficulty = difficulty_for_position(index, max_questions);
            let tier = match difficulty {
                Difficulty::Basic => topic.basic,
                Difficulty::Intermediate => topic.intermediate,
                Difficulty::Advanced => topic.advanced,
            };
            let within = (index / topics.len()) % tier.len();
            SelectedQuestion {
                category: topic.name,
                difficulty: Some(difficulty),
                text: tier[within],
            }
        }
    }
}

fn rotate(bank: &'static [(&'static str, &'static [&'static str])], index: usize) -> SelectedQuestion {
    let (category, questions) = &bank[index % bank.len()];
    let within = (index / bank.len()) % questions.len();
    SelectedQuestion {
        category,
        difficulty: None,
        text: questions[within],
    }
}
