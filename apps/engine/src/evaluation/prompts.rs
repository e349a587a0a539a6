#![allow(dead_code)]

// All LLM prompt constants for the Evaluation module.

/// System prompt for response evaluation — enforces JSON-only output.
pub const EVALUATION_SYSTEM: &str =
    "You are a rigorous interview assessor scoring one candidate answer. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Screening rubric. Replace `{history}`, `{question}`, `{response}`.
pub const SCREENING_EVALUATION_TEMPLATE: &str = r#"Evaluate the candidate's answer to a screening question.

Score each dimension from 1 to 5 using these anchors:
- communication: 1 = incoherent or rambling, 3 = understandable with effort, 5 = crisp and well organized
- relevance: 1 = does not address the question, 3 = partially on topic, 5 = directly and completely on topic
- experience_fit: 1 = no relevant background given, 3 = adjacent background, 5 = directly applicable background with specifics
- motivation: 1 = no interest expressed, 3 = generic interest, 5 = specific, credible interest in this role

Penalize generic or unsupported claims: a statement with no concrete detail
("I'm a great team player") must not score above 3 on its dimension.

PRIOR EXCHANGES (context for consistency scoring — do not re-score them):
{history}

QUESTION:
{question}

CANDIDATE ANSWER:
{response}

Return a JSON object with this EXACT schema (no extra fields):
{
  "scores": {"communication": 3, "relevance": 3, "experience_fit": 3, "motivation": 3},
  "strengths": ["one short phrase per strength"],
  "growth_areas": ["one short phrase per growth area"],
  "needs_clarification": false
}

Set "needs_clarification" to true ONLY when the answer is vague or evasive
enough that one clarifying follow-up would materially improve the signal.
Base this on substance, not length."#;

/// Behavioral rubric (STAR). Replace `{history}`, `{question}`, `{response}`.
pub const BEHAVIORAL_EVALUATION_TEMPLATE: &str = r#"Evaluate the candidate's answer to a behavioral interview question.

Score each dimension from 1 to 5 using these anchors:
- structure: 1 = no discernible narrative, 3 = partial STAR structure, 5 = complete situation-task-action-result arc
- specificity: 1 = entirely generic, 3 = some concrete detail, 5 = named systems, numbers, and people throughout
- impact: 1 = no outcome stated, 3 = outcome stated without evidence, 5 = quantified, attributable outcome
- self_awareness: 1 = no reflection, 3 = surface-level reflection, 5 = honest analysis of what they would change

Penalize generic or unsupported claims: an outcome with no evidence
("it went really well") must not lift the impact score above 3.

PRIOR EXCHANGES (context for consistency scoring — do not re-score them):
{history}

QUESTION:
{question}

CANDIDATE ANSWER:
{response}

Return a JSON object with this EXACT schema (no extra fields):
{
  "scores": {"structure": 3, "specificity": 3, "impact": 3, "self_awareness": 3},
  "strengths": ["one short phrase per strength"],
  "growth_areas": ["one short phrase per growth area"],
  "missing_component": null
}

"missing_component" names the single most absent STAR element: one of
"situation", "task", "action", "result", or null when the story is complete."#;

/// Technical rubric. Replace `{history}`, `{question}`, `{response}`.
pub const TECHNICAL_EVALUATION_TEMPLATE: &str = r#"Evaluate the candidate's answer to a technical interview question.

Score each dimension from 1 to 5 using these anchors:
- accuracy: 1 = materially wrong, 3 = mostly right with gaps, 5 = correct including edge cases
- depth: 1 = surface recital, 3 = working knowledge, 5 = mechanism-level understanding with trade-offs
- problem_solving: 1 = no approach visible, 3 = plausible approach, 5 = systematic decomposition and validation
- clarity: 1 = cannot follow the explanation, 3 = followable with effort, 5 = teaches the concept cleanly

Penalize generic or unsupported claims: buzzwords without mechanism
("we used microservices so it scaled") must not score above 3 on depth.

PRIOR EXCHANGES (context for consistency scoring — do not re-score them):
{history}

QUESTION:
{question}

CANDIDATE ANSWER:
{response}

Return a JSON object with this EXACT schema (no extra fields):
{
  "scores": {"accuracy": 3, "depth": 3, "problem_solving": 3, "clarity": 3},
  "strengths": ["one short phrase per strength"],
  "growth_areas": ["one short phrase per growth area"],
  "unresolved_topics": []
}

"unresolved_topics" lists sub-topics the answer raised but left unexplained
(empty when none) — each a short phrase suitable for a follow-up question."#;

/// Question personalization prompt. Replace `{question}`, `{context}`.
pub const PERSONALIZE_QUESTION_TEMPLATE: &str = r#"Rewrite the interview question below so it references the candidate's actual background, using ONLY the excerpts provided. Keep the same competency under test, keep it one sentence where possible, and do not invent facts.

CANDIDATE CONTEXT:
{context}

QUESTION:
{question}

Return a JSON object with this EXACT schema:
{
  "question": "the personalized question"
}"#;
