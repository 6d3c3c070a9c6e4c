//! Experimental condition catalog
//!
//! A condition bundles the guideline text shown to the participant with the
//! hidden instruction that shapes the AI partner. The catalog is static
//! configuration; participants are assigned one entry at login.

mod assign;

pub use assign::{assign, RandomSource, SequenceSource, ThreadRngSource};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Tag identifying a condition (e.g. `G1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionId(String);

impl ConditionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Behavior family of the AI partner
///
/// The threaded relay backend binds each persona to a pre-configured
/// assistant identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Strategic,
    Baseline,
}

/// Immutable condition record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub id: ConditionId,
    /// Researcher-facing name, never shown to the participant
    pub label: String,
    pub persona: Persona,
    pub guide_text: String,
    pub hidden_instruction: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Condition catalog must not be empty")]
    Empty,
    #[error("Duplicate condition id: {0}")]
    DuplicateId(ConditionId),
}

/// Non-empty set of conditions
#[derive(Debug, Clone)]
pub struct ConditionCatalog {
    conditions: Vec<Condition>,
}

impl ConditionCatalog {
    pub fn new(conditions: Vec<Condition>) -> Result<Self, CatalogError> {
        if conditions.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for condition in &conditions {
            if !seen.insert(&condition.id) {
                return Err(CatalogError::DuplicateId(condition.id.clone()));
            }
        }
        Ok(Self { conditions })
    }

    /// The 2x2 design: guideline style (instructed / neutral) crossed with
    /// AI behavior (strategic / baseline).
    pub fn standard() -> Self {
        let entry = |id: &str, label: &str, persona: Persona, guide: &str| Condition {
            id: ConditionId::new(id),
            label: label.to_string(),
            persona,
            guide_text: guide.trim().to_string(),
            hidden_instruction: match persona {
                Persona::Strategic => STRATEGIC_INSTRUCTION,
                Persona::Baseline => BASELINE_INSTRUCTION,
            }
            .trim()
            .to_string(),
        };

        Self {
            conditions: vec![
                entry("G1", "Instructed_Strategic", Persona::Strategic, GUIDE_INSTRUCTED),
                entry("G2", "Instructed_Baseline", Persona::Baseline, GUIDE_INSTRUCTED),
                entry("G3", "Neutral_Strategic", Persona::Strategic, GUIDE_NEUTRAL),
                entry("G4", "Neutral_Baseline", Persona::Baseline, GUIDE_NEUTRAL),
            ],
        }
    }

    pub fn get(&self, id: &ConditionId) -> Option<&Condition> {
        self.conditions.iter().find(|c| &c.id == id)
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    /// Entry at `index`, wrapping around so any index is valid
    pub(crate) fn nth_wrapping(&self, index: usize) -> &Condition {
        &self.conditions[index % self.conditions.len()]
    }
}

const STRATEGIC_INSTRUCTION: &str = r#"
You are a Generative AI partner for a creative writing brainstorming session.
Today, the user will be writing a short Sci-Fi story.
You must strictly follow the "Discourse Engineering" guidelines:
1. Construction: Do not just accept ideas. Ask thoughtful questions.
2. Co-construction: Combine user ideas with yours. Aim for shared conclusions.
3. Conflict: Question assumptions. Engage in critical dialogue.
"#;

const BASELINE_INSTRUCTION: &str = r"
You are a helpful, friendly AI writing assistant.
Your goal is to help the user brainstorm a Sci-Fi story.
Guidelines:
1. Be Supportive & Natural.
2. Be Reactive: Answer questions clearly. Do not proactively lead or critique unless asked.
3. Follow the User: Assist, do not teach.
";

const GUIDE_INSTRUCTED: &str = r"
<h3>Guidelines for Brainstorming</h3>
<p>To get the best results, try using the following strategies when chatting with the AI:</p>
<ul>
    <li><b>Dig Deeper:</b> Don't just accept the first answer. Ask follow-up questions.</li>
    <li><b>Collaborate:</b> Combine the AI's ideas with your own. Treat it as a partnership.</li>
    <li><b>Challenge:</b> Don't be afraid to disagree. Challenge assumptions to fix logical holes.</li>
</ul>
";

const GUIDE_NEUTRAL: &str = r"
<h3>Guidelines for Brainstorming</h3>
<p>You will brainstorm a Sci-Fi story with an AI partner.</p>
<ul>
    <li>Chat naturally as you would with a human partner.</li>
    <li>Discuss characters, settings, and plots together.</li>
    <li>Feel free to ask for ideas or feedback anytime.</li>
</ul>
";
