//! Context assembly.
//!
//! Packs ranked candidates into one context string under a token budget.
//! The packing is greedy: candidates are taken in rank order and assembly
//! stops at the first one that would exhaust the budget, even if a later,
//! smaller candidate would still fit. Relevance order is never traded for
//! tighter packing.

use serde::{Deserialize, Serialize};

use super::ranker::RankedCandidate;
use crate::core::errors::RagError;

/// Maximum number of tokens an assembled context may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct TokenBudget(usize);

impl TokenBudget {
    pub fn new(tokens: usize) -> Result<Self, RagError> {
        if tokens == 0 {
            return Err(RagError::InvalidConfiguration(
                "token budget must be positive".to_string(),
            ));
        }
        Ok(Self(tokens))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for TokenBudget {
    type Error = RagError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TokenBudget> for usize {
    fn from(budget: TokenBudget) -> Self {
        budget.0
    }
}

/// Result of one assembly pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssembledContext {
    pub text: String,
    /// Labels of the included candidates, in inclusion order.
    pub labels: Vec<String>,
    /// Sum of the included candidates' token counts.
    pub token_count: usize,
}

/// Greedy context assembler.
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    budget: TokenBudget,
}

impl ContextBuilder {
    pub fn new(budget: TokenBudget) -> Self {
        Self { budget }
    }

    /// Builds the context text, each included candidate prefixed by `\n`.
    pub fn assemble(&self, ranked: &[RankedCandidate<'_>]) -> String {
        self.assemble_detailed(ranked).text
    }

    /// Like [`assemble`](Self::assemble), also reporting what was included.
    pub fn assemble_detailed(&self, ranked: &[RankedCandidate<'_>]) -> AssembledContext {
        let budget = self.budget.get();
        let mut assembled = AssembledContext::default();
        let mut running_total = 0usize;

        for candidate in ranked {
            running_total = running_total.saturating_add(candidate.token_count);
            if running_total >= budget {
                break;
            }
            assembled.text.push('\n');
            assembled.text.push_str(&candidate.record.text);
            assembled.labels.push(candidate.record.label.clone());
            assembled.token_count = running_total;
        }

        tracing::debug!(
            "Assembled context from {} of {} candidates ({} tokens, budget {})",
            assembled.labels.len(),
            ranked.len(),
            assembled.token_count,
            budget
        );
        assembled
    }
}
