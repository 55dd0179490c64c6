//! Input screening for prompts headed to the text-generation backend.
//!
//! Screening runs in three steps:
//!
//! 1. **Classification**: the prompt is lower-cased once and tested against an
//!    ordered [`RuleSet`] of substring patterns. The first match rejects it.
//! 2. **Sanitization**: a prompt that passed is stripped of markup tags and
//!    its template/shell metacharacters are backslash-escaped ([`sanitize`]).
//! 3. **Assembly**: the sanitized prompt is placed into the instruction
//!    template ([`build_instruction`]).
//!
//! The [`Screener`] holds the active rule set behind an
//! [`ArcSwap`](arc_swap::ArcSwap) so rules can be replaced at runtime without
//! blocking requests that are being screened.

pub mod rules;
pub mod sanitize;
pub mod template;

use std::sync::Arc;

use arc_swap::ArcSwap;
use promptgate_common::{GatewayError, GatewayResult, RuleConfig, ScreeningConfig};
use tracing::{debug, info};

pub use rules::{RuleSet, ScreeningRule, Verdict};
pub use sanitize::sanitize;
pub use template::build_instruction;

/// A prompt that passed screening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenedPrompt {
    /// The sanitized user prompt.
    pub sanitized: String,
    /// The full instruction to forward to the backend.
    pub instruction: String,
}

pub struct Screener {
    rules: ArcSwap<RuleSet>,
    classify_enabled: bool,
    max_prompt_length: Option<usize>,
}

impl Screener {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            classify_enabled: true,
            max_prompt_length: None,
        }
    }

    /// Reject prompts longer than `limit` characters before classification.
    pub fn with_max_prompt_length(mut self, limit: Option<usize>) -> Self {
        self.max_prompt_length = limit;
        self
    }

    /// Build a screener from the `screening` configuration section. The
    /// built-in rule table is used when no rules are configured.
    pub fn from_config(config: &ScreeningConfig) -> GatewayResult<Self> {
        let rules = if config.rules.is_empty() {
            RuleSet::builtin()
        } else {
            RuleSet::from_config(&config.rules)?
        };

        info!(
            rules = rules.len(),
            enabled = config.enabled,
            max_prompt_length = ?config.max_prompt_length,
            "prompt screener initialized"
        );

        Ok(Self {
            rules: ArcSwap::from_pointee(rules),
            classify_enabled: config.enabled,
            max_prompt_length: config.max_prompt_length,
        })
    }

    /// Classify `text` against the active rule set.
    pub fn classify(&self, text: &str) -> Verdict {
        self.rules.load().classify(text)
    }

    /// Run the full pipeline on a user prompt: length check, classification,
    /// sanitization and instruction assembly.
    ///
    /// The system context is placed into the instruction verbatim.
    pub fn screen(
        &self,
        prompt: &str,
        system_context: Option<&str>,
    ) -> GatewayResult<ScreenedPrompt> {
        if let Some(limit) = self.max_prompt_length {
            let length = prompt.chars().count();
            if length > limit {
                debug!(length, limit, "prompt exceeds length limit");
                return Err(GatewayError::PromptTooLong { length, limit });
            }
        }

        if self.classify_enabled {
            if let Verdict::Unsafe { category, pattern } = self.classify(prompt) {
                debug!(%category, pattern = %pattern, "prompt matched screening rule");
                return Err(GatewayError::UnsafePrompt { category, pattern });
            }
        }

        let sanitized = sanitize(prompt);
        let instruction = build_instruction(system_context, &sanitized);

        Ok(ScreenedPrompt {
            sanitized,
            instruction,
        })
    }

    /// Snapshot of the active rule set.
    pub fn rules(&self) -> Arc<RuleSet> {
        self.rules.load_full()
    }

    /// Append a rule to the active set and return its index.
    pub fn add_rule(&self, rule: &RuleConfig) -> GatewayResult<usize> {
        let new_rule = ScreeningRule::new(&rule.pattern, rule.category)?;
        let mut index = 0;

        self.rules.rcu(|current| {
            let mut rules = current.rules().to_vec();
            rules.push(new_rule.clone());
            index = rules.len() - 1;
            RuleSet::from_rules(rules)
        });

        info!(index, pattern = %new_rule.pattern(), category = %new_rule.category(), "screening rule added");
        Ok(index)
    }

    /// Remove the rule at `index`, returning it, or `None` if out of range.
    pub fn remove_rule(&self, index: usize) -> Option<ScreeningRule> {
        let mut removed = None;

        self.rules.rcu(|current| {
            let mut rules = current.rules().to_vec();
            removed = (index < rules.len()).then(|| rules.remove(index));
            RuleSet::from_rules(rules)
        });

        if let Some(ref rule) = removed {
            info!(index, pattern = %rule.pattern(), "screening rule removed");
        }
        removed
    }
}
