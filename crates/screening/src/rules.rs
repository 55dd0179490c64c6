use promptgate_common::{GatewayError, GatewayResult, RuleCategory, RuleConfig};
use serde::Serialize;

/// Patterns screened when the configuration does not list its own.
const BUILTIN_RULES: &[(&str, RuleCategory)] = &[
    ("ignore previous instructions", RuleCategory::InjectionOverride),
    ("disregard safety", RuleCategory::InjectionOverride),
    ("bypass security", RuleCategory::InjectionOverride),
    ("system command", RuleCategory::CommandExecution),
    ("exec(", RuleCategory::CodeExecution),
    ("eval(", RuleCategory::CodeExecution),
    (";", RuleCategory::SqlInjection),
    ("--", RuleCategory::SqlInjection),
    ("/*", RuleCategory::SqlInjection),
    ("{{", RuleCategory::TemplateInjection),
    ("${", RuleCategory::TemplateInjection),
    ("<script>", RuleCategory::MarkupInjection),
];

/// Result of classifying a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    /// The first rule (in rule-set order) that matched.
    Unsafe {
        category: RuleCategory,
        pattern: String,
    },
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }
}

/// A case-insensitive substring pattern tagged with the attack it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreeningRule {
    pattern: String,
    category: RuleCategory,
}

impl ScreeningRule {
    pub fn new(pattern: &str, category: RuleCategory) -> GatewayResult<Self> {
        if pattern.trim().is_empty() {
            return Err(GatewayError::Config(
                "screening rule pattern must not be empty".to_string(),
            ));
        }
        Ok(Self {
            pattern: pattern.to_lowercase(),
            category,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn category(&self) -> RuleCategory {
        self.category
    }
}

/// An ordered, immutable set of screening rules.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleSet {
    rules: Vec<ScreeningRule>,
}

impl RuleSet {
    /// The built-in rule table.
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|&(pattern, category)| ScreeningRule {
                pattern: pattern.to_string(),
                category,
            })
            .collect();
        Self { rules }
    }

    /// Build a rule set from configured rules, preserving their order.
    pub fn from_config(rules: &[RuleConfig]) -> GatewayResult<Self> {
        let rules = rules
            .iter()
            .map(|r| ScreeningRule::new(&r.pattern, r.category))
            .collect::<GatewayResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn from_rules(rules: Vec<ScreeningRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ScreeningRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Classify `text` against every rule in order. The first match wins.
    pub fn classify(&self, text: &str) -> Verdict {
        let lowered = text.to_lowercase();

        self.rules
            .iter()
            .find(|rule| lowered.contains(rule.pattern.as_str()))
            .map(|rule| Verdict::Unsafe {
                category: rule.category,
                pattern: rule.pattern.clone(),
            })
            .unwrap_or(Verdict::Safe)
    }
}
