//! Documentation generator for validation rules
//!
//! Generates markdown reference documentation from a rule set.

use crate::schema::{ConfigSchema, ExpectedType, PatternSegment, SchemaValidator, ValidationRule};
use std::fmt::Write;

/// Configuration for docs generation
#[derive(Debug, Clone, Default)]
pub struct DocsConfig {
    /// Title for the documentation
    pub title: Option<String>,
    /// Description/introduction text
    pub description: Option<String>,
    /// Whether to group rules by top-level section
    pub group_by_section: bool,
}

impl DocsConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            group_by_section: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    #[must_use]
    pub fn flat(mut self) -> Self {
        self.group_by_section = false;
        self
    }
}

/// Generate markdown documentation for the rules of a validator
#[must_use]
pub fn generate_docs(validator: &SchemaValidator, config: DocsConfig) -> String {
    let rules: Vec<&ValidationRule> = validator.rules().collect();
    render(&rules, config)
}

/// Generate markdown documentation for a [`ConfigSchema`]
#[must_use]
pub fn generate_schema_docs<S: ConfigSchema>(config: DocsConfig) -> String {
    generate_docs_from_rules(&S::rules(), config)
}

/// Generate docs from raw rules (useful when no validator is built)
#[must_use]
pub fn generate_docs_from_rules(rules: &[ValidationRule], config: DocsConfig) -> String {
    let rules: Vec<&ValidationRule> = rules.iter().collect();
    render(&rules, config)
}

fn section_of(rule: &ValidationRule) -> &str {
    match rule.pattern.segments().first() {
        Some(PatternSegment::Key(key)) => key,
        _ => "*",
    }
}

fn render(rules: &[&ValidationRule], config: DocsConfig) -> String {
    let mut output = String::new();

    let title = config
        .title
        .unwrap_or_else(|| "Configuration Reference".to_string());
    let _ = writeln!(output, "# {title}\n");

    if let Some(desc) = config.description {
        let _ = writeln!(output, "{desc}\n");
    }

    if config.group_by_section {
        // sections in first-seen order, rules keep their order inside a section
        let mut sections: Vec<&str> = Vec::new();
        for rule in rules {
            let section = section_of(rule);
            if !sections.contains(&section) {
                sections.push(section);
            }
        }

        for section in sections {
            let _ = writeln!(output, "\n## {section}\n");
            for rule in rules.iter().filter(|r| section_of(r) == section) {
                format_rule(&mut output, rule);
            }
        }
    } else {
        output.push_str("## Rules\n\n");
        for rule in rules {
            format_rule(&mut output, rule);
        }
    }

    output
}

fn format_rule(out: &mut String, rule: &ValidationRule) {
    let _ = writeln!(out, "### `{}`\n", rule.pattern);

    let mut badges = Vec::new();
    if rule.required {
        badges.push("Required");
    }
    if rule.pattern.is_wildcard() {
        badges.push("Wildcard");
    }
    if rule.is_open() {
        badges.push("Open");
    }
    if !badges.is_empty() {
        let _ = writeln!(out, "{}\n", badges.join(" • "));
    }

    if let Some(desc) = &rule.description {
        let _ = writeln!(out, "{desc}\n");
    }

    out.push_str("| Property | Value |\n");
    out.push_str("|----------|-------|\n");
    let _ = writeln!(out, "| **Type** | {} |", format_type(rule));

    let number = &rule.constraints.number;
    match (number.min, number.max) {
        (Some(min), Some(max)) => {
            let _ = writeln!(out, "| **Range** | {min} - {max} |");
        }
        (Some(min), None) => {
            let _ = writeln!(out, "| **Minimum** | {min} |");
        }
        (None, Some(max)) => {
            let _ = writeln!(out, "| **Maximum** | {max} |");
        }
        (None, None) => {}
    }

    if let Some(pattern) = &rule.constraints.pattern {
        let _ = writeln!(out, "| **Pattern** | `{pattern}` |");
    }

    out.push('\n');

    if let Some(allowed) = &rule.constraints.allowed {
        out.push_str("**Allowed values:**\n\n");
        for value in allowed {
            let _ = writeln!(out, "- `{value}`");
        }
        out.push('\n');
    }

    out.push_str("---\n\n");
}

fn format_type(rule: &ValidationRule) -> String {
    match rule.expected {
        ExpectedType::Boolean => "Boolean".to_string(),
        ExpectedType::Integer => "Integer".to_string(),
        ExpectedType::Float => "Number".to_string(),
        ExpectedType::String => "String".to_string(),
        ExpectedType::Enum => "Enum (String)".to_string(),
        ExpectedType::Scalar => "Scalar".to_string(),
        ExpectedType::Sequence => match rule.constraints.items {
            Some(item) => format!("List ({item})"),
            None => "List".to_string(),
        },
        ExpectedType::Mapping => "Mapping".to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
