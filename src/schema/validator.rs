//! Total validation of a tree against a rule set

use super::rule::{ExpectedType, PatternSegment, ValidationRule};
use crate::error::{Error, Result};
use crate::tree::{ConfigNode, ConfigPath, ConfigTree, Mapping, Scalar};
use log::debug;
use regex::Regex;
use std::fmt;

// =============================================================================
// Validation Errors
// =============================================================================

/// What went wrong at a path
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    TypeMismatch { expected: String, actual: String },
    NotAllowed { value: String, allowed: Vec<String> },
    OutOfRange { value: String, min: Option<f64>, max: Option<f64> },
    PatternMismatch { value: String, pattern: String },
    /// A required rule matched nothing
    Missing { expected: String },
    /// Strict mode: no rule covers this key
    UnknownKey,
}

/// A single violation, naming the offending path
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: ConfigPath,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    fn new(path: ConfigPath, kind: ValidationErrorKind) -> Self {
        Self { path, kind }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = &self.path;
        match &self.kind {
            ValidationErrorKind::TypeMismatch { expected, actual } => {
                write!(f, "{path}: expected {expected}, found {actual}")
            }
            ValidationErrorKind::NotAllowed { value, allowed } => {
                write!(f, "{path}: {value} is not one of [{}]", allowed.join(", "))
            }
            ValidationErrorKind::OutOfRange { value, min, max } => {
                write!(f, "{path}: {value} is out of range")?;
                match (min, max) {
                    (Some(min), Some(max)) => write!(f, " ({min}..={max})"),
                    (Some(min), None) => write!(f, " (>= {min})"),
                    (None, Some(max)) => write!(f, " (<= {max})"),
                    (None, None) => Ok(()),
                }
            }
            ValidationErrorKind::PatternMismatch { value, pattern } => {
                write!(f, "{path}: {value} does not match pattern {pattern}")
            }
            ValidationErrorKind::Missing { expected } => {
                write!(f, "{path}: required {expected} is missing")
            }
            ValidationErrorKind::UnknownKey => write!(f, "{path}: unknown key"),
        }
    }
}

/// Every violation found by one validation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

/// Outcome of [`SchemaValidator::validate`]
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<ValidationError>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid(errors) => errors,
        }
    }

    /// Convert into a `Result`, carrying every violation in [`Error::Validation`].
    pub fn into_result(self) -> Result<()> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(errors) => Err(Error::Validation(ValidationErrors(errors))),
        }
    }
}

// =============================================================================
// Schema Trait
// =============================================================================

/// Trait for types that describe a configuration schema
///
/// Implement this to bundle the rules for a configuration layout, then build
/// a validator with [`SchemaValidator::for_schema`].
pub trait ConfigSchema {
    fn rules() -> Vec<ValidationRule>;

    /// Top-level sections named by the rules, in first-seen order
    #[must_use]
    fn sections() -> Vec<String> {
        let mut sections: Vec<String> = Vec::new();
        for rule in Self::rules() {
            if let Some(PatternSegment::Key(first)) = rule.pattern.segments().first() {
                if !sections.contains(first) {
                    sections.push(first.clone());
                }
            }
        }
        sections
    }
}

// No rules: everything is valid unless strict mode is on
impl ConfigSchema for () {
    fn rules() -> Vec<ValidationRule> {
        Vec::new()
    }
}

// =============================================================================
// Schema Validator
// =============================================================================

struct CompiledRule {
    rule: ValidationRule,
    regex: Option<Regex>,
}

/// Checks a [`ConfigTree`] against a set of [`ValidationRule`]s
///
/// Validation is total: every violation is collected. Keys not covered by
/// any rule are accepted unless [`strict`](Self::strict) mode is enabled.
///
/// ```
/// use cfgtree::{mapping, ConfigTree, SchemaValidator, ValidationRule};
///
/// let validator = SchemaValidator::new(vec![
///     ValidationRule::one_of("GFX.processor_colorspace", ["RGB", "CMYK", "GRAY"]),
/// ])?;
///
/// let tree = ConfigTree::new(mapping! {
///     "GFX" => mapping! { "processor_colorspace" => "XYZ" },
/// });
/// let result = validator.validate(&tree);
/// assert_eq!(result.errors().len(), 1);
/// assert_eq!(result.errors()[0].path.to_string(), "GFX.processor_colorspace");
/// # Ok::<(), cfgtree::Error>(())
/// ```
pub struct SchemaValidator {
    rules: Vec<CompiledRule>,
    strict: bool,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("rules", &self.rules.len())
            .field("strict", &self.strict)
            .finish()
    }
}

impl SchemaValidator {
    /// Build a validator, checking every rule definition first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] for the first malformed rule.
    pub fn new(rules: Vec<ValidationRule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                rule.check_rule().map_err(|reason| Error::InvalidRule {
                    pattern: rule.pattern.to_string(),
                    reason,
                })?;
                let regex = match &rule.constraints.pattern {
                    Some(p) => Some(Regex::new(p).map_err(|e| Error::InvalidRule {
                        pattern: rule.pattern.to_string(),
                        reason: e.to_string(),
                    })?),
                    None => None,
                };
                Ok(CompiledRule { rule, regex })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            strict: false,
        })
    }

    /// Build a validator from a [`ConfigSchema`] implementation
    pub fn for_schema<S: ConfigSchema>() -> Result<Self> {
        Self::new(S::rules())
    }

    /// Reject keys not covered by any rule
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn rules(&self) -> impl Iterator<Item = &ValidationRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    /// Check `tree` against every rule, collecting all violations.
    pub fn validate(&self, tree: &ConfigTree) -> ValidationResult {
        let mut errors = Vec::new();

        for compiled in &self.rules {
            let mut matches = Vec::new();
            find_matches(
                tree.root(),
                &ConfigPath::root(),
                compiled.rule.pattern.segments(),
                &mut matches,
                &mut errors,
            );

            if matches.is_empty() && compiled.rule.required {
                push_unique(
                    &mut errors,
                    ValidationError::new(
                        compiled.rule.pattern.to_path(),
                        ValidationErrorKind::Missing {
                            expected: compiled.rule.expected.to_string(),
                        },
                    ),
                );
            }

            for (path, node) in matches {
                check_node(compiled, &path, node, &mut errors);
            }
        }

        if self.strict {
            self.collect_unknown(tree.root(), &ConfigPath::root(), &mut errors);
        }

        if errors.is_empty() {
            debug!("Configuration valid against {} rule(s)", self.rules.len());
            ValidationResult::Valid
        } else {
            debug!("Configuration has {} validation error(s)", errors.len());
            ValidationResult::Invalid(errors)
        }
    }

    fn collect_unknown(&self, mapping: &Mapping, path: &ConfigPath, errors: &mut Vec<ValidationError>) {
        for (key, node) in mapping.iter() {
            let child = path.child(key);
            let patterns = || self.rules.iter().map(|c| &c.rule);

            if patterns().any(|r| r.is_open() && r.pattern.covers(&child)) {
                continue;
            }

            let exact = patterns().any(|r| r.pattern.matches(&child));
            if let ConfigNode::Mapping(inner) = node {
                if exact || patterns().any(|r| r.pattern.leads_below(&child)) {
                    self.collect_unknown(inner, &child, errors);
                    continue;
                }
            } else if exact {
                continue;
            }

            push_unique(errors, ValidationError::new(child, ValidationErrorKind::UnknownKey));
        }
    }
}

/// Validate `tree` against `rules` in the default (non-strict) mode.
///
/// # Errors
///
/// Returns [`Error::InvalidRule`] if a rule definition is malformed.
pub fn validate(tree: &ConfigTree, rules: &[ValidationRule]) -> Result<ValidationResult> {
    Ok(SchemaValidator::new(rules.to_vec())?.validate(tree))
}

// =============================================================================
// Matching
// =============================================================================

/// Walk `mapping` along `pattern`, collecting every concrete match.
///
/// A literal segment that runs into a non-mapping node is reported as a
/// type mismatch at that node.
fn find_matches<'a>(
    mapping: &'a Mapping,
    path: &ConfigPath,
    pattern: &[PatternSegment],
    matches: &mut Vec<(ConfigPath, &'a ConfigNode)>,
    errors: &mut Vec<ValidationError>,
) {
    let Some((head, rest)) = pattern.split_first() else {
        return;
    };

    let candidates: Vec<(&str, &ConfigNode)> = match head {
        PatternSegment::Key(key) => mapping.get(key).map(|n| (key.as_str(), n)).into_iter().collect(),
        PatternSegment::Any => mapping.iter().collect(),
    };

    for (key, node) in candidates {
        let child = path.child(key);
        if rest.is_empty() {
            matches.push((child, node));
            continue;
        }
        match node {
            ConfigNode::Mapping(inner) => find_matches(inner, &child, rest, matches, errors),
            other if matches!(head, PatternSegment::Key(_)) => push_unique(
                errors,
                ValidationError::new(
                    child,
                    ValidationErrorKind::TypeMismatch {
                        expected: "mapping".to_string(),
                        actual: other.kind().to_string(),
                    },
                ),
            ),
            // a wildcard sibling that is not a mapping simply does not match
            _ => {}
        }
    }
}

fn push_unique(errors: &mut Vec<ValidationError>, error: ValidationError) {
    if !errors.contains(&error) {
        errors.push(error);
    }
}

// =============================================================================
// Node Checks
// =============================================================================

fn check_node(
    compiled: &CompiledRule,
    path: &ConfigPath,
    node: &ConfigNode,
    errors: &mut Vec<ValidationError>,
) {
    let rule = &compiled.rule;

    // every offending element is reported at its own index
    if let (ExpectedType::Sequence, ConfigNode::Sequence(items)) = (rule.expected, node) {
        let Some(item_type) = rule.constraints.items else {
            return;
        };
        for (index, item) in items.iter().enumerate() {
            if item.as_scalar().map(Scalar::scalar_type) != Some(item_type) {
                let kind = ValidationErrorKind::TypeMismatch {
                    expected: item_type.to_string(),
                    actual: item.kind().to_string(),
                };
                push_unique(errors, ValidationError::new(path.child(index.to_string()), kind));
            }
        }
        return;
    }

    if let Some(kind) = check_value(compiled, node) {
        push_unique(errors, ValidationError::new(path.clone(), kind));
    }
}

fn check_value(compiled: &CompiledRule, node: &ConfigNode) -> Option<ValidationErrorKind> {
    let rule = &compiled.rule;
    let mismatch = |expected: String| ValidationErrorKind::TypeMismatch {
        expected,
        actual: node.kind().to_string(),
    };

    match (rule.expected, node) {
        (ExpectedType::Mapping, ConfigNode::Mapping(_)) => None,
        (ExpectedType::Mapping, _) => Some(mismatch("mapping".to_string())),

        (ExpectedType::Sequence, ConfigNode::Sequence(_)) => None,
        (ExpectedType::Sequence, _) => Some(mismatch("sequence".to_string())),

        (_, ConfigNode::Scalar(scalar)) if rule.accepts_scalar_type(scalar.scalar_type()) => {
            check_scalar(compiled, scalar)
        }
        (expected, _) => {
            let expected = match expected {
                ExpectedType::Enum => "string".to_string(),
                other => other.to_string(),
            };
            Some(mismatch(expected))
        }
    }
}

fn check_scalar(compiled: &CompiledRule, scalar: &Scalar) -> Option<ValidationErrorKind> {
    let constraints = &compiled.rule.constraints;

    if let Some(allowed) = &constraints.allowed {
        if !allowed.contains(scalar) {
            return Some(ValidationErrorKind::NotAllowed {
                value: scalar.to_string(),
                allowed: allowed.iter().map(ToString::to_string).collect(),
            });
        }
    }

    if let Some(n) = scalar.as_f64() {
        let (min, max) = (constraints.number.min, constraints.number.max);
        let below = min.is_some_and(|m| n < m);
        let above = max.is_some_and(|m| n > m);
        if below || above {
            return Some(ValidationErrorKind::OutOfRange {
                value: scalar.to_string(),
                min,
                max,
            });
        }
    }

    if let (Some(regex), Some(text)) = (&compiled.regex, scalar.as_str()) {
        if !regex.is_match(text) {
            return Some(ValidationErrorKind::PatternMismatch {
                value: scalar.to_string(),
                pattern: regex.as_str().to_string(),
            });
        }
    }

    None
}
