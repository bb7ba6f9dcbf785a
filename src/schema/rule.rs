//! Validation rules and path patterns

use crate::tree::{ConfigPath, Scalar, ScalarType};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Path Patterns
// =============================================================================

/// One segment of a [`PathPattern`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    /// Matches exactly this key
    Key(String),
    /// `*` - matches any key at this level
    Any,
}

impl PatternSegment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            PatternSegment::Key(key) => key == segment,
            PatternSegment::Any => true,
        }
    }
}

/// A [`ConfigPath`] whose segments may be `*` wildcards
///
/// ```
/// use cfgtree::{ConfigPath, PathPattern};
///
/// let pattern = PathPattern::parse("DB.Connections.*.port");
/// assert!(pattern.matches(&ConfigPath::parse("DB.Connections.Default.port")));
/// assert!(!pattern.matches(&ConfigPath::parse("DB.Connections.Default.host")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Parse the dotted form. Segments equal to `*` become wildcards; dots
    /// inside keys are escaped as in [`ConfigPath::parse`].
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let segments = ConfigPath::parse(text)
            .segments()
            .iter()
            .map(|s| {
                if s == "*" {
                    PatternSegment::Any
                } else {
                    PatternSegment::Key(s.clone())
                }
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_wildcard(&self) -> bool {
        self.segments.iter().any(|s| *s == PatternSegment::Any)
    }

    /// Exact match: same length, every segment matches.
    pub fn matches(&self, path: &ConfigPath) -> bool {
        self.segments.len() == path.len() && self.matches_prefix(path.segments())
    }

    /// Whether this pattern matches `path` itself or one of its ancestors.
    pub fn covers(&self, path: &ConfigPath) -> bool {
        self.segments.len() <= path.len()
            && self.matches_prefix(&path.segments()[..self.segments.len()])
    }

    /// Whether some descendant of `path` could match this pattern.
    pub fn leads_below(&self, path: &ConfigPath) -> bool {
        self.segments.len() > path.len() && self.matches_prefix(path.segments())
    }

    fn matches_prefix(&self, segments: &[String]) -> bool {
        self.segments
            .iter()
            .zip(segments)
            .all(|(pattern, segment)| pattern.matches(segment))
    }

    /// The pattern as a path, with wildcards rendered as `*`
    pub fn to_path(&self) -> ConfigPath {
        ConfigPath::new(self.segments.iter().map(|s| match s {
            PatternSegment::Key(key) => key.clone(),
            PatternSegment::Any => "*".to_string(),
        }))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_path().fmt(f)
    }
}

impl From<&str> for PathPattern {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

// =============================================================================
// Expected Types
// =============================================================================

/// Expected shape of the value at a rule's path
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedType {
    Boolean,
    Integer,
    /// Any number; integers are accepted
    Float,
    #[default]
    String,
    /// String restricted to the rule's allowed values
    Enum,
    /// Any scalar, whatever its type
    Scalar,
    Sequence,
    Mapping,
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExpectedType::Boolean => "boolean",
            ExpectedType::Integer => "integer",
            ExpectedType::Float => "float",
            ExpectedType::String => "string",
            ExpectedType::Enum => "enum",
            ExpectedType::Scalar => "scalar",
            ExpectedType::Sequence => "sequence",
            ExpectedType::Mapping => "mapping",
        })
    }
}

// =============================================================================
// Constraints
// =============================================================================

/// Range constraints for Integer and Float rules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberConstraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Constraints attached to a rule beyond its expected type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleConstraints {
    /// Allowed scalar values (REQUIRED for Enum)
    pub allowed: Option<Vec<Scalar>>,

    pub number: NumberConstraints,

    /// Regex for String and Enum values
    pub pattern: Option<String>,

    /// Element type for Sequence rules
    pub items: Option<ScalarType>,

    /// Mapping rule accepts any keys below it (strict mode)
    pub open: bool,
}

// =============================================================================
// Validation Rule
// =============================================================================

/// Associates a path pattern with an expected type and constraints
///
/// # Example
///
/// ```
/// use cfgtree::ValidationRule;
///
/// let colorspace = ValidationRule::one_of("GFX.processor_colorspace", ["RGB", "CMYK", "GRAY"])
///     .describe("Colorspace used by the image processor");
///
/// let port = ValidationRule::integer("DB.Connections.*.port")
///     .min(1.0)
///     .max(65535.0);
///
/// let sections = ValidationRule::mapping("SYS").required();
/// assert!(port.check_rule().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRule {
    pub pattern: PathPattern,
    pub expected: ExpectedType,
    pub constraints: RuleConstraints,
    /// At least one node must match the pattern
    pub required: bool,
    pub description: Option<String>,
}

impl ValidationRule {
    fn with_type(pattern: &str, expected: ExpectedType) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            expected,
            constraints: RuleConstraints::default(),
            required: false,
            description: None,
        }
    }

    // =========================================================================
    // Type-specific constructors
    // =========================================================================

    pub fn boolean(pattern: &str) -> Self {
        Self::with_type(pattern, ExpectedType::Boolean)
    }

    pub fn integer(pattern: &str) -> Self {
        Self::with_type(pattern, ExpectedType::Integer)
    }

    pub fn float(pattern: &str) -> Self {
        Self::with_type(pattern, ExpectedType::Float)
    }

    pub fn string(pattern: &str) -> Self {
        Self::with_type(pattern, ExpectedType::String)
    }

    /// String restricted to `values`.
    ///
    /// **Values are required** - an enum without them is rejected by
    /// [`check_rule`](Self::check_rule).
    pub fn one_of<I, S>(pattern: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rule = Self::with_type(pattern, ExpectedType::Enum);
        rule.constraints.allowed = Some(
            values
                .into_iter()
                .map(|v| Scalar::String(v.into()))
                .collect(),
        );
        rule
    }

    /// Any scalar value; for keys whose type varies between installs.
    pub fn scalar(pattern: &str) -> Self {
        Self::with_type(pattern, ExpectedType::Scalar)
    }

    pub fn sequence(pattern: &str) -> Self {
        Self::with_type(pattern, ExpectedType::Sequence)
    }

    pub fn mapping(pattern: &str) -> Self {
        Self::with_type(pattern, ExpectedType::Mapping)
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restrict to a set of scalar values (any expected scalar type)
    #[must_use]
    pub fn allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        self.constraints.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn min(mut self, val: f64) -> Self {
        self.constraints.number.min = Some(val);
        self
    }

    #[must_use]
    pub fn max(mut self, val: f64) -> Self {
        self.constraints.number.max = Some(val);
        self
    }

    /// Regex the string value must match
    #[must_use]
    pub fn matching(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    /// Element type of a sequence
    #[must_use]
    pub fn items(mut self, item_type: ScalarType) -> Self {
        self.constraints.items = Some(item_type);
        self
    }

    /// Allow arbitrary keys below a mapping in strict mode
    #[must_use]
    pub fn open(mut self) -> Self {
        self.constraints.open = true;
        self
    }

    pub fn is_open(&self) -> bool {
        self.expected == ExpectedType::Mapping && self.constraints.open
    }

    // =========================================================================
    // Self-check
    // =========================================================================

    /// Validate the rule definition itself
    ///
    /// Checks that:
    /// - the pattern is not empty
    /// - an enum has a non-empty allowed set
    /// - allowed values fit the expected type
    /// - min <= max
    /// - the regex compiles and is not empty
    pub fn check_rule(&self) -> Result<(), String> {
        if self.pattern.is_empty() {
            return Err("Pattern cannot be empty".to_string());
        }

        if self.expected == ExpectedType::Enum {
            match &self.constraints.allowed {
                None => return Err("Enum type must have allowed values defined".to_string()),
                Some(values) if values.is_empty() => {
                    return Err("Enum type must have at least one allowed value".to_string());
                }
                _ => {}
            }
        }

        if let Some(values) = &self.constraints.allowed {
            for value in values {
                if !self.accepts_scalar_type(value.scalar_type()) {
                    return Err(format!(
                        "Allowed value {value} does not fit expected type {}",
                        self.expected
                    ));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.constraints.number.min, self.constraints.number.max) {
            if min > max {
                return Err(format!("min ({min}) cannot be greater than max ({max})"));
            }
        }

        if let Some(pattern) = &self.constraints.pattern {
            if pattern.is_empty() {
                return Err("Pattern cannot be empty string".to_string());
            }
            regex::Regex::new(pattern).map_err(|e| format!("Invalid regex pattern: {e}"))?;
        }

        Ok(())
    }

    /// Whether a scalar of type `t` satisfies the expected type
    pub(crate) fn accepts_scalar_type(&self, t: ScalarType) -> bool {
        match self.expected {
            ExpectedType::Boolean => t == ScalarType::Boolean,
            ExpectedType::Integer => t == ScalarType::Integer,
            ExpectedType::Float => matches!(t, ScalarType::Float | ScalarType::Integer),
            ExpectedType::String | ExpectedType::Enum => t == ScalarType::String,
            ExpectedType::Scalar => true,
            ExpectedType::Sequence | ExpectedType::Mapping => false,
        }
    }
}
