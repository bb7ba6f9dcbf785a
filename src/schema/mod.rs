//! Schema validation for configuration trees
//!
//! - [`ValidationRule`] - a path pattern with an expected type and constraints
//! - [`SchemaValidator`] - checks a whole tree and collects every violation
//! - [`ConfigSchema`] - trait bundling the rules for one configuration layout
//! - [`cms`] - the preset for the CMS settings file

pub mod cms;
mod rule;
mod validator;

pub use rule::{
    ExpectedType, NumberConstraints, PathPattern, PatternSegment, RuleConstraints, ValidationRule,
};
pub use validator::{
    ConfigSchema, SchemaValidator, ValidationError, ValidationErrorKind, ValidationErrors,
    ValidationResult, validate,
};
