//! Field action pipeline
//!
//! Actions are named value transforms applied in declared order. Handlers
//! live in an [`ActionRegistry`] keyed by action name, so new actions are
//! added by registration.

use docmap_model::{FieldAction, Scalar};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::{debug, warn};

/// Action failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// No handler registered under this name
    #[error("Unknown field action: {0}")]
    Unknown(String),

    /// A parameter is missing or malformed
    #[error("Invalid parameter '{parameter}' for action '{action}': {reason}")]
    InvalidParameter {
        action: String,
        parameter: String,
        reason: String,
    },

    /// The value cannot be processed by the action
    #[error("Action '{action}' cannot process value '{value}'")]
    InvalidValue { action: String, value: String },
}

impl ActionError {
    /// Build an invalid-parameter error.
    pub fn invalid_parameter(
        action: &FieldAction,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            action: action.name.clone(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for actions
pub type Result<T> = std::result::Result<T, ActionError>;

/// Handler signature: receives the current value (absent when null) and the
/// action carrying its parameters
pub type ActionHandler =
    Arc<dyn Fn(Option<Scalar>, &FieldAction) -> Result<Option<Scalar>> + Send + Sync>;

/// Registry of named field actions
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, ActionHandler>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}

static DASH_SEPARATORS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[\s_+=:]+").ok());
static UNDERSCORE_SEPARATORS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[\s\-+=:]+").ok());

impl ActionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in action.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry
            .register_text("trim", |s, _| Ok(s.trim().to_string()))
            .register_text("trim-left", |s, _| Ok(s.trim_start().to_string()))
            .register_text("trim-right", |s, _| Ok(s.trim_end().to_string()))
            .register_text("uppercase", |s, _| Ok(s.to_uppercase()))
            .register_text("lowercase", |s, _| Ok(s.to_lowercase()))
            .register_text("capitalize", |s, _| Ok(capitalize(s)))
            .register_text("camelize", |s, _| Ok(camelize(s)))
            .register_text("separate-by-dash", |s, _| {
                Ok(replace_separators(&DASH_SEPARATORS, s, "-"))
            })
            .register_text("separate-by-underscore", |s, _| {
                Ok(replace_separators(&UNDERSCORE_SEPARATORS, s, "_"))
            })
            .register_text("normalize-whitespace", |s, _| {
                Ok(s.split_whitespace().collect::<Vec<_>>().join(" "))
            })
            .register_text("append", |s, action| {
                Ok(format!("{s}{}", required(action, "string")?))
            })
            .register_text("prepend", |s, action| {
                Ok(format!("{}{s}", required(action, "string")?))
            })
            .register_text("replace-all", |s, action| {
                let (pattern, replacement) = replacement_parameters(action)?;
                Ok(pattern.replace_all(s, replacement).into_owned())
            })
            .register_text("replace-first", |s, action| {
                let (pattern, replacement) = replacement_parameters(action)?;
                Ok(pattern.replace(s, replacement).into_owned())
            })
            .register_text("sub-string", sub_string);

        registry.register("string-length", |value, _| {
            let Some(value) = value else {
                return Ok(None);
            };
            let length = value.render().chars().count();
            Ok(Some(Scalar::Integer(i32::try_from(length).unwrap_or(i32::MAX))))
        });
        registry.register("abs-value", abs_value);

        registry
    }

    /// Register (or replace) a handler.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Option<Scalar>, &FieldAction) -> Result<Option<Scalar>> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Register a handler over the rendered text of the value. Null values
    /// pass through untouched.
    pub fn register_text<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&str, &FieldAction) -> Result<String> + Send + Sync + 'static,
    {
        self.register(name, move |value, action| match value {
            None => Ok(None),
            Some(value) => handler(&value.render(), action).map(|s| Some(Scalar::String(s))),
        })
    }

    /// Whether an action with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered action names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Apply `actions` in declared order, threading each output into the next
    /// input.
    ///
    /// # Errors
    ///
    /// Fails on the first action that is not registered or that rejects its
    /// parameters or value.
    pub fn apply(&self, value: Option<Scalar>, actions: &[FieldAction]) -> Result<Option<Scalar>> {
        actions.iter().try_fold(value, |current, action| {
            let handler = self
                .handlers
                .get(&action.name)
                .ok_or_else(|| ActionError::Unknown(action.name.clone()))?;
            debug!(action = %action.name, "Applying field action");
            handler(current, action)
        })
    }

    /// Drop actions with no registered handler, returning the dropped names.
    pub fn retain_known(&self, actions: &mut Vec<FieldAction>) -> Vec<String> {
        let mut dropped = Vec::new();
        actions.retain(|action| {
            let known = self.contains(&action.name);
            if !known {
                warn!(action = %action.name, "Dropping unknown field action");
                dropped.push(action.name.clone());
            }
            known
        });
        dropped
    }
}

fn required<'a>(action: &'a FieldAction, parameter: &str) -> Result<&'a str> {
    action
        .parameter(parameter)
        .ok_or_else(|| ActionError::invalid_parameter(action, parameter, "missing"))
}

fn replacement_parameters(action: &FieldAction) -> Result<(Regex, &str)> {
    let pattern = required(action, "match")?;
    let pattern = Regex::new(pattern)
        .map_err(|e| ActionError::invalid_parameter(action, "match", e.to_string()))?;
    let replacement = action.parameter("newString").unwrap_or_default();
    Ok((pattern, replacement))
}

fn parse_index(action: &FieldAction, parameter: &str, raw: &str) -> Result<usize> {
    raw.trim().parse().map_err(|_| {
        ActionError::invalid_parameter(action, parameter, format!("'{raw}' is not an index"))
    })
}

fn sub_string(text: &str, action: &FieldAction) -> Result<String> {
    let length = text.chars().count();
    let start = parse_index(action, "startIndex", required(action, "startIndex")?)?;
    let end = match action.parameter("endIndex") {
        Some(raw) => parse_index(action, "endIndex", raw)?,
        None => length,
    };
    if start > end || end > length {
        return Err(ActionError::invalid_parameter(
            action,
            "startIndex",
            format!("range {start}..{end} outside of 0..{length}"),
        ));
    }
    Ok(text.chars().skip(start).take(end - start).collect())
}

fn abs_value(value: Option<Scalar>, action: &FieldAction) -> Result<Option<Scalar>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let result = match value {
        Scalar::Byte(v) => Scalar::Byte(v.saturating_abs()),
        Scalar::Short(v) => Scalar::Short(v.saturating_abs()),
        Scalar::Integer(v) => Scalar::Integer(v.saturating_abs()),
        Scalar::Long(v) => Scalar::Long(v.saturating_abs()),
        Scalar::Float(v) => Scalar::Float(v.abs()),
        Scalar::Double(v) => Scalar::Double(v.abs()),
        Scalar::String(ref text) => {
            let trimmed = text.trim();
            if let Ok(integral) = trimmed.parse::<i64>() {
                Scalar::Long(integral.saturating_abs())
            } else if let Ok(fractional) = trimmed.parse::<f64>() {
                Scalar::Double(fractional.abs())
            } else {
                return Err(ActionError::InvalidValue {
                    action: action.name.clone(),
                    value: text.clone(),
                });
            }
        }
        other => {
            return Err(ActionError::InvalidValue {
                action: action.name.clone(),
                value: other.render(),
            });
        }
    };
    Ok(Some(result))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Join the words of `text` as lower camel case: `"Hello big_world"` becomes
/// `"helloBigWorld"`.
fn camelize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (position, word) in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if position == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.extend(chars);
        }
    }
    out
}

fn replace_separators(pattern: &LazyLock<Option<Regex>>, text: &str, separator: &str) -> String {
    match pattern.as_ref() {
        Some(regex) => regex.replace_all(text, separator).into_owned(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, value: &str) -> Option<Scalar> {
        ActionRegistry::with_builtins()
            .apply(Some(Scalar::from(value)), &[FieldAction::new(name)])
            .unwrap()
    }

    fn text(name: &str, value: &str) -> String {
        run(name, value).unwrap().render()
    }

    #[test]
    fn test_trim_family() {
        assert_eq!(text("trim", "  a b  "), "a b");
        assert_eq!(text("trim-left", "  a b  "), "a b  ");
        assert_eq!(text("trim-right", "  a b  "), "  a b");
    }

    #[test]
    fn test_case_actions() {
        assert_eq!(text("uppercase", "abc"), "ABC");
        assert_eq!(text("lowercase", "AbC"), "abc");
        assert_eq!(text("capitalize", "hello world"), "Hello world");
        assert_eq!(text("capitalize", ""), "");
        assert_eq!(text("camelize", "Hello big_world"), "helloBigWorld");
        assert_eq!(text("camelize", "  one   two "), "oneTwo");
    }

    #[test]
    fn test_separators() {
        assert_eq!(text("separate-by-dash", "a b_c:d"), "a-b-c-d");
        assert_eq!(text("separate-by-underscore", "a b-c=d"), "a_b_c_d");
        assert_eq!(text("normalize-whitespace", " a \t b\n c "), "a b c");
    }

    #[test]
    fn test_string_length() {
        assert_eq!(run("string-length", "héllo"), Some(Scalar::Integer(5)));
    }

    #[test]
    fn test_actions_thread_in_order() {
        let registry = ActionRegistry::with_builtins();
        let actions = [
            FieldAction::new("trim"),
            FieldAction::new("uppercase"),
            FieldAction::new("append").with_parameter("string", "!"),
            FieldAction::new("string-length"),
        ];
        let result = registry.apply(Some(Scalar::from("  hi ")), &actions).unwrap();
        assert_eq!(result, Some(Scalar::Integer(3)));
    }

    #[test]
    fn test_null_passes_through() {
        let registry = ActionRegistry::with_builtins();
        let result = registry
            .apply(None, &[FieldAction::new("uppercase"), FieldAction::new("trim")])
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_parameterized_actions() {
        let registry = ActionRegistry::with_builtins();
        let replace = FieldAction::new("replace-all")
            .with_parameter("match", "[0-9]+")
            .with_parameter("newString", "#");
        assert_eq!(
            registry.apply(Some(Scalar::from("a1b22c")), &[replace]).unwrap(),
            Some(Scalar::from("a#b#c"))
        );

        let first = FieldAction::new("replace-first")
            .with_parameter("match", "o")
            .with_parameter("newString", "0");
        assert_eq!(
            registry.apply(Some(Scalar::from("foo")), &[first]).unwrap(),
            Some(Scalar::from("f0o"))
        );

        let sub = FieldAction::new("sub-string")
            .with_parameter("startIndex", "1")
            .with_parameter("endIndex", "3");
        assert_eq!(
            registry.apply(Some(Scalar::from("abcdef")), &[sub]).unwrap(),
            Some(Scalar::from("bc"))
        );
    }

    #[test]
    fn test_invalid_parameters() {
        let registry = ActionRegistry::with_builtins();
        let err = registry
            .apply(Some(Scalar::from("x")), &[FieldAction::new("append")])
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidParameter { .. }));

        let sub = FieldAction::new("sub-string").with_parameter("startIndex", "9");
        assert!(registry.apply(Some(Scalar::from("abc")), &[sub]).is_err());

        let bad_regex = FieldAction::new("replace-all").with_parameter("match", "(");
        assert!(registry.apply(Some(Scalar::from("abc")), &[bad_regex]).is_err());
    }

    #[test]
    fn test_abs_value() {
        let registry = ActionRegistry::with_builtins();
        let abs = [FieldAction::new("abs-value")];
        assert_eq!(
            registry.apply(Some(Scalar::Integer(-4)), &abs).unwrap(),
            Some(Scalar::Integer(4))
        );
        assert_eq!(
            registry.apply(Some(Scalar::from("-2.5")), &abs).unwrap(),
            Some(Scalar::Double(2.5))
        );
        assert!(matches!(
            registry.apply(Some(Scalar::from("x")), &abs),
            Err(ActionError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_action() {
        let registry = ActionRegistry::with_builtins();
        let err = registry
            .apply(Some(Scalar::from("x")), &[FieldAction::new("frobnicate")])
            .unwrap_err();
        assert_eq!(err, ActionError::Unknown("frobnicate".to_string()));

        let mut actions = vec![FieldAction::new("trim"), FieldAction::new("frobnicate")];
        let dropped = registry.retain_known(&mut actions);
        assert_eq!(dropped, vec!["frobnicate".to_string()]);
        assert_eq!(actions, vec![FieldAction::new("trim")]);
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = ActionRegistry::new();
        registry.register_text("reverse", |s, _| Ok(s.chars().rev().collect()));
        assert!(registry.contains("reverse"));
        assert_eq!(
            registry.apply(Some(Scalar::from("abc")), &[FieldAction::new("reverse")]).unwrap(),
            Some(Scalar::from("cba"))
        );
    }
}
