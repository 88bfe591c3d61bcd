//! Request validation.
//!
//! Request bodies deserialize with every field optional; handlers then run a
//! [`Validator`] over them, which records every violation instead of stopping
//! at the first. The collected [`ValidationErrors`] become a single 400
//! response.

use serde::Serialize;
use serde_json::Value;

/// What is wrong with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    /// Absent, null, or blank.
    Missing,
    /// Present but not of the expected shape.
    Invalid,
    /// A list that must have at least one element has none.
    Empty,
}

/// One field-level problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Field path, e.g. `products[1].price`.
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

/// All violations found in a request, with a human-readable summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{summary}")]
pub struct ValidationErrors {
    #[serde(rename = "error")]
    pub summary: String,
    pub violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Whether any violation of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// Whether `field` has a violation.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

/// Collects violations while a handler pulls typed values out of a request.
#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, field: &str, kind: ViolationKind, message: impl Into<String>) {
        self.violations.push(Violation {
            field: field.to_owned(),
            kind,
            message: message.into(),
        });
    }

    pub fn missing(&mut self, field: &str) {
        self.push(field, ViolationKind::Missing, format!("{field} is required"));
    }

    pub fn invalid(&mut self, field: &str, message: impl Into<String>) {
        self.push(field, ViolationKind::Invalid, message);
    }

    pub fn empty(&mut self, field: &str) {
        self.push(
            field,
            ViolationKind::Empty,
            format!("{field} must contain at least one item"),
        );
    }

    /// A required string. Blank counts as missing. Returns the trimmed value.
    pub fn required_str(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_owned()),
            _ => {
                self.missing(field);
                None
            }
        }
    }

    /// A required number given either as a JSON number or a numeric string.
    pub fn required_f64(&mut self, field: &str, value: Option<&Value>) -> Option<f64> {
        let value = self.present(field, value)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(n) if n.is_finite() => Some(n),
            _ => {
                self.invalid(field, format!("{field} must be a number"));
                None
            }
        }
    }

    /// A required integer given either as a JSON integer or an integer string.
    /// Fractional values are rejected.
    pub fn required_i32(&mut self, field: &str, value: Option<&Value>) -> Option<i32> {
        let value = self.present(field, value)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.invalid(field, format!("{field} must be an integer"));
        }
        parsed
    }

    /// Null and blank strings count as missing.
    fn present<'v>(&mut self, field: &str, value: Option<&'v Value>) -> Option<&'v Value> {
        match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(v),
        }
        .or_else(|| {
            self.missing(field);
            None
        })
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Finish validation, building the summary from the recorded violations.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` if anything was recorded.
    pub fn finish(
        self,
        summary: impl FnOnce(&[Violation]) -> String,
    ) -> Result<(), ValidationErrors> {
        if self.violations.is_empty() {
            return Ok(());
        }
        Err(ValidationErrors {
            summary: summary(&self.violations),
            violations: self.violations,
        })
    }

    /// Finish validation and hand back `value`, which the caller builds only
    /// when every required part was present.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` if anything was recorded or `value` is absent.
    pub fn conclude<T>(
        self,
        value: Option<T>,
        summary: impl FnOnce(&[Violation]) -> String,
    ) -> Result<T, ValidationErrors> {
        self.finish(summary)?;
        value.ok_or_else(|| ValidationErrors {
            summary: "Request is invalid.".to_string(),
            violations: Vec::new(),
        })
    }
}
