use std::fmt;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

/// A single broken rule, addressed by the field path it was found on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {rule}")]
pub struct Violation {
    pub field: String,
    pub rule: Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required,
    Negative,
    NotPositive,
    InvalidEmail,
    InvalidPhone,
    Length(usize),
    TooLong(usize),
    TooFew(usize),
    InFuture,
    TrackMismatch(String),
    TotalMismatch(f64),
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => f.write_str("required field"),
            Rule::Negative => f.write_str("value must be >= 0"),
            Rule::NotPositive => f.write_str("value must be > 0"),
            Rule::InvalidEmail => f.write_str("invalid email"),
            Rule::InvalidPhone => f.write_str("phone must be in E.164 format, e.g. +71234567890"),
            Rule::Length(n) => write!(f, "length must be {}", n),
            Rule::TooLong(n) => write!(f, "length must be at most {}", n),
            Rule::TooFew(n) => write!(f, "at least {} element(s) required", n),
            Rule::InFuture => f.write_str("date cannot be in the future"),
            Rule::TrackMismatch(track) => {
                write!(f, "track_number does not match the order ({})", track)
            }
            Rule::TotalMismatch(total) => write!(
                f,
                "items total + delivery_cost + custom_fee = {:.2}, does not match amount",
                total
            ),
        }
    }
}

/// Every rule an order broke, reported together.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", join(.violations))]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

#[cfg(test)]
impl ValidationErrors {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// True if any violation was reported on exactly this field path.
    pub fn has(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}
