use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Validation error for malformed dialog or quest definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check that every id in `ids` is unique, reporting each repeated id once.
///
/// Ids are compared by value, so typed ids that render alike are still distinct.
///
/// ```
/// use questgiver_data::{ValidationError, validate_unique_ids};
///
/// let errors = validate_unique_ids("page", ["intro", "deal", "intro", "intro"]);
/// assert_eq!(
///     errors,
///     vec![ValidationError::DuplicateId { kind: "page", id: "intro".into() }]
/// );
/// ```
pub fn validate_unique_ids<I, T>(kind: &'static str, ids: I) -> Vec<ValidationError>
where
    I: IntoIterator<Item = T>,
    T: Eq + Hash + fmt::Display,
{
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    track_ids(kind, ids, &mut seen, &mut reported, &mut errors);
    errors
}

fn track_ids<I, T>(
    kind: &'static str,
    ids: I,
    seen: &mut HashSet<T>,
    reported: &mut HashSet<T>,
    errors: &mut Vec<ValidationError>,
) where
    I: IntoIterator<Item = T>,
    T: Eq + Hash + fmt::Display,
{
    for id in ids {
        if seen.contains(&id) {
            if !reported.contains(&id) {
                errors.push(ValidationError::DuplicateId {
                    kind,
                    id: id.to_string(),
                });
                reported.insert(id);
            }
        } else {
            seen.insert(id);
        }
    }
}
