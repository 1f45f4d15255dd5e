//! Field validation for outline writes.
//!
//! Every check here runs before any repository call is issued.

use super::outline::ProjectDraft;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const PROJECT_TITLE_CHARS: (usize, usize) = (2, 100);
pub const PROJECT_AUTHOR_CHARS: (usize, usize) = (2, 50);
pub const PROJECT_DESCRIPTION_MAX_CHARS: usize = 500;

/// Rejected input for an outline write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineValidationError {
    /// Field is empty after trimming.
    BlankField(&'static str),
    /// Field length in chars is outside `[min, max]`.
    FieldLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },
    /// Scene would belong to a chapter of another project.
    ProjectMismatch,
    /// Swap addressed the same sibling twice.
    SelfSwap,
}

impl Display for OutlineValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::FieldLength {
                field,
                min,
                max,
                actual,
            } => write!(
                f,
                "{field} must be between {min} and {max} characters, got {actual}"
            ),
            Self::ProjectMismatch => {
                write!(f, "scene and chapter must belong to the same project")
            }
            Self::SelfSwap => write!(f, "cannot swap a sibling with itself"),
        }
    }
}

impl Error for OutlineValidationError {}

/// Trims `value` and rejects blank results.
pub fn normalize_title(field: &'static str, value: &str) -> Result<String, OutlineValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OutlineValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

/// Trims every project field and checks length bounds.
pub fn normalize_project_draft(draft: &ProjectDraft) -> Result<ProjectDraft, OutlineValidationError> {
    let title = bounded("title", &draft.title, PROJECT_TITLE_CHARS)?;
    let author = bounded("author", &draft.author, PROJECT_AUTHOR_CHARS)?;
    let description = draft.description.trim().to_string();
    let description_chars = description.chars().count();
    if description_chars > PROJECT_DESCRIPTION_MAX_CHARS {
        return Err(OutlineValidationError::FieldLength {
            field: "description",
            min: 0,
            max: PROJECT_DESCRIPTION_MAX_CHARS,
            actual: description_chars,
        });
    }
    Ok(ProjectDraft {
        title,
        author,
        description,
    })
}

fn bounded(
    field: &'static str,
    value: &str,
    (min, max): (usize, usize),
) -> Result<String, OutlineValidationError> {
    let trimmed = normalize_title(field, value)?;
    let actual = trimmed.chars().count();
    if actual < min || actual > max {
        return Err(OutlineValidationError::FieldLength {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(trimmed)
}
