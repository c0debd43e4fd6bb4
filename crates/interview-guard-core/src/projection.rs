//! Plain-text rendering of a result for legacy consumers.
//!
//! The projection is lossy (evidence is omitted) and derived only from a
//! validated [`InterviewResult`]; it is never parsed back.

use serde::{Deserialize, Serialize};

use crate::sanitize::{sanitize_placeholder, DEFAULT_PLACEHOLDER};
use crate::types::InterviewResult;

/// Rendering options for [`render_legacy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionOptions {
    /// Text shown in place of an answer for unanswered items
    pub placeholder: String,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

/// Render one `Q / A / status` block per item, separated by blank lines.
pub fn render_legacy(result: &InterviewResult, options: &ProjectionOptions) -> String {
    let placeholder = sanitize_placeholder(&options.placeholder);

    result
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let answer = item.answer().unwrap_or(&placeholder);
            format!(
                "Q{}: {}\nA: {}\nstatus: {}",
                i + 1,
                item.question(),
                answer,
                item.status()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
