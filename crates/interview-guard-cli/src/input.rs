//! Reading questions and transcripts from disk.

use anyhow::{bail, Context, Result};
use interview_guard_core::Question;
use serde::Deserialize;
use std::path::Path;

/// One entry of a questions file: either bare text or `{id, text}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionEntry {
    Text(String),
    Full { id: Option<String>, text: String },
}

/// Read a UTF-8 text file.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Load an ordered question list from a YAML or JSON file.
pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    let content = read_text(path)?;
    parse_questions(&content).with_context(|| format!("Invalid questions file {}", path.display()))
}

/// Parse a YAML (or JSON) list of questions.
///
/// Entries without an explicit id are numbered `q1..qN` by position.
pub fn parse_questions(content: &str) -> Result<Vec<Question>> {
    let entries: Vec<QuestionEntry> = serde_yaml::from_str(content)?;

    let mut questions = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let index = i + 1;
        let (id, text) = match entry {
            QuestionEntry::Text(text) => (None, text),
            QuestionEntry::Full { id, text } => (id, text),
        };
        if text.trim().is_empty() {
            bail!("question {} is blank", index);
        }
        let id = id.unwrap_or_else(|| format!("q{}", index));
        questions.push(Question::new(id, index, text));
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_yaml_list() {
        let questions = parse_questions("- 出身地は？\n- 志望動機は？\n").unwrap();
        assert_eq!(questions, Question::numbered(["出身地は？", "志望動機は？"]));
    }

    #[test]
    fn test_json_list_is_accepted() {
        let questions = parse_questions(r#"["Where?", "Why?"]"#).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].id, "q2");
    }

    #[test]
    fn test_explicit_ids_are_kept() {
        let questions = parse_questions(
            r#"
- id: hometown
  text: 出身地は？
- 志望動機は？
"#,
        )
        .unwrap();
        assert_eq!(questions[0].id, "hometown");
        assert_eq!(questions[0].index, 1);
        assert_eq!(questions[1].id, "q2");
    }

    #[test]
    fn test_blank_question_rejected() {
        assert!(parse_questions("- ok\n- '  '\n").is_err());
    }

    #[test]
    fn test_not_a_list_rejected() {
        assert!(parse_questions("questions: 3").is_err());
    }
}
