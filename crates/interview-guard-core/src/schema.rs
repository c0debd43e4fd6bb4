//! Structural and self-consistency validation of a candidate payload.
//!
//! Field presence and primitive types are checked against the embedded
//! schema at `schema/interview_result.schema.json`; item count and the
//! status/answer/evidence pairing rules are checked here. The validator has
//! no access to the transcript: whether quotations are real is decided later
//! by the [`crate::Clamper`]. Every check runs; nothing short-circuits.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::config::EvidenceLimits;
use crate::payload::item_values;
use crate::text::normalized_len;

/// Embedded result schema (loaded at compile time).
const RESULT_SCHEMA_JSON: &str = include_str!("../schema/interview_result.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: Value = serde_json::from_str(RESULT_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;
        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// One contract violation. Item indices are 1-based, matching question numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// No JSON object or array could be extracted from the output
    MissingPayload,

    /// The payload is JSON but not `{"items": [...]}` or a list
    NotAList,

    /// Field presence or type error reported by the schema
    Structure { path: String, message: String },

    CountMismatch { expected: usize, actual: usize },

    AnsweredWithoutAnswer { item: usize },

    AnsweredWithoutEvidence { item: usize },

    EvidenceTooShort {
        item: usize,
        quote: usize,
        length: usize,
        min: usize,
    },

    UnansweredWithAnswer { item: usize },

    UnansweredWithEvidence { item: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingPayload => {
                write!(f, "no JSON object could be found in the response")
            }
            Violation::NotAList => {
                write!(f, "the response must be an object of the form {{\"items\": [...]}}")
            }
            Violation::Structure { path, message } if path.is_empty() => {
                write!(f, "schema: {}", message)
            }
            Violation::Structure { path, message } => {
                write!(f, "schema: {} at {}", message, path)
            }
            Violation::CountMismatch { expected, actual } => write!(
                f,
                "expected exactly {} items (one per question, in order) but found {}",
                expected, actual
            ),
            Violation::AnsweredWithoutAnswer { item } => write!(
                f,
                "item {}: status is \"answered\" but answer is missing or blank",
                item
            ),
            Violation::AnsweredWithoutEvidence { item } => write!(
                f,
                "item {}: status is \"answered\" but evidence is empty",
                item
            ),
            Violation::EvidenceTooShort {
                item,
                quote,
                length,
                min,
            } => write!(
                f,
                "item {}: evidence quote {} is {} characters; quotes must be at least {}",
                item, quote, length, min
            ),
            Violation::UnansweredWithAnswer { item } => write!(
                f,
                "item {}: status is \"unanswered\" but answer is not null",
                item
            ),
            Violation::UnansweredWithEvidence { item } => write!(
                f,
                "item {}: status is \"unanswered\" but evidence is not empty",
                item
            ),
        }
    }
}

/// Outcome of validating one candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            ok: violations.is_empty(),
            violations,
        }
    }

    /// Violations rendered as plain sentences.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.to_string()).collect()
    }
}

/// Validates candidate payloads against the N-item contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator {
    limits: EvidenceLimits,
}

impl SchemaValidator {
    pub fn new(limits: EvidenceLimits) -> Self {
        Self { limits }
    }

    /// Validate `payload` (absent if nothing parsed) against `expected_count` items.
    pub fn validate(&self, payload: Option<&Value>, expected_count: usize) -> ValidationReport {
        let mut violations = Vec::new();

        let Some(payload) = payload else {
            violations.push(Violation::MissingPayload);
            if expected_count != 0 {
                violations.push(Violation::CountMismatch {
                    expected: expected_count,
                    actual: 0,
                });
            }
            return ValidationReport::from_violations(violations);
        };

        let well_formed = match payload {
            Value::Array(_) => true,
            Value::Object(obj) => matches!(obj.get("items"), Some(Value::Array(_))),
            _ => false,
        };
        if !well_formed {
            violations.push(Violation::NotAList);
        }

        let items = item_values(payload).unwrap_or(&[]);

        if items.len() != expected_count {
            violations.push(Violation::CountMismatch {
                expected: expected_count,
                actual: items.len(),
            });
        }

        self.check_structure(items, &mut violations);

        for (i, item) in items.iter().enumerate() {
            self.check_item(i + 1, item, &mut violations);
        }

        ValidationReport::from_violations(violations)
    }

    fn check_structure(&self, items: &[Value], violations: &mut Vec<Violation>) {
        let validator = match get_validator() {
            Ok(v) => v,
            Err(e) => {
                violations.push(Violation::Structure {
                    path: String::new(),
                    message: e.to_string(),
                });
                return;
            }
        };

        let instance = serde_json::json!({ "items": items });
        violations.extend(validator.iter_errors(&instance).map(|e| Violation::Structure {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        }));
    }

    fn check_item(&self, item: usize, value: &Value, violations: &mut Vec<Violation>) {
        let Some(obj) = value.as_object() else {
            return;
        };

        let answer = obj.get("answer");
        let evidence = obj.get("evidence").and_then(Value::as_array);

        match obj.get("status").and_then(Value::as_str) {
            Some("answered") => {
                let has_answer = answer
                    .and_then(Value::as_str)
                    .map(|a| !a.trim().is_empty())
                    .unwrap_or(false);
                if !has_answer {
                    violations.push(Violation::AnsweredWithoutAnswer { item });
                }

                match evidence {
                    Some(quotes) if !quotes.is_empty() => {
                        for (q, quote) in quotes.iter().enumerate() {
                            let Some(quote) = quote.as_str() else {
                                continue;
                            };
                            let length = normalized_len(quote);
                            if length < self.limits.min_length {
                                violations.push(Violation::EvidenceTooShort {
                                    item,
                                    quote: q + 1,
                                    length,
                                    min: self.limits.min_length,
                                });
                            }
                        }
                    }
                    _ => violations.push(Violation::AnsweredWithoutEvidence { item }),
                }
            }
            Some("unanswered") => {
                if matches!(answer, Some(a) if !a.is_null()) {
                    violations.push(Violation::UnansweredWithAnswer { item });
                }
                if matches!(evidence, Some(quotes) if !quotes.is_empty()) {
                    violations.push(Violation::UnansweredWithEvidence { item });
                }
            }
            // unknown or missing status is reported by the schema
            _ => {}
        }
    }
}

/// Validate with default evidence limits.
pub fn validate(payload: Option<&Value>, expected_count: usize) -> ValidationReport {
    SchemaValidator::default().validate(payload, expected_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answered(q: &str) -> Value {
        json!({
            "question": q,
            "answer": "東京に住んでいます",
            "status": "answered",
            "evidence": ["私は東京に住んでいます"]
        })
    }

    fn unanswered(q: &str) -> Value {
        json!({"question": q, "answer": null, "status": "unanswered", "evidence": []})
    }

    #[test]
    fn test_valid_payload_passes() {
        let payload = json!({"items": [answered("Q1"), unanswered("Q2")]});
        let report = validate(Some(&payload), 2);
        assert!(report.ok, "{:?}", report.violations);
    }

    #[test]
    fn test_bare_array_accepted() {
        let payload = json!([unanswered("Q1")]);
        assert!(validate(Some(&payload), 1).ok);
    }

    #[test]
    fn test_missing_payload() {
        let report = validate(None, 3);
        assert!(!report.ok);
        assert_eq!(
            report.violations,
            vec![
                Violation::MissingPayload,
                Violation::CountMismatch {
                    expected: 3,
                    actual: 0
                }
            ]
        );
    }

    #[test]
    fn test_count_mismatch() {
        let payload = json!({"items": [unanswered("Q1")]});
        let report = validate(Some(&payload), 3);
        assert_eq!(
            report.violations,
            vec![Violation::CountMismatch {
                expected: 3,
                actual: 1
            }]
        );
    }

    #[test]
    fn test_violations_are_all_collected() {
        let payload = json!({"items": [
            {"question": "Q1", "answer": null, "status": "answered", "evidence": []},
            {"question": "Q2", "answer": "x", "status": "unanswered", "evidence": ["quote"]},
            {"question": "Q3", "answer": "ok", "status": "answered", "evidence": ["短い"]}
        ]});
        let report = validate(Some(&payload), 4);
        assert!(report.violations.contains(&Violation::CountMismatch {
            expected: 4,
            actual: 3
        }));
        assert!(report
            .violations
            .contains(&Violation::AnsweredWithoutAnswer { item: 1 }));
        assert!(report
            .violations
            .contains(&Violation::AnsweredWithoutEvidence { item: 1 }));
        assert!(report
            .violations
            .contains(&Violation::UnansweredWithAnswer { item: 2 }));
        assert!(report
            .violations
            .contains(&Violation::UnansweredWithEvidence { item: 2 }));
        assert!(report.violations.contains(&Violation::EvidenceTooShort {
            item: 3,
            quote: 1,
            length: 2,
            min: 8
        }));
    }

    #[test]
    fn test_missing_fields_and_wrong_types() {
        let payload = json!({"items": [
            {"question": 7, "status": "maybe", "evidence": "not a list"}
        ]});
        let report = validate(Some(&payload), 1);
        let structural = report
            .violations
            .iter()
            .filter(|v| matches!(v, Violation::Structure { .. }))
            .count();
        // answer missing, question type, status enum, evidence type
        assert!(structural >= 4, "{:?}", report.violations);
    }

    #[test]
    fn test_object_without_items_is_not_a_list() {
        let payload = json!({"answers": []});
        let report = validate(Some(&payload), 0);
        assert_eq!(report.violations, vec![Violation::NotAList]);
    }

    #[test]
    fn test_lone_item_object_flagged() {
        let payload = unanswered("Q1");
        let report = validate(Some(&payload), 1);
        assert_eq!(report.violations, vec![Violation::NotAList]);
    }

    #[test]
    fn test_min_length_is_configurable() {
        let payload = json!({"items": [
            {"question": "Q1", "answer": "ok", "status": "answered", "evidence": ["短い"]}
        ]});
        let validator = SchemaValidator::new(EvidenceLimits::new(2, 200).unwrap());
        assert!(validator.validate(Some(&payload), 1).ok);
    }

    #[test]
    fn test_messages_are_readable() {
        let report = validate(None, 2);
        let messages = report.messages();
        assert!(messages[0].contains("no JSON object"));
        assert!(messages[1].contains("exactly 2 items"));
    }

    #[test]
    fn test_embedded_schema_compiles() {
        assert!(get_validator().is_ok());
    }
}
