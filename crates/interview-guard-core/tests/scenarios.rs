//! End-to-end checks of one raw model output through parse, validate and clamp.

use interview_guard_core::{
    guard_output, DowngradeReason, EvidenceLimits, ItemStatus, Question, Transcript, Violation,
};
use serde_json::json;

const TRANSCRIPT: &str = "面接官：自己紹介をお願いします。\n\
候補者：山田と申します。前職では物流会社で在庫管理システムの開発を担当していました。\n\
面接官：転職理由は？\n\
候補者：より大規模なデータを扱う仕事に挑戦したいと考えたからです。";

fn questions() -> Vec<Question> {
    Question::numbered(["前職の業務内容は？", "希望年収は？", "転職理由は？"])
}

fn run(raw: &str) -> interview_guard_core::GuardedOutput {
    guard_output(raw, &questions(), &Transcript::new(TRANSCRIPT), EvidenceLimits::default())
}

fn item(question: &str, answer: &str, evidence: &[&str]) -> serde_json::Value {
    json!({"question": question, "answer": answer, "status": "answered", "evidence": evidence})
}

#[test]
fn test_unsupported_middle_answer_becomes_unanswered() {
    let raw = json!({"items": [
        item("前職の業務内容は？", "在庫管理システムの開発", &["物流会社で在庫管理システムの開発を担当"]),
        item("希望年収は？", "600万円", &[]),
        item("転職理由は？", "大規模データへの挑戦", &["より大規模なデータを扱う仕事に挑戦したい"]),
    ]})
    .to_string();

    let guarded = run(&raw);
    let items = guarded.outcome.result.items();

    assert_eq!(items[0].status(), ItemStatus::Answered);
    assert_eq!(items[1].status(), ItemStatus::Unanswered);
    assert_eq!(items[1].answer(), None);
    assert_eq!(items[2].status(), ItemStatus::Answered);
    assert!(guarded
        .report
        .violations
        .contains(&Violation::AnsweredWithoutEvidence { item: 2 }));
}

#[test]
fn test_extra_items_dropped() {
    let extras: Vec<_> = (0..7)
        .map(|i| json!({"question": format!("余分{}", i), "answer": null, "status": "unanswered", "evidence": []}))
        .collect();
    let raw = format!("```json\n{}\n```", json!({ "items": extras }));

    let guarded = run(&raw);
    assert_eq!(guarded.outcome.result.len(), 3);
    assert_eq!(guarded.outcome.truncated, 4);
    let texts: Vec<_> = guarded.outcome.result.items().iter().map(|i| i.question()).collect();
    assert_eq!(texts, vec!["前職の業務内容は？", "希望年収は？", "転職理由は？"]);
}

#[test]
fn test_missing_items_padded() {
    let raw = json!({"items": [
        item("前職の業務内容は？", "在庫管理", &["在庫管理システムの開発を担当していました"]),
    ]})
    .to_string();

    let guarded = run(&raw);
    assert_eq!(guarded.outcome.result.len(), 3);
    assert_eq!(guarded.outcome.padded, 2);
    assert!(guarded.outcome.result.items()[0].is_answered());
    assert!(!guarded.outcome.result.items()[1].is_answered());
    assert!(!guarded.outcome.result.items()[2].is_answered());
}

#[test]
fn test_fabricated_quote_forces_downgrade() {
    let raw = json!({"items": [
        item("前職の業務内容は？", "とても説得力のある回答", &["存在しない引用"]),
        {"question": "希望年収は？", "answer": null, "status": "unanswered", "evidence": []},
        {"question": "転職理由は？", "answer": null, "status": "unanswered", "evidence": []},
    ]})
    .to_string();

    let guarded = run(&raw);
    let first = &guarded.outcome.result.items()[0];
    assert_eq!(first.status(), ItemStatus::Unanswered);
    assert_eq!(first.answer(), None);
    assert!(first.evidence().is_empty());
    assert_eq!(guarded.outcome.downgrades[0].reason, DowngradeReason::UnverifiedEvidence);
}

#[test]
fn test_empty_transcript_answers_nothing() {
    let raw = json!({"items": [
        item("前職の業務内容は？", "在庫管理", &["在庫管理システムの開発を担当していました"]),
        item("希望年収は？", "600万円", &["希望年収は600万円です"]),
        item("転職理由は？", "挑戦", &["より大規模なデータを扱う仕事に挑戦したい"]),
    ]})
    .to_string();

    let guarded = guard_output(&raw, &questions(), &Transcript::new(""), EvidenceLimits::default());
    assert_eq!(guarded.outcome.result.len(), 3);
    assert_eq!(guarded.outcome.result.answered_count(), 0);
    assert_eq!(guarded.outcome.downgrades.len(), 3);
}

#[test]
fn test_short_verbatim_quote_downgraded() {
    // "山田と申し" appears verbatim but is only 5 characters
    let raw = json!({"items": [
        item("前職の業務内容は？", "山田", &["山田と申し"]),
        {"question": "希望年収は？", "answer": null, "status": "unanswered", "evidence": []},
        {"question": "転職理由は？", "answer": null, "status": "unanswered", "evidence": []},
    ]})
    .to_string();

    let guarded = run(&raw);
    assert!(!guarded.outcome.result.items()[0].is_answered());
    assert!(guarded.report.violations.contains(&Violation::EvidenceTooShort {
        item: 1,
        quote: 1,
        length: 5,
        min: 8
    }));
}

#[test]
fn test_wire_shape_of_result() {
    let raw = json!({"items": [
        item("前職の業務内容は？", "在庫管理", &["在庫管理システムの開発を担当していました"]),
    ]})
    .to_string();

    let value = serde_json::to_value(&run(&raw).outcome.result).unwrap();
    assert_eq!(value["items"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["items"][0]["status"], "answered");
    assert_eq!(value["items"][1], json!({
        "question": "希望年収は？",
        "answer": null,
        "status": "unanswered",
        "evidence": []
    }));
}

#[test]
fn test_cut_off_output_keeps_answers_in_place() {
    // output stopped mid-way through a fourth item; the list never closes
    let raw = concat!(
        r#"{"items": [{"question": "前職の業務内容は？", "answer": null, "status": "unanswered", "evidence": []}, "#,
        r#"{"question": "希望年収は？", "answer": null, "status": "unanswered", "evidence": []}, "#,
        r#"{"question": "転職理由は？", "answer": "大規模データへの挑戦", "status": "answered", "evidence": ["より大規模なデータを扱う仕事に挑戦したい"]}, "#,
        r#"{"question": "ex"#
    );

    let guarded = run(raw);
    let items = guarded.outcome.result.items();

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].question(), "前職の業務内容は？");
    assert!(items.iter().all(|item| !item.is_answered()));
    assert!(items.iter().all(|item| item.answer().is_none()));
    assert!(!guarded.report.ok);
    assert!(guarded.report.violations.contains(&Violation::MissingPayload));
}
