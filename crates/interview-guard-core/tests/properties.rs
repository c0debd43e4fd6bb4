//! Property tests for the result invariants.
//!
//! Whatever shape the candidate takes, a clamped result must have one item
//! per question in question order, answered items must carry only verified
//! quotations, and unanswered items must carry nothing.

use interview_guard_core::{
    normalize, Candidate, Clamper, EvidenceLimits, EvidenceValidator, Question, SchemaValidator,
    Transcript,
};
use proptest::prelude::*;
use serde_json::{json, Value};

const TRANSCRIPT: &str = "私は札幌で生まれ、高校まで北海道で過ごしました。\
大学進学を機に上京し、今はIT企業でエンジニアとして働いています。\
休日は「カメラ」を持って散歩するのが好きです。";

const QUOTE_POOL: &[&str] = &[
    // verbatim
    "高校まで北海道で過ごしました",
    "今はIT企業でエンジニアとして働いています。",
    // formatting drift
    "大学進学を機に上京し，今は",
    "休日は“カメラ”を持って散歩",
    "私は札幌で\u{200B}生まれ",
    // fabricated
    "存在しない引用",
    "大阪でデザイナーをしています",
    // too short
    "札幌",
    "",
];

const ANSWER_POOL: &[&str] = &["札幌", "エンジニア", "", "   ", "Answer: 散歩", "**写真**"];

const STATUS_POOL: &[&str] = &["answered", "unanswered", "ANSWERED", "unknown", ""];

fn arb_item() -> impl Strategy<Value = Value> {
    prop_oneof![
        8 => (
            prop::sample::select(STATUS_POOL),
            prop::option::of(prop::sample::select(ANSWER_POOL)),
            prop::collection::vec(prop::sample::select(QUOTE_POOL), 0..4),
        )
            .prop_map(|(status, answer, evidence)| {
                json!({"question": "model text", "answer": answer, "status": status, "evidence": evidence})
            }),
        1 => Just(json!("not an object")),
        1 => Just(json!({})),
    ]
}

fn arb_candidate() -> impl Strategy<Value = Candidate> {
    prop::collection::vec(arb_item(), 0..9).prop_map(|items| Candidate::from_payload(json!({ "items": items })))
}

fn arb_questions() -> impl Strategy<Value = Vec<Question>> {
    prop::collection::vec("[a-zあ-ん？]{1,12}", 0..6).prop_map(Question::numbered)
}

fn arb_noisy_text() -> impl Strategy<Value = String> {
    let alphabet = prop::sample::select(vec![
        'a', 'Z', '1', 'Ａ', '１', 'ｶ', 'ﾞ', 'ア', '東', '京', ' ', '\u{3000}', '\t', '\n', '、',
        '，', ',', '。', '．', '「', '」', '『', '“', '”', '’', '\u{200B}', '\u{FEFF}', 'e',
        '\u{0301}', '\u{00A0}', '㍻',
    ]);
    prop::collection::vec(alphabet, 0..40).prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn normalize_is_idempotent(text in arb_noisy_text()) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalize_has_no_edge_or_double_whitespace(text in arb_noisy_text()) {
        let out = normalize(&text);
        prop_assert_eq!(out.trim(), out.as_str());
        prop_assert!(!out.contains("  "));
        prop_assert!(!out.contains('\u{200B}'), "output contains U+200B");
    }

    #[test]
    fn result_has_one_item_per_question_in_order(
        candidate in arb_candidate(),
        questions in arb_questions(),
    ) {
        let transcript = Transcript::new(TRANSCRIPT);
        let outcome = Clamper::default().clamp(&candidate, &questions, &transcript);

        prop_assert_eq!(outcome.result.len(), questions.len());
        for (item, question) in outcome.result.items().iter().zip(&questions) {
            prop_assert_eq!(item.question(), question.text.as_str());
        }
    }

    #[test]
    fn answered_items_carry_only_verified_evidence(
        candidate in arb_candidate(),
        questions in arb_questions(),
    ) {
        let transcript = Transcript::new(TRANSCRIPT);
        let validator = EvidenceValidator::new(&transcript, EvidenceLimits::default());
        let outcome = Clamper::default().clamp(&candidate, &questions, &transcript);

        for item in outcome.result.items() {
            if item.is_answered() {
                prop_assert!(item.answer().map(|a| !a.trim().is_empty()).unwrap_or(false));
                prop_assert!(!item.evidence().is_empty());
                for quote in item.evidence() {
                    prop_assert!(validator.is_valid(quote), "unverified quote {:?}", quote);
                }
            } else {
                prop_assert_eq!(item.answer(), None);
                prop_assert!(item.evidence().is_empty());
            }
        }
    }

    #[test]
    fn clamping_is_deterministic(
        candidate in arb_candidate(),
        questions in arb_questions(),
    ) {
        let transcript = Transcript::new(TRANSCRIPT);
        let first = Clamper::default().clamp(&candidate, &questions, &transcript);
        let second = Clamper::default().clamp(&candidate, &questions, &transcript);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn empty_transcript_never_answers(
        candidate in arb_candidate(),
        questions in arb_questions(),
    ) {
        let outcome = Clamper::default().clamp(&candidate, &questions, &Transcript::new(""));
        prop_assert_eq!(outcome.result.answered_count(), 0);
    }

    #[test]
    fn passing_report_implies_expected_count(
        candidate in arb_candidate(),
        expected in 0usize..9,
    ) {
        let report = SchemaValidator::default().validate(candidate.payload.as_ref(), expected);
        if report.ok {
            prop_assert_eq!(candidate.items.len(), expected);
        }
        prop_assert_eq!(report.ok, report.violations.is_empty());
    }
}
