#![no_main]
use libfuzzer_sys::fuzz_target;
use sideline_core::ScoringEngine;
use sideline_core::scoring::{parse_digits, standard_questions};

fuzz_target!(|data: &str| {
    let engine = ScoringEngine::default();
    let digits = parse_digits(data);
    let _ = engine.digit_trial(&digits, data);
    let _ = engine.months_reverse(data);

    let words: Vec<String> = ["finger", "penny", "blanket", "lemon", "insect"]
        .iter()
        .map(|w| (*w).to_string())
        .collect();
    let out = engine.recall_trial(&words, data);
    assert!(out.score <= 5);

    let now = chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|d| d.and_hms_opt(14, 30, 0))
        .unwrap_or_default();
    for q in standard_questions(now) {
        let _ = engine.orientation(&q, data);
    }
});
