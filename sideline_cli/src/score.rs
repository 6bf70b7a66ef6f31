//! One-shot scoring of a single response.

use chrono::{Local, NaiveDateTime};
use eyre::WrapErr;
use sideline_core::scoring::{OrientationItem, parse_digits, standard_questions};
use sideline_core::{AssessCfg, ScoringEngine};

use crate::cli::ScoreCmd;

pub fn parse_local(text: &str) -> eyre::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .wrap_err_with(|| format!("expected YYYY-MM-DDTHH:MM:SS, got {text:?}"))
}

pub fn run_score(cfg: &AssessCfg, what: ScoreCmd, json: bool) -> eyre::Result<()> {
    let engine = ScoringEngine::new(cfg.scoring.clone(), cfg.orientation);
    match what {
        ScoreCmd::Digits {
            presented,
            response,
        } => {
            let digits = parse_digits(&presented);
            if digits.is_empty() {
                eyre::bail!("--presented contains no digits");
            }
            let out = engine.digit_trial(&digits, &response);
            if json {
                println!("{}", serde_json::to_string(&out)?);
            } else if out.pass {
                println!("pass");
            } else {
                let at = out
                    .first_mismatch
                    .map_or_else(String::new, |i| format!(" at position {}", i + 1));
                println!("fail{at}");
            }
        }
        ScoreCmd::Recall { words, response } => {
            let targets: Vec<String> = if words.is_empty() {
                cfg.protocol.session_word_list()
            } else {
                words.iter().map(|w| w.trim().to_lowercase()).collect()
            };
            let out = engine.recall_trial(&targets, &response);
            if json {
                println!("{}", serde_json::to_string(&out)?);
            } else {
                println!(
                    "{}/{} recalled: {}",
                    out.score,
                    cfg.scoring.recall_cap(targets.len()),
                    out.recalled.join(", ")
                );
            }
        }
        ScoreCmd::Months { response } => {
            let out = engine.months_reverse(&response);
            if json {
                println!("{}", serde_json::to_string(&out)?);
            } else {
                println!("{}/1", out.score);
            }
        }
        ScoreCmd::Orientation { item, response, at } => {
            let now = match at.as_deref() {
                Some(text) => parse_local(text)?,
                None => Local::now().naive_local(),
            };
            let item = OrientationItem::from(item);
            let question = standard_questions(now)
                .into_iter()
                .find(|q| q.item == item)
                .ok_or_else(|| eyre::eyre!("no standard question for {item:?}"))?;
            let correct = engine.orientation(&question, &response);
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "item": item,
                        "expected": question.expected,
                        "correct": correct,
                    })
                );
            } else {
                println!(
                    "{} (expected {})",
                    if correct { "correct" } else { "incorrect" },
                    question.expected
                );
            }
        }
    }
    Ok(())
}
