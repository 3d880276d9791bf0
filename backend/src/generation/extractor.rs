use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::truncate_for_log;
use crate::error::ServiceError;
use crate::models::{PlanItem, QuizQuestion, QUIZ_OPTION_COUNT, QUIZ_QUESTION_COUNT};

const DIAGNOSTIC_PREFIX_LEN: usize = 200;

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```json\b").unwrap());
/// Greedy: first `[` through the last `]`, across lines
static BRACKET_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// Which structured list the model was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    PlanList,
    QuizList,
}

impl Shape {
    /// Key under which a model sometimes nests the list in an object
    fn envelope_key(self) -> &'static str {
        match self {
            Shape::PlanList => "plan",
            Shape::QuizList => "questions",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Shape::PlanList => "study plan",
            Shape::QuizList => "quiz",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    Plan(Vec<PlanItem>),
    Quiz(Vec<QuizQuestion>),
}

/// Remove markdown code fences and surrounding whitespace
pub fn strip_fences(raw: &str) -> String {
    let without_json_fence = JSON_FENCE.replace_all(raw, "");
    let cleaned = without_json_fence.replace("```", "");
    // Partial fencing can leave stray backticks at either end
    cleaned.trim().trim_matches('`').trim().to_string()
}

/// Recover a validated list of the requested shape from raw model text.
///
/// Order of remedies: fence stripping and a strict parse, then a scan for the
/// outermost `[...]` span of the raw text, then the emptiness check, then
/// shape validation.
pub fn extract(raw_text: &str, shape: Shape) -> Result<ExtractionResult, ServiceError> {
    match shape {
        Shape::PlanList => extract_plan(raw_text).map(ExtractionResult::Plan),
        Shape::QuizList => extract_quiz(raw_text).map(ExtractionResult::Quiz),
    }
}

pub fn extract_plan(raw_text: &str) -> Result<Vec<PlanItem>, ServiceError> {
    let items = recover_items(raw_text, Shape::PlanList)?;
    let plan: Vec<PlanItem> = decode(items, Shape::PlanList, raw_text)?;
    validate_plan(&plan)?;
    Ok(plan)
}

pub fn extract_quiz(raw_text: &str) -> Result<Vec<QuizQuestion>, ServiceError> {
    let items = recover_items(raw_text, Shape::QuizList)?;
    let mut questions: Vec<QuizQuestion> = decode(items, Shape::QuizList, raw_text)?;
    validate_quiz(&mut questions)?;
    Ok(questions)
}

fn recover_items(raw_text: &str, shape: Shape) -> Result<Vec<Value>, ServiceError> {
    let cleaned = strip_fences(raw_text);

    let items = match as_list(&cleaned, shape) {
        Some(items) => items,
        None => {
            debug!("Strict parse failed, scanning for a bracketed list");
            bracket_scan(raw_text, shape).ok_or_else(|| {
                warn!(raw = %truncate_for_log(raw_text, 60), "Could not recover JSON list");
                ServiceError::MalformedModelOutput(format!(
                    "could not parse {} from model output: {}",
                    shape.label(),
                    diagnostic_prefix(raw_text)
                ))
            })?
        }
    };

    if items.is_empty() {
        return Err(ServiceError::EmptyGenerationResult(format!(
            "model returned an empty {}",
            shape.label()
        )));
    }
    Ok(items)
}

/// Parse text as a JSON list, unwrapping `{"plan": [...]}` style envelopes
fn as_list(text: &str, shape: Shape) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove(shape.envelope_key()) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn bracket_scan(raw_text: &str, shape: Shape) -> Option<Vec<Value>> {
    let span = BRACKET_SPAN.find(raw_text)?;
    as_list(span.as_str(), shape)
}

fn decode<T: DeserializeOwned>(
    items: Vec<Value>,
    shape: Shape,
    raw_text: &str,
) -> Result<Vec<T>, ServiceError> {
    serde_json::from_value(Value::Array(items)).map_err(|e| {
        ServiceError::MalformedModelOutput(format!(
            "{} entries have unexpected fields ({}): {}",
            shape.label(),
            e,
            diagnostic_prefix(raw_text)
        ))
    })
}

fn validate_plan(plan: &[PlanItem]) -> Result<(), ServiceError> {
    if let Some(pos) = plan.iter().position(|item| item.name.trim().is_empty()) {
        return Err(ServiceError::MalformedModelOutput(format!(
            "study plan item {} has no name",
            pos + 1
        )));
    }
    Ok(())
}

fn validate_quiz(questions: &mut [QuizQuestion]) -> Result<(), ServiceError> {
    if questions.len() != QUIZ_QUESTION_COUNT {
        return Err(ServiceError::MalformedModelOutput(format!(
            "quiz must have exactly {} questions, got {}",
            QUIZ_QUESTION_COUNT,
            questions.len()
        )));
    }

    for (index, q) in questions.iter().enumerate() {
        if q.options.len() != QUIZ_OPTION_COUNT {
            return Err(ServiceError::MalformedModelOutput(format!(
                "quiz question {} must have exactly {} options, got {}",
                index + 1,
                QUIZ_OPTION_COUNT,
                q.options.len()
            )));
        }
        if q.correct_index as usize >= QUIZ_OPTION_COUNT {
            return Err(ServiceError::MalformedModelOutput(format!(
                "quiz question {} has correct answer index {} outside 0..={}",
                index + 1,
                q.correct_index,
                QUIZ_OPTION_COUNT - 1
            )));
        }
    }

    // Ids are positional; models often number from 0 or repeat them
    let sequential = questions
        .iter()
        .enumerate()
        .all(|(i, q)| q.id as usize == i + 1);
    if !sequential {
        debug!("Renumbering quiz question ids");
        for (i, q) in questions.iter_mut().enumerate() {
            q.id = i as u32 + 1;
        }
    }
    Ok(())
}

fn diagnostic_prefix(raw_text: &str) -> String {
    truncate_for_log(raw_text.trim(), DIAGNOSTIC_PREFIX_LEN)
}
