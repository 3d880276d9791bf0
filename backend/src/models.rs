use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

// ===== STUDY PLAN TYPES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(alias = "easy", alias = "EASY")]
    Easy,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "hard", alias = "HARD")]
    Hard,
}

/// One topic of a generated study plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub name: String,
    pub priority: Priority,
    pub difficulty: Difficulty,
    #[serde(deserialize_with = "whole_hours")]
    pub hours: u32,
}

/// Models often write `4.0` for four hours; any non-negative whole number is accepted
fn whole_hours<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    let hours = match number.as_u64() {
        Some(whole) => u32::try_from(whole).ok(),
        None => number
            .as_f64()
            .filter(|h| *h >= 0.0 && h.fract() == 0.0 && *h <= f64::from(u32::MAX))
            .map(|h| h as u32),
    };
    hours.ok_or_else(|| D::Error::custom(format!("hours must be a non-negative whole number, got {}", number)))
}

// ===== QUIZ TYPES =====

pub const QUIZ_QUESTION_COUNT: usize = 5;
pub const QUIZ_OPTION_COUNT: usize = 4;
pub const POINTS_PER_QUESTION: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: u32,
    pub category: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correct", alias = "correctIndex")]
    pub correct_index: u32,
}

// ===== INBOUND REQUESTS =====

/// Callable envelope: the frontend SDK wraps every payload in `data`
#[derive(Debug, Deserialize)]
pub struct CallableRequest<T> {
    pub data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyllabusPayload {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    /// Syllabus text pasted by the user instead of an uploaded file
    pub text: Option<String>,
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GradePayload {
    pub questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub answers: Vec<Option<u32>>,
}

/// Where the source material for a generation lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentReference {
    /// Already-downloaded document on the local filesystem
    File(PathBuf),
    Inline(String),
}

/// Validated inbound request, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub content_reference: Option<ContentReference>,
    pub days: u32,
}

// ===== PROVIDER TYPES =====

/// Normalized model listing entry, independent of the provider's wire shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub identifier: String,
    pub supports_generation: bool,
}

/// Document sent alongside a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl Prompt {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }
}

// ===== OUTBOUND RESPONSES =====

#[derive(Debug, Serialize)]
pub struct CallableResponse<T> {
    pub result: T,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanResponse {
    pub plan: Vec<PlanItem>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizScore {
    pub score: u32,
    #[serde(rename = "maxScore")]
    pub max_score: u32,
    pub correct: u32,
    pub total: u32,
}

/// Score submitted answers against a quiz; unanswered questions count as wrong
pub fn grade_quiz(questions: &[QuizQuestion], answers: &[Option<u32>]) -> QuizScore {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(i, q)| answers.get(*i).copied().flatten() == Some(q.correct_index))
        .count() as u32;
    let total = questions.len() as u32;

    QuizScore {
        score: correct * POINTS_PER_QUESTION,
        max_score: total * POINTS_PER_QUESTION,
        correct,
        total,
    }
}
