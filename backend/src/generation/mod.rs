//! Model selection, provider access and recovery of structured output
//! from free-form model text.

pub mod extractor;
pub mod gemini;
pub mod prompts;
pub mod provider;
pub mod resolver;

pub use extractor::{extract, extract_plan, extract_quiz, strip_fences, ExtractionResult, Shape};
pub use gemini::GeminiProvider;
pub use provider::{normalize_descriptor, GenerationProvider};
pub use resolver::{select_fallback, Generation, ModelResolver};

/// Flatten newlines and cut to `max_len` characters for log lines
pub fn truncate_for_log(text: &str, max_len: usize) -> String {
    let clean_text = text.replace('\n', " ");
    if clean_text.chars().count() <= max_len {
        clean_text
    } else {
        let cut: String = clean_text.chars().take(max_len).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("this is a very long text", 10), "this is a ...");
        assert_eq!(truncate_for_log("line\nbreak", 20), "line break");
    }

    #[test]
    fn test_truncate_for_log_is_char_safe() {
        assert_eq!(truncate_for_log("ééééé", 2), "éé...");
    }
}
