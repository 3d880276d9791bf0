use crate::models::{QUIZ_OPTION_COUNT, QUIZ_QUESTION_COUNT};

/// Source material the prompt should refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource<'a> {
    /// The syllabus is attached to the request as a document
    AttachedDocument,
    /// Syllabus text pasted into the prompt
    InlineText(&'a str),
    /// No material available, plan for a named subject
    Subject(&'a str),
}

fn source_section(source: PromptSource<'_>) -> String {
    match source {
        PromptSource::AttachedDocument => {
            "Base it on the topics listed in the attached syllabus document.".to_string()
        }
        PromptSource::InlineText(text) => format!(
            "Base it on the topics listed in this syllabus:\n\"\"\"\n{}\n\"\"\"",
            text.trim()
        ),
        PromptSource::Subject(subject) => format!("Subject: {}.", subject),
    }
}

/// Build the study-plan prompt
pub fn build_plan_prompt(days: u32, source: PromptSource<'_>) -> String {
    format!(
        r#"Create a study plan for {days} days.
{source}

Return a JSON list of objects, one per topic.
Each object must have:
- "name": topic name (string)
- "priority": one of "High", "Medium", "Low"
- "difficulty": one of "Easy", "Medium", "Hard"
- "hours": whole number of study hours (non-negative integer)

The total hours should fit in {days} days of study.
Do not use Markdown formatting. Just raw JSON."#,
        days = days,
        source = source_section(source),
    )
}

/// Build the quiz prompt
pub fn build_quiz_prompt(source: PromptSource<'_>) -> String {
    format!(
        r#"Write a multiple-choice quiz with exactly {count} questions.
{source}

Return a JSON list of exactly {count} objects.
Each object must have:
- "id": question number from 1 to {count} (integer)
- "category": the topic the question tests (string)
- "question": the question text (string)
- "options": exactly {options} answer strings
- "correct": index of the correct option, 0 to {last} (integer)

Do not use Markdown formatting. Just raw JSON."#,
        count = QUIZ_QUESTION_COUNT,
        options = QUIZ_OPTION_COUNT,
        last = QUIZ_OPTION_COUNT - 1,
        source = source_section(source),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_prompt_embeds_days_and_subject() {
        let prompt = build_plan_prompt(5, PromptSource::Subject("Engineering Calculus"));
        assert!(prompt.contains("study plan for 5 days"));
        assert!(prompt.contains("Subject: Engineering Calculus."));
        assert!(prompt.contains("\"hours\""));
    }

    #[test]
    fn test_plan_prompt_mentions_attachment() {
        let prompt = build_plan_prompt(7, PromptSource::AttachedDocument);
        assert!(prompt.contains("attached syllabus document"));
    }

    #[test]
    fn test_quiz_prompt_fixes_question_count() {
        let prompt = build_quiz_prompt(PromptSource::InlineText("Week 1: Limits"));
        assert!(prompt.contains("exactly 5 questions"));
        assert!(prompt.contains("exactly 4 answer strings"));
        assert!(prompt.contains("Week 1: Limits"));
    }
}
