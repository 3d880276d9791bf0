use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{AppConfig, MAX_DAYS};
use crate::error::ServiceError;
use crate::generation::prompts::{build_plan_prompt, build_quiz_prompt, PromptSource};
use crate::generation::{extract_plan, extract_quiz, GenerationProvider, ModelResolver};
use crate::models::{
    Attachment, ContentReference, GenerationRequest, PlanResponse, Prompt, QuizResponse,
    SyllabusPayload,
};

/// Turns syllabus requests into study plans and quizzes.
///
/// Stateless across requests: everything shared is read-only.
pub struct StudyService {
    config: Arc<AppConfig>,
    provider: Arc<dyn GenerationProvider>,
}

impl StudyService {
    pub fn new(config: Arc<AppConfig>, provider: Arc<dyn GenerationProvider>) -> Self {
        Self { config, provider }
    }

    /// Document-analysis variant: a content reference is required
    pub async fn analyze_syllabus(&self, payload: SyllabusPayload) -> Result<PlanResponse, ServiceError> {
        self.config.validate()?;
        let request = self.build_request(payload)?;
        let content = request.content_reference.as_ref().ok_or_else(|| {
            ServiceError::InvalidRequest("filePath is required".to_string())
        })?;
        info!(days = request.days, content = %describe(content), "📄 Analyzing syllabus");

        let prompt = match content {
            ContentReference::File(path) if self.config.attach_documents => Prompt {
                text: build_plan_prompt(request.days, PromptSource::AttachedDocument),
                attachment: Some(load_attachment(path).await?),
            },
            ContentReference::File(_) => Prompt::text_only(build_plan_prompt(
                request.days,
                PromptSource::Subject(&self.config.plan_subject),
            )),
            ContentReference::Inline(text) => {
                Prompt::text_only(build_plan_prompt(request.days, PromptSource::InlineText(text)))
            }
        };

        let generation = self.resolver().generate(&self.config.preferred_model, &prompt).await?;
        let plan = extract_plan(&generation.text)?;

        info!(items = plan.len(), model = %generation.model, "✅ Study plan ready");
        Ok(PlanResponse { plan })
    }

    /// Text-only variant: `filePath` is accepted but only echoed to the log
    pub async fn generate_quiz(&self, payload: SyllabusPayload) -> Result<QuizResponse, ServiceError> {
        self.config.validate()?;
        let request = self.build_request(payload)?;

        let source = match &request.content_reference {
            Some(ContentReference::Inline(text)) => PromptSource::InlineText(text),
            Some(ContentReference::File(path)) => {
                info!(file = %path.display(), "📝 Generating quiz");
                PromptSource::Subject(&self.config.plan_subject)
            }
            None => {
                info!("📝 Generating quiz without syllabus (using subject)");
                PromptSource::Subject(&self.config.plan_subject)
            }
        };
        let prompt = Prompt::text_only(build_quiz_prompt(source));

        let generation = self.resolver().generate(&self.config.preferred_model, &prompt).await?;
        let questions = extract_quiz(&generation.text)?;

        info!(questions = questions.len(), model = %generation.model, "✅ Quiz ready");
        Ok(QuizResponse { questions })
    }

    fn resolver(&self) -> ModelResolver<'_> {
        ModelResolver::new(self.provider.as_ref(), &self.config.family_markers)
    }

    fn build_request(&self, payload: SyllabusPayload) -> Result<GenerationRequest, ServiceError> {
        let days = match payload.days {
            None => self.config.default_days,
            Some(d) if d >= 1 && d <= MAX_DAYS as i64 => d as u32,
            Some(d) => {
                return Err(ServiceError::InvalidRequest(format!(
                    "days must be between 1 and {}, got {}",
                    MAX_DAYS, d
                )))
            }
        };

        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        let content_reference = match (non_empty(payload.file_path), non_empty(payload.text)) {
            (Some(path), _) => Some(ContentReference::File(PathBuf::from(path))),
            (None, Some(text)) => Some(ContentReference::Inline(text)),
            (None, None) => None,
        };

        Ok(GenerationRequest {
            content_reference,
            days,
        })
    }
}

fn describe(content: &ContentReference) -> String {
    match content {
        ContentReference::File(path) => path.display().to_string(),
        ContentReference::Inline(text) => format!("inline text ({} chars)", text.chars().count()),
    }
}

/// Read an already-downloaded document for inline upload
async fn load_attachment(path: &Path) -> Result<Attachment, ServiceError> {
    let data = tokio::fs::read(path).await.map_err(|e| {
        ServiceError::InvalidRequest(format!("could not read '{}': {}", path.display(), e))
    })?;
    if data.is_empty() {
        return Err(ServiceError::InvalidRequest(format!(
            "'{}' is empty",
            path.display()
        )));
    }

    let mime_type = mime_for(path);
    debug!(bytes = data.len(), mime_type, "Loaded syllabus attachment");
    Ok(Attachment {
        mime_type: mime_type.to_string(),
        data,
    })
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html") | Some("htm") => "text/html",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
