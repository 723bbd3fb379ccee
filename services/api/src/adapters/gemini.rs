//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the generative model. It implements the
//! `GenerationService` port from the `core` crate by talking to Gemini through
//! its OpenAI-compatible endpoint.

use crate::adapters::prompts;
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestMessageContentPartAudioArgs,
        ChatCompletionRequestMessageContentPartFile,
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, FileObject, ImageUrlArgs,
        InputAudio, InputAudioFormat,
    },
    types::images::{CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat},
    Client,
};
use async_trait::async_trait;
use base64::Engine;
use courseware_core::{
    retry::RetryPolicy, AssistantService, ChatMessage, ChatRole, ContentType, CourseContext,
    GenerationService, MediaFile, Module, ModuleOutline, PortError, PortResult,
};
use tracing::{debug, warn};

const TRANSIENT_MARKERS: &[&str] = &[
    "429",
    "503",
    "rate limit",
    "overloaded",
    "resource_exhausted",
    "unavailable",
];

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerationService` using Gemini models.
#[derive(Clone)]
pub struct GeminiGenerationAdapter {
    client: Client<OpenAIConfig>,
    text_model: String,
    image_model: String,
    retry: RetryPolicy,
}

impl GeminiGenerationAdapter {
    /// Creates a new `GeminiGenerationAdapter`.
    pub fn new(
        client: Client<OpenAIConfig>,
        text_model: String,
        image_model: String,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            text_model,
            image_model,
            retry,
        }
    }

    fn request(&self, user: ChatCompletionRequestMessage) -> PortResult<CreateChatCompletionRequest> {
        let system = Self::system_message(prompts::SYSTEM_INSTRUCTION.to_string())?;
        self.request_with(vec![system, user])
    }

    fn request_with(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> PortResult<CreateChatCompletionRequest> {
        CreateChatCompletionRequestArgs::default()
            .model(&self.text_model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    fn system_message(text: String) -> PortResult<ChatCompletionRequestMessage> {
        Ok(ChatCompletionRequestSystemMessageArgs::default()
            .content(text)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into())
    }

    fn reply_message(text: String) -> PortResult<ChatCompletionRequestMessage> {
        Ok(ChatCompletionRequestAssistantMessageArgs::default()
            .content(text)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into())
    }

    fn text_message(text: String) -> PortResult<ChatCompletionRequestMessage> {
        Ok(ChatCompletionRequestUserMessageArgs::default()
            .content(text)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into())
    }

    /// Sends a chat request under the retry policy and returns the first
    /// choice's text, which may be empty.
    async fn complete(&self, request: CreateChatCompletionRequest) -> PortResult<String> {
        let response = self
            .retry
            .run(|| {
                let request = request.clone();
                async move {
                    self.client
                        .chat()
                        .create(request)
                        .await
                        .map_err(|e| classify(&e))
                }
            })
            .await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    async fn complete_text(&self, prompt: String) -> PortResult<String> {
        let request = self.request(Self::text_message(prompt)?)?;
        self.complete(request).await
    }

    fn media_part(file: &MediaFile) -> PortResult<ChatCompletionRequestUserMessageContentPart> {
        let mime = media_mime(file).ok_or_else(|| {
            PortError::Unsupported(format!(
                "{} ({}) cannot be sent to the model",
                file.name, file.mime_type
            ))
        })?;
        let data = base64::engine::general_purpose::STANDARD.encode(&file.data);

        if mime.starts_with("image/") {
            let image_url = ImageUrlArgs::default()
                .url(format!("data:{};base64,{}", mime, data))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            return Ok(ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(image_url)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into());
        }

        let format = match mime {
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(InputAudioFormat::Wav),
            "audio/mpeg" | "audio/mp3" => Some(InputAudioFormat::Mp3),
            _ => None,
        };
        if let Some(format) = format {
            return Ok(ChatCompletionRequestMessageContentPartAudioArgs::default()
                .input_audio(InputAudio { data, format })
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into());
        }

        // Video and the remaining audio containers go inline as a file part.
        // `FileObject` has private fields and no builder, so it is built from JSON.
        let file_object: FileObject = serde_json::from_value(serde_json::json!({
            "file_data": format!("data:{};base64,{}", mime, data),
            "filename": file.name.clone(),
        }))
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(ChatCompletionRequestUserMessageContentPart::File(
            ChatCompletionRequestMessageContentPartFile { file: file_object },
        ))
    }
}

/// The MIME type a media upload is sent with. Browsers often report container
/// formats as `application/octet-stream`, so the extension is the fallback.
fn media_mime(file: &MediaFile) -> Option<&str> {
    let mime = file.mime_type.as_str();
    if ["image/", "audio/", "video/"].iter().any(|prefix| mime.starts_with(prefix)) {
        return Some(mime);
    }
    let extension = file.name.rsplit_once('.')?.1.to_lowercase();
    Some(match extension.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        _ => return None,
    })
}

/// Maps a client error onto the port taxonomy. Rate limiting and overload are
/// reported as transient so the retry policy picks them up.
pub fn classify(e: &OpenAIError) -> PortError {
    classify_message(e.to_string())
}

fn classify_message(message: String) -> PortError {
    let lower = message.to_lowercase();
    if TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker)) {
        PortError::Transient(message)
    } else {
        PortError::Unexpected(message)
    }
}

/// Pulls the JSON payload out of a model reply that may wrap it in a code fence
/// or surround it with prose.
pub fn json_payload(text: &str) -> &str {
    let trimmed = text.trim();
    match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

//=========================================================================================
// `GenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerationService for GeminiGenerationAdapter {
    async fn generate(
        &self,
        content_type: ContentType,
        module: &Module,
        context: &CourseContext,
    ) -> PortResult<String> {
        debug!(module = %module.title, %content_type, "Requesting section");

        if content_type.is_structured() {
            let text = self.complete_text(prompts::quiz_prompt(module, context)).await?;
            if text.trim().is_empty() {
                return Ok("[]".to_string());
            }
            return Ok(json_payload(&text).to_string());
        }

        let text = self
            .complete_text(prompts::section_prompt(content_type, module, context))
            .await?;
        if text.trim().is_empty() {
            return Err(PortError::Unexpected(format!(
                "The model returned no {} content for '{}'.",
                content_type, module.title
            )));
        }
        Ok(text)
    }

    async fn generate_structure(&self, context: &CourseContext) -> PortResult<Vec<ModuleOutline>> {
        let text = self.complete_text(prompts::structure_prompt(context)).await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(json_payload(&text)).map_err(|e| {
            PortError::Unexpected(format!("Course structure response was not valid JSON: {}", e))
        })
    }

    async fn refine(
        &self,
        _content_type: ContentType,
        _module: &Module,
        _context: &CourseContext,
        existing: &str,
        feedback: &str,
    ) -> PortResult<String> {
        let text = self
            .complete_text(prompts::refine_prompt(existing, feedback))
            .await?;
        if text.trim().is_empty() {
            warn!("Refinement returned no text; keeping the existing content.");
            return Ok(existing.to_string());
        }
        Ok(text)
    }

    async fn generate_image(&self, prompt: &str) -> PortResult<String> {
        if prompt.trim().chars().count() < 2 {
            return Ok(String::new());
        }

        let request = CreateImageRequestArgs::default()
            .prompt(prompts::image_prompt(prompt))
            .model(ImageModel::Other(self.image_model.clone()))
            .response_format(ImageResponseFormat::B64Json)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .retry
            .run(|| {
                let request = request.clone();
                async move {
                    self.client
                        .images()
                        .generate(request)
                        .await
                        .map_err(|e| classify(&e))
                }
            })
            .await;

        // Illustrations are optional; a failure renders as a missing image.
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!("Image generation failed: {}", e);
                return Ok(String::new());
            }
        };

        Ok(match response.data.first().map(|image| image.as_ref()) {
            Some(Image::B64Json { b64_json, .. }) => format!("data:image/png;base64,{}", b64_json),
            Some(Image::Url { url, .. }) => url.to_string(),
            None => String::new(),
        })
    }

    async fn describe_media(&self, file: &MediaFile) -> PortResult<String> {
        let parts = vec![
            Self::media_part(file)?,
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(prompts::media_prompt(&file.name))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(parts)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into();

        self.complete(self.request(user)?).await
    }
}

//=========================================================================================
// `AssistantService` Trait Implementation
//=========================================================================================

/// The conversation sent to the model. The canned greeting that opens the
/// history is not part of it.
fn chat_messages(history: &[ChatMessage]) -> impl Iterator<Item = &ChatMessage> {
    history.iter().skip_while(|m| m.role == ChatRole::Model)
}

#[async_trait]
impl AssistantService for GeminiGenerationAdapter {
    async fn chat(&self, context: &CourseContext, history: &[ChatMessage]) -> PortResult<String> {
        let mut messages = vec![Self::system_message(prompts::assistant_instruction(context))?];
        for message in chat_messages(history) {
            messages.push(match message.role {
                ChatRole::User => Self::text_message(message.text.clone())?,
                ChatRole::Model => Self::reply_message(message.text.clone())?,
            });
        }
        debug!(turns = messages.len() - 1, "Requesting assistant reply");

        let reply = self.complete(self.request_with(messages)?).await?;
        if reply.trim().is_empty() {
            return Err(PortError::Unexpected("The assistant returned an empty reply.".to_string()));
        }
        Ok(reply)
    }
}
