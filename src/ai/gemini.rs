//! Gemini client for all hosted-AI calls.
//!
//! One client implements every collaborator trait against the Gemini
//! `generateContent` API: transcription with word-level timestamps, chord
//! detection, translation, speech synthesis and slide art. Users provide
//! their own API key.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use zeroize::Zeroize;

use super::{
    AiError, ChordDetector, SlideArtist, SpeechSynthesizer, TranscriptionMode, Transcriber,
    Translator,
};
use crate::config::Config;
use crate::transcript::{LineSegment, Transcript, WordSegment};

/// Maximum number of retry attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Initial delay between retries (doubles with each attempt).
const INITIAL_RETRY_DELAY_MS: u64 = 1000;

/// Sentinel the chord prompt asks for when no chords are audible.
const NO_CHORDS_SENTINEL: &str = "NONE";

/// Client for the Gemini generateContent API.
pub struct GeminiClient {
    endpoint: String,
    api_key: String,
    model: String,
    tts_model: String,
    image_model: String,
    client: reqwest::Client,
}

/// Request body for generateContent.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl RequestPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    /// Base64 payload.
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

/// Response from generateContent.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "inlineData", default)]
    inline_data: Option<InlineData>,
}

/// Structured transcription payload the prompt asks the model for.
#[derive(Debug, Deserialize)]
struct TranscriptPayload {
    lines: Vec<LinePayload>,
}

#[derive(Debug, Deserialize)]
struct LinePayload {
    #[serde(default)]
    content: String,
    #[serde(default)]
    words: Vec<WordSegment>,
}

/// Transcription prompt for lyrical content: verse-oriented line grouping.
const TRANSCRIBE_LYRICAL_PROMPT: &str = r#"Transcribe the attached song with word-level timestamps. Break the lyrics into short lyric lines the way they are sung, one line per musical phrase.

Respond with JSON only, matching exactly this schema:
{"lines": [{"content": "<text of the line>", "words": [{"text": "<one word>", "startTime": <seconds>, "endTime": <seconds>}]}]}

Every word of a line must appear in its words array, in order, with startTime <= endTime. Do not add commentary."#;

/// Transcription prompt for spoken content: sentence-oriented lines.
const TRANSCRIBE_PROSE_PROMPT: &str = r#"Transcribe the attached audio with word-level timestamps. Break the transcript into sentence-length lines.

Respond with JSON only, matching exactly this schema:
{"lines": [{"content": "<text of the line>", "words": [{"text": "<one word>", "startTime": <seconds>, "endTime": <seconds>}]}]}

Every word of a line must appear in its words array, in order, with startTime <= endTime. Do not add commentary."#;

/// Chord-detection prompt; advisory, so the answer stays free-form.
const CHORDS_PROMPT: &str = r#"Listen to the attached song and list the chord progression you hear, section by section, using standard chord names (e.g. Am, F, C, G7). The transcribed lyrics follow for context. If you cannot identify any chords, respond with exactly NONE."#;

fn translate_prompt(target_language: &str) -> String {
    format!(
        "Translate the following transcript into {target_language}. \
         Preserve the line breaks. Respond with the translation only."
    )
}

fn speak_prompt(text: &str, language: &str) -> String {
    format!("Read the following text aloud in {language}, at a natural pace:\n\n{text}")
}

fn slide_art_prompt(slide_text: &str) -> String {
    format!(
        "Generate an atmospheric, softly lit background image for a presentation \
         slide showing these lyrics. No text or lettering in the image.\n\n{slide_text}"
    )
}

impl GeminiClient {
    /// Create a client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model().to_string(),
            tts_model: config.tts_model().to_string(),
            image_model: config.image_model().to_string(),
            client,
        })
    }

    /// POST a generateContent request with retry on transient failures.
    #[instrument(skip(self, request), fields(model = %model))]
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, AiError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, model);

        let mut last_error: Option<AiError> = None;
        let mut retry_delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS);

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                warn!(
                    attempt = attempt,
                    max_retries = MAX_RETRIES,
                    delay_ms = retry_delay.as_millis(),
                    "Retrying request after transient failure"
                );
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let result = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("Content-Type", "application/json")
                .json(request)
                .send()
                .await;

            match result {
                Ok(response) => {
                    if response.status().is_success() {
                        let parsed: GenerateResponse = response.json().await.map_err(|e| {
                            AiError::InvalidResponse(format!("Failed to parse response: {e}"))
                        })?;
                        if attempt > 0 {
                            info!(attempt = attempt, "Request succeeded after retry");
                        }
                        return Ok(parsed);
                    }

                    let status = response.status().as_u16();
                    let message = response.text().await.unwrap_or_default();
                    let error = AiError::ServerError { status, message };

                    // Retry on 5xx server errors
                    if (500..600).contains(&status) && attempt < MAX_RETRIES {
                        warn!(status = status, attempt = attempt, "Server error, will retry");
                        last_error = Some(error);
                        continue;
                    }

                    return Err(error);
                }
                Err(e) => {
                    if is_retryable_error(&e) && attempt < MAX_RETRIES {
                        warn!(error = %e, attempt = attempt, "Network error, will retry");
                        last_error = Some(AiError::Network(e));
                        continue;
                    }
                    return Err(AiError::Network(e));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AiError::InvalidResponse("Unexpected retry loop exit".into())))
    }
}

/// Collect all text parts of the first candidate.
fn extract_text(response: &GenerateResponse) -> Result<String, AiError> {
    let text: String = response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.is_empty() {
        return Err(AiError::InvalidResponse(
            "No text content in response".into(),
        ));
    }
    Ok(text)
}

/// Find the first inline payload whose MIME type matches `mime_prefix` and
/// decode it.
fn extract_inline_data(
    response: &GenerateResponse,
    mime_prefix: &str,
) -> Result<Vec<u8>, AiError> {
    let data = response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.inline_data.as_ref())
        .find(|d| d.mime_type.starts_with(mime_prefix))
        .ok_or_else(|| {
            AiError::InvalidResponse(format!("No {mime_prefix} payload in response"))
        })?;

    base64::engine::general_purpose::STANDARD
        .decode(&data.data)
        .map_err(|e| AiError::InvalidResponse(format!("Invalid base64 payload: {e}")))
}

/// Parse the model's JSON transcript payload into the domain type.
///
/// Some models wrap JSON in a markdown fence despite being asked not to;
/// strip it before parsing. A payload that still does not match the schema
/// is an `InvalidResponse`, not a transport error.
fn parse_transcript(text: &str) -> Result<Transcript, AiError> {
    let trimmed = strip_code_fence(text);
    let payload: TranscriptPayload = serde_json::from_str(trimmed).map_err(|e| {
        AiError::InvalidResponse(format!("Transcript payload does not match schema: {e}"))
    })?;

    let lines = payload
        .lines
        .into_iter()
        .map(|l| LineSegment::new(l.content, l.words))
        .collect();
    Ok(Transcript::from_lines(lines))
}

/// Strip a surrounding ```json ... ``` fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Decode raw little-endian 16-bit PCM bytes into samples.
fn pcm_samples(bytes: &[u8]) -> Result<Vec<i16>, AiError> {
    if bytes.len() % 2 != 0 {
        return Err(AiError::InvalidResponse(format!(
            "PCM payload has odd length {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

#[async_trait]
impl Transcriber for GeminiClient {
    #[instrument(skip(self, audio), fields(audio_bytes = audio.len(), mime_type = %mime_type))]
    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        mode: TranscriptionMode,
    ) -> Result<Transcript, AiError> {
        let prompt = match mode {
            TranscriptionMode::Lyrical => TRANSCRIBE_LYRICAL_PROMPT,
            TranscriptionMode::Prose => TRANSCRIBE_PROSE_PROMPT,
        };
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::text(prompt),
                    RequestPart::inline(mime_type, audio),
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_modalities: None,
            }),
        };

        let response = self.generate(&self.model, &request).await?;
        let transcript = parse_transcript(&extract_text(&response)?)?;
        info!(
            lines = transcript.lines.len(),
            words = transcript.words().count(),
            "Transcription complete"
        );
        Ok(transcript)
    }
}

#[async_trait]
impl ChordDetector for GeminiClient {
    #[instrument(skip(self, audio, transcript_text))]
    async fn detect_chords(
        &self,
        audio: &[u8],
        mime_type: &str,
        transcript_text: &str,
    ) -> Result<Option<String>, AiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::text(format!("{CHORDS_PROMPT}\n\n{transcript_text}")),
                    RequestPart::inline(mime_type, audio),
                ],
            }],
            generation_config: None,
        };

        let response = self.generate(&self.model, &request).await?;
        let text = extract_text(&response)?;
        if text.trim().eq_ignore_ascii_case(NO_CHORDS_SENTINEL) {
            return Ok(None);
        }
        Ok(Some(text.trim().to_string()))
    }
}

#[async_trait]
impl Translator for GeminiClient {
    #[instrument(skip(self, text), fields(text_len = text.len(), target_language = %target_language))]
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart::text(format!(
                    "{}\n\n{text}",
                    translate_prompt(target_language)
                ))],
            }],
            generation_config: None,
        };

        let response = self.generate(&self.model, &request).await?;
        extract_text(&response).map(|t| t.trim().to_string())
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    #[instrument(skip(self, text), fields(text_len = text.len(), language = %language))]
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<i16>, AiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart::text(speak_prompt(text, language))],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_modalities: Some(vec!["AUDIO".to_string()]),
            }),
        };

        let response = self.generate(&self.tts_model, &request).await?;
        let bytes = extract_inline_data(&response, "audio/")?;
        pcm_samples(&bytes)
    }
}

#[async_trait]
impl SlideArtist for GeminiClient {
    #[instrument(skip(self, slide_text), fields(text_len = slide_text.len()))]
    async fn slide_art(&self, slide_text: &str) -> Result<Vec<u8>, AiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart::text(slide_art_prompt(slide_text))],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
            }),
        };

        let response = self.generate(&self.image_model, &request).await?;
        extract_inline_data(&response, "image/")
    }
}

impl Drop for GeminiClient {
    fn drop(&mut self) {
        // Clear API key from memory
        self.api_key.zeroize();
    }
}
