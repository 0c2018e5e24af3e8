//! 답변 생성 모듈 - Gemini generateContent API
//!
//! 검색된 이력서 청크를 문맥으로 전달하여 근거 있는 답변을 생성합니다.
//! 생성 호출이 실패하면 쿼리 전체가 실패합니다 (부분 답변 없음).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::SearchResult;

/// Gemini API 베이스 URL
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// 기본 생성 모델
pub const DEFAULT_ANSWER_MODEL: &str = "gemini-2.0-flash";

/// 생성 호출 최대 재시도 횟수 (429/5xx)
const MAX_RETRIES: u32 = 3;

/// HTTP 타임아웃
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Errors
// ============================================================================

/// 답변 생성 실패
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Model returned empty content")]
    EmptyContent,

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

// ============================================================================
// AnswerGenerator Trait
// ============================================================================

/// 답변 생성기 트레이트
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// 질문과 검색된 문맥으로 답변 생성
    async fn generate(
        &self,
        question: &str,
        contexts: &[SearchResult],
    ) -> Result<String, GenerationError>;

    /// 모델 이름
    fn model_name(&self) -> &str;
}

// ============================================================================
// Gemini Generator
// ============================================================================

/// Gemini generateContent 기반 답변 생성기
pub struct GeminiGenerator {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl GeminiGenerator {
    /// 새 생성기 생성
    pub fn new(api_key: String, model: &str) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;

        Ok(Self {
            api_key,
            client,
            model: model.to_string(),
        })
    }

    /// 환경변수에서 API 키를 읽어 생성
    pub fn from_env(model: &str) -> anyhow::Result<Self> {
        let api_key = crate::embedding::get_api_key()?;
        Ok(Self::new(api_key, model)?)
    }

    /// generateContent 엔드포인트 URL
    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            GEMINI_API_BASE, self.model
        )
    }

    /// 단일 요청 수행 (재시도 판단은 호출부)
    async fn call_once(&self, request: &GenerateRequest) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // 에러 메시지 파싱 시도
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyContent);
        }

        Ok(text)
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn generate(
        &self,
        question: &str,
        contexts: &[SearchResult],
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(question, contexts);

        let request = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 2048,
            },
        };

        let mut last_error: Option<GenerationError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 지수 백오프: 1s, 2s, 4s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                tracing::warn!(
                    "Generation attempt {} failed, retrying after {}ms",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.call_once(&request).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    let retryable = match &e {
                        GenerationError::Http(_) => true,
                        GenerationError::Api { status, .. } => *status == 429 || *status >= 500,
                        _ => false,
                    };

                    if !retryable {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(GenerationError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Prompt
// ============================================================================

/// RAG 답변 프롬프트
const ANSWER_PROMPT: &str = r#"당신은 이력서 데이터베이스를 검색하는 도우미입니다.
아래 제공된 이력서 발췌문만을 근거로 질문에 답변하세요.

규칙:
1. 발췌문에 없는 내용은 추측하지 않습니다
2. 답변에 근거가 된 파일 경로를 함께 언급합니다
3. 관련 정보가 없으면 "관련 정보를 찾을 수 없습니다"라고 답변합니다"#;

/// 질문 + 검색 문맥을 프롬프트로 조합
fn build_prompt(question: &str, contexts: &[SearchResult]) -> String {
    let mut prompt = String::from(ANSWER_PROMPT);
    prompt.push_str("\n\n이력서 발췌문:\n");

    for (i, ctx) in contexts.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[{}] (파일: {})\n{}\n",
            i + 1,
            ctx.source,
            ctx.chunk_text
        ));
    }

    prompt.push_str(&format!("\n질문: {}", question));
    prompt
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GenerateContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerateContent {
    parts: Vec<GeneratePart>,
}

#[derive(Debug, Serialize)]
struct GeneratePart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context(source: &str, text: &str) -> SearchResult {
        SearchResult {
            source: source.to_string(),
            chunk_index: 0,
            start_offset: 0,
            chunk_text: text.to_string(),
            similarity: 0.9,
        }
    }

    #[test]
    fn test_build_prompt_contains_contexts_and_question() {
        let contexts = vec![
            sample_context("kim.pdf", "Python 백엔드 5년 경력"),
            sample_context("lee.docx", "React 프론트엔드 3년 경력"),
        ];

        let prompt = build_prompt("백엔드 개발자를 찾아줘", &contexts);

        assert!(prompt.contains("kim.pdf"));
        assert!(prompt.contains("lee.docx"));
        assert!(prompt.contains("Python 백엔드 5년 경력"));
        assert!(prompt.contains("질문: 백엔드 개발자를 찾아줘"));
        assert!(prompt.contains("[1]"));
        assert!(prompt.contains("[2]"));
    }

    #[test]
    fn test_build_prompt_empty_contexts() {
        let prompt = build_prompt("아무 질문", &[]);
        assert!(prompt.contains("질문: 아무 질문"));
    }

    #[test]
    fn test_endpoint_url() {
        let generator = GeminiGenerator::new("fake_key".to_string(), DEFAULT_ANSWER_MODEL).unwrap();
        assert_eq!(
            generator.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(generator.model_name(), "gemini-2.0-flash");
    }

    #[test]
    fn test_generate_response_parsing() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "김철수 (kim.pdf)가 적합합니다."}]}}
            ]
        }"#;

        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(
            parsed.candidates[0].content.parts[0].text,
            "김철수 (kim.pdf)가 적합합니다."
        );
    }
}
