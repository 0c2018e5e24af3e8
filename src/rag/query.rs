//! 검색 파이프라인 (RAG 쿼리 엔진)
//!
//! 쿼리 임베딩 -> 벡터 검색 -> 생성 모델 호출 순서로 진행하며,
//! 답변과 함께 근거가 된 청크 목록을 반환합니다.

use anyhow::{Context, Result};

use crate::config::RagConfig;
use crate::embedding::{EmbedTask, EmbeddingProvider, GeminiEmbedding};
use crate::generation::{AnswerGenerator, GeminiGenerator};
use crate::store::{LanceVectorStore, SearchResult, StoreMeta, VectorStore};

/// 검색 결과가 없을 때의 고정 답변 (생성 모델 호출 없음)
const NO_MATCH_ANSWER: &str = "관련된 이력서를 찾을 수 없습니다.";

// ============================================================================
// Types
// ============================================================================

/// 쿼리 결과
///
/// `sources`는 유사도 내림차순이며, 답변 생성에 사용된 문맥 그대로입니다.
#[derive(Debug)]
pub struct QueryResult {
    /// 생성된 답변
    pub answer: String,
    /// 근거 청크 (유사도 순)
    pub sources: Vec<SearchResult>,
}

// ============================================================================
// RagEngine
// ============================================================================

/// RAG 쿼리 엔진
///
/// 열려 있는 동안 저장소는 읽기 전용으로만 사용합니다.
pub struct RagEngine {
    store: LanceVectorStore,
    embedder: GeminiEmbedding,
    generator: GeminiGenerator,
    top_k: usize,
}

impl RagEngine {
    /// 기존 저장소를 열어 엔진 생성
    ///
    /// 저장소가 없거나 비어 있으면 에러입니다 (먼저 ingest 실행 필요).
    pub async fn open(config: &RagConfig) -> Result<Self> {
        if !config.store_dir.exists() {
            anyhow::bail!(
                "벡터 저장소를 찾을 수 없습니다: {:?}\n\
                 먼저 `resume-rag ingest`를 실행하세요.",
                config.store_dir
            );
        }

        // 수집 시점의 임베딩 모델과 일치하는지 확인
        if let Some(meta) = StoreMeta::read(&config.store_dir)? {
            meta.ensure_model(&config.embed_model, config.embed_dimension)?;
        }

        let store = LanceVectorStore::open(&config.store_dir, config.embed_dimension as i32)
            .await
            .context("Failed to open vector store")?;

        let count = store.count().await.context("Failed to count vectors")?;
        if count == 0 {
            anyhow::bail!(
                "벡터 저장소가 비어 있습니다: {:?}\n\
                 먼저 `resume-rag ingest`를 실행하세요.",
                config.store_dir
            );
        }

        tracing::debug!("Opened vector store with {} records", count);

        let embedder = GeminiEmbedding::from_env(&config.embed_model, config.embed_dimension)?;
        let generator = GeminiGenerator::from_env(&config.answer_model)?;

        Ok(Self {
            store,
            embedder,
            generator,
            top_k: config.top_k,
        })
    }

    /// 질의 실행
    ///
    /// 빈 쿼리는 저장소/네트워크 접근 전에 거부됩니다.
    pub async fn answer(&self, query: &str) -> Result<QueryResult> {
        let query = validate_query(query)?;

        let query_embedding = self
            .embedder
            .embed(query, EmbedTask::Query)
            .await
            .context("Failed to embed query")?;

        let sources = self
            .store
            .search(&query_embedding, self.top_k)
            .await
            .context("Failed to search vector store")?;

        if sources.is_empty() {
            return Ok(QueryResult {
                answer: NO_MATCH_ANSWER.to_string(),
                sources,
            });
        }

        let answer = self
            .generator
            .generate(query, &sources)
            .await
            .context("Failed to generate answer")?;

        Ok(QueryResult { answer, sources })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 쿼리 검증 (공백 제거 후 비어 있으면 에러)
pub fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        anyhow::bail!("검색어가 비어 있습니다");
    }
    Ok(trimmed)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("백엔드 개발자").unwrap(), "백엔드 개발자");
        assert_eq!(validate_query("  trimmed  ").unwrap(), "trimmed");

        assert!(validate_query("").is_err());
        assert!(validate_query("   ").is_err());
        assert!(validate_query("\t\n").is_err());
    }

    #[tokio::test]
    async fn test_open_missing_store_fails() {
        let config = RagConfig {
            store_dir: std::path::PathBuf::from("/nonexistent/store/dir"),
            ..Default::default()
        };

        let result = RagEngine::open(&config).await;
        assert!(result.is_err());

        let message = format!("{:#}", result.err().unwrap());
        assert!(message.contains("ingest"));
    }

    #[tokio::test]
    async fn test_open_empty_store_fails() {
        // 디렉토리는 있지만 테이블이 없는 경우
        let dir = tempfile::TempDir::new().unwrap();

        let config = RagConfig {
            store_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        // API 키 없이도 저장소 검사가 먼저 실패해야 함
        let result = RagEngine::open(&config).await;
        assert!(result.is_err());
    }
}
