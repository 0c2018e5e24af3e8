//! Vector Store - 벡터 저장소 트레이트 및 타입
//!
//! 청크 + 임베딩 레코드의 저장과 최근접 이웃 검색 인터페이스입니다.

use anyhow::Result;
use async_trait::async_trait;

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
///
/// 불변식: `source`는 수집 루트 기준 상대 경로이며 비어 있으면 안 됩니다.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 원본 파일의 상대 경로
    pub source: String,
    /// 파일 내 청크 인덱스 (0-based)
    pub chunk_index: i32,
    /// 원본 텍스트 내 시작 오프셋 (문자 수)
    pub start_offset: i64,
    /// 청크 텍스트
    pub chunk_text: String,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// 원본 파일의 상대 경로
    pub source: String,
    /// 파일 내 청크 인덱스
    pub chunk_index: i32,
    /// 원본 텍스트 내 시작 오프셋 (문자 수)
    pub start_offset: i64,
    /// 청크 텍스트
    pub chunk_text: String,
    /// 유사도 스코어 (0.0 ~ 1.0)
    pub similarity: f32,
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// VectorStore 트레이트 (async)
///
/// 벡터 저장소의 공통 인터페이스입니다.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 벡터 배치 삽입
    async fn insert_batch(&self, entries: &[VectorEntry]) -> Result<usize>;

    /// 벡터 검색 (유사도 내림차순)
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// 벡터 개수 조회
    async fn count(&self) -> Result<usize>;
}
