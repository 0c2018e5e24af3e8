//! RAG 모듈 - 수집/검색 파이프라인
//!
//! - ingest: 폴더 순회 -> 로드 -> 청킹 -> 임베딩 -> 영속화
//! - query: 쿼리 임베딩 -> 벡터 검색 -> 답변 생성

mod ingest;
mod query;

// Re-exports
pub use ingest::{chunk_document, relative_source, run_ingest, IngestReport, PendingChunk};
pub use query::{validate_query, QueryResult, RagEngine};
