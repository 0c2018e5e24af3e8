//! Store 모듈 - 영속 벡터 저장소
//!
//! - LanceDB: 디렉토리 기반 벡터 저장 + ANN 검색
//! - Meta: 수집 시점의 임베딩 모델/청킹 설정 기록

mod lance;
mod meta;
mod vector;

// Re-exports
pub use lance::LanceVectorStore;
pub use meta::{StoreMeta, META_FILE};
pub use vector::{SearchResult, VectorEntry, VectorStore};
