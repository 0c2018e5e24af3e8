//! resume-rag - 이력서 RAG 시스템
//!
//! 이력서 문서(PDF/DOCX)를 청킹하여 LanceDB 벡터 저장소에 수집하고,
//! 자연어 질의에 대해 검색 증강 생성(RAG)으로 답변합니다.

pub mod chunker;
pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod generation;
pub mod loader;
pub mod rag;
pub mod store;

// Re-exports
pub use chunker::{Chunk, ChunkConfig, Chunker, SlidingWindowChunker};
pub use collector::{CollectedFile, CollectionStats, CollectorConfig, FileCollector, FileType};
pub use config::RagConfig;
pub use embedding::{get_api_key, has_api_key, EmbedTask, EmbeddingProvider, GeminiEmbedding};
pub use generation::{AnswerGenerator, GeminiGenerator, GenerationError};
pub use loader::{DocumentLoader, DocxLoader, LoadError, LoaderRegistry, PdfLoader};
pub use rag::{run_ingest, IngestReport, QueryResult, RagEngine};
pub use store::{LanceVectorStore, SearchResult, StoreMeta, VectorEntry, VectorStore};
