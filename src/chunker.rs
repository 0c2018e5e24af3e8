//! Text Chunking Module
//!
//! 문서 텍스트를 고정 크기의 오버랩 청크로 분할합니다.
//! 길이는 문자(char) 단위로 측정하며, 각 청크는 원본 텍스트 내의
//! 시작 오프셋(문자 단위)을 함께 기록합니다.

use anyhow::Result;

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 인접 청크 간 오버랩 (문자 수)
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkConfig {
    /// 검증된 설정 생성
    ///
    /// 오버랩은 청크 크기보다 작아야 합니다 (같으면 stride가 0이 됨).
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than 0");
        }
        if chunk_overlap >= chunk_size {
            anyhow::bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// 청크 간 전진 폭 (stride)
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

// ============================================================================
// Types
// ============================================================================

/// 분할된 청크
///
/// `start_offset`은 원본 문서 내 시작 위치 (문자 단위, 0-based)입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// 청크 텍스트
    pub text: String,
    /// 원본 텍스트 내 시작 오프셋 (문자 수)
    pub start_offset: usize,
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<Chunk>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// SlidingWindowChunker
// ============================================================================

/// 고정 크기 슬라이딩 윈도우 청커
///
/// 텍스트 길이 L, 청크 크기 S, 오버랩 O에 대해:
/// - L <= S 이면 청크 1개 (오프셋 0)
/// - 그 외에는 오프셋 0, S-O, 2(S-O), ... 에서 시작하는
///   ceil((L - O) / (S - O)) 개의 청크
///
/// 마지막 청크만 S보다 짧을 수 있습니다.
pub struct SlidingWindowChunker {
    config: ChunkConfig,
}

impl SlidingWindowChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// 기본 설정 (1000자 / 200자 오버랩)으로 생성
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }
}

impl Chunker for SlidingWindowChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return vec![];
        }

        // 문자 인덱스 -> 바이트 오프셋 테이블 (UTF-8 경계 보장)
        let mut boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        boundaries.push(text.len());
        let char_count = boundaries.len() - 1;

        let size = self.config.chunk_size;
        if char_count <= size {
            return vec![Chunk {
                text: text.to_string(),
                start_offset: 0,
            }];
        }

        let stride = self.config.stride();
        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let end = (start + size).min(char_count);
            chunks.push(Chunk {
                text: text[boundaries[start]..boundaries[end]].to_string(),
                start_offset: start,
            });

            if end == char_count {
                break;
            }
            start += stride;
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "SlidingWindowChunker"
    }
}

// ============================================================================
// Tests
// ============================================================================
