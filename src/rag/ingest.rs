//! 수집 파이프라인
//!
//! 이력서 폴더 순회 -> 문서 로드 -> 청킹 -> 임베딩 -> 벡터 저장소 영속화.
//!
//! 파일 단위 로드 실패는 기록하고 건너뜁니다. 임베딩 실패는 수집 전체를
//! 중단하며, 저장소 삽입은 모든 임베딩이 끝난 뒤 한 번만 수행하므로
//! 반쯤 만들어진 저장소는 남지 않습니다.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chunker::{Chunker, SlidingWindowChunker};
use crate::collector::{CollectionStats, FileCollector};
use crate::config::RagConfig;
use crate::embedding::{EmbedTask, EmbeddingProvider, GeminiEmbedding};
use crate::loader::LoaderRegistry;
use crate::store::{LanceVectorStore, StoreMeta, VectorEntry, VectorStore};

// ============================================================================
// Types
// ============================================================================

/// 임베딩 전의 청크 (소스 경로가 스탬프된 상태)
#[derive(Debug, Clone)]
pub struct PendingChunk {
    /// 수집 루트 기준 상대 경로
    pub source: String,
    /// 파일 내 청크 인덱스 (0-based)
    pub chunk_index: i32,
    /// 원본 텍스트 내 시작 오프셋 (문자 수)
    pub start_offset: i64,
    /// 청크 텍스트
    pub text: String,
}

/// 수집 결과 보고
#[derive(Debug, Default)]
pub struct IngestReport {
    /// 발견된 파일 수
    pub files_total: usize,
    /// 로드에 성공한 파일 수
    pub files_loaded: usize,
    /// 로드에 실패한 파일 수 (건너뜀)
    pub files_failed: usize,
    /// 저장된 청크 수
    pub chunks: usize,
}

// ============================================================================
// Pipeline
// ============================================================================

/// 수집 파이프라인 실행
///
/// `append`가 false이면 기존 저장소 디렉토리를 제거하고 새로 만듭니다.
pub async fn run_ingest(config: &RagConfig, append: bool) -> Result<IngestReport> {
    let collector = FileCollector::with_defaults();
    let registry = Arc::new(LoaderRegistry::with_defaults());
    let chunker = SlidingWindowChunker::new(config.chunk.clone());

    // 1. 파일 수집
    let files = collector
        .collect_directory(&config.source_dir)
        .context("Failed to collect source directory")?;

    if files.is_empty() {
        anyhow::bail!(
            "수집할 파일이 없습니다: {:?} (지원 형식: .pdf, .docx)",
            config.source_dir
        );
    }

    let stats = CollectionStats::from_files(&files);
    println!("[*] 수집 대상: {} 파일", stats.total_files);
    println!("    PDF: {}, DOCX: {}", stats.pdf_files, stats.docx_files);
    println!();

    // 2. 파일별 로드 + 청킹
    let mut report = IngestReport {
        files_total: files.len(),
        ..Default::default()
    };
    let mut pending: Vec<PendingChunk> = Vec::new();

    for (i, file) in files.iter().enumerate() {
        let source = relative_source(&config.source_dir, &file.path);

        print!(
            "[{}/{}] [{}] {}... ",
            i + 1,
            files.len(),
            file.file_type.label(),
            source
        );

        // 로더는 CPU 바운드이므로 spawn_blocking 사용
        let path = file.path.clone();
        let registry_ref = Arc::clone(&registry);
        let loaded = tokio::task::spawn_blocking(move || registry_ref.load(&path))
            .await
            .context("Loader task failed")?;

        let text = match loaded {
            Ok(t) => t,
            Err(e) => {
                // 손상된 파일 하나가 나머지 수집을 막지 않는다
                println!("실패: {}", e);
                tracing::warn!("Skipping {:?}: {}", file.path, e);
                report.files_failed += 1;
                continue;
            }
        };

        let chunks = chunk_document(&chunker, &source, &text);
        println!("{} 청크", chunks.len());

        pending.extend(chunks);
        report.files_loaded += 1;
    }

    // 3. 빈 수집은 명시적 에러 (망가진 저장소를 만들지 않음)
    if pending.is_empty() {
        anyhow::bail!(
            "생성된 청크가 없습니다. 모든 파일이 비어 있거나 로드에 실패했습니다 \
             (성공 {}, 실패 {})",
            report.files_loaded,
            report.files_failed
        );
    }

    // 4. 기존 저장소와의 모델 일치 확인 (append 모드, 임베딩 비용 전에 실패)
    if append {
        if let Some(meta) = StoreMeta::read(&config.store_dir)? {
            meta.ensure_model(&config.embed_model, config.embed_dimension)?;
        }
    }

    // 5. 임베딩 (전부 성공해야 저장 단계로 진행)
    println!();
    println!("[*] 임베딩 생성 중: {} 청크...", pending.len());

    let embedder = GeminiEmbedding::from_env(&config.embed_model, config.embed_dimension)?;
    let texts: Vec<String> = pending.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder
        .embed_batch(&texts, EmbedTask::Document)
        .await
        .context("Failed to embed chunks")?;

    let entries: Vec<VectorEntry> = pending
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| VectorEntry {
            source: chunk.source,
            chunk_index: chunk.chunk_index,
            start_offset: chunk.start_offset,
            chunk_text: chunk.text,
            embedding,
        })
        .collect();

    // 6. 단일 배치로 영속화
    // 기존 저장소 제거는 임베딩이 전부 준비된 뒤에만 수행
    if !append && config.store_dir.exists() {
        tracing::info!("Removing existing store at {:?}", config.store_dir);
        std::fs::remove_dir_all(&config.store_dir)
            .context("Failed to remove existing store directory")?;
    }

    let store = LanceVectorStore::open(&config.store_dir, config.embed_dimension as i32)
        .await
        .context("Failed to open vector store")?;

    let inserted = store
        .insert_batch(&entries)
        .await
        .context("Failed to insert vectors")?;

    StoreMeta {
        embed_model: config.embed_model.clone(),
        dimension: config.embed_dimension,
        chunk_size: config.chunk.chunk_size,
        chunk_overlap: config.chunk.chunk_overlap,
    }
    .write(&config.store_dir)?;

    report.chunks = inserted;

    tracing::info!(
        "Ingested {} chunks from {} files into {:?}",
        inserted,
        report.files_loaded,
        config.store_dir
    );

    Ok(report)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 문서 하나를 청크로 분할하고 소스 경로를 스탬프
pub fn chunk_document(chunker: &dyn Chunker, source: &str, text: &str) -> Vec<PendingChunk> {
    chunker
        .chunk(text)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| PendingChunk {
            source: source.to_string(),
            chunk_index: i as i32,
            start_offset: chunk.start_offset as i64,
            text: chunk.text,
        })
        .collect()
}

/// 수집 루트 기준 상대 경로 계산
///
/// 루트 밖의 경로(발생하지 않아야 함)는 파일명으로 대체합니다.
/// 구분자는 플랫폼과 무관하게 `/`로 통일합니다.
pub fn relative_source(root: &Path, path: &Path) -> String {
    let root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(root))
            .unwrap_or_else(|_| root.to_path_buf())
    };

    let relative = path
        .strip_prefix(&root)
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| {
            path.file_name()
                .map(|n| n.into())
                .unwrap_or_else(|| path.to_path_buf())
        });

    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Tests
// ============================================================================
