//! CLI 모듈
//!
//! resume-rag CLI 명령어 정의 및 구현

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::chunker::ChunkConfig;
use crate::config::{RagConfig, DEFAULT_SOURCE_DIR, DEFAULT_STORE_DIR, DEFAULT_TOP_K};
use crate::embedding::has_api_key;
use crate::rag::{run_ingest, QueryResult, RagEngine};
use crate::store::{LanceVectorStore, StoreMeta, VectorStore};

/// 소스 발췌문 표시 최대 길이 (표시용 자르기, 저장된 청크는 그대로)
const EXCERPT_MAX_CHARS: usize = 1000;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "resume-rag")]
#[command(version, about = "이력서 RAG 시스템", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 이력서 폴더를 수집하여 벡터 저장소 구축
    Ingest {
        /// 이력서 폴더 경로
        #[arg(short, long, default_value = DEFAULT_SOURCE_DIR)]
        dir: PathBuf,

        /// 벡터 저장소 디렉토리
        #[arg(long, default_value = DEFAULT_STORE_DIR)]
        db: PathBuf,

        /// 청크 크기 (문자 수)
        #[arg(long, default_value_t = 1000)]
        chunk_size: usize,

        /// 청크 오버랩 (문자 수)
        #[arg(long, default_value_t = 200)]
        chunk_overlap: usize,

        /// 기존 저장소를 지우지 않고 추가
        #[arg(long)]
        append: bool,
    },

    /// 저장소에 질의하고 답변 생성 (인자가 없으면 대화형)
    Ask {
        /// 검색 쿼리 (예: 채용 공고 요약)
        query: Option<String>,

        /// 벡터 저장소 디렉토리
        #[arg(long, default_value = DEFAULT_STORE_DIR)]
        db: PathBuf,

        /// 검색 결과 개수
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        k: usize,
    },

    /// 상태 확인
    Status {
        /// 벡터 저장소 디렉토리
        #[arg(long, default_value = DEFAULT_STORE_DIR)]
        db: PathBuf,
    },
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ingest {
            dir,
            db,
            chunk_size,
            chunk_overlap,
            append,
        } => cmd_ingest(dir, db, chunk_size, chunk_overlap, append).await,
        Commands::Ask { query, db, k } => cmd_ask(query, db, k).await,
        Commands::Status { db } => cmd_status(db).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 수집 명령어 (ingest)
///
/// 이력서 폴더를 순회하며 PDF/DOCX를 청킹하고 벡터 저장소에 저장합니다.
async fn cmd_ingest(
    dir: PathBuf,
    db: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
    append: bool,
) -> Result<()> {
    // API 키 확인
    if !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export GEMINI_API_KEY=your-api-key\n  \
             또는\n  \
             export GOOGLE_AI_API_KEY=your-api-key\n\n\
             API 키 발급: https://aistudio.google.com/app/apikey"
        );
    }

    let config = RagConfig {
        source_dir: dir,
        store_dir: db,
        chunk: ChunkConfig::new(chunk_size, chunk_overlap)
            .context("Invalid chunk configuration")?,
        ..Default::default()
    };

    let report = run_ingest(&config, append).await?;

    println!();
    println!(
        "[OK] 수집 완료: 파일 {} (성공 {}, 실패 {}), 청크 {}",
        report.files_total, report.files_loaded, report.files_failed, report.chunks
    );
    println!("     저장소: {}", config.store_dir.display());

    Ok(())
}

/// 질의 명령어 (ask)
///
/// 쿼리가 주어지면 한 번 실행하고, 없으면 대화형 루프로 진입합니다.
async fn cmd_ask(query: Option<String>, db: PathBuf, k: usize) -> Result<()> {
    if !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\
             설정: export GEMINI_API_KEY=your-key"
        );
    }

    let config = RagConfig {
        store_dir: db,
        top_k: k,
        ..Default::default()
    };

    let engine = RagEngine::open(&config).await?;

    if let Some(ref query) = query {
        // 단일 질의
        if query.trim().is_empty() {
            bail!("검색어가 비어 있습니다");
        }

        println!("[*] 검색 중: \"{}\"", query.trim());
        let result = engine.answer(query).await?;
        print_result(&result);
        return Ok(());
    }

    // 대화형 루프
    println!("[*] 대화형 모드입니다. 채용 공고나 질문을 입력하세요.");
    println!("    종료: quit 또는 exit");
    println!();

    let stdin = io::stdin();
    loop {
        print!("질문> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();

        // 빈 입력은 질의하지 않음
        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "exit" {
            break;
        }

        println!("[*] 검색 중: \"{}\"", input);
        match engine.answer(input).await {
            Ok(result) => print_result(&result),
            Err(e) => {
                // 실패를 표시하고 루프는 계속
                println!("[!] 검색 실패: {:#}", e);
            }
        }
    }

    Ok(())
}

/// 상태 명령어 (status)
///
/// 시스템 상태를 확인합니다.
async fn cmd_status(db: PathBuf) -> Result<()> {
    println!("resume-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // API 키 상태
    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export GEMINI_API_KEY=your-key");
    }

    // 저장소 상태
    println!("[*] 저장소: {}", db.display());

    if !db.exists() {
        println!("[!] 저장소가 없습니다. `resume-rag ingest`를 먼저 실행하세요.");
        return Ok(());
    }

    match StoreMeta::read(&db) {
        Ok(Some(meta)) => {
            println!(
                "[OK] 임베딩 모델: {} ({}차원)",
                meta.embed_model, meta.dimension
            );
            println!(
                "     청킹: {}자 / 오버랩 {}자",
                meta.chunk_size, meta.chunk_overlap
            );

            match LanceVectorStore::open(&db, meta.dimension as i32).await {
                Ok(store) => match store.count().await {
                    Ok(count) => println!("[OK] 벡터 인덱스: {} 청크", count),
                    Err(e) => println!("[!] 벡터 개수 조회 실패: {}", e),
                },
                Err(e) => println!("[!] 저장소 열기 실패: {}", e),
            }
        }
        Ok(None) => {
            println!("[!] 메타데이터가 없습니다 (손상되었거나 수집이 완료되지 않은 저장소)");
        }
        Err(e) => {
            println!("[!] 메타데이터 읽기 실패: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 질의 결과 출력
fn print_result(result: &QueryResult) {
    println!();
    println!("[답변]");
    println!("{}", result.answer);
    println!();
    println!("[참고 문서] ({} 건)", result.sources.len());

    for (i, source) in result.sources.iter().enumerate() {
        println!(
            "{}. {} (청크 {}, 오프셋 {}, 유사도 {:.4})",
            i + 1,
            source.source,
            source.chunk_index,
            source.start_offset,
            source.similarity
        );
        println!("   {}", truncate_text(&source.chunk_text, EXCERPT_MAX_CHARS));
        println!();
    }
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_truncate_unicode() {
        let korean = "안녕하세요 세계";
        let truncated = truncate_text(korean, 5);
        assert_eq!(truncated, "안녕하세요...");
    }

    #[test]
    fn test_truncate_excerpt_cap() {
        let long = "x".repeat(1500);
        let truncated = truncate_text(&long, EXCERPT_MAX_CHARS);
        assert_eq!(truncated.chars().count(), EXCERPT_MAX_CHARS + 3);
    }
}
