//! 스토어 메타데이터
//!
//! 수집에 사용된 임베딩 모델과 청킹 설정을 저장소 디렉토리에 기록합니다.
//! 검색 시 모델이 다르면 조용한 품질 저하 대신 즉시 에러를 냅니다.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 메타데이터 파일 이름 (저장소 디렉토리 내)
pub const META_FILE: &str = "meta.json";

/// 저장소 메타데이터
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreMeta {
    /// 수집에 사용된 임베딩 모델
    pub embed_model: String,
    /// 임베딩 차원
    pub dimension: usize,
    /// 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 청크 오버랩 (문자 수)
    pub chunk_overlap: usize,
}

impl StoreMeta {
    /// 저장소 디렉토리에 기록
    pub fn write(&self, store_dir: &Path) -> Result<()> {
        let path = store_dir.join(META_FILE);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize store meta")?;

        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write store meta: {:?}", path))?;

        tracing::debug!("Wrote store meta to {:?}", path);
        Ok(())
    }

    /// 저장소 디렉토리에서 읽기
    ///
    /// 파일이 없으면 None (구버전 저장소와의 호환).
    pub fn read(store_dir: &Path) -> Result<Option<Self>> {
        let path = store_dir.join(META_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read store meta: {:?}", path))?;
        let meta = serde_json::from_str(&json).context("Failed to parse store meta")?;

        Ok(Some(meta))
    }

    /// 임베딩 모델 일치 검증
    pub fn ensure_model(&self, model: &str, dimension: usize) -> Result<()> {
        if self.embed_model != model {
            anyhow::bail!(
                "Embedding model mismatch: store was built with '{}', but '{}' was requested. \
                 Re-run ingest or use the original model.",
                self.embed_model,
                model
            );
        }

        if self.dimension != dimension {
            anyhow::bail!(
                "Embedding dimension mismatch: store was built with {}, but {} was requested",
                self.dimension,
                dimension
            );
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_meta() -> StoreMeta {
        StoreMeta {
            embed_model: "gemini-embedding-001".to_string(),
            dimension: 768,
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }

    #[test]
    fn test_meta_write_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let meta = sample_meta();

        meta.write(dir.path()).unwrap();

        let loaded = StoreMeta::read(dir.path()).unwrap();
        assert_eq!(loaded, Some(meta));
    }

    #[test]
    fn test_meta_read_missing() {
        let dir = TempDir::new().unwrap();
        let loaded = StoreMeta::read(dir.path()).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_meta_ensure_model() {
        let meta = sample_meta();

        assert!(meta.ensure_model("gemini-embedding-001", 768).is_ok());
        assert!(meta.ensure_model("text-embedding-004", 768).is_err());
        assert!(meta.ensure_model("gemini-embedding-001", 1536).is_err());
    }
}
