//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 텍스트를 추출합니다.

use std::path::Path;

use super::{DocumentLoader, LoadError};

/// pdf-extract 기반 PDF 로더
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pdf"]
    }

    fn load(&self, path: &Path) -> Result<String, LoadError> {
        let bytes = std::fs::read(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        // 스캔본 PDF는 텍스트 레이어가 없을 수 있음
        if text.trim().is_empty() {
            tracing::warn!(
                "No text extracted from PDF: {:?}. It might be a scanned document.",
                path
            );
        }

        Ok(text)
    }
}

// ============================================================================
// Tests
// ============================================================================
