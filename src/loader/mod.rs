//! 문서 로더 모듈
//!
//! 확장자별 로더를 레지스트리에 등록하고, 파일 경로에 맞는 로더로
//! 디스패치하여 원문 텍스트를 추출합니다.
//!
//! 모든 로더 실패는 `LoadError`로 회수됩니다. 손상된 파일 하나가
//! 전체 수집을 중단시키지 않도록, 호출 측은 파일 단위로 에러를
//! 기록하고 계속 진행합니다.

pub mod docx;
pub mod pdf;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use docx::DocxLoader;
pub use pdf::PdfLoader;

// ============================================================================
// LoadError
// ============================================================================

/// 문서 로드 실패
#[derive(Debug, Error)]
pub enum LoadError {
    /// 파일 읽기 실패
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 문서 파싱 실패 (손상되었거나 지원하지 않는 내부 형식)
    #[error("Failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    /// 등록된 로더가 없는 확장자
    #[error("No loader registered for {path:?}")]
    UnsupportedExtension { path: PathBuf },
}

// ============================================================================
// DocumentLoader Trait
// ============================================================================

/// 문서 로더 트레이트
///
/// 파일 경로를 받아 원문 텍스트를 추출합니다. 로더는 동기이며,
/// CPU 바운드 작업이므로 호출 측에서 spawn_blocking으로 감쌉니다.
pub trait DocumentLoader: Send + Sync {
    /// 로더 이름
    fn name(&self) -> &'static str;

    /// 처리 가능한 확장자 목록 (소문자)
    fn extensions(&self) -> &'static [&'static str];

    /// 파일에서 텍스트 추출
    fn load(&self, path: &Path) -> Result<String, LoadError>;
}

// ============================================================================
// LoaderRegistry
// ============================================================================

/// 확장자 -> 로더 레지스트리
///
/// 새 파일 형식은 로더를 등록하는 것만으로 추가됩니다.
/// 순회 로직은 수정하지 않습니다.
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    /// 빈 레지스트리 생성
    pub fn new() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// 기본 로더(PDF, DOCX)가 등록된 레지스트리 생성
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PdfLoader));
        registry.register(Box::new(DocxLoader));
        registry
    }

    /// 로더 등록
    pub fn register(&mut self, loader: Box<dyn DocumentLoader>) {
        self.loaders.push(loader);
    }

    /// 경로에 맞는 로더 조회
    pub fn for_path(&self, path: &Path) -> Option<&dyn DocumentLoader> {
        let ext = path.extension()?.to_str()?.to_lowercase();

        self.loaders
            .iter()
            .find(|l| l.extensions().contains(&ext.as_str()))
            .map(|l| l.as_ref())
    }

    /// 경로를 처리할 수 있는지 확인
    pub fn supports(&self, path: &Path) -> bool {
        self.for_path(path).is_some()
    }

    /// 경로에 맞는 로더로 텍스트 추출
    pub fn load(&self, path: &Path) -> Result<String, LoadError> {
        let loader = self
            .for_path(path)
            .ok_or_else(|| LoadError::UnsupportedExtension {
                path: path.to_path_buf(),
            })?;

        tracing::debug!("Loading {:?} with {}", path, loader.name());
        loader.load(path)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_dispatch() {
        let registry = LoaderRegistry::with_defaults();

        let loader = registry.for_path(Path::new("a/b/resume.pdf"));
        assert_eq!(loader.map(|l| l.name()), Some("pdf-extract"));

        let loader = registry.for_path(Path::new("a/b/resume.DOCX"));
        assert_eq!(loader.map(|l| l.name()), Some("docx-rs"));
    }

    #[test]
    fn test_registry_unsupported() {
        let registry = LoaderRegistry::with_defaults();

        assert!(registry.for_path(Path::new("notes.txt")).is_none());
        assert!(registry.for_path(Path::new("no_extension")).is_none());
        assert!(!registry.supports(Path::new("image.png")));

        let err = registry.load(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedExtension { .. }));
    }

    #[test]
    fn test_registry_missing_file_is_io_error() {
        let registry = LoaderRegistry::with_defaults();

        let err = registry
            .load(Path::new("/nonexistent/resume.pdf"))
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_registry_corrupt_file_is_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"this is not a docx file").unwrap();

        let registry = LoaderRegistry::with_defaults();
        let err = registry.load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn test_empty_registry() {
        let registry = LoaderRegistry::new();
        assert!(!registry.supports(Path::new("resume.pdf")));
    }
}
