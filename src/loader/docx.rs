//! DOCX 텍스트 추출 모듈
//!
//! docx-rs 크레이트로 문서를 파싱하고, 문단과 표를 순회하며
//! 텍스트를 추출합니다. 서식 정보는 버립니다.

use std::path::Path;

use docx_rs::{
    DocumentChild, Docx, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};

use super::{DocumentLoader, LoadError};

/// docx-rs 기반 DOCX 로더
pub struct DocxLoader;

impl DocumentLoader for DocxLoader {
    fn name(&self) -> &'static str {
        "docx-rs"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["docx"]
    }

    fn load(&self, path: &Path) -> Result<String, LoadError> {
        let bytes = std::fs::read(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let docx = docx_rs::read_docx(&bytes).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: format!("{:?}", e),
        })?;

        let text = document_text(&docx);

        if text.trim().is_empty() {
            tracing::warn!("No text extracted from DOCX: {:?}", path);
        }

        Ok(text)
    }
}

// ============================================================================
// Document Walking
// ============================================================================

/// 문서 본문 전체를 텍스트로 변환
fn document_text(docx: &Docx) -> String {
    let mut out = String::new();

    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => {
                let line = paragraph_text(p);
                if !line.is_empty() {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            DocumentChild::Table(t) => {
                table_text(t, &mut out);
            }
            _ => {}
        }
    }

    out
}

/// 문단 내 모든 런의 텍스트 연결
fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();

    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => out.push_str(&t.text),
                    RunChild::Tab(_) => out.push(' '),
                    RunChild::Break(_) => out.push('\n'),
                    _ => {}
                }
            }
        }
    }

    out
}

/// 표를 행 단위 텍스트로 변환 (셀은 탭으로 구분)
fn table_text(table: &Table, out: &mut String) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;

        let mut cells = Vec::new();
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;

            let mut cell_text = String::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => {
                        let line = paragraph_text(p);
                        if !line.is_empty() {
                            if !cell_text.is_empty() {
                                cell_text.push(' ');
                            }
                            cell_text.push_str(&line);
                        }
                    }
                    _ => {}
                }
            }
            cells.push(cell_text);
        }

        let line = cells.join("\t");
        if !line.trim().is_empty() {
            out.push_str(&line);
            out.push('\n');
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docx_loader_extensions() {
        let loader = DocxLoader;
        assert_eq!(loader.extensions(), &["docx"]);
        assert_eq!(loader.name(), "docx-rs");
    }

    #[test]
    fn test_docx_loader_missing_file() {
        let loader = DocxLoader;
        let err = loader
            .load(Path::new("/nonexistent/file.docx"))
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_docx_loader_corrupt_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let loader = DocxLoader;
        let err = loader.load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn test_document_text_roundtrip() {
        // docx-rs 빌더로 만든 문서를 다시 읽어 텍스트를 확인
        let mut buf = Vec::new();
        docx_rs::Docx::new()
            .add_paragraph(
                docx_rs::Paragraph::new()
                    .add_run(docx_rs::Run::new().add_text("Software Engineer")),
            )
            .add_paragraph(
                docx_rs::Paragraph::new()
                    .add_run(docx_rs::Run::new().add_text("5 years Python experience")),
            )
            .build()
            .pack(&mut std::io::Cursor::new(&mut buf))
            .unwrap();

        let docx = docx_rs::read_docx(&buf).unwrap();
        let text = document_text(&docx);

        assert!(text.contains("Software Engineer"));
        assert!(text.contains("5 years Python experience"));
    }
}
