//! LanceDB Vector Store - 디렉토리 기반 영속 벡터 검색
//!
//! ANN (Approximate Nearest Neighbor) 검색으로 대용량 벡터에서도 빠른 검색을 지원합니다.
//! 같은 디렉토리를 다시 열면 이전 수집 결과가 그대로 복원됩니다.
//! ref: https://lancedb.github.io/lancedb/

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, Int64Array, RecordBatch,
    RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};

use super::vector::{SearchResult, VectorEntry, VectorStore};

/// 벡터 테이블 이름
const TABLE_NAME: &str = "vectors";

// ============================================================================
// LanceVectorStore
// ============================================================================

/// LanceDB 벡터 저장소 구현
///
/// LanceDB는 고성능 벡터 검색을 위한 columnar 데이터베이스입니다.
/// Apache Arrow 기반으로 빠른 읽기/쓰기를 제공합니다.
pub struct LanceVectorStore {
    db: Connection,
    dimension: i32,
}

impl LanceVectorStore {
    /// LanceDB 저장소 열기
    ///
    /// # Arguments
    /// * `path` - 저장소 디렉토리 경로
    /// * `dimension` - 임베딩 차원 (스키마 고정)
    pub async fn open(path: &Path, dimension: i32) -> Result<Self> {
        // 부모 디렉토리 생성
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create LanceDB directory")?;
            }
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?;

        let db = lancedb::connect(path_str)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        Ok(Self { db, dimension })
    }

    /// 벡터 테이블 스키마 생성
    fn create_schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("source", DataType::Utf8, false),
            Field::new("chunk_index", DataType::Int32, false),
            Field::new("start_offset", DataType::Int64, false),
            Field::new("chunk_text", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimension,
                ),
                false,
            ),
        ])
    }

    /// 엔트리들을 Arrow RecordBatch로 변환
    fn entries_to_batch(&self, entries: &[VectorEntry]) -> Result<RecordBatch> {
        if entries.is_empty() {
            anyhow::bail!("Cannot create batch from empty entries");
        }

        let sources: Vec<&str> = entries.iter().map(|e| e.source.as_str()).collect();
        let chunk_indices: Vec<i32> = entries.iter().map(|e| e.chunk_index).collect();
        let start_offsets: Vec<i64> = entries.iter().map(|e| e.start_offset).collect();
        let chunk_texts: Vec<&str> = entries.iter().map(|e| e.chunk_text.as_str()).collect();

        // 임베딩을 FixedSizeList로 변환
        let embeddings_flat: Vec<f32> = entries
            .iter()
            .flat_map(|e| e.embedding.iter().copied())
            .collect();

        let values = Float32Array::from(embeddings_flat);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings_list = FixedSizeListArray::try_new(
            field,
            self.dimension,
            Arc::new(values) as Arc<dyn Array>,
            None,
        )
        .context("Failed to create embedding array")?;

        let batch = RecordBatch::try_new(
            Arc::new(self.create_schema()),
            vec![
                Arc::new(StringArray::from(sources)),
                Arc::new(Int32Array::from(chunk_indices)),
                Arc::new(Int64Array::from(start_offsets)),
                Arc::new(StringArray::from(chunk_texts)),
                Arc::new(embeddings_list),
            ],
        )
        .context("Failed to create RecordBatch")?;

        Ok(batch)
    }

    /// 테이블 존재 여부 확인
    async fn table_exists(&self) -> bool {
        self.db
            .table_names()
            .execute()
            .await
            .map(|names| names.contains(&TABLE_NAME.to_string()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn insert_batch(&self, entries: &[VectorEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let batch = self.entries_to_batch(entries)?;
        let schema = batch.schema();

        if self.table_exists().await {
            // 기존 테이블에 추가
            let table = self
                .db
                .open_table(TABLE_NAME)
                .execute()
                .await
                .context("Failed to open table")?;

            let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
            table
                .add(batches)
                .execute()
                .await
                .context("Failed to add vectors to table")?;
        } else {
            // 새 테이블 생성
            let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
            self.db
                .create_table(TABLE_NAME, batches)
                .execute()
                .await
                .context("Failed to create table")?;
        }

        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if !self.table_exists().await {
            return Ok(vec![]);
        }

        let table = self
            .db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open table for search")?;

        // 벡터 검색
        let results = table
            .vector_search(query_embedding.to_vec())
            .context("Failed to create vector search")?
            .limit(limit)
            .execute()
            .await
            .context("Failed to execute vector search")?;

        let mut search_results = Vec::new();

        // RecordBatch 스트림에서 결과 추출
        use futures::TryStreamExt;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        for batch in batches {
            let sources = batch
                .column_by_name("source")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing source column"))?;

            let chunk_indices = batch
                .column_by_name("chunk_index")
                .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
                .ok_or_else(|| anyhow::anyhow!("Missing chunk_index column"))?;

            let start_offsets = batch
                .column_by_name("start_offset")
                .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
                .ok_or_else(|| anyhow::anyhow!("Missing start_offset column"))?;

            let chunk_texts = batch
                .column_by_name("chunk_text")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing chunk_text column"))?;

            // _distance 컬럼 (LanceDB가 자동 추가)
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| anyhow::anyhow!("Missing _distance column"))?;

            for i in 0..batch.num_rows() {
                let distance = distances.value(i);
                // 거리를 유사도로 변환 (L2 거리 -> 코사인 유사도 근사)
                let similarity = 1.0 / (1.0 + distance);

                search_results.push(SearchResult {
                    source: sources.value(i).to_string(),
                    chunk_index: chunk_indices.value(i),
                    start_offset: start_offsets.value(i),
                    chunk_text: chunk_texts.value(i).to_string(),
                    similarity,
                });
            }
        }

        Ok(search_results)
    }

    async fn count(&self) -> Result<usize> {
        if !self.table_exists().await {
            return Ok(0);
        }

        let table = self
            .db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open table for count")?;

        let count = table.count_rows(None).await.context("Failed to count rows")?;
        Ok(count)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIM: usize = 768;

    /// i번째 축에만 값이 있는 단위 벡터
    fn basis_embedding(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        v[axis] = 1.0;
        v
    }

    fn create_test_entry(source: &str, chunk_index: i32, axis: usize) -> VectorEntry {
        VectorEntry {
            source: source.to_string(),
            chunk_index,
            start_offset: (chunk_index as i64) * 800,
            chunk_text: format!("Chunk {} of {}", chunk_index, source),
            embedding: basis_embedding(axis),
        }
    }

    #[tokio::test]
    async fn test_lance_store_basic() {
        let temp_dir = TempDir::new().unwrap();
        let lance_path = temp_dir.path().join("test.lance");

        let store = LanceVectorStore::open(&lance_path, DIM as i32).await.unwrap();

        // 초기 상태
        assert_eq!(store.count().await.unwrap(), 0);

        // 삽입
        let entries = vec![
            create_test_entry("kim.pdf", 0, 0),
            create_test_entry("kim.pdf", 1, 1),
        ];
        let inserted = store.insert_batch(&entries).await.unwrap();
        assert_eq!(inserted, 2);

        // 개수 확인
        assert_eq!(store.count().await.unwrap(), 2);

        // 빈 배치는 no-op
        assert_eq!(store.insert_batch(&[]).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lance_search_returns_nearest() {
        let temp_dir = TempDir::new().unwrap();
        let lance_path = temp_dir.path().join("search_test.lance");

        let store = LanceVectorStore::open(&lance_path, DIM as i32).await.unwrap();

        let entries = vec![
            create_test_entry("kim.pdf", 0, 0),
            create_test_entry("lee.docx", 0, 1),
            create_test_entry("park.pdf", 0, 2),
        ];
        store.insert_batch(&entries).await.unwrap();

        // lee.docx 청크와 같은 방향의 쿼리
        let results = store.search(&basis_embedding(1), 2).await.unwrap();

        assert!(!results.is_empty());
        assert!(results.len() <= 2);
        assert_eq!(results[0].source, "lee.docx");
        assert!(results[0].similarity > results[1].similarity);
    }

    #[tokio::test]
    async fn test_lance_search_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let lance_path = temp_dir.path().join("empty.lance");

        let store = LanceVectorStore::open(&lance_path, DIM as i32).await.unwrap();
        let results = store.search(&basis_embedding(0), 4).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_lance_store_reopen_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let lance_path = temp_dir.path().join("persist.lance");

        let entries = vec![
            create_test_entry("kim.pdf", 0, 3),
            create_test_entry("kim.pdf", 1, 4),
            create_test_entry("lee.docx", 0, 5),
        ];

        {
            let store = LanceVectorStore::open(&lance_path, DIM as i32).await.unwrap();
            store.insert_batch(&entries).await.unwrap();
        }

        // 새 핸들로 다시 열기 (프로세스 재시작 시뮬레이션)
        let reopened = LanceVectorStore::open(&lance_path, DIM as i32).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 3);

        // 저장했던 청크의 임베딩으로 검색하면 그 청크가 최상위
        let results = reopened.search(&basis_embedding(4), 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_text, "Chunk 1 of kim.pdf");
        assert_eq!(results[0].start_offset, 800);
    }

    #[tokio::test]
    async fn test_lance_store_rebuild_same_count() {
        // 같은 입력을 새 디렉토리에 다시 수집하면 레코드 수가 같아야 한다
        let entries = vec![
            create_test_entry("kim.pdf", 0, 0),
            create_test_entry("kim.pdf", 1, 1),
            create_test_entry("lee.docx", 0, 2),
        ];

        let first_dir = TempDir::new().unwrap();
        let first = LanceVectorStore::open(&first_dir.path().join("db"), DIM as i32)
            .await
            .unwrap();
        first.insert_batch(&entries).await.unwrap();

        let second_dir = TempDir::new().unwrap();
        let second = LanceVectorStore::open(&second_dir.path().join("db"), DIM as i32)
            .await
            .unwrap();
        second.insert_batch(&entries).await.unwrap();

        assert_eq!(
            first.count().await.unwrap(),
            second.count().await.unwrap()
        );
    }
}
