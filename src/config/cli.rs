use crate::core::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// 本地檔案系統存儲，相對路徑以 `base_path` 為基準
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        // 絕對路徑會直接取代 base_path
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.resolve(path)).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_directories_and_reads_back() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        storage
            .write_file("nested/dir/demand_data.json", b"{}")
            .await
            .unwrap();
        let data = storage.read_file("nested/dir/demand_data.json").await.unwrap();
        assert_eq!(data, b"{}");
        assert!(temp_dir.path().join("nested/dir/demand_data.json").exists());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        assert!(matches!(
            tokio_test::block_on(storage.read_file("missing.csv")),
            Err(crate::utils::error::DemandError::IoError(_))
        ));
    }

    #[test]
    fn test_absolute_path_ignores_base() {
        let temp_dir = TempDir::new().unwrap();
        let absolute = temp_dir.path().join("blocks.csv");
        std::fs::write(&absolute, "id,lon,lat,population\n").unwrap();

        let storage = LocalStorage::new("/nonexistent-base");
        let data = tokio_test::block_on(storage.read_file(absolute.to_str().unwrap())).unwrap();
        assert!(data.starts_with(b"id,lon"));
    }
}
