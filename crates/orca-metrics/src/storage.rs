//! Append-only JSON-lines storage

use std::path::Path;

use orca_core::Result;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Append each record as one JSON line, creating parent directories
pub async fn append_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut buf = String::new();
    for record in records {
        buf.push_str(&serde_json::to_string(record)?);
        buf.push('\n');
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(buf.as_bytes()).await?;
    file.flush().await?;

    debug!(count = records.len(), path = %path.display(), "appended metrics");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_accumulates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/metrics.jsonl");

        append_jsonl(&path, &[1, 2]).await.unwrap();
        append_jsonl(&path, &[3]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["1", "2", "3"]);
    }
}
