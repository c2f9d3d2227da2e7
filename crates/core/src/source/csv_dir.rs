//! CSV files in a directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex_lite::Regex;
use tracing::debug;

use super::{ItemSource, SourceError};
use crate::config::SourceConfig;
use crate::item::{Item, ItemId};

/// Reads `id,domain` CSV files whose names match a pattern.
///
/// Rows missing either field are skipped. Source identifiers are file paths.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
    pattern: Regex,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>, file_pattern: &str) -> Result<Self, SourceError> {
        let pattern = Regex::new(file_pattern).map_err(|e| SourceError::InvalidPattern {
            pattern: file_pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            dir: dir.into(),
            pattern,
        })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        Self::new(&config.dir, &config.file_pattern)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ItemSource for CsvDirectorySource {
    fn name(&self) -> &str {
        "csv_directory"
    }

    async fn list_sources(&self) -> Result<Vec<String>, SourceError> {
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(self.dir.display().to_string()))
            }
            Err(e) => return Err(SourceError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| SourceError::io(&self.dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| SourceError::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if self.pattern.is_match(name) {
                files.push(entry.path());
            }
        }

        files.sort();
        debug!(dir = %self.dir.display(), count = files.len(), "Listed source files");
        Ok(files
            .into_iter()
            .map(|p| p.display().to_string())
            .collect())
    }

    async fn read_items(&self, source_id: &str) -> Result<Vec<Item>, SourceError> {
        let data = match tokio::fs::read(source_id).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(source_id.to_string()))
            }
            Err(e) => return Err(SourceError::io(source_id, e)),
        };
        parse_items(source_id, &data)
    }
}

/// Parse a headed CSV document into items.
fn parse_items(source_id: &str, data: &[u8]) -> Result<Vec<Item>, SourceError> {
    let malformed = |e: csv::Error| SourceError::Malformed {
        source_id: source_id.to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader.headers().map_err(malformed)?.clone();
    let column = |wanted: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SourceError::MissingColumn {
                source_id: source_id.to_string(),
                column: wanted.to_string(),
            })
    };
    let id_idx = column("id")?;
    let domain_idx = column("domain")?;

    let mut items = Vec::new();
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        let (Some(id), Some(domain)) = (record.get(id_idx), record.get(domain_idx)) else {
            continue;
        };
        if id.is_empty() || domain.is_empty() {
            continue;
        }
        items.push(Item::new(ItemId::parse(id), domain));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_items_skips_incomplete_rows() {
        let csv = b"id,domain\n1,a.com\n2,\n,c.com\n4, d.com \n";
        let items = parse_items("test.csv", csv).unwrap();
        assert_eq!(
            items,
            vec![Item::new(1u64, "a.com"), Item::new(4u64, "d.com")]
        );
    }

    #[test]
    fn test_parse_items_column_order_and_case() {
        let csv = b"Domain,rank,ID\nx.org,5,10\n";
        let items = parse_items("test.csv", csv).unwrap();
        assert_eq!(items, vec![Item::new(10u64, "x.org")]);
    }

    #[test]
    fn test_parse_items_missing_column() {
        let csv = b"id,host\n1,a.com\n";
        let err = parse_items("test.csv", csv).unwrap_err();
        assert!(matches!(err, SourceError::MissingColumn { ref column, .. } if column == "domain"));
    }

    #[test]
    fn test_parse_items_text_ids() {
        let csv = b"id,domain\nabc,a.com\n";
        let items = parse_items("test.csv", csv).unwrap();
        assert_eq!(items[0].id, ItemId::Text("abc".to_string()));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = CsvDirectorySource::new("/tmp", "(").unwrap_err();
        assert!(matches!(err, SourceError::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn test_list_sources_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("domains_2.csv"), "id,domain\n").unwrap();
        std::fs::write(dir.path().join("domains_1.csv"), "id,domain\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("other.csv"), "").unwrap();
        std::fs::create_dir(dir.path().join("domains_dir.csv")).unwrap();

        let source = CsvDirectorySource::new(dir.path(), r"^domains_.*\.csv$").unwrap();
        let sources = source.list_sources().await.unwrap();

        assert_eq!(sources.len(), 2);
        assert!(sources[0].ends_with("domains_1.csv"));
        assert!(sources[1].ends_with("domains_2.csv"));
    }

    #[tokio::test]
    async fn test_list_missing_dir() {
        let source = CsvDirectorySource::new("/nonexistent/domains", ".*").unwrap();
        assert!(matches!(
            source.list_sources().await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_read_items_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domains_1.csv");
        std::fs::write(&path, "id,domain\n1,a.com\n2,b.com\n").unwrap();

        let source = CsvDirectorySource::new(dir.path(), ".*").unwrap();
        let items = source
            .read_items(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].domain, "b.com");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let source = CsvDirectorySource::new("/tmp", ".*").unwrap();
        assert!(matches!(
            source.read_items("/nonexistent/domains_1.csv").await,
            Err(SourceError::NotFound(_))
        ));
    }
}
