//! CSV read and write.

use crate::error::{QualityError, Result, ResultExt};
use crate::utils::NULL_MARKERS;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rows sampled by polars to infer column dtypes on read.
const INFER_SCHEMA_ROWS: usize = 100;

/// Reads CSV files and bytes into tables and writes tables back out.
pub struct TableLoader;

impl TableLoader {
    /// Read a CSV file with a header row.
    ///
    /// A nonexistent path is [`QualityError::TableNotFound`]. If the standard
    /// parse fails the content is read again with blank lines and doubled
    /// quotes cleaned up.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(QualityError::TableNotFound(path.display().to_string()));
        }

        let standard = Self::read_options()
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
            .finish();

        let df = match standard {
            Ok(df) => df,
            Err(e) => {
                debug!("Standard CSV parse failed for {}: {}", path.display(), e);
                let content = fs::read_to_string(path)?;
                Self::read_csv_bytes(clean_csv_content(&content).as_bytes())
                    .context(format!("Reading {}", path.display()))?
            }
        };

        info!("Loaded {}: {:?}", path.display(), df.shape());
        Ok(df)
    }

    /// Read CSV content held in memory.
    pub fn read_csv_bytes(bytes: &[u8]) -> Result<DataFrame> {
        let df = Self::read_options()
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .context("Parsing CSV content")?;
        Ok(df)
    }

    /// Write `df` as CSV with a header. The file is written next to `path`
    /// under a temporary name and renamed into place, so a failed write
    /// leaves no partial file.
    pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = temp_path_for(path);
        let written = File::create(&tmp_path)
            .map_err(QualityError::from)
            .and_then(|mut file| {
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .with_separator(b',')
                    .with_quote_char(b'"')
                    .finish(df)
                    .map_err(QualityError::from)
            });

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.with_context(format!("Writing {}", path.display())));
        }

        fs::rename(&tmp_path, path)?;
        info!("Wrote {} rows to {}", df.height(), path.display());
        Ok(())
    }

    fn read_options() -> CsvReadOptions {
        let null_values = NullValues::AllColumns(NULL_MARKERS.iter().map(|m| (*m).into()).collect());

        CsvReadOptions::default()
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_has_header(true)
            .with_parse_options(
                CsvParseOptions::default()
                    .with_quote_char(Some(b'"'))
                    .with_null_values(Some(null_values)),
            )
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table.csv".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}

fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bytes_with_null_markers() {
        let csv = b"id,value,label\n1,1.5,a\n2,NA,\n3,null,c\n";
        let df = TableLoader::read_csv_bytes(csv).unwrap();

        assert_eq!(df.shape(), (3, 3));
        assert_eq!(df.column("value").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("value").unwrap().null_count(), 2);
        assert_eq!(df.column("label").unwrap().null_count(), 1);
    }

    #[test]
    fn test_missing_file_is_table_not_found() {
        let err = TableLoader::read_csv("/definitely/not/here.csv").unwrap_err();
        assert_eq!(err.error_code(), "TABLE_NOT_FOUND");
    }

    #[test]
    fn test_write_then_read() {
        let dir = std::env::temp_dir().join(format!("lex-quality-loader-{}", std::process::id()));
        let path = dir.join("out.csv");
        let mut df = df![
            "id" => [1i64, 2],
            "name" => ["a", "b"],
        ]
        .unwrap();

        TableLoader::write_csv(&mut df, &path).unwrap();
        assert!(!temp_path_for(&path).exists());

        let back = TableLoader::read_csv(&path).unwrap();
        assert!(back.equals_missing(&df));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_clean_csv_content_drops_blank_lines() {
        assert_eq!(clean_csv_content("a,b\n\n1,2\n  \n"), "a,b\n1,2");
    }
}
