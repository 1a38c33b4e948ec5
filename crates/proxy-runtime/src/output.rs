//! Output naming and lookup

use crate::types::{Result, RuntimeError};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub const COMBINED_PDF_NAME: &str = "Combined_Double_Sided.pdf";
pub const MANIFEST_NAME: &str = "DFC_Manifest.txt";
pub const DECK_LIST_NAME: &str = "deck_list.csv";

/// Deck name made safe for use as a file or folder name
pub fn file_safe(name: &str) -> String {
    let safe: String = name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if safe.is_empty() || safe.chars().all(|c| c == '.') {
        "Deck".to_string()
    } else {
        safe
    }
}

pub fn batch_dir_name(now: DateTime<Local>) -> String {
    format!("Batch_{}", now.format("%Y%m%d_%H%M%S"))
}

/// A bare file name: no separators, no parent references
pub fn validate_file_name(filename: &str) -> Result<()> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains('\0')
        || Path::new(filename).is_absolute();
    if invalid {
        return Err(RuntimeError::InvalidFileName(filename.to_string()));
    }
    Ok(())
}

/// Search `root` recursively for a file called `filename`
pub async fn find_output_file(root: &Path, filename: &str) -> Result<PathBuf> {
    validate_file_name(filename)?;

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() && entry.file_name() == filename {
                return Ok(entry.path());
            }
        }
    }

    Err(RuntimeError::FileNotFound(filename.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_safe() {
        assert_eq!(file_safe("Izzet Spells"), "Izzet_Spells");
        assert_eq!(file_safe("R/G Aggro"), "R_G_Aggro");
        assert_eq!(file_safe(" .. "), "Deck");
        assert_eq!(file_safe(""), "Deck");
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("Deck_Standard.pdf").is_ok());
        for bad in ["", "..", "../secret.txt", "a/b.pdf", "a\\b.pdf", "/etc/passwd"] {
            assert!(
                matches!(validate_file_name(bad), Err(RuntimeError::InvalidFileName(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_batch_dir_name() {
        use chrono::TimeZone;
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(batch_dir_name(now), "Batch_20240309_140507");
    }

    #[tokio::test]
    async fn test_find_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Batch_1").join("Deck");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(nested.join("Deck_Standard.pdf"), b"%PDF").await.unwrap();

        let found = find_output_file(dir.path(), "Deck_Standard.pdf").await.unwrap();
        assert_eq!(found, nested.join("Deck_Standard.pdf"));

        assert!(matches!(
            find_output_file(dir.path(), "Other.pdf").await,
            Err(RuntimeError::FileNotFound(_))
        ));
    }
}
