//! Markdown inventory: find `.md` files under a folder and list them as CSV.

use anyhow::{Context, Result};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One row of the inventory CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkdownFile {
    pub file_name: String,
    pub relative_path: String,
    pub number_of_chars: usize,
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}

/// All markdown files below `root`, sorted by path.
pub fn find_markdown_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        anyhow::bail!("Source folder does not exist: {}", root.display());
    }
    if !root.is_dir() {
        anyhow::bail!("Source path is not a directory: {}", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.context("Failed to read directory entry")?;
        if entry.file_type().is_file() && is_markdown(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    Ok(files)
}

/// Scan `root` for markdown files and count the characters in each.
///
/// A file that cannot be read as UTF-8 is listed with zero characters.
pub fn scan_markdown_files(root: &Path) -> Result<Vec<MarkdownFile>> {
    let files = find_markdown_files(root)?;

    Ok(files
        .iter()
        .map(|path| {
            let number_of_chars = match std::fs::read_to_string(path) {
                Ok(content) => content.chars().count(),
                Err(e) => {
                    log::warn!("Could not read {}: {}", path.display(), e);
                    0
                }
            };
            MarkdownFile {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                relative_path: path
                    .strip_prefix(root)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .into_owned(),
                number_of_chars,
            }
        })
        .collect())
}

/// Write the inventory with a `file_name,relative_path,number_of_chars` header.
pub fn write_csv(output: &Path, files: &[MarkdownFile]) -> Result<()> {
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    for file in files {
        writer.serialize(file)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("part2")).unwrap();
        fs::write(root.join("b.md"), "hello").unwrap();
        fs::write(root.join("a.MD"), "zażółć").unwrap();
        fs::write(root.join("notes.txt"), "ignored").unwrap();
        fs::write(root.join("part2").join("c.md"), "").unwrap();
        temp_dir
    }

    #[test]
    fn test_find_markdown_files_sorted() {
        let temp_dir = fixture();
        let files = find_markdown_files(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(temp_dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.MD"),
                PathBuf::from("b.md"),
                PathBuf::from("part2").join("c.md"),
            ]
        );
    }

    #[test]
    fn test_scan_counts_characters() {
        let temp_dir = fixture();
        let files = scan_markdown_files(temp_dir.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].file_name, "a.MD");
        assert_eq!(files[0].number_of_chars, 6);
        assert_eq!(files[1].number_of_chars, 5);
        assert_eq!(files[2].file_name, "c.md");
        assert_eq!(
            files[2].relative_path,
            PathBuf::from("part2").join("c.md").to_string_lossy()
        );
    }

    #[test]
    fn test_missing_folder() {
        let temp_dir = TempDir::new().unwrap();
        assert!(scan_markdown_files(&temp_dir.path().join("nope")).is_err());

        let file = temp_dir.path().join("file.md");
        fs::write(&file, "x").unwrap();
        assert!(find_markdown_files(&file).is_err());
    }

    #[test]
    fn test_write_csv() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("list.csv");
        let files = vec![
            MarkdownFile {
                file_name: "a.md".to_string(),
                relative_path: "a.md".to_string(),
                number_of_chars: 12,
            },
            MarkdownFile {
                file_name: "b, c.md".to_string(),
                relative_path: "sub/b, c.md".to_string(),
                number_of_chars: 0,
            },
        ];

        write_csv(&output, &files).unwrap();
        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(
            content,
            "file_name,relative_path,number_of_chars\na.md,a.md,12\n\"b, c.md\",\"sub/b, c.md\",0\n"
        );
    }
}
