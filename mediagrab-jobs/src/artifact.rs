//! Artifact selection.
//!
//! yt-dlp decides the final filename from the media title, so after a fetch
//! the work directory is scanned for the real output: prefer the largest
//! file with the expected extension, fall back to the largest file overall.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::JobError;

pub async fn select_artifact(
    dir: &Path,
    preferred_ext: Option<&str>,
) -> Result<PathBuf, JobError> {
    let mut entries = fs::read_dir(dir).await?;
    let mut best_preferred: Option<(u64, PathBuf)> = None;
    let mut best_any: Option<(u64, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let path = entry.path();
        let size = meta.len();

        let matches_preferred = preferred_ext
            .map(|ext| {
                path.extension()
                    .map(|e| e.eq_ignore_ascii_case(ext))
                    .unwrap_or(false)
            })
            .unwrap_or(false);

        if matches_preferred && best_preferred.as_ref().map(|(s, _)| size > *s).unwrap_or(true) {
            best_preferred = Some((size, path.clone()));
        }
        if best_any.as_ref().map(|(s, _)| size > *s).unwrap_or(true) {
            best_any = Some((size, path));
        }
    }

    best_preferred
        .or(best_any)
        .map(|(_, path)| path)
        .ok_or_else(|| {
            JobError::Execution(format!(
                "fetch produced no output files in {}",
                dir.display()
            ))
        })
}

/// Sanitize a media title for use as a filename: strip path separators and
/// other unsafe characters, collapse whitespace, cap at 80 characters.
pub fn sanitize_title(raw: &str) -> String {
    let cleaned = sanitize_filename::sanitize(raw);
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out: String = collapsed.chars().take(80).collect();
    if out.is_empty() {
        out.push_str("media");
    }
    out
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    async fn write_file(dir: &Path, name: &str, len: usize) {
        let mut f = fs::File::create(dir.join(name)).await.unwrap();
        f.write_all(&vec![0u8; len]).await.unwrap();
    }

    #[tokio::test]
    async fn prefers_largest_file_with_expected_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "clip.f137.webm", 5000).await;
        write_file(dir.path(), "clip.mp4", 3000).await;
        write_file(dir.path(), "thumb.mp4", 100).await;

        let picked = select_artifact(dir.path(), Some("mp4")).await.unwrap();
        assert_eq!(picked.file_name().unwrap(), "clip.mp4");
    }

    #[tokio::test]
    async fn falls_back_to_largest_overall() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "clip.webm", 5000).await;
        write_file(dir.path(), "clip.json", 100).await;

        let picked = select_artifact(dir.path(), Some("mp4")).await.unwrap();
        assert_eq!(picked.file_name().unwrap(), "clip.webm");
    }

    #[tokio::test]
    async fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = select_artifact(dir.path(), None).await.unwrap_err();
        assert!(matches!(err, JobError::Execution(_)));
    }

    #[test]
    fn sanitize_strips_separators_and_caps_length() {
        assert_eq!(sanitize_title("a/b\\c: d"), "abc d");
        let long = "x".repeat(200);
        assert_eq!(sanitize_title(&long).len(), 80);
        assert_eq!(sanitize_title("///"), "media");
    }
}
