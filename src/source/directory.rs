//! Directory of per-student feedback files.
//!
//! Each `*.txt` or `*.md` file holds one student's final feedback box;
//! the file stem is the student identifier.

use crate::models::FeedbackBlob;
use crate::progress::{ProgressSink, ProgressTicker};
use crate::source::{FetchOutcome, SourceError, SourceOptions};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// File extensions read as feedback.
const FEEDBACK_EXTENSIONS: &[&str] = &["txt", "md"];

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    options: SourceOptions,
}

impl DirectorySource {
    pub fn new(root: PathBuf, options: SourceOptions) -> Self {
        Self { root, options }
    }

    /// Feedback files under the root, sorted by path.
    ///
    /// Only a root that cannot be walked is an error. Entries below it
    /// that fail (unreadable directories, symlink loops, files removed
    /// mid-walk) are logged and skipped.
    pub fn feedback_files(&self) -> Result<Vec<PathBuf>, SourceError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) if source.depth() == 0 => {
                    return Err(SourceError::Walk {
                        path: self.root.clone(),
                        source,
                    });
                }
                Err(e) => {
                    warn!("Skipping entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_file() && is_feedback_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Read every feedback file, `concurrency` at a time.
    ///
    /// Unreadable files count as students with missing submissions.
    pub async fn fetch(&self, sink: &dyn ProgressSink) -> Result<FetchOutcome, SourceError> {
        let files = self.feedback_files()?;
        debug!("Found {} feedback files in {}", files.len(), self.root.display());

        let ticker = ProgressTicker::new(sink, self.options.progress_every, files.len());
        let mut outcome = FetchOutcome {
            roster_size: files.len(),
            ..FetchOutcome::default()
        };

        let mut reads = stream::iter(files)
            .map(|path| async move {
                let content = tokio::fs::read_to_string(&path).await;
                (path, content)
            })
            .buffered(self.options.concurrency.max(1));

        let mut index = 0;
        while let Some((path, content)) = reads.next().await {
            ticker.tick(index);
            index += 1;

            match content {
                Ok(content) => outcome.blobs.push(FeedbackBlob::new(student_id(&path), content)),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    outcome.skipped += 1;
                }
            }
        }

        ticker.finish();
        Ok(outcome)
    }
}

fn is_feedback_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'));

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    !hidden && FEEDBACK_EXTENSIONS.contains(&ext)
}

fn student_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::testing::RecordingProgress;
    use crate::progress::NoProgress;

    fn write_fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("alice.txt"),
            include_str!("../../fixtures/feedback/alice.txt"),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("bob.txt"),
            include_str!("../../fixtures/feedback/bob.txt"),
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("section-b")).unwrap();
        std::fs::write(
            dir.path().join("section-b").join("carol.md"),
            include_str!("../../fixtures/feedback/carol.txt"),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        std::fs::write(dir.path().join(".hidden.txt"), "- Style: x").unwrap();
        dir
    }

    #[test]
    fn test_is_feedback_file() {
        assert!(is_feedback_file(Path::new("a/b/123.txt")));
        assert!(is_feedback_file(Path::new("123.md")));
        assert!(!is_feedback_file(Path::new("123.json")));
        assert!(!is_feedback_file(Path::new(".secret.txt")));
        assert!(!is_feedback_file(Path::new("README")));
    }

    #[test]
    fn test_student_id_is_file_stem() {
        assert_eq!(student_id(Path::new("/tmp/feedback/4021.txt")), "4021");
    }

    #[test]
    fn test_feedback_files_sorted_and_filtered() {
        let dir = write_fixture_dir();
        let source = DirectorySource::new(dir.path().to_path_buf(), SourceOptions::default());

        let files = source.feedback_files().unwrap();
        let names: Vec<String> = files.iter().map(|p| student_id(p)).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn test_fetch_reads_every_file() {
        let dir = write_fixture_dir();
        let options = SourceOptions {
            concurrency: 2,
            progress_every: 2,
            ..SourceOptions::default()
        };
        let source = DirectorySource::new(dir.path().to_path_buf(), options);
        let sink = RecordingProgress::default();

        let outcome = source.fetch(&sink).await.unwrap();

        assert_eq!(outcome.roster_size, 3);
        assert_eq!(outcome.skipped, 0);
        let students: Vec<&str> = outcome.blobs.iter().map(|b| b.student.as_str()).collect();
        assert_eq!(students, vec!["alice", "bob", "carol"]);
        assert_eq!(sink.updates(), vec![(0, 3), (2, 3), (3, 3)]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_survives_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("alice.txt"),
            include_str!("../../fixtures/feedback/alice.txt"),
        )
        .unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let source = DirectorySource::new(dir.path().to_path_buf(), SourceOptions::default());
        let outcome = source.fetch(&NoProgress).await.unwrap();

        assert_eq!(outcome.roster_size, 1);
        assert_eq!(outcome.blobs[0].student, "alice");
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path().join("gone"), SourceOptions::default());

        let err = source.feedback_files().unwrap_err();
        assert!(matches!(err, SourceError::Walk { .. }));
    }

    #[test]
    fn test_fetch_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path().to_path_buf(), SourceOptions::default());

        let outcome = tokio_test::block_on(source.fetch(&NoProgress)).unwrap();
        assert_eq!(outcome.roster_size, 0);
        assert!(outcome.blobs.is_empty());
    }
}
