//! Lines-of-code normalization backed by `tokei` language detection.

use std::path::Path;

use tokei::{Config, LanguageType};

use crate::error::Result;
use crate::fs::FileSystem;

/// Resolve a user-supplied language identifier against the `tokei` language
/// registry, case-insensitively. `None` means the identifier is unknown,
/// which callers must treat as a configuration error distinct from "no code
/// found".
pub fn resolve_language(name: &str) -> Option<LanguageType> {
    LanguageType::list()
        .iter()
        .copied()
        .find(|language| language.name().eq_ignore_ascii_case(name))
}

/// Counts lines of code in one language for a project directory.
pub struct LocInspector<F: FileSystem> {
    fs: F,
    config: Config,
}

impl<F: FileSystem> LocInspector<F> {
    /// Create an inspector with the default `tokei` configuration.
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            config: Config::default(),
        }
    }

    /// Count the non-blank lines of all files under `root` whose detected
    /// language matches `language`.
    pub fn lines_of_code(&self, root: &Path, language: LanguageType) -> Result<usize> {
        let files = self.fs.list_files(root)?;
        let mut total = 0usize;

        for path in files {
            let Some(detected) = LanguageType::from_path(&path, &self.config) else {
                continue;
            };
            if detected != language {
                continue;
            }
            let contents = self.fs.read_to_string(&path)?;
            total += count_code_lines(&contents);
        }

        Ok(total)
    }
}

fn count_code_lines(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::{LocInspector, resolve_language};
    use crate::fs::MockFileSystem;
    use std::path::{Path, PathBuf};
    use tokei::LanguageType;

    #[test]
    fn resolves_language_names_case_insensitively() {
        assert_eq!(resolve_language("python"), Some(LanguageType::Python));
        assert_eq!(resolve_language("Rust"), Some(LanguageType::Rust));
        assert_eq!(resolve_language("klingon"), None);
    }

    #[test]
    fn counts_only_the_requested_language() {
        let mut fs = MockFileSystem::new();
        fs.expect_list_files().returning(|_| {
            Ok(vec![
                PathBuf::from("src/app.py"),
                PathBuf::from("src/main.rs"),
            ])
        });
        fs.expect_read_to_string()
            .withf(|path| path == Path::new("src/app.py"))
            .returning(|_| Ok("import os\n\nprint('hi')\n".to_string()));

        let inspector = LocInspector::new(fs);
        let lines = inspector
            .lines_of_code(Path::new("/corpus/demo"), LanguageType::Python)
            .expect("count succeeds");

        // Blank line excluded; the Rust file is never read.
        assert_eq!(lines, 2);
    }

    #[test]
    fn reports_zero_when_language_is_absent() {
        let mut fs = MockFileSystem::new();
        fs.expect_list_files()
            .returning(|_| Ok(vec![PathBuf::from("src/main.rs")]));

        let inspector = LocInspector::new(fs);
        let lines = inspector
            .lines_of_code(Path::new("/corpus/demo"), LanguageType::Python)
            .expect("count succeeds");

        assert_eq!(lines, 0);
    }

    #[test]
    fn undetected_files_are_skipped() {
        let mut fs = MockFileSystem::new();
        fs.expect_list_files()
            .returning(|_| Ok(vec![PathBuf::from("LICENSE")]));

        let inspector = LocInspector::new(fs);
        let lines = inspector
            .lines_of_code(Path::new("/corpus/demo"), LanguageType::Python)
            .expect("count succeeds");

        assert_eq!(lines, 0);
    }
}
