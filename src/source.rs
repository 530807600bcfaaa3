//! Access to files and the environment.
//!
//! The pipeline never touches the filesystem directly; it goes through a
//! [`Source`], so that embedders (and tests) can serve files from memory.

use std::{
    collections::HashMap,
    io,
    path::{Component, Path, PathBuf},
};

pub trait Source {
    /// Reads the whole file at the given absolute path.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Resolves `path` against `base_dir`. Absolute paths are used as they
    /// are.
    fn abs_path(&self, base_dir: &Path, path: &str) -> io::Result<PathBuf>;

    /// Returns a snapshot of the environment variables.
    fn env(&self) -> HashMap<String, String>;
}

/// Reads from the real filesystem and process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSource;

impl Source for OsSource {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn abs_path(&self, base_dir: &Path, path: &str) -> io::Result<PathBuf> {
        let joined = base_dir.join(path);
        let absolute = std::path::absolute(joined)?;
        Ok(normalize(&absolute))
    }

    fn env(&self) -> HashMap<String, String> {
        std::env::vars().collect()
    }
}

/// Serves files and environment variables from memory.
///
/// ```
/// use atmc::source::{MemorySource, Source};
/// use std::path::Path;
///
/// let source = MemorySource::new()
///     .file("/config/main.atmc", "{ a: 1 }")
///     .var("HOME", "/home/atmc");
/// assert!(source.read_file(Path::new("/config/main.atmc")).is_ok());
/// assert!(source.read_file(Path::new("/config/other.atmc")).is_err());
/// assert_eq!(source.env()["HOME"], "/home/atmc");
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: HashMap<PathBuf, Vec<u8>>,
    env: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    #[must_use]
    pub fn file(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> MemorySource {
        let path = normalize(&Path::new("/").join(path));
        self.files.insert(path, contents.into());
        self
    }

    #[must_use]
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> MemorySource {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl Source for MemorySource {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
        })
    }

    fn abs_path(&self, base_dir: &Path, path: &str) -> io::Result<PathBuf> {
        // Relative roots are taken from `/`, as there is no working
        // directory in memory.
        Ok(normalize(&Path::new("/").join(base_dir).join(path)))
    }

    fn env(&self) -> HashMap<String, String> {
        self.env.clone()
    }
}

/// Lexically removes `.` components and resolves `..` against the preceding
/// component. `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut buf = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                if !matches!(
                    buf.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                ) {
                    buf.pop();
                }
            }
            other => buf.push(other),
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize() {
        let cases = [
            ("/dir1/dir2/../common.atmc", "/dir1/common.atmc"),
            ("/dir1/./a/./b.atmc", "/dir1/a/b.atmc"),
            ("/../../x.atmc", "/x.atmc"),
            ("/a/b/c/../../d", "/a/d"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize(Path::new(input)), PathBuf::from(expected));
        }
    }

    #[test]
    fn test_memory_abs_path() {
        let source = MemorySource::new();
        let cases = [
            ("/project", "./common.atmc", "/project/common.atmc"),
            ("/project/sub", "./../common.atmc", "/project/common.atmc"),
            ("/project", "/etc/base.atmc", "/etc/base.atmc"),
            ("", "main.atmc", "/main.atmc"),
        ];
        for (base, path, expected) in cases {
            let actual = source.abs_path(Path::new(base), path).unwrap();
            assert_eq!(actual, PathBuf::from(expected), "{base} + {path}");
        }
    }

    #[test]
    fn test_memory_read_and_env() {
        let source = MemorySource::new()
            .file("dir/a.atmc", "{}")
            .var("PASSWORD", "qwerty");
        assert_eq!(source.read_file(Path::new("/dir/a.atmc")).unwrap(), b"{}");
        let error = source.read_file(Path::new("/dir/b.atmc")).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert_eq!(source.env().get("PASSWORD").map(String::as_str), Some("qwerty"));
    }

    #[test]
    fn test_os_abs_path_is_absolute_and_normal() {
        let base = std::env::temp_dir();
        let path = OsSource.abs_path(&base, "./a/../b.atmc").unwrap();
        assert!(path.is_absolute());
        assert_eq!(path, normalize(&base.join("b.atmc")));
    }
}
