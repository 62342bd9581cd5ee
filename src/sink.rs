//! Output devices for `output` clauses.
//!
//! [`FileSink`] writes rendered results to disk, [`ClipboardSink`] hands them
//! to a [`ClipboardWriter`], and [`DeviceSink`] routes each target to the
//! matching device.

use std::path::{Path, PathBuf};

use fikl_core::{OutputSink, SinkError, SinkTarget};
use parking_lot::Mutex;

/// Writes to files under a base directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    base: PathBuf,
    home: Option<PathBuf>,
}

impl FileSink {
    /// Relative paths resolve against `base`; `~` expands to `$HOME`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            home: std::env::var("HOME").ok().map(PathBuf::from),
        }
    }

    /// Use `home` for `~` instead of `$HOME`.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn resolve(&self, path: &str) -> Result<PathBuf, SinkError> {
        if path.trim().is_empty() {
            return Err(SinkError::Unavailable("empty output path".to_string()));
        }

        let expanded = if path == "~" || path.starts_with("~/") {
            let home = self.home.as_ref().ok_or_else(|| {
                SinkError::Unavailable(format!("cannot expand '{}': HOME is not set", path))
            })?;
            match path.strip_prefix("~/") {
                Some(rest) => home.join(rest),
                None => home.clone(),
            }
        } else {
            PathBuf::from(path)
        };

        if expanded.is_absolute() {
            Ok(expanded)
        } else {
            Ok(self.base.join(expanded))
        }
    }

    fn write_file(&self, path: &str, text: &str) -> Result<String, SinkError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&resolved, text)?;

        tracing::debug!(path = %resolved.display(), bytes = text.len(), "output written");
        Ok(resolved.display().to_string())
    }
}

impl OutputSink for FileSink {
    fn write(&self, target: &SinkTarget, text: &str) -> Result<String, SinkError> {
        match target {
            SinkTarget::Path(path) => self.write_file(path, text),
            SinkTarget::Clipboard => Err(SinkError::Unavailable(
                "file sink cannot write to the clipboard".to_string(),
            )),
        }
    }
}

/// Platform clipboard access, supplied by the embedding application.
pub trait ClipboardWriter {
    fn set_text(&self, text: &str) -> Result<(), SinkError>;
}

/// Keeps the last text copied.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl ClipboardWriter for MemoryClipboard {
    fn set_text(&self, text: &str) -> Result<(), SinkError> {
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

impl<T: ClipboardWriter + ?Sized> ClipboardWriter for std::sync::Arc<T> {
    fn set_text(&self, text: &str) -> Result<(), SinkError> {
        (**self).set_text(text)
    }
}

impl<T: ClipboardWriter + ?Sized> ClipboardWriter for Box<T> {
    fn set_text(&self, text: &str) -> Result<(), SinkError> {
        (**self).set_text(text)
    }
}

pub struct ClipboardSink<C: ClipboardWriter> {
    writer: C,
}

impl<C: ClipboardWriter> ClipboardSink<C> {
    pub fn new(writer: C) -> Self {
        Self { writer }
    }
}

impl<C: ClipboardWriter> OutputSink for ClipboardSink<C> {
    fn write(&self, target: &SinkTarget, text: &str) -> Result<String, SinkError> {
        match target {
            SinkTarget::Clipboard => {
                self.writer.set_text(text)?;
                Ok(target.to_string())
            }
            SinkTarget::Path(path) => Err(SinkError::Unavailable(format!(
                "clipboard sink cannot write to '{}'",
                path
            ))),
        }
    }
}

/// Files go to a [`FileSink`]; the clipboard to an optional [`ClipboardSink`].
pub struct DeviceSink {
    files: FileSink,
    clipboard: Option<ClipboardSink<Box<dyn ClipboardWriter>>>,
}

impl DeviceSink {
    pub fn new(files: FileSink) -> Self {
        Self {
            files,
            clipboard: None,
        }
    }

    pub fn with_clipboard(mut self, writer: impl ClipboardWriter + 'static) -> Self {
        let writer: Box<dyn ClipboardWriter> = Box::new(writer);
        self.clipboard = Some(ClipboardSink::new(writer));
        self
    }
}

impl OutputSink for DeviceSink {
    fn write(&self, target: &SinkTarget, text: &str) -> Result<String, SinkError> {
        match target {
            SinkTarget::Path(_) => self.files.write(target, text),
            SinkTarget::Clipboard => match &self.clipboard {
                Some(clipboard) => clipboard.write(target, text),
                None => Err(SinkError::Unavailable(
                    "no clipboard is available".to_string(),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_resolve() {
        let sink = FileSink::new("/data/out").with_home("/home/ann");
        assert_eq!(
            sink.resolve("a/b.json").unwrap(),
            PathBuf::from("/data/out/a/b.json")
        );
        assert_eq!(sink.resolve("/tmp/x.csv").unwrap(), PathBuf::from("/tmp/x.csv"));
        assert_eq!(
            sink.resolve("~/x.json").unwrap(),
            PathBuf::from("/home/ann/x.json")
        );
        assert!(sink.resolve("").is_err());
    }

    #[test]
    fn test_file_sink_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path());
        let destination = sink
            .write(&SinkTarget::Path("nested/deep/out.json".to_string()), "[]")
            .unwrap();

        let expected = dir.path().join("nested/deep/out.json");
        assert_eq!(destination, expected.display().to_string());
        assert_eq!(std::fs::read_to_string(expected).unwrap(), "[]");
    }

    #[test]
    fn test_device_sink_routes_targets() {
        let dir = TempDir::new().unwrap();
        let clipboard = Arc::new(MemoryClipboard::new());
        let sink = DeviceSink::new(FileSink::new(dir.path())).with_clipboard(clipboard.clone());

        let destination = sink.write(&SinkTarget::Clipboard, "a,b\n").unwrap();
        assert_eq!(destination, "clipboard");
        assert_eq!(clipboard.contents().as_deref(), Some("a,b\n"));

        sink.write(&SinkTarget::Path("x.json".to_string()), "{}")
            .unwrap();
        assert!(dir.path().join("x.json").exists());
    }

    #[test]
    fn test_missing_clipboard() {
        let sink = DeviceSink::new(FileSink::new("."));
        assert!(matches!(
            sink.write(&SinkTarget::Clipboard, "x"),
            Err(SinkError::Unavailable(_))
        ));
        assert!(matches!(
            FileSink::new(".").write(&SinkTarget::Clipboard, "x"),
            Err(SinkError::Unavailable(_))
        ));
    }
}
