//! Testing utilities for recast workspace
//!
//! Shared source-tree fixtures and fake transformation engines.

#![allow(missing_docs)]

use filetime::FileTime;
use recast_middleware::{
    Interceptor, RecastConfig, TransformError, TransformOptions, TransformOutput, Transformer,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Scratch source root
#[derive(Debug)]
pub struct SourceTree {
    dir: TempDir,
}

impl SourceTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let tree = Self::new();
        for (name, content) in files {
            tree.write(name, content);
        }
        tree
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name.trim_start_matches('/'))
    }

    /// Write `content`, creating parent directories
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.file(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Pin the mtime of `name` to `secs` past the epoch
    pub fn set_mtime(&self, name: &str, secs: i64) {
        let mtime = FileTime::from_unix_time(secs, 0);
        filetime::set_file_mtime(self.file(name), mtime).unwrap();
    }

    /// Rewrite `name` and move its mtime forward so the change is observable
    pub fn touch(&self, name: &str, content: &str) {
        let before = std::fs::metadata(self.file(name)).unwrap().modified().unwrap();
        self.write(name, content);
        let after = FileTime::from_system_time(before + Duration::from_secs(1));
        filetime::set_file_mtime(self.file(name), after).unwrap();
    }

    pub fn config(&self) -> RecastConfig {
        RecastConfig::new(self.path())
    }
}

impl Default for SourceTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Upper-cases the source, counting invocations
#[derive(Debug, Default)]
pub struct UppercaseTransformer {
    calls: AtomicUsize,
    with_map: bool,
}

impl UppercaseTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also emit a source map naming the source file
    pub fn with_map() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            with_map: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transformer for UppercaseTransformer {
    fn transform(
        &self,
        source: &Path,
        _options: &TransformOptions,
    ) -> Result<TransformOutput, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = std::fs::read_to_string(source).map_err(|e| TransformError::io(source, &e))?;
        let output = TransformOutput::new(text.to_uppercase());
        if self.with_map {
            let name = source.file_name().unwrap().to_string_lossy();
            Ok(output.with_map(format!("{{\"version\":3,\"sources\":[\"{name}\"]}}")))
        } else {
            Ok(output)
        }
    }
}

/// Fails for sources whose content contains `marker`
#[derive(Debug)]
pub struct FailingTransformer {
    marker: String,
    calls: AtomicUsize,
}

impl FailingTransformer {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transformer for FailingTransformer {
    fn transform(
        &self,
        source: &Path,
        _options: &TransformOptions,
    ) -> Result<TransformOutput, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = std::fs::read_to_string(source).map_err(|e| TransformError::io(source, &e))?;
        if text.contains(&self.marker) {
            return Err(TransformError::new(format!("Unexpected token in {}", self.marker))
                .with_code_frame(format!("> 1 | {text}"))
                .with_path(source));
        }
        Ok(TransformOutput::new(text.to_uppercase()))
    }
}

/// Interceptor over `config` with a shared transformer handle
pub fn setup_interceptor<T>(config: &RecastConfig, transformer: Arc<T>) -> Interceptor
where
    T: Transformer + 'static,
{
    Interceptor::new(config, transformer).unwrap()
}
