//! Collision-avoiding persistence of frames as delimited text files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use polars::frame::DataFrame;
use snafu::{Backtrace, ResultExt, Snafu};
use tokio::{fs, io::AsyncWriteExt};
use tracing::info;

use crate::frame::{FrameError, write_csv};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// The frame could not be serialised to the destination format.
    #[snafu(display("Data conversion error: {source}"))]
    Conversion {
        source: FrameError,
        backtrace: Backtrace,
    },

    /// A file or directory could not be created or written.
    #[snafu(display("I/O error on {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// Sink names must be plain relative paths inside the sink root.
    #[snafu(display("Invalid sink name '{name}'"))]
    InvalidName { name: String, backtrace: Backtrace },
}

#[async_trait]
pub trait TableSink {
    /// What a successful write reports, e.g. the path actually written.
    type Output;

    /// Writes `frame` to the sink called `name`.
    ///
    /// Without `append`, an existing sink is never overwritten: the frame goes
    /// to the first free `name(1)`, `name(2)`, ... instead. With `append`, the
    /// frame (header included) is added after a blank separator line.
    async fn write(&self, frame: &DataFrame, name: &str, append: bool) -> Result<Self::Output, SinkError>;
}

/// Writes each sink as a CSV file under a root directory.
#[derive(Debug, Clone)]
pub struct CsvDirSink {
    root: PathBuf,
}

impl CsvDirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, SinkError> {
        let relative = Path::new(name);
        let plain = relative
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
        if name.is_empty() || !plain {
            return InvalidNameSnafu { name }.fail();
        }
        Ok(self.root.join(relative))
    }
}

/// `dir/stem(n).ext` for the first `n` that does not exist yet.
async fn free_path(path: &Path) -> Result<PathBuf, SinkError> {
    if !exists(path).await? {
        return Ok(path.to_path_buf());
    }
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut counter = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{stem}({counter}){ext}"));
        if !exists(&candidate).await? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

async fn exists(path: &Path) -> Result<bool, SinkError> {
    fs::try_exists(path).await.context(IoSnafu { path })
}

#[async_trait]
impl TableSink for CsvDirSink {
    type Output = PathBuf;

    async fn write(&self, frame: &DataFrame, name: &str, append: bool) -> Result<PathBuf, SinkError> {
        let requested = self.path_for(name)?;
        if let Some(parent) = requested.parent() {
            fs::create_dir_all(parent).await.context(IoSnafu { path: parent })?;
        }
        let bytes = write_csv(frame).context(ConversionSnafu)?;

        let path = if append && exists(&requested).await? {
            let mut file = fs::OpenOptions::new()
                .append(true)
                .open(&requested)
                .await
                .context(IoSnafu { path: &requested })?;
            file.write_all(b"\n").await.context(IoSnafu { path: &requested })?;
            file.write_all(&bytes).await.context(IoSnafu { path: &requested })?;
            file.flush().await.context(IoSnafu { path: &requested })?;
            requested
        } else {
            let path = free_path(&requested).await?;
            fs::write(&path, &bytes).await.context(IoSnafu { path: &path })?;
            path
        };

        info!(path = %path.display(), rows = frame.height(), append, "Wrote frame");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;
    use tempfile::tempdir;

    use super::*;

    fn frame(value: i64) -> DataFrame {
        DataFrame::new(vec![Column::new("a".into(), [value]), Column::new("b".into(), ["x"])]).unwrap()
    }

    #[tokio::test]
    async fn existing_sink_gets_a_numbered_sibling() {
        let dir = tempdir().unwrap();
        let sink = CsvDirSink::new(dir.path());

        let first = sink.write(&frame(1), "out.csv", false).await.unwrap();
        let second = sink.write(&frame(2), "out.csv", false).await.unwrap();
        let third = sink.write(&frame(3), "out.csv", false).await.unwrap();

        assert_eq!(first, dir.path().join("out.csv"));
        assert_eq!(second, dir.path().join("out(1).csv"));
        assert_eq!(third, dir.path().join("out(2).csv"));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "a,b\n1,x\n");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "a,b\n2,x\n");
    }

    #[tokio::test]
    async fn append_adds_a_separator_and_a_second_header() {
        let dir = tempdir().unwrap();
        let sink = CsvDirSink::new(dir.path());

        sink.write(&frame(1), "pv.csv", false).await.unwrap();
        let path = sink.write(&frame(2), "pv.csv", true).await.unwrap();

        assert_eq!(path, dir.path().join("pv.csv"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,x\n\na,b\n2,x\n");
    }

    #[tokio::test]
    async fn append_to_a_missing_sink_just_writes() {
        let dir = tempdir().unwrap();
        let sink = CsvDirSink::new(dir.path());
        let path = sink.write(&frame(1), "fresh.csv", true).await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a,b\n1,x\n");
    }

    #[tokio::test]
    async fn intermediate_directories_are_created() {
        let dir = tempdir().unwrap();
        let sink = CsvDirSink::new(dir.path().join("data"));
        let path = sink.write(&frame(1), "weather/history.csv", false).await.unwrap();
        assert!(path.ends_with("data/weather/history.csv"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn names_escaping_the_root_are_rejected() {
        let dir = tempdir().unwrap();
        let sink = CsvDirSink::new(dir.path());
        let err = sink.write(&frame(1), "../out.csv", false).await.unwrap_err();
        assert!(matches!(err, SinkError::InvalidName { .. }));
    }
}
