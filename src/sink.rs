use bytes::Bytes;
use futures::SinkExt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;
use tokio::fs::{File, OpenOptions};
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tracing::{debug, info};

use crate::codec::LineCodec;

#[derive(Debug, ThisError)]
pub enum SinkError {
    #[error("failed to open output file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),
}

/// Appends every line received on `lines` to the file at `path`, creating it if needed.
///
/// Runs until every sender is dropped, so lines queued before a shutdown are still written. A
/// write error ends the task: output must not be silently lost.
pub async fn write_out(path: PathBuf, mut lines: mpsc::Receiver<Bytes>) -> Result<(), SinkError> {
    let file = open(&path).await.map_err(|source| SinkError::Open {
        path: path.clone(),
        source,
    })?;
    let mut writer = FramedWrite::new(file, LineCodec);

    info!(path = %path.display(), "writing output");

    while let Some(line) = lines.recv().await {
        debug!(?line, "writing line");
        writer.send(line).await?;
    }

    writer.close().await?;
    Ok(())
}

async fn open(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "existing\n").unwrap();

        let (tx, rx) = mpsc::channel(4);
        let writer = tokio::spawn(write_out(path.clone(), rx));

        tx.send(Bytes::from("bar")).await.unwrap();
        tx.send(Bytes::from("egg")).await.unwrap();
        drop(tx);
        writer.await.unwrap().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "existing\nbar\negg\n");
    }

    #[tokio::test]
    async fn open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let (_tx, rx) = mpsc::channel(1);
        let err = write_out(path, rx).await.err().unwrap();

        assert!(matches!(err, SinkError::Open { .. }));
    }
}
