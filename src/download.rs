use crate::config::UnpackConfig;
use crate::error::DownloadError;
use crate::json::{FileJson, Side};
use anyhow::Context;
use bytes::{Buf, Bytes};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use reqwest::{Client, StatusCode};
use sha1::Sha1;
use sha2::{Digest, Sha512};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub bytes: u64,
}

pub struct Downloader {
    client: Arc<Client>,
    max_concurrent: usize,
    conn_timeout: Duration,
    verify: bool,
    side: Option<Side>,
}

impl Downloader {
    pub fn new(config: &UnpackConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Error building HTTP client")?;

        Ok(Self {
            client: Arc::new(client),
            max_concurrent: config.concurrency.max(1),
            conn_timeout: config.timeout,
            verify: config.verify,
            side: config.side,
        })
    }

    /// Downloads every wanted file in `files` below `output_path`, at most `max_concurrent` at a
    /// time. Only the first URL of each entry is tried, and only once. Failures are logged and
    /// counted; this returns after every download has finished one way or the other.
    pub async fn download_all(&self, files: Vec<FileJson>, output_path: &Path) -> DownloadSummary {
        let mut summary = DownloadSummary::default();

        let files: Vec<FileJson> = files
            .into_iter()
            .filter(|file| {
                let wanted = !file.downloads.is_empty() && file.is_wanted(self.side);
                if !wanted {
                    debug!("Skipping {}", file.path);
                    summary.skipped += 1;
                }
                wanted
            })
            .collect();

        info!("Downloading {} files...", files.len());

        let progress = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")
        {
            progress.set_style(style);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut futures = FuturesUnordered::<JoinHandle<Result<u64, DownloadError>>>::new();

        for file in files {
            let client = self.client.clone();
            let semaphore = semaphore.clone();
            let progress = progress.clone();
            let output_path = output_path.to_path_buf();
            let conn_timeout = self.conn_timeout;
            let verify = self.verify;

            futures.push(tokio::spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();

                let res = download_file(&client, &file, &output_path, conn_timeout, verify).await;
                report_result(&progress, &file, &res);

                res
            }));
        }

        while let Some(res) = futures.next().await {
            match res {
                Ok(Ok(len)) => {
                    summary.succeeded += 1;
                    summary.bytes += len;
                }
                Ok(Err(_)) => summary.failed += 1,
                Err(e) => {
                    error!("Download task failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        progress.finish_and_clear();

        info!(
            "Downloaded {} files ({}), {} failed, {} skipped.",
            summary.succeeded,
            HumanBytes(summary.bytes),
            summary.failed,
            summary.skipped
        );

        summary
    }
}

/// Logs the outcome of one download and advances the bar. The bar is cleared while the line is
/// written so the two don't interleave on the terminal.
fn report_result(progress: &ProgressBar, file: &FileJson, res: &Result<u64, DownloadError>) {
    progress.suspend(|| match res {
        Ok(len) => info!(
            "File {} downloaded successfully ({})",
            file.file_name(),
            HumanBytes(*len)
        ),
        Err(e) => error!("Error downloading file {}: {}", file.file_name(), e),
    });

    progress.set_message(file.file_name().to_string());
    progress.inc(1);
}

/// Fetches one manifest entry from its first URL. A partially written file is removed again on
/// failure.
async fn download_file(
    client: &Client,
    file: &FileJson,
    output_path: &Path,
    conn_timeout: Duration,
    verify: bool,
) -> Result<u64, DownloadError> {
    let dest = destination_path(output_path, &file.path)?;
    // Entries with no URL never reach this point.
    let url = &file.downloads[0];

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e))?;
    }

    let res = timeout(conn_timeout, client.get(url.as_str()).send())
        .await
        .map_err(|_| DownloadError::ConnectTimeout)??;

    if res.status() != StatusCode::OK {
        return Err(DownloadError::BadStatus(res.status()));
    }

    let mut output = File::create(&dest)
        .await
        .map_err(|e| DownloadError::io(&dest, e))?;

    let written = write_body(res, &mut output, &dest, conn_timeout).await;
    drop(output);

    let written = written.and_then(|(len, digest)| {
        if verify {
            check_file(file, len, &digest)?;
        }
        Ok(len)
    });

    if written.is_err() {
        if let Err(e) = fs::remove_file(&dest).await {
            warn!(
                "Unable to remove partial download {}: {}",
                dest.to_string_lossy(),
                e
            );
        }
    }

    written
}

async fn write_body(
    res: reqwest::Response,
    output: &mut File,
    dest: &Path,
    conn_timeout: Duration,
) -> Result<(u64, Digests), DownloadError> {
    let mut digests = Digests::default();
    let mut written = 0u64;
    let mut stream = res.bytes_stream();

    while let Some(item) = timeout(conn_timeout, stream.next())
        .await
        .map_err(|_| DownloadError::ChunkTimeout)?
    {
        let chunk: Bytes = item?;

        output
            .write_all(chunk.chunk())
            .await
            .map_err(|e| DownloadError::io(dest, e))?;

        digests.update(chunk.chunk());
        written += chunk.len() as u64;
    }

    output
        .flush()
        .await
        .map_err(|e| DownloadError::io(dest, e))?;

    Ok((written, digests))
}

#[derive(Default)]
struct Digests {
    sha1: Sha1,
    sha512: Sha512,
}

impl Digests {
    fn update(&mut self, data: &[u8]) {
        self.sha1.update(data);
        self.sha512.update(data);
    }
}

/// Compares the downloaded bytes with the size and hash the manifest gives. SHA-512 is preferred
/// over SHA-1; a manifest without either is trusted as-is.
fn check_file(file: &FileJson, len: u64, digests: &Digests) -> Result<(), DownloadError> {
    if file.file_size > 0 && file.file_size != len {
        return Err(DownloadError::SizeMismatch {
            expected: file.file_size,
            actual: len,
        });
    }

    let (algorithm, expected, actual) = if let Some(expected) = &file.hashes.sha512 {
        ("SHA-512", expected, hex::encode(digests.sha512.clone().finalize()))
    } else if let Some(expected) = &file.hashes.sha1 {
        ("SHA-1", expected, hex::encode(digests.sha1.clone().finalize()))
    } else {
        return Ok(());
    };

    if !expected.eq_ignore_ascii_case(&actual) {
        return Err(DownloadError::HashMismatch {
            algorithm,
            expected: expected.clone(),
            actual,
        });
    }

    Ok(())
}

/// Resolves a manifest path against the output dir. Absolute paths, drive letters and `..` are
/// refused.
fn destination_path(output_path: &Path, path: &str) -> Result<PathBuf, DownloadError> {
    let unsafe_path = || DownloadError::UnsafePath(path.to_string());

    let normalized = path.replace('\\', "/");
    // Drive letters only parse as a `Prefix` on Windows.
    let bytes = normalized.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(unsafe_path());
    }

    let mut dest = output_path.to_path_buf();
    let mut parts = 0;
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => {
                dest.push(part);
                parts += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path())
            }
        }
    }

    if parts == 0 {
        return Err(unsafe_path());
    }

    Ok(dest)
}
