use crate::utils::ResultExt;
use anyhow::Context;
use async_zip::read::fs::ZipFileReader;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Extracts every entry of `zip_path` below `output_path`, keeping the archive's folder layout.
/// Returns the number of files written. The first failing entry aborts the rest.
pub async fn extract_all(
    zip_path: &Path,
    output_path: &Path,
    max_concurrent: usize,
) -> anyhow::Result<usize> {
    let zip = Arc::new(
        ZipFileReader::new(zip_path)
            .await
            .context("Error opening modpack zip")?,
    );

    fs::create_dir_all(output_path)
        .await
        .with_context(|| format!("Error creating dir {}", output_path.to_string_lossy()))?;

    let entries = zip.entries();
    debug!("Modpack has {} zip entries", entries.len());

    let cancelled = Arc::new(AtomicBool::new(false));
    let extraction_count = Arc::new(AtomicUsize::new(0));
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut futures: FuturesUnordered<JoinHandle<anyhow::Result<()>>> = FuturesUnordered::new();

    for index in 0..entries.len() {
        let zip = zip.clone();
        let output_path = output_path.to_path_buf();
        let extraction_count = extraction_count.clone();
        let cancelled = cancelled.clone();
        let semaphore = semaphore.clone();

        futures.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .context("Error acquiring semaphore permit")?;

            if cancelled.load(Ordering::Acquire) {
                return Ok(());
            }

            let mut entry_reader = zip
                .entry_reader(index)
                .await
                .context("Error reading zip entry")
                .cancel(&cancelled)?;

            let entry_filename = entry_reader.entry().filename().replace('\\', "/");
            let relative = sanitize_entry_path(&entry_filename);
            if relative.as_os_str().is_empty() {
                return Ok(());
            }
            let extract_path = output_path.join(relative);

            if entry_filename.ends_with('/') {
                fs::create_dir_all(&extract_path)
                    .await
                    .with_context(|| {
                        format!("Error creating dir {}", extract_path.to_string_lossy())
                    })
                    .cancel(&cancelled)?;
                return Ok(());
            }

            if let Some(extract_parent) = extract_path.parent() {
                fs::create_dir_all(extract_parent)
                    .await
                    .with_context(|| {
                        format!("Error creating dir {}", extract_parent.to_string_lossy())
                    })
                    .cancel(&cancelled)?;
            }

            let mut writer = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&extract_path)
                .await
                .with_context(|| {
                    format!(
                        "Error opening destination file {}",
                        extract_path.to_string_lossy()
                    )
                })
                .cancel(&cancelled)?;

            io::copy(&mut entry_reader, &mut writer)
                .await
                .with_context(|| {
                    format!("Error writing to file {}", extract_path.to_string_lossy())
                })
                .cancel(&cancelled)?;

            extraction_count.fetch_add(1, Ordering::AcqRel);

            Ok(())
        }));
    }

    while let Some(res) = futures.next().await {
        res.context("Error waiting for file extraction")?
            .context("Error extracting file")?;
    }

    let extracted = extraction_count.load(Ordering::Acquire);
    info!("Extraction completed successfully ({} files).", extracted);

    Ok(extracted)
}

/// Turns a zip entry name into a relative path that cannot leave the extraction folder.
fn sanitize_entry_path(name: &str) -> PathBuf {
    // Backslash replacement is done earlier.
    name.split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .map(sanitize_filename::sanitize)
        .filter(|part| !part.is_empty())
        .collect()
}
