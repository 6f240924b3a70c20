use crate::config::UnpackConfig;
use crate::download::{DownloadSummary, Downloader};
use crate::extract::extract_all;
use crate::json::read_index;
use crate::overrides::merge_overrides;
use crate::workspace::{Cleanup, Workspace};
use anyhow::Context;
use tokio::fs;

const MAX_CONCURRENT_EXTRACTIONS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackReport {
    pub extracted: usize,
    pub overrides: usize,
    /// `None` when the pack had no `modrinth.index.json`.
    pub downloads: Option<DownloadSummary>,
    pub cleanup: Cleanup,
}

/// Installs the pack at `config.pack_path` into `config.output_dir`.
///
/// Staging, extraction, override merging and manifest parsing errors are fatal. Individual
/// download failures are not; they only show up in the returned report.
pub async fn unpack(config: &UnpackConfig) -> anyhow::Result<UnpackReport> {
    info!("Unpacking {}", config.pack_path.to_string_lossy());

    let workspace = Workspace::stage(&config.pack_path, &config.work_dir)
        .await
        .context("Error staging modpack")?;

    let res = unpack_staged(config, &workspace).await;
    if res.is_err() {
        if let Err(e) = workspace.remove_archive().await {
            warn!("{:#}", e);
        }
    }

    res
}

async fn unpack_staged(config: &UnpackConfig, workspace: &Workspace) -> anyhow::Result<UnpackReport> {
    let pack_dir = workspace.extract_path();

    let extracted = extract_all(workspace.zip_path(), pack_dir, MAX_CONCURRENT_EXTRACTIONS)
        .await
        .context("Error extracting modpack")?;
    workspace.remove_archive().await?;

    fs::create_dir_all(&config.output_dir).await.with_context(|| {
        format!(
            "Error creating output dir {}",
            config.output_dir.to_string_lossy()
        )
    })?;

    let overrides = merge_overrides(pack_dir, &config.output_dir, config.side)
        .await
        .context("Error merging overrides")?;

    let downloads = match read_index(pack_dir).await? {
        Some(index) => {
            info!(
                "Modpack {} {} ({} files)",
                index.name,
                index.version_id,
                index.files.len()
            );
            for (dependency, version) in &index.dependencies {
                info!("Requires {} {}", dependency, version);
            }

            let downloader = Downloader::new(config)?;
            Some(
                downloader
                    .download_all(index.files, &config.output_dir)
                    .await,
            )
        }
        None => {
            info!("No modrinth.index.json file found.");
            None
        }
    };

    let cleanup = workspace.cleanup().await.context("Error cleaning up")?;

    Ok(UnpackReport {
        extracted,
        overrides,
        downloads,
        cleanup,
    })
}
