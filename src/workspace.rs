use crate::json::INDEX_FILE_NAME;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Folder inside the work root that holds everything this tool stages. Nothing outside it is
/// ever removed.
pub const STAGING_DIR_NAME: &str = "mrpack-unpacker";

/// Scratch state for one unpack: a `.zip` copy of the pack and the folder it is extracted into.
#[derive(Debug)]
pub struct Workspace {
    zip_path: PathBuf,
    extract_path: PathBuf,
}

/// What was left behind when the extraction folder was cleaned up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    Removed,
    Retained(Vec<String>),
}

impl Workspace {
    /// Copies `pack_path` to `<work_root>/mrpack-unpacker/<stem>.zip`. The original is left
    /// alone.
    pub async fn stage(pack_path: &Path, work_root: &Path) -> anyhow::Result<Self> {
        let stem = pack_path
            .file_stem()
            .ok_or(anyhow!("Modpack file has no file name"))?;

        let staging_root = work_root.join(STAGING_DIR_NAME);
        let zip_path = staging_root.join(format!("{}.zip", stem.to_string_lossy()));
        let extract_path = staging_root.join(stem);

        fs::create_dir_all(&staging_root).await.with_context(|| {
            format!("Error creating work dir {}", staging_root.to_string_lossy())
        })?;

        // Leftovers from an earlier aborted run would otherwise end up in the output.
        if fs::metadata(&extract_path).await.is_ok() {
            debug!("Removing stale {}", extract_path.to_string_lossy());
            fs::remove_dir_all(&extract_path).await.with_context(|| {
                format!(
                    "Error removing stale extraction dir {}",
                    extract_path.to_string_lossy()
                )
            })?;
        }

        fs::copy(pack_path, &zip_path).await.with_context(|| {
            format!(
                "Error copying {} to {}",
                pack_path.to_string_lossy(),
                zip_path.to_string_lossy()
            )
        })?;

        info!("Copied modpack to {}", zip_path.to_string_lossy());

        Ok(Self {
            zip_path,
            extract_path,
        })
    }

    pub fn zip_path(&self) -> &Path {
        &self.zip_path
    }

    pub fn extract_path(&self) -> &Path {
        &self.extract_path
    }

    pub async fn remove_archive(&self) -> anyhow::Result<()> {
        if fs::metadata(&self.zip_path).await.is_ok() {
            fs::remove_file(&self.zip_path).await.with_context(|| {
                format!("Error removing {}", self.zip_path.to_string_lossy())
            })?;
        }
        Ok(())
    }

    /// Deletes the manifest, then the extraction folder if nothing else is left in it.
    pub async fn cleanup(&self) -> anyhow::Result<Cleanup> {
        let index_path = self.extract_path.join(INDEX_FILE_NAME);
        if fs::metadata(&index_path).await.is_ok() {
            fs::remove_file(&index_path)
                .await
                .with_context(|| format!("Error removing {}", index_path.to_string_lossy()))?;
        }

        if fs::metadata(&self.extract_path).await.is_err() {
            return Ok(Cleanup::Removed);
        }

        let mut remaining = Vec::new();
        let mut dir = fs::read_dir(&self.extract_path).await.with_context(|| {
            format!("Error listing {}", self.extract_path.to_string_lossy())
        })?;
        while let Some(entry) = dir.next_entry().await? {
            remaining.push(entry.file_name().to_string_lossy().into_owned());
        }

        if remaining.is_empty() {
            fs::remove_dir(&self.extract_path).await.with_context(|| {
                format!("Error removing {}", self.extract_path.to_string_lossy())
            })?;
            // Other runs may still be using the staging root.
            if let Some(staging_root) = self.extract_path.parent() {
                fs::remove_dir(staging_root).await.ok();
            }
            Ok(Cleanup::Removed)
        } else {
            remaining.sort();
            warn!(
                "Some files remained in the folder {}:\n\t{}",
                self.extract_path.to_string_lossy(),
                remaining.join("\n\t")
            );
            Ok(Cleanup::Retained(remaining))
        }
    }
}
