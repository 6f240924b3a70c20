use crate::json::Side;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs;

const OVERRIDES_DIR: &str = "overrides";

/// Copies the pack's `overrides/` tree (and the one for `side`, if any) into `output_path`,
/// replacing files that already exist. All override trees are removed from `pack_dir`
/// afterwards. Returns the number of files copied.
pub async fn merge_overrides(
    pack_dir: &Path,
    output_path: &Path,
    side: Option<Side>,
) -> anyhow::Result<usize> {
    let mut copied = merge_dir(&pack_dir.join(OVERRIDES_DIR), output_path).await?;

    // Side specific overrides go on top of the common ones.
    if let Some(side) = side {
        debug!("Applying {} overrides", side);
        copied += merge_dir(&pack_dir.join(side.overrides_dir()), output_path).await?;
    }

    for dir in [Side::Client, Side::Server].map(Side::overrides_dir) {
        let path = pack_dir.join(dir);
        if fs::metadata(&path).await.is_ok() {
            debug!("Discarding {}", dir);
            fs::remove_dir_all(&path)
                .await
                .with_context(|| format!("Error removing {}", path.to_string_lossy()))?;
        }
    }

    info!(
        "{} override files moved to {} successfully.",
        copied,
        output_path.to_string_lossy()
    );

    Ok(copied)
}

async fn merge_dir(source: &Path, output_path: &Path) -> anyhow::Result<usize> {
    match fs::metadata(source).await {
        Ok(meta) if meta.is_dir() => {}
        _ => return Ok(0),
    }

    let copied = copy_tree(source, output_path)
        .await
        .with_context(|| format!("Error copying {}", source.to_string_lossy()))?;

    fs::remove_dir_all(source)
        .await
        .with_context(|| format!("Error removing {}", source.to_string_lossy()))?;

    Ok(copied)
}

async fn copy_tree(source: &Path, dest: &Path) -> anyhow::Result<usize> {
    let mut copied = 0;
    let mut pending: Vec<(PathBuf, PathBuf)> = vec![(source.to_path_buf(), dest.to_path_buf())];

    while let Some((from_dir, to_dir)) = pending.pop() {
        fs::create_dir_all(&to_dir)
            .await
            .with_context(|| format!("Error creating dir {}", to_dir.to_string_lossy()))?;

        let mut entries = fs::read_dir(&from_dir)
            .await
            .with_context(|| format!("Error listing {}", from_dir.to_string_lossy()))?;
        while let Some(entry) = entries.next_entry().await? {
            let from = entry.path();
            let to = to_dir.join(entry.file_name());

            if entry.file_type().await?.is_dir() {
                pending.push((from, to));
            } else {
                fs::copy(&from, &to).await.with_context(|| {
                    format!(
                        "Error copying {} to {}",
                        from.to_string_lossy(),
                        to.to_string_lossy()
                    )
                })?;
                copied += 1;
            }
        }
    }

    Ok(copied)
}
