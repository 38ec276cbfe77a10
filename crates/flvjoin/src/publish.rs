use std::path::Path;

use crate::error::JoinResult;

/// Move the joined file out of the workspace to its final name.
///
/// This is a single rename, so nothing is visible under `destination` until
/// the whole output is. The workspace lives next to the destination, which
/// keeps the rename on one filesystem.
pub async fn publish<S, D>(staged: S, destination: D) -> JoinResult<()>
where
    S: AsRef<Path>,
    D: AsRef<Path>,
{
    let (staged, destination) = (staged.as_ref(), destination.as_ref());
    if destination.exists() {
        tracing::warn!("{} already exists, replacing it.", destination.display());
    }

    tracing::info!("Moving to {}", destination.display());
    tokio::fs::rename(staged, destination).await?;
    Ok(())
}
