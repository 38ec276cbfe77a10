use std::path::{Path, PathBuf};

use crate::{
    error::{JoinError, JoinResult},
    naming::sanitize_file_name,
    tool::ExternalTool,
    workspace::{Manifest, Workspace},
};

/// Output of the metadata repair stage.
#[derive(Debug)]
pub struct RepairedFragments {
    /// Closed concat manifest listing every repaired fragment.
    pub manifest: PathBuf,
    /// Repaired copies inside the workspace, in input order.
    pub fragments: Vec<PathBuf>,
    /// Sum of the repaired fragment sizes in kilobytes.
    pub total_kb: u64,
}

/// Path of the repaired copy of the `index`-th fragment.
///
/// The index keeps fragments with the same file name apart, and quotes are
/// stripped so the path can be written into the manifest verbatim.
pub fn repaired_path<P, W>(fragment: P, index: usize, workspace: W) -> PathBuf
where
    P: AsRef<Path>,
    W: AsRef<Path>,
{
    let fragment = fragment.as_ref();
    let filename = sanitize_file_name(
        fragment
            .file_name()
            .unwrap_or_else(|| fragment.as_os_str()),
    );
    workspace.as_ref().join(format!("{index:06}_{filename}"))
}

/// Run the repair tool on every fragment in order, writing the repaired
/// copies into the workspace and listing them in the manifest.
///
/// The first failure aborts the whole stage.
pub async fn repair_fragments<P>(
    tool: &ExternalTool,
    fragments: &[P],
    workspace: &Workspace,
    mut manifest: Manifest,
) -> JoinResult<RepairedFragments>
where
    P: AsRef<Path>,
{
    let mut repaired = Vec::with_capacity(fragments.len());
    for (index, fragment) in fragments.iter().enumerate() {
        let fragment = fragment.as_ref();
        let destination = repaired_path(fragment, index, workspace.path());

        tracing::info!("Fixing metadata for {}", fragment.display());
        repair_fragment(tool, fragment, &destination).await?;

        manifest.push(&destination)?;
        repaired.push(destination);
    }

    let mut total_kb = 0;
    for fragment in &repaired {
        let metadata = tokio::fs::metadata(fragment).await?;
        total_kb += metadata.len() / 1024;
    }

    let manifest = manifest.finish()?;
    tracing::debug!(
        "Wrote manifest {} with {} entries, {total_kb} kB in total",
        manifest.display(),
        repaired.len()
    );

    Ok(RepairedFragments {
        manifest,
        fragments: repaired,
        total_kb,
    })
}

async fn repair_fragment(tool: &ExternalTool, input: &Path, output: &Path) -> JoinResult<()> {
    let mut command = tool.command();
    command.arg("-i").arg(input).arg("-o").arg(output);
    tracing::debug!("Running {command:?}");

    let result = command.output().await.map_err(|source| JoinError::Spawn {
        tool: tool.name(),
        source,
    })?;

    if !result.status.success() {
        let mut output = String::from_utf8_lossy(&result.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&result.stderr));
        return Err(JoinError::ExternalTool {
            tool: tool.name(),
            status: result.status,
            output: output.trim().to_string(),
        });
    }

    Ok(())
}
