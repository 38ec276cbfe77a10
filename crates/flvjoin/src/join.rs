use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    concat::concatenate,
    error::{JoinError, JoinResult},
    naming::derive_output_path,
    progress::{ProgressMode, ProgressTracker},
    publish::publish,
    repair::repair_fragments,
    tool::ExternalTool,
    workspace::{Manifest, Workspace},
};

/// Joins FLV fragments into one file:
///
/// 1. every fragment gets its metadata repaired by `yamdi` into a private
///    workspace, and is listed in a concat manifest;
/// 2. `ffmpeg` concatenates the repaired fragments, its progress drawn as a
///    bar;
/// 3. the result is renamed to the output path.
///
/// The workspace is removed however the run ends, including on Ctrl-C.
pub struct Joiner {
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    repair_tool: Option<ExternalTool>,
    concat_tool: Option<ExternalTool>,
    workspace_root: Option<PathBuf>,
    progress: ProgressMode,
}

impl Joiner {
    /// Fragments are joined in the given order.
    pub fn new<I, P>(inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            output: None,
            repair_tool: None,
            concat_tool: None,
            workspace_root: None,
            progress: ProgressMode::Auto,
        }
    }

    /// Output path. Derived from the input names when not set.
    pub fn output(mut self, output: PathBuf) -> Self {
        self.output = Some(output);
        self
    }

    /// Metadata repair tool, `yamdi` from `PATH` by default.
    pub fn repair_tool(mut self, tool: ExternalTool) -> Self {
        self.repair_tool = Some(tool);
        self
    }

    /// Concatenation tool, `ffmpeg` from `PATH` by default.
    pub fn concat_tool(mut self, tool: ExternalTool) -> Self {
        self.concat_tool = Some(tool);
        self
    }

    /// Directory to create the workspace in. Defaults to the directory of
    /// the output, so publishing never crosses filesystems.
    pub fn workspace_root(mut self, root: PathBuf) -> Self {
        self.workspace_root = Some(root);
        self
    }

    pub fn progress(mut self, mode: ProgressMode) -> Self {
        self.progress = mode;
        self
    }

    /// Run the whole pipeline, returning the path of the joined file.
    pub async fn run(self) -> JoinResult<PathBuf> {
        if self.inputs.is_empty() {
            return Err(JoinError::NoInputs);
        }

        let output = self
            .output
            .unwrap_or_else(|| derive_output_path(&self.inputs));
        tracing::info!("Output filename: {}", output.display());

        let job = Job {
            repair_tool: resolve_tool(self.repair_tool, "yamdi")?,
            concat_tool: resolve_tool(self.concat_tool, "ffmpeg")?,
            inputs: self.inputs,
            output,
            progress: self.progress,
        };

        let root = self
            .workspace_root
            .unwrap_or_else(|| parent_dir(&job.output));
        let (workspace, manifest) = Workspace::create_in(root)?;
        let workspace = Arc::new(workspace);
        let interrupt_guard = workspace.guard_interrupts();

        let result = job.execute(&workspace, manifest).await;

        interrupt_guard.abort();
        workspace.cleanup();
        result.map(|()| job.output)
    }
}

const DEFAULT_EXTENSION: &str = "flv";

struct Job {
    inputs: Vec<PathBuf>,
    output: PathBuf,
    repair_tool: ExternalTool,
    concat_tool: ExternalTool,
    progress: ProgressMode,
}

impl Job {
    async fn execute(&self, workspace: &Workspace, manifest: Manifest) -> JoinResult<()> {
        let repaired =
            repair_fragments(&self.repair_tool, &self.inputs, workspace, manifest).await?;

        let staged = staged_path(workspace.path(), &self.output);

        tracing::info!("Joining {} fragments...", repaired.fragments.len());
        let progress = ProgressTracker::new(repaired.total_kb, self.progress);
        concatenate(&self.concat_tool, &repaired.manifest, &staged, &progress).await?;

        publish(&staged, &self.output).await
    }
}

fn resolve_tool(tool: Option<ExternalTool>, name: &str) -> JoinResult<ExternalTool> {
    match tool {
        Some(tool) => Ok(tool),
        None => ExternalTool::find(name),
    }
}

/// Where the joined file is written before publishing. The name keeps the
/// output's extension, which picks ffmpeg's muxer, and never collides with a
/// repaired fragment (`<index>_<name>`) or the manifest (`list*.txt`).
fn staged_path(workspace: &Path, output: &Path) -> PathBuf {
    let extension = output
        .extension()
        .unwrap_or(OsStr::new(DEFAULT_EXTENSION));
    workspace.join("output").with_extension(extension)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
