use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

use crate::error::JoinResult;

/// An external program the pipeline shells out to.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: PathBuf,
    /// Arguments placed before the ones the pipeline adds, e.g. a script
    /// path when the program is an interpreter.
    leading_args: Vec<OsString>,
}

impl ExternalTool {
    pub fn new<P>(program: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Look up `name` in `PATH`.
    pub fn find(name: &str) -> JoinResult<Self> {
        let program = which::which(name)?;
        tracing::debug!("Found {name} at {}", program.display());
        Ok(Self::new(program))
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.leading_args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}
