use std::{
    collections::VecDeque,
    path::Path,
    process::Stdio,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::{
    error::{JoinError, JoinResult},
    progress::{is_status_line, parse_progress_line, ProgressTracker},
    tool::ExternalTool,
};

/// Number of diagnostic lines kept for error reports.
const DIAGNOSTIC_TAIL: usize = 16;

/// How long a failed run waits for the listener to drain the last lines.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

type DiagnosticTail = Arc<Mutex<VecDeque<String>>>;

/// Concatenate the fragments listed in `manifest` into `output` with the
/// ffmpeg concat demuxer, copying streams without re-encoding.
///
/// ffmpeg's stderr is watched by a background task feeding `progress`. That
/// task is not joined: it stops by itself once the pipe closes, which
/// happens when ffmpeg exits. `progress` is finished once ffmpeg exits,
/// whether or not any status line was recognized.
pub async fn concatenate(
    tool: &ExternalTool,
    manifest: &Path,
    output: &Path,
    progress: &ProgressTracker,
) -> JoinResult<()> {
    let mut command = tool.command();
    command
        .args(["-nostdin", "-f", "concat", "-safe", "0", "-i"])
        .arg(manifest)
        .args(["-c", "copy"])
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    tracing::debug!("Running {command:?}");

    let mut child = command.spawn().map_err(|source| JoinError::Spawn {
        tool: tool.name(),
        source,
    })?;
    tracing::debug!("Concatenation running");

    let tail: DiagnosticTail = Arc::default();
    let listener = child
        .stderr
        .take()
        .map(|stderr| tokio::spawn(watch_progress(stderr, progress.clone(), tail.clone())));

    let status = child.wait().await?;
    progress.finish();

    if status.success() {
        tracing::debug!("Concatenation succeeded");
        return Ok(());
    }

    tracing::debug!("Concatenation failed with {status}");
    if let Some(listener) = listener {
        // the pipe is closed by now, give the listener a moment to record
        // ffmpeg's last words
        let _ = tokio::time::timeout(DRAIN_TIMEOUT, listener).await;
    }
    let output = tail
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    Err(JoinError::ExternalTool {
        tool: tool.name(),
        status,
        output,
    })
}

/// Read ffmpeg diagnostics until the stream ends.
///
/// ffmpeg rewrites its status line in place with `\r`, while everything else
/// ends with `\n`, so chunks are split on both.
async fn watch_progress<R>(stream: R, progress: ProgressTracker, tail: DiagnosticTail)
where
    R: AsyncRead + Unpin,
{
    let mut chunks = BufReader::new(stream).split(b'\r');
    loop {
        match chunks.next_segment().await {
            Ok(Some(chunk)) => {
                let chunk = String::from_utf8_lossy(&chunk);
                for line in chunk.lines() {
                    observe_line(line, &progress, &tail);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Stopped reading ffmpeg output: {e}");
                break;
            }
        }
    }
}

fn observe_line(line: &str, progress: &ProgressTracker, tail: &DiagnosticTail) {
    if is_status_line(line) {
        if let Some(kb) = parse_progress_line(line) {
            progress.set(kb);
        }
        return;
    }

    let line = line.trim_end();
    if line.is_empty() {
        return;
    }

    let mut tail = tail.lock().unwrap_or_else(|e| e.into_inner());
    if tail.len() == DIAGNOSTIC_TAIL {
        tail.pop_front();
    }
    tail.push_back(line.to_string());
}
