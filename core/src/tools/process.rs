//! Runs tools as child processes.
//!
//! One reader task per pipe forwards lines into the run's channel. Both pipes
//! are drained to EOF before the child is reaped, so a tool can never stall
//! on a full pipe buffer while we wait for it.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use netsift_common::error::ScanError;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Invocation, OutputLine, ToolRun, ToolRunner};

const LINE_BUFFER: usize = 256;
/// Lines of stderr quoted in a failure message.
const STDERR_TAIL: usize = 5;

pub struct ProcessRunner {
    kill_grace: Duration,
}

impl ProcessRunner {
    pub fn new(kill_grace: Duration) -> Self {
        Self { kill_grace }
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation, cancel: CancellationToken) -> Result<ToolRun, ScanError> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        debug!("Spawning {}", invocation.command_line());
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScanError::tool_failed(&invocation.program, format!("could not start: {e}")))?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                return Err(ScanError::tool_failed(
                    &invocation.program,
                    "output pipes were not captured",
                ));
            }
        };

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let mut readers = JoinSet::new();
        readers.spawn(forward_lines(stdout, tx.clone(), OutputLine::Stdout, 0));
        readers.spawn(forward_lines(stderr, tx, OutputLine::Stderr, STDERR_TAIL));

        let status = tokio::spawn(supervise(
            child,
            readers,
            invocation.clone(),
            cancel,
            self.kill_grace,
        ));
        Ok(ToolRun::new(rx, status))
    }
}

/// Forwards every line of `pipe` and returns the last `keep` of them.
///
/// Keeps reading after the receiver is gone, the child still needs its pipe
/// emptied.
async fn forward_lines<R>(
    pipe: R,
    tx: mpsc::Sender<OutputLine>,
    wrap: fn(String) -> OutputLine,
    keep: usize,
) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(pipe).lines();
    let mut tail = VecDeque::with_capacity(keep);
    let mut forwarding = true;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading tool output: {e}");
                break;
            }
        };

        if keep > 0 {
            if tail.len() == keep {
                tail.pop_front();
            }
            tail.push_back(line.clone());
        }

        if forwarding && tx.send(wrap(line)).await.is_err() {
            forwarding = false;
        }
    }

    tail.into()
}

async fn supervise(
    mut child: Child,
    mut readers: JoinSet<Vec<String>>,
    invocation: Invocation,
    cancel: CancellationToken,
    grace: Duration,
) -> Result<(), ScanError> {
    let tool = invocation.program.as_str();
    let ceiling = async {
        match invocation.ceiling {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(ceiling);

    let mut stderr_tail = Vec::new();
    let interrupted = loop {
        tokio::select! {
            joined = readers.join_next() => match joined {
                Some(Ok(tail)) => stderr_tail.extend(tail),
                Some(Err(e)) => warn!("Output reader for {tool} died: {e}"),
                None => break None,
            },

            _ = cancel.cancelled() => break Some(ScanError::Cancelled),

            _ = &mut ceiling => {
                let secs = invocation.ceiling.map(|c| c.as_secs()).unwrap_or_default();
                break Some(ScanError::tool_failed(tool, format!("exceeded its {secs}s time limit")));
            }
        }
    };

    if let Some(err) = interrupted {
        debug!("Stopping {tool}: {err}");
        if let Err(e) = child.start_kill() {
            debug!("Kill of {tool} failed, it probably exited already: {e}");
        }

        let drained = tokio::time::timeout(grace, async {
            while readers.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("{tool} did not close its output within {}ms", grace.as_millis());
            readers.abort_all();
        }
        if tokio::time::timeout(grace, child.wait()).await.is_err() {
            warn!("{tool} did not exit within {}ms of being killed", grace.as_millis());
        }
        return Err(err);
    }

    let status = child
        .wait()
        .await
        .map_err(|e| ScanError::tool_failed(tool, format!("could not be awaited: {e}")))?;

    match status.code() {
        Some(code) if invocation.ok_exit_codes.contains(&code) => Ok(()),
        Some(code) => {
            let mut reason = format!("exited with status {code}");
            if !stderr_tail.is_empty() {
                reason.push_str(": ");
                reason.push_str(&stderr_tail.join(" | "));
            }
            Err(ScanError::tool_failed(tool, reason))
        }
        None => Err(ScanError::tool_failed(tool, "terminated by a signal")),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tools::Capability;
    use std::time::Instant;

    fn sh(script: &str) -> Invocation {
        Invocation {
            capability: Capability::Reachability,
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            ok_exit_codes: vec![0],
            ceiling: None,
        }
    }

    async fn collect(mut run: ToolRun) -> (Vec<OutputLine>, Result<(), ScanError>) {
        let mut lines = Vec::new();
        while let Some(line) = run.next_line().await {
            lines.push(line);
        }
        (lines, run.finish().await)
    }

    #[tokio::test]
    async fn streams_both_pipes() {
        let runner = ProcessRunner::new(Duration::from_millis(500));
        let run = runner
            .run(&sh("echo 10.0.0.1; echo oops >&2"), CancellationToken::new())
            .await
            .unwrap();
        let (lines, result) = collect(run).await;

        assert!(result.is_ok());
        assert!(lines.contains(&OutputLine::Stdout("10.0.0.1".into())));
        assert!(lines.contains(&OutputLine::Stderr("oops".into())));
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let runner = ProcessRunner::new(Duration::from_millis(500));
        let run = runner
            .run(&sh("echo 'no such device' >&2; exit 2"), CancellationToken::new())
            .await
            .unwrap();
        let (_, result) = collect(run).await;

        match result {
            Err(ScanError::ToolFailed { reason, .. }) => {
                assert!(reason.contains("status 2"));
                assert!(reason.contains("no such device"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn tolerated_exit_code_is_success() {
        let runner = ProcessRunner::new(Duration::from_millis(500));
        let mut invocation = sh("exit 1");
        invocation.ok_exit_codes = vec![0, 1];
        let run = runner.run(&invocation, CancellationToken::new()).await.unwrap();
        assert!(run.finish().await.is_ok());
    }

    #[tokio::test]
    async fn cancellation_kills_within_grace() {
        let runner = ProcessRunner::new(Duration::from_millis(500));
        let cancel = CancellationToken::new();
        let run = runner.run(&sh("sleep 30"), cancel.clone()).await.unwrap();

        let started = Instant::now();
        cancel.cancel();
        let result = run.finish().await;

        assert!(matches!(result, Err(ScanError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn ceiling_stops_a_hung_tool() {
        let runner = ProcessRunner::new(Duration::from_millis(200));
        let mut invocation = sh("sleep 30");
        invocation.ceiling = Some(Duration::from_millis(100));
        let run = runner.run(&invocation, CancellationToken::new()).await.unwrap();

        assert!(matches!(run.finish().await, Err(ScanError::ToolFailed { .. })));
    }

    #[tokio::test]
    async fn missing_program_fails_to_start() {
        let runner = ProcessRunner::new(Duration::from_millis(200));
        let mut invocation = sh("true");
        invocation.program = "netsift-no-such-tool".into();
        let result = runner.run(&invocation, CancellationToken::new()).await;
        assert!(matches!(result, Err(ScanError::ToolFailed { .. })));
    }
}
