//! Local preview playback through an external audio player process

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{oneshot, Mutex};

use crate::error::{SessionError, SessionResult};
use crate::model::PreviewPlayer;

/// Plays preview clips by handing the URL to a command line player
/// (`mpv --no-video` by default).
///
/// At most one clip runs at a time. The child is killed on `stop` or when a
/// new clip starts.
pub struct ProcessPreviewPlayer {
    program: String,
    args: Vec<String>,
    running: Mutex<Option<oneshot::Sender<()>>>,
}

impl ProcessPreviewPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            running: Mutex::new(None),
        }
    }

    /// Build from a whitespace separated command line, e.g. `mpv --no-video`
    pub fn from_command_line(command: &str) -> SessionResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| SessionError::PreviewFailed("empty preview command".into()))?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    async fn kill_running(&self) {
        if let Some(kill) = self.running.lock().await.take() {
            let _ = kill.send(());
        }
    }
}

#[async_trait]
impl PreviewPlayer for ProcessPreviewPlayer {
    async fn play_url(&self, url: &str) -> SessionResult<oneshot::Receiver<SessionResult<()>>> {
        self.kill_running().await;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SessionError::PreviewFailed(format!("could not start {}: {}", self.program, e)))?;

        tracing::debug!(program = %self.program, url, pid = ?child.id(), "Preview process started");

        let (kill_tx, kill_rx) = oneshot::channel();
        let (ended_tx, ended_rx) = oneshot::channel();
        *self.running.lock().await = Some(kill_tx);

        let program = self.program.clone();
        tokio::spawn(async move {
            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = kill_rx => None,
            };

            match exited {
                Some(status) => {
                    let end = match status {
                        Ok(status) if status.success() => {
                            tracing::debug!(program = %program, "Preview finished");
                            Ok(())
                        }
                        Ok(status) => {
                            tracing::warn!(program = %program, %status, "Preview player exited abnormally");
                            Err(SessionError::PreviewFailed(format!("{} exited with {}", program, status)))
                        }
                        Err(e) => {
                            tracing::warn!(program = %program, error = %e, "Lost track of preview process");
                            Err(SessionError::PreviewFailed(format!("lost track of {}: {}", program, e)))
                        }
                    };
                    let _ = ended_tx.send(end);
                }
                // Stopped: ended_tx is dropped without sending
                None => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(program = %program, error = %e, "Failed to kill preview process");
                    }
                }
            }
        });

        Ok(ended_rx)
    }

    async fn stop(&self) {
        self.kill_running().await;
    }
}
