// Subprocess generation pipeline
// Runs an external generator (section split, image fetch, render) as a child
// process: request JSON on stdin, finished article on stdout.
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use vivid_core::port::{
    GenerationArtifact, GenerationPipeline, GenerationRequest, PipelineError, TimeProvider,
};

/// Grace period between SIGTERM and SIGKILL on timeout
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest stderr tail carried in a failure message
const MAX_STDERR_TAIL: usize = 2_000;

/// Environment passed through by default
pub const DEFAULT_ENV_ALLOWLIST: &[&str] = &["PATH", "HOME", "LANG", "TMPDIR"];

/// Default limit for one generation (5 minutes)
pub const DEFAULT_PIPELINE_TIMEOUT_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct SubprocessPipelineConfig {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Variables copied from our environment; everything else is dropped
    pub env_allowlist: Vec<String>,
    pub timeout_ms: i64,
}

impl SubprocessPipelineConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            env_allowlist: DEFAULT_ENV_ALLOWLIST.iter().map(|v| v.to_string()).collect(),
            timeout_ms: DEFAULT_PIPELINE_TIMEOUT_MS,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Generation pipeline backed by an external command
pub struct SubprocessPipeline {
    config: SubprocessPipelineConfig,
    time_provider: Arc<dyn TimeProvider>,
}

impl SubprocessPipeline {
    pub fn new(config: SubprocessPipelineConfig, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            config,
            time_provider,
        }
    }

    /// Allowlisted subset of `vars`
    fn filter_env<I>(&self, vars: I) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter(|(k, _)| self.config.env_allowlist.contains(k))
            .collect()
    }

    fn spawn(&self, request: &GenerationRequest) -> Result<Child, PipelineError> {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .env_clear()
            .envs(self.filter_env(std::env::vars()))
            .env("VIVID_OWNER_ID", &request.owner_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        command
            .spawn()
            .map_err(|e| PipelineError::SpawnFailed(format!("{}: {}", self.config.command, e)))
    }

    async fn run(&self, request: &GenerationRequest) -> Result<GenerationArtifact, PipelineError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| PipelineError::IoError(e.to_string()))?;
        let started_at = self.time_provider.now_millis();

        let mut child = self.spawn(request)?;
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await
            })
        });
        let stdout = child.stdout.take().map(read_all);
        let stderr = child.stderr.take().map(read_all);

        info!(
            command = %self.config.command,
            pid = ?child.id(),
            owner_id = %request.owner_id,
            timeout_ms = self.config.timeout_ms,
            "Generation pipeline started"
        );

        let limit = Duration::from_millis(self.config.timeout_ms.max(0) as u64);
        let status = match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status.map_err(|e| PipelineError::IoError(e.to_string()))?,
            Err(_) => {
                terminate(&mut child).await;
                return Err(PipelineError::Timeout(self.config.timeout_ms));
            }
        };

        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    warn!(error = %e, "Failed to write request to pipeline stdin");
                }
                _ => {}
            }
        }
        let stdout = collect(stdout).await;
        let stderr = collect(stderr).await;
        let duration_ms = self.time_provider.now_millis() - started_at;

        info!(
            command = %self.config.command,
            exit_code = ?status.code(),
            duration_ms = duration_ms,
            "Generation pipeline finished"
        );

        build_artifact(status, stdout, stderr, duration_ms)
    }
}

fn read_all<R>(mut reader: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf).await;
        buf
    })
}

async fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    match handle {
        Some(handle) => String::from_utf8_lossy(&handle.await.unwrap_or_default()).into_owned(),
        None => String::new(),
    }
}

fn build_artifact(
    status: ExitStatus,
    stdout: String,
    stderr: String,
    duration_ms: i64,
) -> Result<GenerationArtifact, PipelineError> {
    if !status.success() {
        return Err(PipelineError::Failed {
            exit_code: status.code(),
            message: stderr_tail(&stderr),
        });
    }
    if stdout.trim().is_empty() {
        return Err(PipelineError::Failed {
            exit_code: status.code(),
            message: "pipeline produced no output".to_string(),
        });
    }
    Ok(GenerationArtifact {
        body: stdout,
        duration_ms,
    })
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= MAX_STDERR_TAIL {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - MAX_STDERR_TAIL;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}

/// SIGTERM first, SIGKILL if the child ignores it
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            info!(pid = pid, "Sending SIGTERM to timed out pipeline");
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, child.wait())
                    .await
                    .is_ok()
            {
                info!(pid = pid, "Pipeline exited after SIGTERM");
                return;
            }
            warn!(pid = pid, "Pipeline did not exit after SIGTERM, sending SIGKILL");
        }
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill pipeline process");
    }
}

#[async_trait]
impl GenerationPipeline for SubprocessPipeline {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationArtifact, PipelineError> {
        self.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vivid_core::port::time_provider::SystemTimeProvider;

    fn pipeline(config: SubprocessPipelineConfig) -> SubprocessPipeline {
        SubprocessPipeline::new(config, Arc::new(SystemTimeProvider))
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("alice", "Northern lights", "Aurora over the fjord")
    }

    #[tokio::test]
    async fn test_generate_echoes_request() {
        let pipeline = pipeline(SubprocessPipelineConfig::new("/bin/sh").with_args(["-c", "cat"]));

        let artifact = pipeline.generate(&request()).await.unwrap();

        let echoed: GenerationRequest = serde_json::from_str(&artifact.body).unwrap();
        assert_eq!(echoed, request());
        assert!(artifact.duration_ms >= 0);
    }

    #[tokio::test]
    async fn test_generate_nonzero_exit() {
        let pipeline = pipeline(
            SubprocessPipelineConfig::new("/bin/sh").with_args(["-c", "echo no images >&2; exit 3"]),
        );

        match pipeline.generate(&request()).await {
            Err(PipelineError::Failed { exit_code, message }) => {
                assert_eq!(exit_code, Some(3));
                assert!(message.contains("no images"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_empty_output_is_failure() {
        let pipeline = pipeline(SubprocessPipelineConfig::new("/bin/sh").with_args(["-c", "true"]));
        assert!(matches!(
            pipeline.generate(&request()).await,
            Err(PipelineError::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_generate_timeout() {
        let pipeline = pipeline(
            SubprocessPipelineConfig::new("/bin/sh")
                .with_args(["-c", "sleep 10"])
                .with_timeout_ms(100),
        );

        let result = pipeline.generate(&request()).await;

        assert!(matches!(result, Err(PipelineError::Timeout(100))));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let pipeline = pipeline(SubprocessPipelineConfig::new("/definitely/not/a/generator"));
        assert!(matches!(
            pipeline.generate(&request()).await,
            Err(PipelineError::SpawnFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_owner_id_is_exported() {
        let pipeline = pipeline(
            SubprocessPipelineConfig::new("/bin/sh").with_args(["-c", "printf %s \"$VIVID_OWNER_ID\""]),
        );
        let artifact = pipeline.generate(&request()).await.unwrap();
        assert_eq!(artifact.body, "alice");
    }

    #[test]
    fn test_env_filtering() {
        let mut config = SubprocessPipelineConfig::new("gen");
        config.env_allowlist = vec!["ALLOWED_VAR".to_string()];
        let pipeline = pipeline(config);

        let filtered = pipeline.filter_env(vec![
            ("ALLOWED_VAR".to_string(), "value1".to_string()),
            ("BLOCKED_VAR".to_string(), "value2".to_string()),
        ]);

        assert_eq!(filtered, vec![("ALLOWED_VAR".to_string(), "value1".to_string())]);
    }

    #[test]
    fn test_stderr_tail_keeps_the_end() {
        let long = format!("{}END", "x".repeat(5_000));
        let tail = stderr_tail(&long);
        assert_eq!(tail.len(), MAX_STDERR_TAIL);
        assert!(tail.ends_with("END"));
    }
}
