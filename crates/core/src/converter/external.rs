//! Converter that shells out to LibreOffice, ImageMagick, Ghostscript and Tesseract.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::routes::{OutputLayout, ToolRoute};
use super::traits::Converter;
use super::types::{ConversionJob, ToolKind, ToolOutcome};
use crate::metrics;

/// How long to wait for the output readers once the process has exited.
const CAPTURE_GRACE: Duration = Duration::from_secs(2);

/// Converter backed by external command-line tools.
pub struct ExternalToolConverter {
    config: ConverterConfig,
}

impl ExternalToolConverter {
    /// Creates a new converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    async fn run_tool(
        &self,
        job: &ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ToolOutcome, ConverterError> {
        let route = ToolRoute::resolve(job.source_format, job.target_format)?;
        check_source_readable(&job.input_path).await?;

        if cancel.is_cancelled() {
            return Err(ConverterError::Cancelled);
        }

        let output_dir = job
            .output_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|_| ConverterError::OutputDirectoryFailed {
                path: output_dir.clone(),
            })?;

        // A leftover file would mask a tool that writes nothing
        let _ = tokio::fs::remove_file(&job.output_path).await;

        let scratch = output_dir.join(format!(".{}.scratch", job.job_id));
        if route.layout() == OutputLayout::OutDir {
            tokio::fs::create_dir_all(&scratch).await?;
        }

        let result = self.spawn_and_wait(job, &route, &scratch, cancel).await;

        if route.layout() == OutputLayout::OutDir {
            if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
                debug!(path = %scratch.display(), error = %e, "Failed to remove scratch directory");
            }
        }

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                // Partial output from a failed, killed or empty run
                if let Err(rm) = tokio::fs::remove_file(&job.output_path).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        debug!(path = %job.output_path.display(), error = %rm, "Failed to remove partial output");
                    }
                }
                return Err(e);
            }
        };
        metrics::CONVERSION_DURATION
            .with_label_values(&[route.tool.name()])
            .observe(outcome.duration_ms as f64 / 1000.0);
        Ok(outcome)
    }

    async fn spawn_and_wait(
        &self,
        job: &ConversionJob,
        route: &ToolRoute,
        scratch: &Path,
        cancel: CancellationToken,
    ) -> Result<ToolOutcome, ConverterError> {
        let start = Instant::now();
        let program = self.config.tool_path(route.tool);
        let args = route.build_args(&self.config, &job.input_path, &job.output_path, scratch);

        info!(
            job_id = %job.job_id,
            tool = %route.tool,
            source_format = %job.source_format,
            target_format = %job.target_format,
            "Starting external tool"
        );
        debug!(job_id = %job.job_id, program = %program.display(), ?args, "Tool command line");

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::ToolNotFound {
                        tool: route.tool,
                        path: program.to_path_buf(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let max_bytes = self.config.max_diagnostic_bytes;
        let stdout_task = child
            .stdout
            .take()
            .map(|out| spawn_capture(out, job.job_id.clone(), "stdout", max_bytes));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| spawn_capture(err, job.job_id.clone(), "stderr", max_bytes));

        let timeout_ms = self.config.tool_timeout_ms;
        let waited: Result<ExitStatus, ConverterError> = tokio::select! {
            res = timeout(Duration::from_millis(timeout_ms), child.wait()) => match res {
                Ok(status) => status.map_err(ConverterError::Io),
                Err(_) => Err(ConverterError::Timeout { timeout_ms }),
            },
            _ = cancel.cancelled() => Err(ConverterError::Cancelled),
        };

        let status = match waited {
            Ok(status) => status,
            Err(e) => {
                // Kill the process on timeout or cancellation
                let _ = child.kill().await;
                abort_capture(stdout_task);
                abort_capture(stderr_task);
                match &e {
                    ConverterError::Timeout { .. } => {
                        warn!(job_id = %job.job_id, tool = %route.tool, timeout_ms, "Tool timed out, process killed")
                    }
                    _ => info!(job_id = %job.job_id, tool = %route.tool, "Tool cancelled, process killed"),
                }
                return Err(e);
            }
        };

        let stdout = collect_capture(stdout_task).await;
        let stderr = collect_capture(stderr_task).await;
        let diagnostics = merge_diagnostics(&stdout, &stderr);

        if !status.success() {
            warn!(
                job_id = %job.job_id,
                tool = %route.tool,
                code = ?status.code(),
                "Tool exited with failure"
            );
            return Err(ConverterError::ToolExecutionFailed {
                tool: route.tool,
                code: status.code(),
                diagnostics,
            });
        }

        let produced = route.produced_path(&job.input_path, &job.output_path, scratch);
        if produced != job.output_path && tokio::fs::metadata(&produced).await.is_ok() {
            tokio::fs::rename(&produced, &job.output_path).await?;
        }

        let output_size_bytes = match tokio::fs::metadata(&job.output_path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => meta.len(),
            _ => {
                return Err(ConverterError::OutputNotProduced {
                    tool: route.tool,
                    path: job.output_path.clone(),
                    diagnostics,
                })
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            job_id = %job.job_id,
            tool = %route.tool,
            duration_ms,
            output_size_bytes,
            "Tool finished"
        );

        Ok(ToolOutcome {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes,
            duration_ms,
            tool: route.tool,
        })
    }
}

#[async_trait]
impl Converter for ExternalToolConverter {
    fn name(&self) -> &str {
        "external-tools"
    }

    async fn convert_cancellable(
        &self,
        job: ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ToolOutcome, ConverterError> {
        self.run_tool(&job, cancel).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        for tool in ToolKind::ALL {
            let path = self.config.tool_path(tool);
            let flag = super::capabilities::version_flag(tool);
            if let Err(e) = Command::new(path)
                .arg(flag)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
            {
                if e.kind() == std::io::ErrorKind::NotFound {
                    return Err(ConverterError::ToolNotFound {
                        tool,
                        path: path.to_path_buf(),
                    });
                }
                return Err(ConverterError::Io(e));
            }
        }

        tokio::fs::create_dir_all(&self.config.work_dir).await?;

        Ok(())
    }
}

/// Fails with `SourceUnreadable` unless `path` is a regular file we can open.
async fn check_source_readable(path: &Path) -> Result<(), ConverterError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| ConverterError::source_unreadable(path, e.to_string()))?;
    if !meta.is_file() {
        return Err(ConverterError::source_unreadable(path, "not a regular file"));
    }
    tokio::fs::File::open(path)
        .await
        .map_err(|e| ConverterError::source_unreadable(path, e.to_string()))?;
    Ok(())
}

/// Keeps the last `max_bytes` worth of lines.
#[derive(Debug, Default)]
struct TailBuffer {
    lines: VecDeque<String>,
    bytes: usize,
    max_bytes: usize,
    truncated: bool,
}

impl TailBuffer {
    fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            ..Default::default()
        }
    }

    fn push(&mut self, line: String) {
        self.bytes += line.len() + 1;
        self.lines.push_back(line);
        while self.bytes > self.max_bytes {
            match self.lines.pop_front() {
                Some(dropped) => {
                    self.bytes -= dropped.len() + 1;
                    self.truncated = true;
                }
                None => break,
            }
        }
    }

    fn into_string(self) -> String {
        let mut out = String::with_capacity(self.bytes + 16);
        if self.truncated {
            out.push_str("[...]\n");
        }
        for line in self.lines {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

fn spawn_capture<R>(
    reader: R,
    job_id: String,
    stream: &'static str,
    max_bytes: usize,
) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut tail = TailBuffer::new(max_bytes);
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(job_id = %job_id, stream, "{}", line);
            tail.push(line);
        }
        tail.into_string()
    })
}

fn abort_capture(task: Option<JoinHandle<String>>) {
    if let Some(handle) = task {
        handle.abort();
    }
}

async fn collect_capture(task: Option<JoinHandle<String>>) -> String {
    let Some(handle) = task else {
        return String::new();
    };
    // Grandchildren may keep the pipe open after the tool exits
    match timeout(CAPTURE_GRACE, handle).await {
        Ok(Ok(output)) => output,
        _ => String::new(),
    }
}

fn merge_diagnostics(stdout: &str, stderr: &str) -> Option<String> {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, true) => None,
        (true, false) => Some(stderr.to_string()),
        (false, true) => Some(stdout.to_string()),
        (false, false) => Some(format!("{}{}", stderr, stdout)),
    }
}
