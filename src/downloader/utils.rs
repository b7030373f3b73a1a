// Helper functions shared by the tool adapters and the pipeline

use std::process::Stdio;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::ToolConfig;
use super::errors::ServiceError;

/// Longest sanitized title, in characters
pub const MAX_FILENAME_LEN: usize = 100;

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*\x00-\x1f\x7f]"#).unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Map arbitrary title text to a filesystem-safe name of at most
/// `MAX_FILENAME_LEN` characters. Never returns an empty string.
pub fn sanitize_filename(title: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(title, "_");
    let collapsed = WHITESPACE.replace_all(&replaced, " ");
    let truncated: String = collapsed.trim().chars().take(MAX_FILENAME_LEN).collect();
    // Windows rejects trailing dots and spaces, leading dots hide files
    let cleaned = truncated.trim_matches(|c: char| c == '.' || c == ' ');

    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Run a program with an argument list and collect its output. `timeout_secs`
/// of `None` waits indefinitely.
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: Option<u64>,
) -> Result<std::process::Output, ServiceError> {
    debug!(program, args = %args.join(" "), "Running");

    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        ServiceError::Execution(format!("Failed to capture stdout from {}", program))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        ServiceError::Execution(format!("Failed to capture stderr from {}", program))
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let status = match timeout_secs {
        Some(secs) => match timeout(Duration::from_secs(secs), child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(ServiceError::Network(format!(
                    "{} timed out after {}s",
                    program, secs
                )));
            }
        },
        None => child.wait().await?,
    };

    let stdout = join_pipe(stdout_task).await?;
    let stderr = join_pipe(stderr_task).await?;
    Ok(std::process::Output {
        status,
        stdout,
        stderr,
    })
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, ServiceError> {
    task.await
        .map_err(|e| ServiceError::Execution(format!("pipe reader failed: {}", e)))?
        .map_err(ServiceError::Io)
}

/// Missing binaries become `ToolNotFound`, anything else stays I/O
pub fn spawn_error(program: &str, e: std::io::Error) -> ServiceError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ServiceError::ToolNotFound(program.to_string())
    } else {
        ServiceError::Io(e)
    }
}

/// Last few non-empty lines of stderr, for error messages
pub fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(3);
    lines[start..].join(" | ")
}

/// Build proxy and cookie arguments for yt-dlp
pub fn get_network_args(config: &ToolConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(proxy) = &config.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }

    if let Some(cookies) = &config.cookies_path {
        args.push("--cookies".to_string());
        args.push(cookies.clone());
    }

    args
}
