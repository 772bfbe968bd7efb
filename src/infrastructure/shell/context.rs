//! 命令执行上下文
//!
//! 安装流程只通过这里的接口与本机或远程主机交互，两种实现的语义完全一致。

use super::quote::{quote_path, shell_quote};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// 命令执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code().unwrap_or(-1),
        }
    }
}

#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// 用于日志和错误信息的名称
    fn name(&self) -> &str;

    /// 本机上下文中，本地路径与目标路径指向同一个文件系统
    fn is_local(&self) -> bool {
        false
    }

    async fn run_command(&self, cmdline: &str, env: &[(String, String)]) -> AppResult<CommandOutput>;

    async fn transfer_file(&self, local: &Path, remote: &Path) -> AppResult<()>;

    async fn file_exists(&self, path: &Path) -> AppResult<bool> {
        let output = self
            .run_command(&format!("test -f {}", quote_path(path)), &[])
            .await?;
        Ok(output.success())
    }

    /// 执行命令，非零退出码视为错误
    async fn check(&self, cmdline: &str) -> AppResult<String> {
        let output = self.run_command(cmdline, &[]).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(AppError::Command {
                context: self.name().to_string(),
                command: cmdline.to_string(),
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    /// `uname -s` 与 `uname -m`
    async fn uname(&self) -> AppResult<(String, String)> {
        let os = self.check("uname -s").await?;
        let arch = self.check("uname -m").await?;
        Ok((os.trim().to_string(), arch.trim().to_string()))
    }
}

/// 本机执行
#[derive(Debug, Clone, Default)]
pub struct LocalContext;

impl LocalContext {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionContext for LocalContext {
    fn name(&self) -> &str {
        "localhost"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn run_command(&self, cmdline: &str, env: &[(String, String)]) -> AppResult<CommandOutput> {
        debug!("[localhost] {}", cmdline);
        let output = Command::new("sh")
            .arg("-c")
            .arg(cmdline)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .await?;
        Ok(output.into())
    }

    async fn transfer_file(&self, local: &Path, remote: &Path) -> AppResult<()> {
        if local == remote {
            return Ok(());
        }
        if let Some(parent) = remote.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local, remote)
            .await
            .map_err(|e| AppError::Transfer {
                local: local.display().to_string(),
                remote: remote.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn file_exists(&self, path: &Path) -> AppResult<bool> {
        Ok(tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }
}

/// 通过 ssh/scp 在远程主机上执行
#[derive(Debug, Clone)]
pub struct SshContext {
    host: String,
    ssh: PathBuf,
    scp: PathBuf,
}

impl SshContext {
    /// `host` 可以是 `user@host` 形式
    pub fn new(host: &str) -> AppResult<Self> {
        let ssh = which::which("ssh").map_err(|e| AppError::config(format!("未找到 ssh: {}", e)))?;
        let scp = which::which("scp").map_err(|e| AppError::config(format!("未找到 scp: {}", e)))?;
        Ok(Self {
            host: host.to_string(),
            ssh,
            scp,
        })
    }

    /// 远端 shell 收到的完整命令行
    pub fn remote_command_line(cmdline: &str, env: &[(String, String)]) -> String {
        let mut line = String::new();
        if !env.is_empty() {
            line.push_str("env ");
            for (key, value) in env {
                line.push_str(&format!("{}={} ", key, shell_quote(value)));
            }
        }
        line.push_str("sh -c ");
        line.push_str(&shell_quote(cmdline));
        line
    }
}

#[async_trait]
impl ExecutionContext for SshContext {
    fn name(&self) -> &str {
        &self.host
    }

    async fn run_command(&self, cmdline: &str, env: &[(String, String)]) -> AppResult<CommandOutput> {
        debug!("[{}] {}", self.host, cmdline);
        let output = Command::new(&self.ssh)
            .args(["-o", "BatchMode=yes"])
            .arg(&self.host)
            .arg(Self::remote_command_line(cmdline, env))
            .output()
            .await?;
        Ok(output.into())
    }

    async fn transfer_file(&self, local: &Path, remote: &Path) -> AppResult<()> {
        if let Some(parent) = remote.parent() {
            self.check(&format!("mkdir -p {}", quote_path(parent))).await?;
        }
        let target = format!("{}:{}", self.host, remote.display());
        let output: CommandOutput = Command::new(&self.scp)
            .args(["-q", "-o", "BatchMode=yes"])
            .arg(local)
            .arg(&target)
            .output()
            .await?
            .into();
        if !output.success() {
            return Err(AppError::Transfer {
                local: local.display().to_string(),
                remote: target,
                message: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_run_command() {
        let ctx = LocalContext::new();
        let output = ctx
            .run_command("echo \"$GREETING\"", &[("GREETING".to_string(), "hello".to_string())])
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");

        let failed = ctx.run_command("exit 3", &[]).await.unwrap();
        assert_eq!(failed.status, 3);
        assert!(matches!(ctx.check("exit 3").await, Err(AppError::Command { status: 3, .. })));
    }

    #[tokio::test]
    async fn test_local_transfer_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("archive.tar.gz");
        std::fs::write(&local, b"data").unwrap();
        let remote = dir.path().join("remote").join("archive.tar.gz");

        let ctx = LocalContext::new();
        assert!(!ctx.file_exists(&remote).await.unwrap());
        ctx.transfer_file(&local, &remote).await.unwrap();
        assert!(ctx.file_exists(&remote).await.unwrap());
        assert_eq!(std::fs::read(&remote).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_local_uname() {
        let (os, arch) = LocalContext::new().uname().await.unwrap();
        assert!(!os.is_empty());
        assert!(!arch.is_empty());
    }

    #[test]
    fn test_remote_command_line() {
        let line = SshContext::remote_command_line(
            "test -d \"/opt/jdk\"",
            &[("JAVA_HOME".to_string(), "/opt/jdk".to_string())],
        );
        assert_eq!(line, "env JAVA_HOME=\"/opt/jdk\" sh -c \"test -d \\\"/opt/jdk\\\"\"");
    }
}
