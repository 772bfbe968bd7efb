//! 安装校验与回滚

use super::planner::InstallPlan;
use crate::error::{AppError, AppResult};
use crate::infrastructure::shell::context::ExecutionContext;
use crate::infrastructure::shell::quote::quote_path;
use std::path::Path;
use tracing::{info, warn};

pub fn installed_check(destination: &Path) -> String {
    format!(
        "test -d {} && test -x {}",
        quote_path(destination),
        quote_path(&destination.join("bin").join("java"))
    )
}

/// 目标目录存在且包含可执行的 `bin/java`
pub async fn is_installed(ctx: &dyn ExecutionContext, destination: &Path) -> AppResult<bool> {
    let output = ctx.run_command(&installed_check(destination), &[]).await?;
    Ok(output.success())
}

/// 需要删除的目录：macOS 上是整个 `*.jdk` 包，其余平台就是 JAVA_HOME
fn rollback_root(destination: &Path) -> &Path {
    if destination.ends_with("Contents/Home") {
        if let Some(bundle) = destination.parent().and_then(Path::parent) {
            if bundle.extension().is_some_and(|ext| ext == "jdk") {
                return bundle;
            }
        }
    }
    destination
}

pub async fn rollback(ctx: &dyn ExecutionContext, destination: &Path) -> AppResult<()> {
    let root = rollback_root(destination);
    warn!("[{}] 回滚安装: {}", ctx.name(), root.display());
    ctx.check(&format!("rm -rf {}", quote_path(root))).await?;
    Ok(())
}

async fn fail(ctx: &dyn ExecutionContext, destination: &Path, message: String) -> AppError {
    if let Err(e) = rollback(ctx, destination).await {
        warn!("[{}] 回滚失败: {}", ctx.name(), e);
    }
    AppError::verification(&destination.display().to_string(), message)
}

/// 执行安装命令并校验结果，任何一步失败都会删除目标目录
pub async fn execute_plan(ctx: &dyn ExecutionContext, plan: &InstallPlan, destination: &Path) -> AppResult<()> {
    info!("[{}] 安装 JDK 到 {}", ctx.name(), destination.display());
    if let Err(e) = ctx.check(&plan.command_line()).await {
        if let Err(rollback_error) = rollback(ctx, destination).await {
            warn!("[{}] 回滚失败: {}", ctx.name(), rollback_error);
        }
        return Err(e);
    }

    if let Some(probe) = &plan.probe {
        let output = ctx.run_command(probe, &[]).await?;
        if !output.success() {
            let message = format!("java -version 退出码 {}: {}", output.status, output.stderr.trim());
            return Err(fail(ctx, destination, message).await);
        }
    }

    if !is_installed(ctx, destination).await? {
        return Err(fail(ctx, destination, "安装完成后未找到可执行的 bin/java".to_string()).await);
    }

    info!("[{}] 安装完成: {}", ctx.name(), destination.display());
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infrastructure::installer::planner::plan_install;
    use crate::environments::java::catalog::ReleaseInfo;
    use crate::infrastructure::shell::context::CommandOutput;
    use async_trait::async_trait;
    use sha2::{Digest, Sha256};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// 模拟的目标主机：记录所有命令，按命令前缀模拟文件系统
    pub(crate) struct MockContext {
        pub uname: (String, String),
        /// 安装命令执行后 JDK 是否可用
        pub install_works: bool,
        pub probe_works: bool,
        pub installed: Mutex<bool>,
        pub files: Mutex<HashMap<PathBuf, Vec<u8>>>,
        pub commands: Mutex<Vec<String>>,
        pub transfers: Mutex<Vec<PathBuf>>,
    }

    impl MockContext {
        pub fn new() -> Self {
            Self {
                uname: ("Linux".to_string(), "x86_64".to_string()),
                install_works: true,
                probe_works: true,
                installed: Mutex::new(false),
                files: Mutex::new(HashMap::new()),
                commands: Mutex::new(Vec::new()),
                transfers: Mutex::new(Vec::new()),
            }
        }

        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }

        pub fn is_installed(&self) -> bool {
            *self.installed.lock().unwrap()
        }

        /// 命令中第一个被引号包住的参数
        fn first_quoted(cmdline: &str) -> PathBuf {
            let rest = cmdline.split_once('"').map(|(_, r)| r).unwrap_or("");
            PathBuf::from(rest.split_once('"').map(|(p, _)| p).unwrap_or(""))
        }

        fn reply(status: i32, stdout: String) -> CommandOutput {
            CommandOutput {
                stdout,
                stderr: String::new(),
                status,
            }
        }
    }

    #[async_trait]
    impl ExecutionContext for MockContext {
        fn name(&self) -> &str {
            "mock"
        }

        async fn run_command(&self, cmdline: &str, _env: &[(String, String)]) -> AppResult<CommandOutput> {
            self.commands.lock().unwrap().push(cmdline.to_string());
            let status = |ok: bool| if ok { 0 } else { 1 };

            let output = if cmdline == "uname -s" {
                Self::reply(0, format!("{}\n", self.uname.0))
            } else if cmdline == "uname -m" {
                Self::reply(0, format!("{}\n", self.uname.1))
            } else if cmdline.starts_with("test -d ") {
                Self::reply(status(self.is_installed()), String::new())
            } else if cmdline.starts_with("test -f ") {
                let exists = self.files.lock().unwrap().contains_key(&Self::first_quoted(cmdline));
                Self::reply(status(exists), String::new())
            } else if cmdline.ends_with(" -version") {
                Self::reply(status(self.probe_works), String::new())
            } else if cmdline.starts_with("rm -rf ") {
                *self.installed.lock().unwrap() = false;
                Self::reply(0, String::new())
            } else if cmdline.starts_with("wc -c ") {
                match self.files.lock().unwrap().get(&Self::first_quoted(cmdline)) {
                    Some(data) => Self::reply(0, format!("{}\n", data.len())),
                    None => Self::reply(1, String::new()),
                }
            } else if cmdline.starts_with("sha256sum ") {
                let path = Self::first_quoted(cmdline);
                match self.files.lock().unwrap().get(&path) {
                    Some(data) => Self::reply(
                        0,
                        format!("{}  {}\n", hex::encode(Sha256::digest(data)), path.display()),
                    ),
                    None => Self::reply(1, String::new()),
                }
            } else if cmdline.starts_with("mkdir -p ") {
                *self.installed.lock().unwrap() = self.install_works;
                Self::reply(0, String::new())
            } else {
                Self::reply(0, String::new())
            };
            Ok(output)
        }

        async fn transfer_file(&self, local: &Path, remote: &Path) -> AppResult<()> {
            let data = std::fs::read(local)?;
            self.files.lock().unwrap().insert(remote.to_path_buf(), data);
            self.transfers.lock().unwrap().push(remote.to_path_buf());
            Ok(())
        }
    }

    fn tarball_plan(dest: &Path) -> InstallPlan {
        let info = ReleaseInfo::parse_release_name("jdk-7u15").unwrap();
        plan_install(&info, Path::new("/t/jdk-7u15-linux-x64.tar.gz"), dest).unwrap()
    }

    #[test]
    fn test_installed_check() {
        assert_eq!(
            installed_check(Path::new("/t/jdk1.7.0_15")),
            "test -d \"/t/jdk1.7.0_15\" && test -x \"/t/jdk1.7.0_15/bin/java\""
        );
    }

    #[tokio::test]
    async fn test_successful_install() {
        let ctx = MockContext::new();
        let dest = Path::new("/t/jdk1.7.0_15");

        assert!(!is_installed(&ctx, dest).await.unwrap());
        execute_plan(&ctx, &tarball_plan(dest), dest).await.unwrap();
        assert!(ctx.is_installed());
        assert!(!ctx.commands().iter().any(|c| c.starts_with("rm -rf")));
    }

    #[tokio::test]
    async fn test_failed_java_version_rolls_back() {
        let mut ctx = MockContext::new();
        ctx.probe_works = false;
        let dest = Path::new("/t/jdk1.7.0_15");

        let result = execute_plan(&ctx, &tarball_plan(dest), dest).await;
        assert!(matches!(result, Err(AppError::InstallVerification { .. })));
        assert!(ctx.commands().contains(&"rm -rf \"/t/jdk1.7.0_15\"".to_string()));
        assert!(!is_installed(&ctx, dest).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_java_after_install_rolls_back() {
        let mut ctx = MockContext::new();
        ctx.install_works = false;
        let dest = Path::new("/t/jdk1.7.0_15");

        let result = execute_plan(&ctx, &tarball_plan(dest), dest).await;
        assert!(matches!(result, Err(AppError::InstallVerification { .. })));
        assert_eq!(ctx.commands().last().map(String::as_str), Some("rm -rf \"/t/jdk1.7.0_15\""));
    }

    #[tokio::test]
    async fn test_dmg_rollback_removes_bundle() {
        let mut ctx = MockContext::new();
        ctx.install_works = false;
        let dest = Path::new("/Library/Java/JavaVirtualMachines/jdk1.7.0_15.jdk/Contents/Home");
        let info = ReleaseInfo::parse_release_name("jdk-7u15").unwrap();
        let plan = plan_install(&info, Path::new("/t/jdk-7u15-macosx-x64.dmg"), dest).unwrap();

        let result = execute_plan(&ctx, &plan, dest).await;
        assert!(matches!(result, Err(AppError::InstallVerification { .. })));
        assert_eq!(
            ctx.commands().last().map(String::as_str),
            Some("rm -rf \"/Library/Java/JavaVirtualMachines/jdk1.7.0_15.jdk\"")
        );
    }

    #[test]
    fn test_rollback_root() {
        let home = Path::new("/t/jdk1.7.0_15");
        assert_eq!(rollback_root(home), home);
        // 不是 .jdk 包时只删除 Home 本身
        let odd = Path::new("/t/jdk1.7.0_15/Contents/Home");
        assert_eq!(rollback_root(odd), odd);
    }
}
