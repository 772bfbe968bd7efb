use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// jdk-installer CLI 应用程序
#[derive(Parser)]
#[command(name = "jdk-installer")]
#[command(about = "从 JDK 目录解析、下载并安装指定版本的 JDK，支持本机和 SSH 远程主机", long_about = None)]
#[command(version)]
pub struct Cli {
    /// 配置文件路径
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 顶级命令
#[derive(Subcommand)]
pub enum Commands {
    /// 安装 JDK 到本机或远程主机
    Install {
        /// JDK 版本，例如 7u15、6u39、1.5.0_22
        version: String,
        /// 安装到本机（未指定 --host 时默认）
        #[arg(long)]
        local: bool,
        /// 远程主机，可重复指定
        #[arg(long = "host")]
        hosts: Vec<String>,
        /// 远程主机上的工具目录
        #[arg(long)]
        remote_tools: Option<PathBuf>,
        /// 接受许可协议
        #[arg(long)]
        accept_license: bool,
        /// 接受的许可协议标题
        #[arg(long)]
        license_title: Option<String>,
        /// JSON 格式输出
        #[arg(long)]
        json: bool,
    },
    /// 解析版本对应的下载文件
    Resolve {
        /// JDK 版本
        version: String,
        /// 操作系统（uname -s），默认检测本机
        #[arg(long, requires = "arch")]
        os: Option<String>,
        /// 架构（uname -m）
        #[arg(long, requires = "os")]
        arch: Option<String>,
        /// 直接指定平台标识，例如 linux-x64
        #[arg(long, conflicts_with_all = ["os", "arch"])]
        platform: Option<String>,
        /// JSON 格式输出
        #[arg(long)]
        json: bool,
    },
    /// 列出目录中的版本
    List {
        /// JSON 格式输出
        #[arg(long)]
        json: bool,
    },
    /// 强制更新目录缓存
    Refresh,
    /// 计算平台标识
    Platform {
        /// 操作系统（uname -s）
        #[arg(long)]
        os: String,
        /// 架构（uname -m）
        #[arg(long)]
        arch: String,
        /// JDK 主版本
        #[arg(long, default_value = "7")]
        major: String,
    },
}

impl Commands {
    /// 出错时展示给用户的操作名称
    pub fn operation(&self) -> &'static str {
        match self {
            Commands::Install { .. } => "安装 JDK",
            Commands::Resolve { .. } => "解析 JDK 下载文件",
            Commands::List { .. } => "读取 JDK 目录",
            Commands::Refresh => "更新 JDK 目录",
            Commands::Platform { .. } => "计算平台标识",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install() {
        let cli = Cli::try_parse_from([
            "jdk-installer",
            "install",
            "7u15",
            "--host",
            "deploy@app1",
            "--host",
            "deploy@app2",
            "--accept-license",
        ])
        .unwrap();
        match cli.command {
            Commands::Install {
                version,
                hosts,
                accept_license,
                local,
                ..
            } => {
                assert_eq!(version, "7u15");
                assert_eq!(hosts, ["deploy@app1", "deploy@app2"]);
                assert!(accept_license);
                assert!(!local);
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_resolve_platform_conflicts_with_os() {
        assert!(Cli::try_parse_from([
            "jdk-installer",
            "resolve",
            "7u15",
            "--platform",
            "linux-x64",
            "--os",
            "Linux",
            "--arch",
            "x86_64",
        ])
        .is_err());
    }
}
