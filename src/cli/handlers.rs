use crate::cli::commands::*;
use crate::cli::output::{OutputFormat, FORMATTER};
use crate::environments::java::{resolve, JdkInstaller, ReleaseInfo, Target};
use crate::error::AppResult;
use crate::infrastructure::config::InstallerConfig;
use crate::infrastructure::remote::{platform_token, LicenseAcceptance, PlatformToken};
use crate::infrastructure::shell::context::{LocalContext, SshContext};
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// 命令处理器
pub struct CommandHandler {
    config: InstallerConfig,
}

impl CommandHandler {
    /// 加载配置并创建命令处理器
    pub fn new(config_path: Option<PathBuf>) -> AppResult<Self> {
        let config = match config_path {
            Some(path) => InstallerConfig::load_from(&path)?,
            None => InstallerConfig::load()?,
        };
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: InstallerConfig) -> Self {
        Self { config }
    }

    /// 处理命令
    pub async fn handle_command(&mut self, command: Commands) -> AppResult<()> {
        match command {
            Commands::Install {
                version,
                local,
                hosts,
                remote_tools,
                accept_license,
                license_title,
                json,
            } => {
                self.handle_install(
                    &version,
                    local,
                    hosts,
                    remote_tools,
                    accept_license,
                    license_title,
                    OutputFormat::from_flag(json),
                )
                .await
            }
            Commands::Resolve {
                version,
                os,
                arch,
                platform,
                json,
            } => {
                self.handle_resolve(&version, os, arch, platform, OutputFormat::from_flag(json))
                    .await
            }
            Commands::List { json } => self.handle_list(OutputFormat::from_flag(json)).await,
            Commands::Refresh => self.handle_refresh().await,
            Commands::Platform { os, arch, major } => {
                println!("{}", platform_token(&os, &arch, &major));
                Ok(())
            }
        }
    }

    /// 命令行参数覆盖配置文件中的许可设置
    fn license(&self, accept_license: bool, license_title: Option<String>) -> LicenseAcceptance {
        let mut license = self.config.license_acceptance();
        if accept_license {
            license.accepted = true;
        }
        if license_title.is_some() {
            license.title = license_title;
        }
        license
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_install(
        &self,
        version: &str,
        local: bool,
        hosts: Vec<String>,
        remote_tools: Option<PathBuf>,
        accept_license: bool,
        license_title: Option<String>,
        format: OutputFormat,
    ) -> AppResult<()> {
        let installer =
            JdkInstaller::from_config(&self.config)?.with_license(self.license(accept_license, license_title));

        let remote_tools = remote_tools.unwrap_or_else(|| self.config.paths.remote_tools.clone());
        let mut targets = Vec::new();
        if local || hosts.is_empty() {
            targets.push(Target::local(&self.config.paths.local_tools));
        }
        for host in &hosts {
            targets.push(Target::new(Arc::new(SshContext::new(host)?), &remote_tools));
        }

        info!("安装 JDK {} 到 {} 个目标", version, targets.len());
        let results = installer.setup_all(version, &targets).await?;

        let mut first_error = None;
        for (target, result) in targets.iter().zip(results) {
            match result {
                Ok(report) => print!("{}", FORMATTER.format_report(&report, format)?),
                Err(e) => {
                    eprint!("{}", FORMATTER.format_error(target.name(), &e.to_string(), format)?);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn handle_resolve(
        &self,
        version: &str,
        os: Option<String>,
        arch: Option<String>,
        platform: Option<String>,
        format: OutputFormat,
    ) -> AppResult<()> {
        let installer = JdkInstaller::from_config(&self.config)?;
        let catalog = installer.load_catalog().await?;

        let platform: PlatformToken = match (platform, os, arch) {
            (Some(platform), _, _) => platform.parse().unwrap_or_else(|never: Infallible| match never {}),
            (None, Some(os), Some(arch)) => {
                let requested = ReleaseInfo::parse_version_name(version)?;
                platform_token(&os, &arch, &requested.major_version)
            }
            _ => {
                let requested = ReleaseInfo::parse_version_name(version)?;
                JdkInstaller::detect_platform(&LocalContext::new(), &requested.major_version).await?
            }
        };

        let artifact = resolve(&catalog, version, &platform)?;
        print!(
            "{}",
            FORMATTER.format_artifact(&artifact, &self.config.paths.local_tools, format)?
        );
        Ok(())
    }

    async fn handle_list(&self, format: OutputFormat) -> AppResult<()> {
        let installer = JdkInstaller::from_config(&self.config)?;
        let catalog = installer.load_catalog().await?;
        print!("{}", FORMATTER.format_catalog(&catalog, format)?);
        Ok(())
    }

    async fn handle_refresh(&self) -> AppResult<()> {
        let installer = JdkInstaller::from_config(&self.config)?;
        let catalog = installer.refresh_catalog().await?;
        let entry = installer.cache().entry();
        println!(
            "目录已更新: {} ({} 个版本)",
            entry.path.display(),
            catalog.versions().len()
        );
        if let Some(fetched_at) = entry.fetched_at_local() {
            println!("更新时间: {}", fetched_at.format("%Y-%m-%d %H:%M:%S"));
        }
        Ok(())
    }
}
