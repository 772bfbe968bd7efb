//! JDK 安装流程
//!
//! 对每个目标依次执行：检测平台、解析下载文件、下载到本地工具目录、
//! 按需上传到目标、未安装时执行安装并校验。本机与远程目标走同一条路径。

use super::catalog::{Catalog, ReleaseInfo};
use super::resolver::resolve;
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::InstallerConfig;
use crate::infrastructure::installer::{execute_plan, file_digest, is_installed, plan_install, FileDigest};
use crate::infrastructure::remote::{
    platform_token, AuthenticatedDownloader, CatalogCache, Credentials, DownloadOutcome, HttpClient,
    HttpTransport, LicenseAcceptance, PlatformToken,
};
use crate::infrastructure::shell::context::{ExecutionContext, LocalContext};
use crate::infrastructure::shell::quote::quote_path;
use futures_util::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// 安装目标：一个执行上下文加上它的工具目录
#[derive(Clone)]
pub struct Target {
    pub context: Arc<dyn ExecutionContext>,
    /// 安装包存放与解压的目录
    pub tools_root: PathBuf,
}

impl Target {
    pub fn new(context: Arc<dyn ExecutionContext>, tools_root: impl Into<PathBuf>) -> Self {
        Self {
            context,
            tools_root: tools_root.into(),
        }
    }

    pub fn local(tools_root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(LocalContext::new()), tools_root)
    }

    pub fn name(&self) -> &str {
        self.context.name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    AlreadyInstalled,
    Installed,
}

/// 单个目标的安装结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub target: String,
    pub platform: String,
    pub release: String,
    pub java_home: PathBuf,
    /// `<java_home>/bin/java`
    pub java_bin: PathBuf,
    /// 带上 JAVA_HOME 调用 java 的命令行，供后续任务使用
    pub java_cmd: String,
    pub archive: Option<PathBuf>,
    pub uploaded: bool,
    pub status: InstallStatus,
}

pub fn java_bin(java_home: &Path) -> PathBuf {
    java_home.join("bin").join("java")
}

/// `env JAVA_HOME="<home>" "<home>/bin/java"`
pub fn java_cmd(java_home: &Path) -> String {
    format!(
        "env JAVA_HOME={} {}",
        quote_path(java_home),
        quote_path(&java_bin(java_home))
    )
}

/// 下载完成、等待上传和安装的目标
#[derive(Debug, Clone)]
struct PreparedInstall {
    platform: PlatformToken,
    release: String,
    info: ReleaseInfo,
    java_home: PathBuf,
    /// 已安装时为 None
    local_archive: Option<PathBuf>,
}

pub struct JdkInstaller {
    cache: CatalogCache,
    downloader: AuthenticatedDownloader,
    local_tools: PathBuf,
    credentials: Option<Credentials>,
    license: LicenseAcceptance,
}

impl JdkInstaller {
    pub fn new(
        cache: CatalogCache,
        downloader: AuthenticatedDownloader,
        local_tools: impl Into<PathBuf>,
        license: LicenseAcceptance,
    ) -> Self {
        Self {
            cache,
            downloader,
            local_tools: local_tools.into(),
            credentials: None,
            license,
        }
    }

    /// 按配置创建，共用一个带 cookie 的 HTTP 客户端
    pub fn from_config(config: &InstallerConfig) -> AppResult<Self> {
        let client = HttpClient::with_timeouts(
            Duration::from_secs(config.download.connect_timeout_secs),
            config.download.timeout_secs.map(Duration::from_secs),
        )?
        .with_progress(config.download.show_progress);
        let transport: Arc<dyn HttpTransport> = Arc::new(client);

        let cache = CatalogCache::new(
            &config.catalog.uri,
            config.catalog_cache_path(),
            config.catalog.ttl(),
            config.catalog.keep_stale,
            transport.clone(),
        );
        let downloader = AuthenticatedDownloader::with_auth_host(transport, &config.download.auth_host);

        let credentials = match config.credentials() {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                debug!("未加载下载凭据: {}", e);
                None
            }
        };

        Ok(Self::new(cache, downloader, &config.paths.local_tools, config.license_acceptance())
            .with_credentials(credentials))
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_license(mut self, license: LicenseAcceptance) -> Self {
        self.license = license;
        self
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub fn local_tools(&self) -> &Path {
        &self.local_tools
    }

    /// 读取目录（优先使用未过期的缓存）
    pub async fn load_catalog(&self) -> AppResult<Catalog> {
        let raw = self.cache.get().await?;
        Catalog::parse_current(&String::from_utf8_lossy(&raw))
    }

    /// 强制更新目录缓存后解析
    pub async fn refresh_catalog(&self) -> AppResult<Catalog> {
        let raw = self.cache.refresh().await?;
        Catalog::parse_current(&String::from_utf8_lossy(&raw))
    }

    /// 通过 `uname` 检测目标平台
    pub async fn detect_platform(ctx: &dyn ExecutionContext, major_version: &str) -> AppResult<PlatformToken> {
        let (os, arch) = ctx.uname().await?;
        let token = platform_token(&os, &arch, major_version);
        debug!("[{}] {} {} -> {}", ctx.name(), os, arch, token);
        Ok(token)
    }

    /// 在单个目标上安装
    pub async fn setup(&self, catalog: &Catalog, version_name: &str, target: &Target) -> AppResult<InstallReport> {
        let prepared = self.prepare(catalog, version_name, target).await?;
        self.deploy(prepared, target).await
    }

    /// 依次为每个目标下载安装包（同一文件只下载一次），再并发上传和安装
    pub async fn setup_all(&self, version_name: &str, targets: &[Target]) -> AppResult<Vec<AppResult<InstallReport>>> {
        let catalog = self.load_catalog().await?;

        let mut prepared = Vec::with_capacity(targets.len());
        for target in targets {
            prepared.push(self.prepare(&catalog, version_name, target).await);
        }

        let installs = targets.iter().zip(prepared).map(|(target, prepared)| async move {
            match prepared {
                Ok(prepared) => self.deploy(prepared, target).await,
                Err(e) => Err(e),
            }
        });
        Ok(join_all(installs).await)
    }

    async fn prepare(&self, catalog: &Catalog, version_name: &str, target: &Target) -> AppResult<PreparedInstall> {
        let ctx = target.context.as_ref();
        let requested = ReleaseInfo::parse_version_name(version_name)?;
        let platform = Self::detect_platform(ctx, &requested.major_version).await?;

        let artifact = resolve(catalog, version_name, &platform)?;
        let java_home = artifact.install_path(&target.tools_root);

        let local_archive = if is_installed(ctx, &java_home).await? {
            info!("[{}] JDK 已安装: {}", ctx.name(), java_home.display());
            None
        } else {
            let archive = self.local_tools.join(artifact.basename());
            let credentials = match &self.credentials {
                Some(credentials) => credentials.clone(),
                None if archive.exists() => Credentials::default(),
                None => return Err(AppError::config("未配置下载账号或密码 (credentials)")),
            };
            if let DownloadOutcome::Downloaded { bytes } = self
                .downloader
                .download(&artifact, &archive, &credentials, &self.license)
                .await?
            {
                debug!("下载完成: {} ({} 字节)", archive.display(), bytes);
            }
            Some(archive)
        };

        Ok(PreparedInstall {
            platform: platform.clone(),
            release: artifact.release.name.clone(),
            info: artifact.info().clone(),
            java_home,
            local_archive,
        })
    }

    async fn deploy(&self, prepared: PreparedInstall, target: &Target) -> AppResult<InstallReport> {
        let ctx = target.context.as_ref();
        let mut report = InstallReport {
            target: ctx.name().to_string(),
            platform: prepared.platform.to_string(),
            release: prepared.release,
            java_home: prepared.java_home.clone(),
            java_bin: java_bin(&prepared.java_home),
            java_cmd: java_cmd(&prepared.java_home),
            archive: None,
            uploaded: false,
            status: InstallStatus::AlreadyInstalled,
        };

        let Some(local_archive) = prepared.local_archive else {
            return Ok(report);
        };

        let remote_archive = match local_archive.file_name() {
            Some(name) => target.tools_root.join(name),
            None => local_archive.clone(),
        };
        report.uploaded = upload_if_modified(ctx, &local_archive, &remote_archive).await?;

        let plan = plan_install(&prepared.info, &remote_archive, &prepared.java_home)?;
        execute_plan(ctx, &plan, &prepared.java_home).await?;

        report.archive = Some(remote_archive);
        report.status = InstallStatus::Installed;
        Ok(report)
    }
}

/// 目标上的文件大小与摘要，文件不存在时为 None
async fn remote_digest(ctx: &dyn ExecutionContext, path: &Path) -> AppResult<Option<FileDigest>> {
    let quoted = quote_path(path);
    let output = ctx.run_command(&format!("wc -c < {}", quoted), &[]).await?;
    let size = match output.stdout.trim().parse::<u64>() {
        Ok(size) if output.success() => size,
        _ => return Ok(None),
    };

    let sum = ctx
        .run_command(
            &format!("sha256sum {} 2>/dev/null || shasum -a 256 {}", quoted, quoted),
            &[],
        )
        .await?;
    if !sum.success() {
        return Ok(None);
    }
    Ok(sum.stdout.split_whitespace().next().map(|hash| FileDigest {
        size,
        sha256: hash.to_lowercase(),
    }))
}

/// 目标上已有相同内容时跳过传输，返回是否实际传输
pub async fn upload_if_modified(ctx: &dyn ExecutionContext, local: &Path, remote: &Path) -> AppResult<bool> {
    if ctx.is_local() && local == remote {
        return Ok(false);
    }

    let local_digest = file_digest(local).await?;
    if remote_digest(ctx, remote).await?.as_ref() == Some(&local_digest) {
        debug!("[{}] 目标文件未变化: {}", ctx.name(), remote.display());
        return Ok(false);
    }

    info!("[{}] 上传 {} -> {}", ctx.name(), local.display(), remote.display());
    ctx.transfer_file(local, remote).await?;
    Ok(true)
}
