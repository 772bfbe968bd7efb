use crate::core::constants::{catalog, download, env as env_keys, install};
use crate::error::{AppError, AppResult};
use crate::infrastructure::remote::auth_download::{Credentials, LicenseAcceptance};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 配置文件结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallerConfig {
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub license: LicenseSettings,
    #[serde(default)]
    pub credentials: CredentialSettings,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub download: DownloadSettings,
}

/// JDK 目录来源与缓存策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_catalog_uri")]
    pub uri: String,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// 更新失败时继续使用过期的缓存
    #[serde(default = "default_true")]
    pub keep_stale: bool,
    #[serde(default = "default_catalog_file_name")]
    pub file_name: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            uri: default_catalog_uri(),
            ttl_secs: default_ttl_secs(),
            keep_stale: true,
            file_name: default_catalog_file_name(),
        }
    }
}

impl CatalogSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// 许可协议
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicenseSettings {
    #[serde(default)]
    pub accept: bool,
    /// 只接受该标题的许可协议
    #[serde(default)]
    pub title: Option<String>,
}

/// 登录凭据，值可以写成 `${VAR}` 从环境变量读取
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialSettings {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// 本机存放目录缓存和安装包的目录
    #[serde(default = "default_local_tools")]
    pub local_tools: PathBuf,
    /// 远程主机上的工具目录，相对路径基于登录用户的主目录
    #[serde(default = "default_remote_tools")]
    pub remote_tools: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            local_tools: default_local_tools(),
            remote_tools: default_remote_tools(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadSettings {
    #[serde(default = "default_auth_host")]
    pub auth_host: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 单次请求的总时限（含下载），默认不限制
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            auth_host: default_auth_host(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: None,
            show_progress: true,
        }
    }
}

fn default_catalog_uri() -> String {
    catalog::DEFAULT_URI.to_string()
}

fn default_ttl_secs() -> u64 {
    catalog::DEFAULT_TTL_SECS
}

fn default_catalog_file_name() -> String {
    catalog::DEFAULT_FILE_NAME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_local_tools() -> PathBuf {
    get_config_dir()
        .unwrap_or_else(|_| PathBuf::from(".jdk-installer"))
        .join("tools")
}

fn default_remote_tools() -> PathBuf {
    PathBuf::from(install::DEFAULT_REMOTE_TOOLS)
}

fn default_auth_host() -> String {
    download::AUTH_HOST.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    download::DEFAULT_CONNECT_TIMEOUT
}

impl InstallerConfig {
    /// 从默认位置加载配置，不存在时写入默认配置
    pub fn load() -> AppResult<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let config = InstallerConfig::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("无法读取配置文件 {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::config(format!("无法创建配置目录: {}", e)))?;
        }

        let toml_content = toml::to_string_pretty(self)?;
        fs::write(path, toml_content)
            .map_err(|e| AppError::config(format!("写入配置文件失败: {}", e)))?;
        Ok(())
    }

    /// 本机目录缓存文件
    pub fn catalog_cache_path(&self) -> PathBuf {
        self.paths.local_tools.join(&self.catalog.file_name)
    }

    pub fn license_acceptance(&self) -> LicenseAcceptance {
        LicenseAcceptance {
            accepted: self.license.accept,
            title: self.license.title.clone(),
        }
    }

    /// 解析 `${VAR}` 引用后的凭据，用户名和密码都不能为空
    pub fn credentials(&self) -> AppResult<Credentials> {
        let username = resolve_env_var(&self.credentials.username);
        let password = resolve_env_var(&self.credentials.password);

        if username.trim().is_empty() || is_unresolved(&username) {
            return Err(AppError::config("未配置下载账号 (credentials.username)"));
        }
        if password.is_empty() || is_unresolved(&password) {
            return Err(AppError::config("未配置下载密码 (credentials.password)"));
        }

        Ok(Credentials { username, password })
    }
}

fn is_unresolved(value: &str) -> bool {
    value.starts_with("${") && value.ends_with('}')
}

/// 解析环境变量引用（如 ${VAR_NAME}）
pub fn resolve_env_var(value: &str) -> String {
    if is_unresolved(value) {
        let var_name = &value[2..value.len() - 1];
        env::var(var_name).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// 获取配置文件路径，可用 `JDK_INSTALLER_CONFIG` 覆盖
pub fn get_config_path() -> AppResult<PathBuf> {
    if let Ok(path) = env::var(env_keys::CONFIG_PATH) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(get_config_dir()?.join("config.toml"))
}

/// 获取配置目录
pub fn get_config_dir() -> AppResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| AppError::config("无法获取用户主目录"))?;
    Ok(home_dir.join(".jdk-installer"))
}
