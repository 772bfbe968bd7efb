use std::io;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {message}")]
    Config { message: String },

    /// 目录声明的 schema 版本与解析规则不一致，目录不可用
    #[error("目录版本不匹配: 期望 {expected}, 实际 {found}")]
    CatalogSchema { expected: i64, found: String },

    #[error("目录解析错误: {message}")]
    CatalogParse { message: String },

    #[error("未找到 JDK 版本: {version}")]
    NoSuchVersion { version: String },

    #[error("未找到 JDK 发布: {release}")]
    NoSuchRelease { release: String },

    #[error("发布 {release} 中没有平台 {platform} 的文件")]
    NoSuchPlatform { release: String, platform: String },

    #[error("下载前必须接受 JDK 许可协议: {reason}")]
    LicenseNotAccepted { reason: String },

    #[error("认证重定向在 {attempts} 次尝试后仍未结束")]
    AuthLoopExceeded { attempts: usize },

    #[error("下载失败: {url} - {message}")]
    Download { url: String, message: String },

    #[error("未知的压缩包类型: {filename}")]
    UnknownArchiveType { filename: String },

    #[error("安装验证失败: {destination} - {message}")]
    InstallVerification { destination: String, message: String },

    #[error("命令执行失败 [{context}] (退出码 {status}): {command}")]
    Command {
        context: String,
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("文件传输失败: {local} -> {remote}: {message}")]
    Transfer {
        local: String,
        remote: String,
        message: String,
    },
}

/// 应用程序 Result 类型
pub type AppResult<T> = Result<T, AppError>;

/// 便捷的错误创建函数
impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::CatalogParse {
            message: message.into(),
        }
    }

    pub fn download(url: &str, message: impl Into<String>) -> Self {
        Self::Download {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub fn verification(destination: &str, message: impl Into<String>) -> Self {
        Self::InstallVerification {
            destination: destination.to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        let url = error
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        AppError::Download {
            url,
            message: error.to_string(),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(error: toml::de::Error) -> Self {
        AppError::config(format!("解析配置文件失败: {}", error))
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(error: toml::ser::Error) -> Self {
        AppError::config(format!("序列化配置失败: {}", error))
    }
}
