//! 需要登录/同意许可的 JDK 下载
//!
//! 下载地址会被重定向到认证站点。只要响应还停留在认证站点，就把页面当成登录表单：
//! 填入用户名和密码后重新提交。离开认证站点后的第一个响应就是真正的压缩包。

use super::http_client::{HttpPage, HttpTransport};
use crate::core::constants::download::{AUTH_HOST, MAX_AUTH_ATTEMPTS, PASSWORD_FIELD, USERNAME_FIELD};
use crate::environments::java::resolver::ResolvedArtifact;
use crate::error::{AppError, AppResult};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

static FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form>").unwrap_or_else(|e| panic!("{e}"))
});
static INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b([^>]*)>").unwrap_or_else(|e| panic!("{e}")));
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .unwrap_or_else(|e| panic!("{e}"))
});

/// 认证站点的账号
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// 调用方对许可协议的确认
#[derive(Debug, Clone, Default)]
pub struct LicenseAcceptance {
    pub accepted: bool,
    /// 用户确认过的许可标题，必须与目录中的完全一致
    pub title: Option<String>,
}

impl LicenseAcceptance {
    pub fn check(&self, license_title: &str) -> AppResult<()> {
        if !self.accepted {
            return Err(AppError::LicenseNotAccepted {
                reason: "未明确接受许可协议".to_string(),
            });
        }
        match self.title.as_deref() {
            Some(title) if title == license_title => Ok(()),
            Some(title) => Err(AppError::LicenseNotAccepted {
                reason: format!("已接受 \"{}\"，但该文件要求 \"{}\"", title, license_title),
            }),
            None => Err(AppError::LicenseNotAccepted {
                reason: format!("未指定许可标题，该文件要求 \"{}\"", license_title),
            }),
        }
    }
}

/// 下载结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// 目标文件已存在
    Skipped,
    Downloaded { bytes: u64 },
}

/// 从登录页提取出的表单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub action: String,
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    /// 提取页面中的第一个表单，相对地址按页面地址补全
    pub fn extract(page: &HttpPage) -> AppResult<Self> {
        let html = page.text();
        let captures = FORM
            .captures(&html)
            .ok_or_else(|| AppError::download(page.url.as_str(), "认证页面中没有登录表单"))?;

        let form_attrs = parse_attributes(captures.get(1).map(|m| m.as_str()).unwrap_or(""));
        let action = match attribute(&form_attrs, "action") {
            Some(action) if !action.is_empty() => page
                .url
                .join(&action)
                .map_err(|e| AppError::download(page.url.as_str(), format!("无效的表单地址: {}", e)))?
                .to_string(),
            _ => page.url.to_string(),
        };

        let body = captures.get(2).map(|m| m.as_str()).unwrap_or("");
        let fields = INPUT
            .captures_iter(body)
            .filter_map(|input| {
                let attrs = parse_attributes(input.get(1)?.as_str());
                let name = attribute(&attrs, "name")?;
                let value = attribute(&attrs, "value").unwrap_or_default();
                Some((name, value))
            })
            .collect();

        Ok(Self { action, fields })
    }

    /// 设置字段，不存在时追加
    pub fn set(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(field) => field.1 = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(raw)
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_lowercase();
            let value = c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4))?.as_str();
            Some((name, decode_entities(value)))
        })
        .collect()
}

fn attribute(attrs: &[(String, String)], name: &str) -> Option<String> {
    attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// 带认证的下载器
pub struct AuthenticatedDownloader {
    transport: Arc<dyn HttpTransport>,
    auth_host: String,
}

impl AuthenticatedDownloader {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_auth_host(transport, AUTH_HOST)
    }

    pub fn with_auth_host(transport: Arc<dyn HttpTransport>, auth_host: &str) -> Self {
        Self {
            transport,
            auth_host: auth_host.to_lowercase(),
        }
    }

    fn on_auth_host(&self, page: &HttpPage) -> bool {
        page.host()
            .map(|h| h.eq_ignore_ascii_case(&self.auth_host))
            .unwrap_or(false)
    }

    /// 下载文件到指定路径。目标已存在时直接跳过。
    pub async fn download(
        &self,
        artifact: &ResolvedArtifact<'_>,
        destination: &Path,
        credentials: &Credentials,
        license: &LicenseAcceptance,
    ) -> AppResult<DownloadOutcome> {
        if destination.exists() {
            info!("已存在下载文件: {}", destination.display());
            return Ok(DownloadOutcome::Skipped);
        }

        license.check(artifact.license_title())?;

        let url = artifact.url();
        info!("下载 JDK 压缩包: {}", url);
        let page = self.fetch_through_auth(url, credentials).await?;

        if !page.is_success() {
            return Err(AppError::download(
                page.url.as_str(),
                format!("服务器返回状态码: {}", page.status),
            ));
        }

        let bytes = write_atomically(destination, &page.body).await?;
        info!("已写入 {} 字节到 {}", bytes, destination.display());
        Ok(DownloadOutcome::Downloaded { bytes })
    }

    /// 首次 GET 计为第 1 次尝试，之后每次提交登录表单计一次
    pub async fn fetch_through_auth(&self, url: &str, credentials: &Credentials) -> AppResult<HttpPage> {
        let mut page = self.transport.get(url).await?;

        for attempt in 1..=MAX_AUTH_ATTEMPTS {
            if !self.on_auth_host(&page) {
                debug!("第 {} 次尝试离开认证站点: {}", attempt, page.url);
                return Ok(page);
            }
            if attempt == MAX_AUTH_ATTEMPTS {
                break;
            }

            let mut form = LoginForm::extract(&page)?;
            form.set(USERNAME_FIELD, &credentials.username);
            form.set(PASSWORD_FIELD, &credentials.password);
            debug!("第 {} 次尝试停留在认证站点，提交登录表单: {}", attempt, form.action);
            page = self.transport.post_form(&form.action, &form.fields).await?;
        }

        Err(AppError::AuthLoopExceeded {
            attempts: MAX_AUTH_ATTEMPTS,
        })
    }
}

/// 先写临时文件再重命名，中断时不会留下半个文件
async fn write_atomically(destination: &Path, body: &[u8]) -> AppResult<u64> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let temp_path = destination.with_extension("downloading");
    tokio::fs::write(&temp_path, body).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, destination).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(body.len() as u64)
}
