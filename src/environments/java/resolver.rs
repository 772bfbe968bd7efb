use super::catalog::{Catalog, File, Release, ReleaseInfo, Version};
use crate::error::{AppError, AppResult};
use crate::infrastructure::remote::platform::{install_path_for, PlatformToken};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 版本名 + 平台解析出的具体下载文件
#[derive(Debug, Clone, Copy)]
pub struct ResolvedArtifact<'a> {
    pub version: &'a Version,
    pub release: &'a Release,
    pub file: &'a File,
    pub platform: &'a PlatformToken,
}

impl<'a> ResolvedArtifact<'a> {
    pub fn info(&self) -> &'a ReleaseInfo {
        &self.release.info
    }

    pub fn license_title(&self) -> &'a str {
        &self.release.license_title
    }

    pub fn license_path(&self) -> &'a str {
        &self.release.license_path
    }

    pub fn url(&self) -> &'a str {
        &self.file.filepath
    }

    pub fn basename(&self) -> String {
        self.file.basename()
    }

    /// 该文件在目标平台上的 JAVA_HOME
    pub fn install_path(&self, base_path: &Path) -> PathBuf {
        install_path_for(&self.release.info, self.platform, base_path)
    }
}

/// 在目录中查找版本名和平台对应的文件。任何一层缺失都会返回对应的错误，不做近似匹配。
pub fn resolve<'a>(
    catalog: &'a Catalog,
    version_name: &str,
    platform: &'a PlatformToken,
) -> AppResult<ResolvedArtifact<'a>> {
    let requested = ReleaseInfo::parse_version_name(version_name)?;

    let version = catalog
        .versions()
        .iter()
        .find(|v| v.major_version.eq_ignore_ascii_case(&requested.major_version))
        .ok_or_else(|| AppError::NoSuchVersion {
            version: requested.major_version.clone(),
        })?;

    let identifier = requested.release_identifier();
    let release = version
        .releases
        .iter()
        .find(|r| matches_identifier(&r.name, &identifier) || matches_identifier(&r.title, &identifier))
        .ok_or_else(|| AppError::NoSuchRelease {
            release: identifier.clone(),
        })?;

    let file = release
        .files
        .iter()
        .find(|f| f.platform.as_ref() == Some(platform))
        .ok_or_else(|| AppError::NoSuchPlatform {
            release: release.name.clone(),
            platform: platform.to_string(),
        })?;

    debug!("{} ({}) -> {}", version_name, platform, file.filepath);
    Ok(ResolvedArtifact {
        version,
        release,
        file,
        platform,
    })
}

/// 标识符之后只能是结尾或 `-`：`jdk-7u1` 不能匹配 `jdk-7u15-oth-JPR`，
/// `jdk-7` 也不能匹配 `jdk-7u15-oth-JPR`
fn matches_identifier(candidate: &str, identifier: &str) -> bool {
    let candidate = candidate.to_lowercase();
    let identifier = identifier.to_lowercase();
    match candidate.strip_prefix(&identifier) {
        Some(rest) => rest.is_empty() || rest.starts_with('-'),
        None => false,
    }
}
