//! JDK 目录模型
//!
//! 目录是 Version → Release → File 三层结构。所有派生字段（版本号、平台标识）
//! 在加载时一次性计算，子节点只保存指向父节点的索引。

use crate::core::constants::catalog::SCHEMA_VERSION;
use crate::error::{AppError, AppResult};
use crate::infrastructure::remote::platform::PlatformToken;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// 历史上出现过的三种 JDK 命名方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingScheme {
    /// `j2sdk-1.4.2_19`
    Legacy14,
    /// `jdk-1.5.0_22`
    Legacy15,
    /// `jdk-7u15`
    Modern,
}

struct SchemePattern {
    scheme: NamingScheme,
    /// 目录中的发布名称
    release: Regex,
    /// 用户输入的版本名称
    request: Regex,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

// 顺序即匹配优先级：现代格式的 `jdk-(\d+)` 也能匹配 `jdk-1.5.0`
static SCHEMES: LazyLock<Vec<SchemePattern>> = LazyLock::new(|| {
    vec![
        SchemePattern {
            scheme: NamingScheme::Legacy14,
            release: regex(r"j2sdk-1\.4\.(\d+)(?:[_u](\d+))?"),
            request: regex(r"(?i)^(?:j2sdk-?)?1[._]4[._](\d+)(?:[._u](\d+))?$"),
        },
        SchemePattern {
            scheme: NamingScheme::Legacy15,
            release: regex(r"jdk-1\.5\.(\d+)(?:[_u](\d+))?"),
            request: regex(r"(?i)^(?:jdk-?)?1[._]5[._](\d+)(?:[._u](\d+))?$"),
        },
        SchemePattern {
            scheme: NamingScheme::Modern,
            release: regex(r"jdk-(\d+)(?:u(\d+))?"),
            request: regex(r"(?i)^(?:jdk-?)?(\d+)(?:u(\d+))?$"),
        },
    ]
});

static MODERN_FILE: LazyLock<Regex> = LazyLock::new(|| regex(r"jdk-\d+(?:u\d+)?-(\w+-\w+)\.\w+"));
static LEGACY_FILE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"j(?:2s)?dk-\d+_\d+_\d+(?:_\d+)?-(\w+-\w+)\.\w+"));
static VERSION_NAME: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)JDK ((?:\d+\.)?\d+)"));

/// 从发布名称中解析出的版本信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub scheme: NamingScheme,
    /// 例如 "1.7.0"
    pub inner_version: String,
    /// 例如 "7"、"5"、"1.4"
    pub major_version: String,
    pub minor_version: u32,
    pub update_number: Option<u32>,
}

impl ReleaseInfo {
    fn from_captures(scheme: NamingScheme, first: u32, update_number: Option<u32>) -> Self {
        let (inner_version, major_version, minor_version) = match scheme {
            NamingScheme::Legacy14 => (format!("1.4.{}", first), "1.4".to_string(), first),
            NamingScheme::Legacy15 => (format!("1.5.{}", first), "5".to_string(), first),
            NamingScheme::Modern => (format!("1.{}.0", first), first.to_string(), 0),
        };
        Self {
            scheme,
            inner_version,
            major_version,
            minor_version,
            update_number,
        }
    }

    fn capture_numbers(captures: &regex::Captures<'_>) -> Option<(u32, Option<u32>)> {
        let first = captures.get(1)?.as_str().parse().ok()?;
        let update = match captures.get(2) {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };
        Some((first, update))
    }

    /// 解析目录中的发布名称，如 `jdk-7u15-oth-JPR`
    pub fn parse_release_name(name: &str) -> AppResult<Self> {
        for pattern in SCHEMES.iter() {
            if let Some(captures) = pattern.release.captures(name) {
                if let Some((first, update)) = Self::capture_numbers(&captures) {
                    return Ok(Self::from_captures(pattern.scheme, first, update));
                }
            }
        }
        Err(AppError::parse(format!("无法解析 JDK 发布名称: {}", name)))
    }

    /// 解析用户输入的版本名称，如 `7u15`、`6u39`、`1_5_0_22`
    pub fn parse_version_name(name: &str) -> AppResult<Self> {
        let trimmed = name.trim();
        for pattern in SCHEMES.iter() {
            if let Some(captures) = pattern.request.captures(trimmed) {
                if let Some((first, update)) = Self::capture_numbers(&captures) {
                    return Ok(Self::from_captures(pattern.scheme, first, update));
                }
            }
        }
        Err(AppError::parse(format!("无法解析 JDK 版本名称: {}", name)))
    }

    /// 目录中该版本发布名称的前缀
    pub fn release_identifier(&self) -> String {
        let base = match self.scheme {
            NamingScheme::Legacy14 => format!("j2sdk-{}", self.inner_version),
            NamingScheme::Legacy15 => format!("jdk-{}", self.inner_version),
            NamingScheme::Modern => format!("jdk-{}", self.major_version),
        };
        match (self.scheme, self.update_number) {
            (NamingScheme::Modern, Some(update)) => format!("{}u{}", base, update),
            (_, Some(update)) => format!("{}_{:02}", base, update),
            (_, None) => base,
        }
    }

    /// 按命名方式从文件名中取出平台标识
    pub fn file_platform(&self, file_name: &str) -> Option<PlatformToken> {
        let pattern = match self.scheme {
            NamingScheme::Modern => &*MODERN_FILE,
            NamingScheme::Legacy14 | NamingScheme::Legacy15 => &*LEGACY_FILE,
        };
        let captures = pattern.captures(file_name)?;
        captures.get(1)?.as_str().parse().ok()
    }
}

/// 从 `JDK 7` 形式的名称取出主版本
pub fn parse_major_version(version_name: &str) -> AppResult<String> {
    VERSION_NAME
        .captures(version_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| AppError::parse(format!("无法解析 JDK 版本名称: {}", version_name)))
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    data: Vec<RawVersion>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    name: String,
    #[serde(default)]
    releases: Vec<RawRelease>,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    lictitle: String,
    #[serde(default)]
    licpath: String,
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    name: String,
    #[serde(default)]
    title: String,
    filepath: String,
}

/// 指向某个 Release 的索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReleaseHandle {
    pub version: usize,
    pub release: usize,
}

/// 一个 JDK 主版本线
#[derive(Debug, Clone)]
pub struct Version {
    pub name: String,
    pub major_version: String,
    pub releases: Vec<Release>,
}

/// 一次更新发布
#[derive(Debug, Clone)]
pub struct Release {
    /// 所属 Version 在目录中的索引
    pub version: usize,
    pub name: String,
    pub title: String,
    pub license_title: String,
    pub license_path: String,
    pub info: ReleaseInfo,
    pub files: Vec<File>,
}

/// 一个可下载的文件
#[derive(Debug, Clone)]
pub struct File {
    pub release: ReleaseHandle,
    pub name: String,
    pub title: String,
    pub filepath: String,
    /// 文件名无法解析时为 None，该文件不参与解析匹配
    pub platform: Option<PlatformToken>,
}

impl File {
    /// 下载地址的最后一段路径
    pub fn basename(&self) -> String {
        match url::Url::parse(&self.filepath) {
            Ok(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(|s| s.to_string()))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| self.name.clone()),
            Err(_) => self
                .filepath
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or(self.name.as_str())
                .to_string(),
        }
    }
}

/// 加载时被跳过的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub entry: String,
    pub message: String,
}

/// 目录根节点
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    versions: Vec<Version>,
    failures: Vec<ParseFailure>,
}

impl Catalog {
    /// 使用当前 schema 版本解析目录
    pub fn parse_current(raw: &str) -> AppResult<Self> {
        Self::parse(raw, SCHEMA_VERSION)
    }

    /// 解析原始目录文本。schema 版本不一致直接失败，单个条目的解析错误只会被记录。
    pub fn parse(raw: &str, expected_schema: i64) -> AppResult<Self> {
        let json = strip_wrapper(raw)?;
        let value: serde_json::Value = serde_json::from_str(json)?;

        let declared = value.get("version");
        if declared.and_then(|v| v.as_i64()) != Some(expected_schema) {
            return Err(AppError::CatalogSchema {
                expected: expected_schema,
                found: declared
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "缺失".to_string()),
            });
        }

        let raw: RawCatalog = serde_json::from_value(value)?;
        Ok(Self::build(raw))
    }

    fn build(raw: RawCatalog) -> Self {
        let mut catalog = Catalog::default();

        for raw_version in raw.data {
            let major_version = match parse_major_version(&raw_version.name) {
                Ok(major) => major,
                Err(e) => {
                    catalog.record(&raw_version.name, e);
                    continue;
                }
            };

            let version_index = catalog.versions.len();
            let mut releases = Vec::new();

            for raw_release in raw_version.releases {
                let info = match ReleaseInfo::parse_release_name(&raw_release.name) {
                    Ok(info) if info.major_version == major_version => info,
                    Ok(info) => {
                        catalog.record(
                            &raw_release.name,
                            AppError::parse(format!(
                                "主版本不一致 (实际={}, 期望={})",
                                info.major_version, major_version
                            )),
                        );
                        continue;
                    }
                    Err(e) => {
                        catalog.record(&raw_release.name, e);
                        continue;
                    }
                };

                let handle = ReleaseHandle {
                    version: version_index,
                    release: releases.len(),
                };

                let mut files = Vec::with_capacity(raw_release.files.len());
                for raw_file in raw_release.files {
                    let platform = info.file_platform(&raw_file.name);
                    if platform.is_none() {
                        catalog.record(
                            &raw_file.name,
                            AppError::parse(format!("无法解析 JDK 文件名: {}", raw_file.name)),
                        );
                    }
                    files.push(File {
                        release: handle,
                        name: raw_file.name,
                        title: raw_file.title,
                        filepath: raw_file.filepath,
                        platform,
                    });
                }

                releases.push(Release {
                    version: version_index,
                    name: raw_release.name,
                    title: raw_release.title,
                    license_title: raw_release.lictitle,
                    license_path: raw_release.licpath,
                    info,
                    files,
                });
            }

            catalog.versions.push(Version {
                name: raw_version.name,
                major_version,
                releases,
            });
        }

        if !catalog.failures.is_empty() {
            debug!("目录中有 {} 个条目无法解析", catalog.failures.len());
        }
        catalog
    }

    fn record(&mut self, entry: &str, error: AppError) {
        warn!("跳过目录条目 {}: {}", entry, error);
        self.failures.push(ParseFailure {
            entry: entry.to_string(),
            message: error.to_string(),
        });
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn failures(&self) -> &[ParseFailure] {
        &self.failures
    }

    pub fn release(&self, handle: ReleaseHandle) -> Option<&Release> {
        self.versions.get(handle.version)?.releases.get(handle.release)
    }

    pub fn version_of(&self, release: &Release) -> Option<&Version> {
        self.versions.get(release.version)
    }

    pub fn releases(&self) -> impl Iterator<Item = &Release> {
        self.versions.iter().flat_map(|v| v.releases.iter())
    }

    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.releases().flat_map(|r| r.files.iter())
    }

    /// 按文件名做不区分大小写的子串查找，如 `7u15-linux-x64`
    pub fn find_file(&self, needle: &str) -> Option<&File> {
        let needle = needle.to_lowercase();
        self.files().find(|f| f.name.to_lowercase().contains(&needle))
    }
}

/// 去掉远端文档包在 JSON 外面的脚本代码
fn strip_wrapper(raw: &str) -> AppResult<&str> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&raw[start..=end]),
        _ => Err(AppError::parse("目录内容中没有 JSON 对象")),
    }
}
