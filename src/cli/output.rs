use crate::environments::java::{Catalog, InstallReport, InstallStatus, ResolvedArtifact};
use crate::error::AppResult;
use std::path::Path;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// 输出格式化器
pub struct OutputFormatter;

impl OutputFormatter {
    /// 格式化目录中的版本列表
    pub fn format_catalog(&self, catalog: &Catalog, format: OutputFormat) -> AppResult<String> {
        match format {
            OutputFormat::Text => {
                let mut output = String::new();
                if catalog.versions().is_empty() {
                    output.push_str("目录中没有 JDK 版本\n");
                }
                for version in catalog.versions() {
                    output.push_str(&format!("{} (主版本 {})\n", version.name, version.major_version));
                    for release in &version.releases {
                        let platforms: Vec<String> = release
                            .files
                            .iter()
                            .filter_map(|f| f.platform.as_ref().map(|p| p.to_string()))
                            .collect();
                        output.push_str(&format!(
                            "  {:<24} {}\n",
                            release.info.release_identifier(),
                            platforms.join(", ")
                        ));
                    }
                }
                if !catalog.failures().is_empty() {
                    output.push_str(&format!("已跳过 {} 个无法识别的条目\n", catalog.failures().len()));
                }
                Ok(output)
            }
            OutputFormat::Json => {
                let versions: Vec<_> = catalog
                    .versions()
                    .iter()
                    .map(|version| {
                        serde_json::json!({
                            "name": version.name,
                            "major_version": version.major_version,
                            "releases": version.releases.iter().map(|release| serde_json::json!({
                                "name": release.name,
                                "title": release.title,
                                "identifier": release.info.release_identifier(),
                                "platforms": release.files.iter()
                                    .filter_map(|f| f.platform.as_ref().map(|p| p.to_string()))
                                    .collect::<Vec<_>>(),
                            })).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                let failures: Vec<_> = catalog
                    .failures()
                    .iter()
                    .map(|f| serde_json::json!({ "entry": f.entry, "message": f.message }))
                    .collect();
                let json_output = serde_json::json!({
                    "versions": versions,
                    "failures": failures,
                });
                Ok(serde_json::to_string_pretty(&json_output)? + "\n")
            }
        }
    }

    /// 格式化解析结果
    pub fn format_artifact(
        &self,
        artifact: &ResolvedArtifact<'_>,
        tools_root: &Path,
        format: OutputFormat,
    ) -> AppResult<String> {
        let java_home = artifact.install_path(tools_root);
        match format {
            OutputFormat::Text => Ok(format!(
                "发布:      {}\n平台:      {}\n文件:      {}\n下载地址:  {}\n许可协议:  {}\nJAVA_HOME: {}\n",
                artifact.release.name,
                artifact.platform,
                artifact.file.name,
                artifact.url(),
                artifact.license_title(),
                java_home.display()
            )),
            OutputFormat::Json => {
                let json_output = serde_json::json!({
                    "version": artifact.version.name,
                    "release": artifact.release.name,
                    "platform": artifact.platform.to_string(),
                    "file": artifact.file.name,
                    "url": artifact.url(),
                    "basename": artifact.basename(),
                    "license_title": artifact.license_title(),
                    "license_path": artifact.license_path(),
                    "java_home": java_home,
                });
                Ok(serde_json::to_string_pretty(&json_output)? + "\n")
            }
        }
    }

    /// 格式化安装结果
    pub fn format_report(&self, report: &InstallReport, format: OutputFormat) -> AppResult<String> {
        match format {
            OutputFormat::Text => {
                let status = match report.status {
                    InstallStatus::AlreadyInstalled => "已安装",
                    InstallStatus::Installed => "安装完成",
                };
                Ok(format!(
                    "[{}] {} ({}) {}: {}\n",
                    report.target,
                    report.release,
                    report.platform,
                    status,
                    report.java_home.display()
                ))
            }
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)? + "\n"),
        }
    }

    /// 格式化错误信息
    pub fn format_error(&self, target: &str, error: &str, format: OutputFormat) -> AppResult<String> {
        match format {
            OutputFormat::Text => Ok(format!("[{}] 错误: {}\n", target, error)),
            OutputFormat::Json => {
                let json_output = serde_json::json!({
                    "target": target,
                    "error": error,
                    "success": false
                });
                Ok(serde_json::to_string_pretty(&json_output)? + "\n")
            }
        }
    }
}

pub static FORMATTER: OutputFormatter = OutputFormatter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environments::java::catalog::tests::SAMPLE;
    use crate::environments::java::resolve;
    use crate::infrastructure::remote::PlatformToken;
    use std::path::PathBuf;

    #[test]
    fn test_format_catalog_text() {
        let catalog = Catalog::parse(SAMPLE, 2).unwrap();
        let output = FORMATTER.format_catalog(&catalog, OutputFormat::Text).unwrap();
        assert!(output.contains("JDK 7 (主版本 7)"));
        assert!(output.contains("jdk-7u15"));
        assert!(output.contains("linux-x64, linux-i586, macosx-x64"));
        assert!(output.contains("已跳过"));
    }

    #[test]
    fn test_format_artifact_json() {
        let catalog = Catalog::parse(SAMPLE, 2).unwrap();
        let platform = PlatformToken::LinuxX64;
        let artifact = resolve(&catalog, "7u15", &platform).unwrap();

        let output = FORMATTER
            .format_artifact(&artifact, Path::new("/opt/tools"), OutputFormat::Json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["platform"], "linux-x64");
        assert_eq!(value["basename"], "jdk-7u15-linux-x64.tar.gz");
        assert_eq!(value["java_home"], "/opt/tools/jdk1.7.0_15");
    }

    #[test]
    fn test_format_report() {
        let report = InstallReport {
            target: "app1".to_string(),
            platform: "linux-x64".to_string(),
            release: "jdk-7u15-oth-JPR".to_string(),
            java_home: PathBuf::from("/opt/jdk1.7.0_15"),
            java_bin: PathBuf::from("/opt/jdk1.7.0_15/bin/java"),
            java_cmd: "env JAVA_HOME=\"/opt/jdk1.7.0_15\" \"/opt/jdk1.7.0_15/bin/java\"".to_string(),
            archive: None,
            uploaded: false,
            status: InstallStatus::AlreadyInstalled,
        };
        let text = FORMATTER.format_report(&report, OutputFormat::Text).unwrap();
        assert_eq!(text, "[app1] jdk-7u15-oth-JPR (linux-x64) 已安装: /opt/jdk1.7.0_15\n");

        let json = FORMATTER.format_report(&report, OutputFormat::Json).unwrap();
        assert!(json.contains("\"status\": \"already_installed\""));
        assert!(json.contains("\"java_bin\": \"/opt/jdk1.7.0_15/bin/java\""));
    }
}
