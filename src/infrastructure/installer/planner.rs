//! 安装命令生成
//!
//! 根据安装包的后缀选择解压方式，生成一条可以交给 `sh -c` 执行的命令。

use crate::environments::java::catalog::ReleaseInfo;
use crate::error::{AppError, AppResult};
use crate::infrastructure::shell::quote::{quote_path, shell_quote};
use std::path::{Path, PathBuf};

/// 安装包类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.bin` / `.sh` 自解压包
    SelfExtracting,
    /// macOS 磁盘镜像
    DiskImage,
    Tarball,
    Zip,
}

const SUFFIXES: &[(&str, ArchiveKind)] = &[
    (".bin", ArchiveKind::SelfExtracting),
    (".sh", ArchiveKind::SelfExtracting),
    (".dmg", ArchiveKind::DiskImage),
    (".tar.gz", ArchiveKind::Tarball),
    (".tgz", ArchiveKind::Tarball),
    (".tar.bz2", ArchiveKind::Tarball),
    (".tbz2", ArchiveKind::Tarball),
    (".zip", ArchiveKind::Zip),
];

impl ArchiveKind {
    pub fn detect(filename: &str) -> AppResult<Self> {
        SUFFIXES
            .iter()
            .find(|(suffix, _)| filename.ends_with(suffix))
            .map(|(_, kind)| *kind)
            .ok_or_else(|| AppError::UnknownArchiveType {
                filename: filename.to_string(),
            })
    }

    /// 解压类安装完成后可以立即运行 `java -version` 探测
    pub fn has_probe(&self) -> bool {
        !matches!(self, ArchiveKind::DiskImage)
    }
}

/// 一次安装要执行的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub kind: ArchiveKind,
    pub steps: Vec<String>,
    pub probe: Option<String>,
}

impl InstallPlan {
    pub fn command_line(&self) -> String {
        self.steps.join(" && ")
    }
}

fn parent_of(destination: &Path) -> PathBuf {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// 磁盘镜像挂载后安装包所在的位置
pub fn dmg_package_path(info: &ReleaseInfo) -> PathBuf {
    let volume = match info.update_number {
        Some(update) => format!("JDK {} Update {:02}", info.major_version, update),
        None => format!("JDK {}", info.major_version),
    };
    PathBuf::from("/Volumes")
        .join(&volume)
        .join(format!("{}.pkg", volume))
}

pub fn plan_install(info: &ReleaseInfo, archive: &Path, destination: &Path) -> AppResult<InstallPlan> {
    let filename = archive.to_string_lossy();
    let kind = ArchiveKind::detect(&filename)?;

    let parent = quote_path(&parent_of(destination));
    let archive_arg = shell_quote(&filename);
    let dest_arg = quote_path(destination);

    let mut steps = vec![format!("mkdir -p {}", parent)];
    match kind {
        ArchiveKind::SelfExtracting => {
            steps.push(format!("( cd {} && yes | sh {} )", parent, archive_arg));
        }
        ArchiveKind::DiskImage => {
            let pkg = quote_path(&dmg_package_path(info));
            steps.push(format!("open {}", archive_arg));
            steps.push(format!("( while test ! -f {}; do sleep 1; done )", pkg));
            steps.push(format!("open {}", pkg));
            steps.push(format!("( while test ! -d {}; do sleep 1; done )", dest_arg));
        }
        ArchiveKind::Tarball => {
            steps.push(format!("tar xf {} -C {}", archive_arg, parent));
        }
        ArchiveKind::Zip => {
            steps.push(format!("( cd {} && unzip {} )", parent, archive_arg));
        }
    }

    let probe = kind
        .has_probe()
        .then(|| format!("{} -version", quote_path(&destination.join("bin").join("java"))));

    Ok(InstallPlan { kind, steps, probe })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modern(update: Option<u32>) -> ReleaseInfo {
        let name = match update {
            Some(u) => format!("jdk-7u{}", u),
            None => "jdk-7".to_string(),
        };
        ReleaseInfo::parse_release_name(&name).unwrap()
    }

    #[test]
    fn test_detect() {
        assert_eq!(ArchiveKind::detect("jdk-6u39-linux-x64.bin").unwrap(), ArchiveKind::SelfExtracting);
        assert_eq!(ArchiveKind::detect("install.sh").unwrap(), ArchiveKind::SelfExtracting);
        assert_eq!(ArchiveKind::detect("jdk-7u15-macosx-x64.dmg").unwrap(), ArchiveKind::DiskImage);
        assert_eq!(ArchiveKind::detect("jdk-7u15-linux-x64.tar.gz").unwrap(), ArchiveKind::Tarball);
        assert_eq!(ArchiveKind::detect("a.tbz2").unwrap(), ArchiveKind::Tarball);
        assert_eq!(ArchiveKind::detect("a.zip").unwrap(), ArchiveKind::Zip);
        assert!(matches!(
            ArchiveKind::detect("jdk-7u15-windows-x64.exe"),
            Err(AppError::UnknownArchiveType { .. })
        ));
    }

    #[test]
    fn test_tarball_plan() {
        let plan = plan_install(
            &modern(Some(15)),
            Path::new("/opt/tools/jdk-7u15-linux-x64.tar.gz"),
            Path::new("/opt/tools/jdk1.7.0_15"),
        )
        .unwrap();

        assert_eq!(
            plan.command_line(),
            "mkdir -p \"/opt/tools\" && tar xf \"/opt/tools/jdk-7u15-linux-x64.tar.gz\" -C \"/opt/tools\""
        );
        assert_eq!(plan.probe.as_deref(), Some("\"/opt/tools/jdk1.7.0_15/bin/java\" -version"));
    }

    #[test]
    fn test_self_extracting_plan() {
        let plan = plan_install(
            &ReleaseInfo::parse_release_name("jdk-6u39").unwrap(),
            Path::new("/opt/tools/jdk-6u39-linux-x64.bin"),
            Path::new("/opt/tools/jdk1.6.0_39"),
        )
        .unwrap();

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0], "mkdir -p \"/opt/tools\"");
        assert_eq!(plan.steps[1], "( cd \"/opt/tools\" && yes | sh \"/opt/tools/jdk-6u39-linux-x64.bin\" )");
    }

    #[test]
    fn test_zip_plan() {
        let plan = plan_install(&modern(Some(15)), Path::new("/t/jdk.zip"), Path::new("/t/jdk1.7.0_15")).unwrap();
        assert_eq!(plan.steps[1], "( cd \"/t\" && unzip \"/t/jdk.zip\" )");
    }

    #[test]
    fn test_dmg_plan() {
        let dest = Path::new("/Library/Java/JavaVirtualMachines/jdk1.7.0_05.jdk/Contents/Home");
        let plan = plan_install(&modern(Some(5)), Path::new("/tmp/jdk-7u5-macosx-x64.dmg"), dest).unwrap();

        assert_eq!(plan.kind, ArchiveKind::DiskImage);
        assert!(plan.probe.is_none());
        assert_eq!(plan.steps[1], "open \"/tmp/jdk-7u5-macosx-x64.dmg\"");
        assert_eq!(
            plan.steps[2],
            "( while test ! -f \"/Volumes/JDK 7 Update 05/JDK 7 Update 05.pkg\"; do sleep 1; done )"
        );
        assert_eq!(plan.steps[3], "open \"/Volumes/JDK 7 Update 05/JDK 7 Update 05.pkg\"");
        assert_eq!(
            plan.steps[4],
            format!("( while test ! -d \"{}\"; do sleep 1; done )", dest.display())
        );
    }

    #[test]
    fn test_dmg_package_without_update() {
        assert_eq!(dmg_package_path(&modern(None)), PathBuf::from("/Volumes/JDK 7/JDK 7.pkg"));
    }

    #[test]
    fn test_relative_destination() {
        let plan = plan_install(&modern(Some(15)), Path::new("a.tgz"), Path::new("jdk1.7.0_15")).unwrap();
        assert_eq!(plan.steps[0], "mkdir -p \".\"");
    }
}
