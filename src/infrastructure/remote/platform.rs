use crate::core::constants::install::MACOS_JVM_ROOT;
use crate::environments::java::catalog::ReleaseInfo;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// JDK 目录中使用的平台标识。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlatformToken {
    MacosxX64,
    LinuxI586,
    LinuxX64,
    LinuxAmd64,
    SolarisSparc,
    SolarisSparcv9,
    SolarisI586,
    SolarisX64,
    WindowsI586,
    WindowsX64,
    /// 未收录的组合，保留 `<os>-<arch>` 原文
    Other(String),
}

const KNOWN_TOKENS: &[(&str, PlatformToken)] = &[
    ("macosx-x64", PlatformToken::MacosxX64),
    ("linux-i586", PlatformToken::LinuxI586),
    ("linux-x64", PlatformToken::LinuxX64),
    ("linux-amd64", PlatformToken::LinuxAmd64),
    ("solaris-sparc", PlatformToken::SolarisSparc),
    ("solaris-sparcv9", PlatformToken::SolarisSparcv9),
    ("solaris-i586", PlatformToken::SolarisI586),
    ("solaris-x64", PlatformToken::SolarisX64),
    ("windows-i586", PlatformToken::WindowsI586),
    ("windows-x64", PlatformToken::WindowsX64),
];

/// `uname -s` 的归一化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OsFamily {
    Darwin,
    Linux,
    Solaris,
    Windows,
    Unknown,
}

/// `uname -m` 的归一化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchFamily {
    X86,
    X86_64,
    Sparc,
    Sparcv9,
    Unknown,
}

impl OsFamily {
    fn classify(ostype: &str) -> Self {
        match ostype {
            "darwin" => OsFamily::Darwin,
            "linux" => OsFamily::Linux,
            "solaris" | "sunos" => OsFamily::Solaris,
            "windows" => OsFamily::Windows,
            _ => OsFamily::Unknown,
        }
    }
}

impl ArchFamily {
    fn classify(arch: &str) -> Self {
        match arch {
            "i386" | "i486" | "i586" | "i686" | "i786" => ArchFamily::X86,
            "x86_64" | "amd64" => ArchFamily::X86_64,
            "sparc" => ArchFamily::Sparc,
            "sparcv9" => ArchFamily::Sparcv9,
            _ => ArchFamily::Unknown,
        }
    }
}

/// 将 `uname -s`、`uname -m` 和 JDK 主版本映射为目录中的平台标识。
///
/// JDK 6 之前 Linux 的 64 位包叫 `linux-amd64`，之后改名为 `linux-x64`。
/// 无法识别的组合回退为 `<os>-<arch>`。
pub fn platform_token(ostype: &str, arch: &str, major_version: &str) -> PlatformToken {
    let ostype = ostype.trim().to_lowercase();
    let arch = arch.trim().to_lowercase();

    match (OsFamily::classify(&ostype), ArchFamily::classify(&arch)) {
        (OsFamily::Darwin, ArchFamily::X86 | ArchFamily::X86_64) => PlatformToken::MacosxX64,
        (OsFamily::Linux, ArchFamily::X86) => PlatformToken::LinuxI586,
        (OsFamily::Linux, ArchFamily::X86_64) if predates_x64_naming(major_version) => {
            PlatformToken::LinuxAmd64
        }
        (OsFamily::Linux, ArchFamily::X86_64) => PlatformToken::LinuxX64,
        // Solaris 只把 x86_64 当作 64 位 x86
        (OsFamily::Solaris, ArchFamily::Sparc) => PlatformToken::SolarisSparc,
        (OsFamily::Solaris, ArchFamily::Sparcv9) => PlatformToken::SolarisSparcv9,
        (OsFamily::Solaris, ArchFamily::X86) => PlatformToken::SolarisI586,
        (OsFamily::Solaris, ArchFamily::X86_64) if arch == "x86_64" => PlatformToken::SolarisX64,
        (OsFamily::Windows, ArchFamily::X86) => PlatformToken::WindowsI586,
        (OsFamily::Windows, ArchFamily::X86_64) => PlatformToken::WindowsX64,
        (OsFamily::Solaris, _) => PlatformToken::Other(format!("solaris-{}", arch)),
        (OsFamily::Darwin, _) => PlatformToken::Other(format!("macosx-{}", arch)),
        _ => PlatformToken::Other(format!("{}-{}", ostype, arch)),
    }
}

/// "1.4"、"5" 这类主版本早于 x64 命名
fn predates_x64_naming(major_version: &str) -> bool {
    let major = major_version.trim();
    if major.starts_with("1.") {
        return true;
    }
    match major.parse::<u32>() {
        Ok(n) => n < 6,
        Err(_) => false,
    }
}

impl PlatformToken {
    pub fn as_str(&self) -> &str {
        if let PlatformToken::Other(raw) = self {
            return raw;
        }
        KNOWN_TOKENS
            .iter()
            .find(|(_, token)| token == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    pub fn is_macos(&self) -> bool {
        self.as_str().to_lowercase().contains("macosx")
    }
}

impl FromStr for PlatformToken {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Ok(KNOWN_TOKENS
            .iter()
            .find(|(name, _)| *name == lowered)
            .map(|(_, token)| token.clone())
            .unwrap_or(PlatformToken::Other(lowered)))
    }
}

impl fmt::Display for PlatformToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 计算 JDK 的安装目录，这是"JDK 装在哪里"的唯一来源。
pub fn install_path_for(release: &ReleaseInfo, platform: &PlatformToken, base_path: &Path) -> PathBuf {
    let dir_name = match release.update_number {
        Some(update) => format!("jdk{}_{:02}", release.inner_version, update),
        None => format!("jdk{}", release.inner_version),
    };

    if platform.is_macos() {
        Path::new(MACOS_JVM_ROOT)
            .join(format!("{}.jdk", dir_name))
            .join("Contents")
            .join("Home")
    } else {
        base_path.join(dir_name)
    }
}
