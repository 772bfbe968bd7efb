//! 应用程序常量定义
//!
//! 本模块包含全局使用的常量，避免魔数并提供统一的配置值。

/// 目录相关常量
pub mod catalog {
    /// 默认的 JDK 目录地址
    pub const DEFAULT_URI: &str = "http://updates.jenkins-ci.org/updates/hudson.tools.JDKInstaller.json";
    /// 本地缓存文件名
    pub const DEFAULT_FILE_NAME: &str = "hudson.tools.JDKInstaller.json";
    /// 缓存 TTL（秒）
    pub const DEFAULT_TTL_SECS: u64 = 259_200; // 3天
    /// 目录解析规则对应的 schema 版本
    pub const SCHEMA_VERSION: i64 = 2;
}

/// 下载相关常量
pub mod download {
    /// 认证页面所在的主机
    pub const AUTH_HOST: &str = "login.oracle.com";
    /// 认证重定向的最大尝试次数（含首次请求）
    pub const MAX_AUTH_ATTEMPTS: usize = 16;
    /// 登录表单中的用户名字段
    pub const USERNAME_FIELD: &str = "ssousername";
    /// 登录表单中的密码字段
    pub const PASSWORD_FIELD: &str = "password";
    /// 认证站点只接受浏览器的 User-Agent
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows; U; MSIE 9.0; Windows NT 9.0; en-US)";
    /// 预置的同意 cookie
    pub const CONSENT_COOKIE: &str = "gpw_e24=.; Domain=oracle.com; Path=/";
    /// 预置 cookie 的作用域
    pub const CONSENT_COOKIE_URL: &str = "https://oracle.com/";
    /// 默认连接超时时间（秒）
    pub const DEFAULT_CONNECT_TIMEOUT: u64 = 30;
}

/// 安装相关常量
pub mod install {
    /// macOS 下 JDK 的固定安装根目录
    pub const MACOS_JVM_ROOT: &str = "/Library/Java/JavaVirtualMachines";
    /// 默认的远程工具目录
    pub const DEFAULT_REMOTE_TOOLS: &str = "tools/java";
}

/// 环境变量相关常量
pub mod env {
    /// 日志过滤环境变量
    pub const LOG_FILTER: &str = "JDK_INSTALLER_LOG";
    /// 配置文件路径覆盖
    pub const CONFIG_PATH: &str = "JDK_INSTALLER_CONFIG";
}
