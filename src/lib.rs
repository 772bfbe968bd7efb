// 核心模块
pub mod cli;
pub mod core;
pub mod environments;
pub mod error;
pub mod infrastructure;

pub use core::constants as app_constants;
pub use environments::java::{
    resolve, Catalog, InstallReport, InstallStatus, JdkInstaller, ReleaseInfo, ResolvedArtifact, Target,
};
pub use error::{AppError, AppResult, ContextualError};
pub use infrastructure::config::InstallerConfig;
pub use infrastructure::remote::{install_path_for, platform_token, PlatformToken};
pub use infrastructure::shell::{ExecutionContext, LocalContext, SshContext};
