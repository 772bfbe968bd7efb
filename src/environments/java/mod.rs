pub mod catalog;
pub mod installer;
pub mod resolver;

pub use catalog::{Catalog, File, ParseFailure, Release, ReleaseInfo, Version};
pub use installer::{InstallReport, InstallStatus, JdkInstaller, Target};
pub use resolver::{resolve, ResolvedArtifact};
