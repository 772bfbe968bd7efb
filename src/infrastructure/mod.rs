pub mod config;
pub mod installer;
pub mod remote;
pub mod shell;

pub use config::InstallerConfig;
