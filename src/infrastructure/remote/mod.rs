pub mod auth_download;
pub mod cache;
pub mod http_client;
pub mod platform;

pub use auth_download::{AuthenticatedDownloader, Credentials, DownloadOutcome, LicenseAcceptance, LoginForm};
pub use cache::{CacheEntry, CatalogCache};
pub use http_client::{HttpClient, HttpPage, HttpTransport};
pub use platform::{install_path_for, platform_token, PlatformToken};
