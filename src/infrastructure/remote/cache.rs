use super::http_client::HttpTransport;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Local};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

/// 磁盘上的目录缓存状态
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub path: PathBuf,
    /// 缓存文件的修改时间，文件不存在时为 None
    pub fetched_at: Option<SystemTime>,
    pub ttl: Duration,
    pub keep_stale: bool,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        match self.fetched_at {
            // 修改时间在未来时视为刚刚写入
            Some(fetched_at) => now.duration_since(fetched_at).unwrap_or_default() >= self.ttl,
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    pub fn fetched_at_local(&self) -> Option<DateTime<Local>> {
        self.fetched_at.map(DateTime::<Local>::from)
    }
}

/// JDK 目录缓存管理器
///
/// 缓存文件一旦写入就总是一个完整的、曾经成功获取过的目录：新内容先写入同目录下的临时文件，
/// 再重命名覆盖。
pub struct CatalogCache {
    uri: String,
    path: PathBuf,
    ttl: Duration,
    keep_stale: bool,
    transport: Arc<dyn HttpTransport>,
}

impl CatalogCache {
    pub fn new(
        uri: &str,
        path: impl Into<PathBuf>,
        ttl: Duration,
        keep_stale: bool,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            uri: uri.to_string(),
            path: path.into(),
            ttl,
            keep_stale,
            transport,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry(&self) -> CacheEntry {
        let fetched_at = fs::metadata(&self.path)
            .ok()
            .filter(|m| m.is_file())
            .and_then(|m| m.modified().ok());
        CacheEntry {
            path: self.path.clone(),
            fetched_at,
            ttl: self.ttl,
            keep_stale: self.keep_stale,
        }
    }

    /// 获取目录内容。缓存未过期时不访问网络。
    pub async fn get(&self) -> AppResult<Vec<u8>> {
        let entry = self.entry();
        if !entry.is_expired() {
            return Ok(fs::read(&self.path)?);
        }

        info!(
            "目录缓存已过期 (ttl={}s): {}",
            self.ttl.as_secs(),
            self.path.display()
        );
        self.refresh().await
    }

    /// 强制从远端更新目录
    pub async fn refresh(&self) -> AppResult<Vec<u8>> {
        match self.fetch_and_store().await {
            Ok(body) => Ok(body),
            Err(e) => {
                warn!("无法从 {} 更新目录: {}", self.uri, e);
                if self.keep_stale && self.path.is_file() {
                    warn!("使用过期的目录缓存: {}", self.path.display());
                    Ok(fs::read(&self.path)?)
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn fetch_and_store(&self) -> AppResult<Vec<u8>> {
        let page = self.transport.get(&self.uri).await?;
        if !page.is_success() {
            return Err(AppError::download(
                &self.uri,
                format!("服务器返回状态码: {}", page.status),
            ));
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(&page.body)?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        info!("目录缓存已更新: {} ({} 字节)", self.path.display(), page.body.len());
        Ok(page.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::remote::http_client::HttpPage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    struct CountingTransport {
        calls: AtomicUsize,
        fail: bool,
        body: &'static [u8],
    }

    impl CountingTransport {
        fn new(body: &'static [u8]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                body,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
                body: b"",
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for CountingTransport {
        async fn get(&self, url: &str) -> AppResult<HttpPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::download(url, "connection refused"));
            }
            Ok(HttpPage {
                url: Url::parse(url).unwrap(),
                status: 200,
                body: self.body.to_vec(),
            })
        }

        async fn post_form(&self, url: &str, _fields: &[(String, String)]) -> AppResult<HttpPage> {
            Err(AppError::download(url, "unexpected form submission"))
        }
    }

    const URI: &str = "http://updates.example.com/catalog.json";

    #[tokio::test]
    async fn test_fresh_cache_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, b"cached").unwrap();

        let transport = Arc::new(CountingTransport::new(b"remote"));
        let cache = CatalogCache::new(URI, &path, Duration::from_secs(3600), false, transport.clone());

        assert_eq!(cache.get().await.unwrap(), b"cached");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_cache_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, b"cached").unwrap();

        let transport = Arc::new(CountingTransport::new(b"remote"));
        let cache = CatalogCache::new(URI, &path, Duration::ZERO, false, transport.clone());

        assert_eq!(cache.get().await.unwrap(), b"remote");
        assert_eq!(transport.calls(), 1);
        assert_eq!(fs::read(&path).unwrap(), b"remote");
    }

    #[tokio::test]
    async fn test_missing_cache_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.json");

        let transport = Arc::new(CountingTransport::new(b"remote"));
        let cache = CatalogCache::new(URI, &path, Duration::from_secs(3600), false, transport.clone());

        assert!(cache.entry().fetched_at.is_none());
        assert_eq!(cache.get().await.unwrap(), b"remote");
        assert!(cache.entry().fetched_at.is_some());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, b"stale").unwrap();

        let transport = Arc::new(CountingTransport::failing());
        let cache = CatalogCache::new(URI, &path, Duration::ZERO, true, transport.clone());

        assert_eq!(cache.get().await.unwrap(), b"stale");
        assert_eq!(transport.calls(), 1);
        assert_eq!(fs::read(&path).unwrap(), b"stale");
    }

    #[tokio::test]
    async fn test_failed_refresh_propagates_without_keep_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, b"stale").unwrap();

        let transport = Arc::new(CountingTransport::failing());
        let cache = CatalogCache::new(URI, &path, Duration::ZERO, false, transport);

        assert!(matches!(cache.get().await, Err(AppError::Download { .. })));
        assert_eq!(fs::read(&path).unwrap(), b"stale");
    }

    #[tokio::test]
    async fn test_keep_stale_needs_an_existing_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let transport = Arc::new(CountingTransport::failing());
        let cache = CatalogCache::new(URI, &path, Duration::ZERO, true, transport);

        assert!(cache.get().await.is_err());
        assert!(!path.exists());
    }
}
