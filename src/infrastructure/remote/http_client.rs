use crate::core::constants::download::{CONSENT_COOKIE, CONSENT_COOKIE_URL, USER_AGENT};
use crate::error::{AppError, AppResult};
use crate::infrastructure::installer::utils::create_progress_bar;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::cookie::Jar;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// 一次 HTTP 请求的最终结果（已跟随重定向）
#[derive(Debug, Clone)]
pub struct HttpPage {
    /// 重定向后的最终地址
    pub url: Url,
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpPage {
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP 传输层，测试中可替换为模拟实现
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET 请求
    async fn get(&self, url: &str) -> AppResult<HttpPage>;

    /// 提交表单（POST application/x-www-form-urlencoded）
    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> AppResult<HttpPage>;
}

/// 基于 reqwest 的 HTTP 客户端，带 cookie 存储
pub struct HttpClient {
    client: Client,
    show_progress: bool,
}

impl HttpClient {
    /// `total` 同时限制读取响应体的时间，大文件下载时通常不设置
    pub fn with_timeouts(connect: Duration, total: Option<Duration>) -> AppResult<Self> {
        let jar = Jar::default();
        let consent_url = Url::parse(CONSENT_COOKIE_URL)
            .map_err(|e| AppError::config(format!("无效的 cookie 地址: {}", e)))?;
        jar.add_cookie_str(CONSENT_COOKIE, &consent_url);

        let mut builder = Client::builder()
            .connect_timeout(connect)
            .user_agent(USER_AGENT)
            .cookie_provider(Arc::new(jar));
        if let Some(total) = total {
            builder = builder.timeout(total);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    async fn read_page(&self, response: reqwest::Response) -> AppResult<HttpPage> {
        let url = response.url().clone();
        let status = response.status().as_u16();
        let total_size = response.content_length().unwrap_or(0);

        let pb = if self.show_progress && total_size > 0 {
            let pb = create_progress_bar();
            pb.set_length(total_size);
            Some(pb)
        } else {
            None
        };

        let mut body = Vec::with_capacity(total_size as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AppError::download(url.as_str(), format!("读取数据失败: {}", e)))?;
            body.extend_from_slice(&chunk);
            if let Some(pb) = &pb {
                pb.set_position(body.len() as u64);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        Ok(HttpPage { url, status, body })
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn get(&self, url: &str) -> AppResult<HttpPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::download(url, format!("网络请求失败: {}", e)))?;
        self.read_page(response).await
    }

    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> AppResult<HttpPage> {
        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .await
            .map_err(|e| AppError::download(url, format!("提交表单失败: {}", e)))?;
        self.read_page(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 先发一半响应体，停顿 `pause` 后再发剩下的一半
    async fn slow_server(pause: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\n01234")
                .await
                .unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(pause).await;
            let _ = socket.write_all(b"56789").await;
        });
        format!("http://{}/jdk-7u15-linux-x64.tar.gz", addr)
    }

    #[tokio::test]
    async fn test_slow_body_outlives_connect_timeout() {
        let url = slow_server(Duration::from_millis(1500)).await;
        let client = HttpClient::with_timeouts(Duration::from_secs(1), None).unwrap();

        let page = client.get(&url).await.unwrap();
        assert!(page.is_success());
        assert_eq!(page.body, b"0123456789");
    }

    #[tokio::test]
    async fn test_total_timeout_is_opt_in() {
        let url = slow_server(Duration::from_millis(1500)).await;
        let client =
            HttpClient::with_timeouts(Duration::from_secs(1), Some(Duration::from_millis(500))).unwrap();

        let err = client.get(&url).await.unwrap_err();
        assert!(matches!(err, AppError::Download { .. }));
    }
}
