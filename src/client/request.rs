use crate::error::Error;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};

/// Cookie-bearing access to the judge. Every component takes this as a
/// capability so tests can substitute canned pages.
#[async_trait]
pub trait Session: Send + Sync {
    async fn get(&self, url: &str) -> anyhow::Result<String>;

    async fn post_form(&self, url: &str, fields: &[(&str, String)]) -> anyhow::Result<String>;
}

fn default_header() -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    [
        ("Accept", header::HeaderValue::from_static("*/*")),
        ("Connection", header::HeaderValue::from_static("keep-alive")),
    ]
    .into_iter()
    .for_each(|(x, y)| {
        headers.insert(x, y);
    });
    headers
}

#[derive(Debug)]
pub struct HttpSession {
    pub client: Client,
    pub base_url: String,
}

impl HttpSession {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36 Edg/108.0.1462.15")
                .timeout(std::time::Duration::from_secs(10))
                .cookie_store(true)
                .default_headers(default_header())
                .build()?,
            base_url: base_url.into(),
        })
    }

    pub fn get_url(&self, url: &str) -> String {
        if url.starts_with("http") {
            return url.into();
        }

        let mut res = self.base_url.clone();

        if !res.ends_with('/') {
            res.push('/')
        }

        if let Some(stripped) = url.strip_prefix('/') {
            res.push_str(stripped)
        } else {
            res.push_str(url)
        }
        res
    }

    async fn read(requested: &str, resp: reqwest::Response) -> anyhow::Result<String> {
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(Error::RateLimited.into());
        }
        if resp.url().path().ends_with("/enter") && !requested.contains("/enter") {
            return Err(Error::SessionExpired.into());
        }
        if !status.is_success() {
            return Err(anyhow::anyhow!("{} responded {}", requested, status));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn get(&self, url: &str) -> anyhow::Result<String> {
        let url = self.get_url(url);
        let resp = self.client.get(&url).send().await?;
        Self::read(&url, resp).await
    }

    async fn post_form(&self, url: &str, fields: &[(&str, String)]) -> anyhow::Result<String> {
        let url = self.get_url(url);
        let resp = self.client.post(&url).form(fields).send().await?;
        Self::read(&url, resp).await
    }
}
