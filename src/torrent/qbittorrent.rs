//! qBittorrent Web API v2 client.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Deserializer};

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::torrent::TorrentClient;

/// Name of the multipart part the add endpoint expects.
const TORRENT_FILE_FIELD: &str = "torrents";

/// One entry of `/api/v2/torrents/info`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TorrentInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: u64,
    /// 0.0 – 1.0
    #[serde(default)]
    pub progress: f64,
    /// Unix timestamp
    #[serde(default)]
    pub added_on: i64,
}

fn lenient_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)))
        .unwrap_or(0))
}

pub struct QBittorrentClient {
    http: reqwest::Client,
    host: String,
    username: Option<String>,
    password: Option<String>,
    save_path: Option<String>,
    logged_in: AtomicBool,
}

impl QBittorrentClient {
    pub fn new(
        host: &str,
        username: Option<String>,
        password: Option<String>,
        save_path: Option<String>,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(true)
            .timeout(config::network::torrent_api_timeout())
            .build()?;

        Ok(Self {
            http,
            host: host.trim_end_matches('/').to_string(),
            username,
            password,
            save_path,
            logged_in: AtomicBool::new(false),
        })
    }

    /// Client configured from `QBITTORRENT_*`, or `None` when no host is set.
    pub fn from_env() -> AppResult<Option<Self>> {
        use config::torrent::*;
        let Some(host) = QBITTORRENT_HOST.as_deref() else {
            return Ok(None);
        };
        Self::new(
            host,
            QBITTORRENT_USERNAME.clone(),
            QBITTORRENT_PASSWORD.clone(),
            QBITTORRENT_DOWNLOAD_PATH.clone(),
        )
        .map(Some)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.host, path)
    }

    async fn ensure_logged_in(&self) -> AppResult<()> {
        if self.logged_in.load(Ordering::Acquire) || self.login().await? {
            Ok(())
        } else {
            Err(AppError::Torrent("cannot log in to qBittorrent".to_string()))
        }
    }

    async fn add(&self, form: Form) -> AppResult<()> {
        let mut form = form;
        if let Some(ref path) = self.save_path {
            form = form.text("savepath", path.clone());
        }

        let response = self.http.post(self.endpoint("torrents/add")).multipart(form).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Torrent(format!("add failed ({}): {}", status, body.trim())))
    }

    /// Adds a magnet or a `.torrent` URL, optionally into `category`.
    pub async fn add_with_category(&self, url_or_magnet: &str, category: Option<&str>) -> AppResult<()> {
        self.ensure_logged_in().await?;

        let mut form = if url_or_magnet.starts_with("magnet:") {
            Form::new().text("urls", url_or_magnet.to_string())
        } else {
            // qBittorrent may not reach the tracker site, so we fetch the file ourselves
            let response = self.http.get(url_or_magnet).send().await?;
            if !response.status().is_success() {
                return Err(AppError::Torrent(format!(
                    "cannot download torrent file: HTTP {}",
                    response.status()
                )));
            }
            let bytes = response.bytes().await?;
            Form::new().part(TORRENT_FILE_FIELD, Part::bytes(bytes.to_vec()).file_name("temp.torrent"))
        };
        if let Some(category) = category {
            form = form.text("category", category.to_string());
        }

        self.add(form).await?;
        log::info!("Torrent added: {}", url_or_magnet);
        Ok(())
    }
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    async fn login(&self) -> AppResult<bool> {
        let (Some(username), Some(password)) = (self.username.as_deref(), self.password.as_deref()) else {
            log::warn!("No qBittorrent credentials, assuming an unauthenticated Web UI");
            self.logged_in.store(true, Ordering::Release);
            return Ok(true);
        };

        let response = self
            .http
            .post(self.endpoint("auth/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let body = response.text().await?;

        let ok = body.trim() == "Ok.";
        if ok {
            log::info!("Logged in to qBittorrent at {}", self.host);
        } else {
            log::error!("qBittorrent login rejected: {}", body.trim());
        }
        self.logged_in.store(ok, Ordering::Release);
        Ok(ok)
    }

    async fn enqueue(&self, url_or_magnet: &str) -> AppResult<()> {
        self.add_with_category(url_or_magnet, None).await
    }

    async fn enqueue_file(&self, name: &str, bytes: Vec<u8>) -> AppResult<()> {
        self.ensure_logged_in().await?;
        let form = Form::new().part(TORRENT_FILE_FIELD, Part::bytes(bytes).file_name(name.to_string()));
        self.add(form).await?;
        log::info!("Torrent file added: {}", name);
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<TorrentInfo>> {
        self.ensure_logged_in().await?;
        let response = self
            .http
            .get(self.endpoint("torrents/info"))
            .query(&[("filter", "all")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }

    fn save_path(&self) -> Option<&str> {
        self.save_path.as_deref()
    }
}
