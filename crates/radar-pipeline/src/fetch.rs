//! Product sources.
//!
//! A [`ProductFetcher`] returns the raw bytes of the newest product for a
//! site. Fetching is the only place the pipeline waits on I/O.

use async_trait::async_trait;
use bytes::Bytes;
use level3_parser::product_info;
use radar_common::ProductCode;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, instrument};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL template '{0}'")]
    InvalidTemplate(String),

    #[error("Product {0} has no AWIPS category")]
    UnknownProduct(ProductCode),

    #[error("Product {0} has no tgftp directory")]
    NoDirectory(ProductCode),

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("No product {product} found for {site}")]
    NotFound { site: String, product: ProductCode },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Request(e.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e.to_string())
    }
}

/// Source of raw product bytes.
#[async_trait]
pub trait ProductFetcher: Send + Sync {
    /// Bytes of the newest available product for a site.
    async fn fetch_latest(&self, site: &str, product: ProductCode) -> Result<Bytes, FetchError>;
}

/// AWIPS category of a product code, e.g. "N0Q" for 94.
fn category(product: ProductCode) -> Result<&'static str, FetchError> {
    product_info(product.value())
        .map(|info| info.awips_category)
        .ok_or(FetchError::UnknownProduct(product))
}

/// tgftp directory of a product code, e.g. "p94r0" for 94.
fn tgftp_dir(product: ProductCode) -> Result<&'static str, FetchError> {
    let info = product_info(product.value()).ok_or(FetchError::UnknownProduct(product))?;
    info.tgftp_dir.ok_or(FetchError::NoDirectory(product))
}

/// Fetches products over HTTP from a URL template.
///
/// Template placeholders: `{site}` (lower-case site id), `{SITE}` (upper
/// case), `{product}` (product code), `{dir}` (tgftp product directory
/// such as `p94r0`), and `{category}` (AWIPS category such as `N0Q`, lower
/// case for `{category}` and upper case for `{CATEGORY}`).
pub struct HttpFetcher {
    client: Client,
    template: String,
}

impl HttpFetcher {
    pub fn new(template: &str, timeout: Duration) -> Result<Self, FetchError> {
        let template = template.trim().to_string();
        if !(template.starts_with("http://") || template.starts_with("https://")) {
            return Err(FetchError::InvalidTemplate(template));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self { client, template })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// URL of the newest product for a site.
    pub fn url_for(&self, site: &str, product: ProductCode) -> Result<String, FetchError> {
        let site = site.trim();
        let mut url = self
            .template
            .replace("{site}", &site.to_lowercase())
            .replace("{SITE}", &site.to_uppercase())
            .replace("{product}", &product.to_string());
        if url.contains("{category}") || url.contains("{CATEGORY}") {
            let category = category(product)?;
            url = url
                .replace("{category}", &category.to_lowercase())
                .replace("{CATEGORY}", category);
        }
        if url.contains("{dir}") {
            url = url.replace("{dir}", tgftp_dir(product)?);
        }
        Ok(url)
    }
}

#[async_trait]
impl ProductFetcher for HttpFetcher {
    #[instrument(skip_all, fields(site = %site, product = %product))]
    async fn fetch_latest(&self, site: &str, product: ProductCode) -> Result<Bytes, FetchError> {
        let url = self.url_for(site, product)?;
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                site: site.to_string(),
                product,
            });
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                url,
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        debug!(url = %url, bytes = bytes.len(), "Fetched product");
        Ok(bytes)
    }
}

/// Reads the newest matching product file from a local directory tree.
///
/// A file matches when its name contains the product's AWIPS category and
/// the site id (either the full id or its last three letters, as in
/// `KTLX_N0Q_20240506_2201` or `N0QTLX`).
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the newest matching file, by modification time then name.
    pub fn find_latest(&self, site: &str, product: ProductCode) -> Result<PathBuf, FetchError> {
        let category = category(product)?;
        let site = site.trim().to_uppercase();
        let short_site = match site.get(1..) {
            Some(rest) if site.len() == 4 => rest,
            _ => site.as_str(),
        };

        let mut best: Option<(SystemTime, PathBuf)> = None;
        for entry in WalkDir::new(&self.root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_uppercase();
            if !name.contains(category) || !(name.contains(&site) || name.contains(short_site)) {
                continue;
            }
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let candidate = (modified, entry.into_path());
            if best.as_ref().map_or(true, |b| candidate > *b) {
                best = Some(candidate);
            }
        }

        best.map(|(_, path)| path).ok_or(FetchError::NotFound {
            site,
            product,
        })
    }
}

#[async_trait]
impl ProductFetcher for DirectoryFetcher {
    #[instrument(
        skip_all,
        fields(site = %site, product = %product, root = %self.root.display())
    )]
    async fn fetch_latest(&self, site: &str, product: ProductCode) -> Result<Bytes, FetchError> {
        let this = self.clone();
        let site_id = site.to_string();
        let path = tokio::task::spawn_blocking(move || this.find_latest(&site_id, product))
            .await
            .map_err(|e| FetchError::Io(e.to_string()))??;

        let data = tokio::fs::read(&path).await?;
        debug!(path = %path.display(), bytes = data.len(), "Read product file");
        Ok(Bytes::from(data))
    }
}
