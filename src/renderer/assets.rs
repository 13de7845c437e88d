use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::AssetConfig;
use crate::error::RenderError;
use crate::scheduler::job::AssetCategory;

/// Downloads assets referenced by sync jobs into the local asset directory.
#[async_trait]
pub trait AssetFetcher: Send + Sync + 'static {
    /// Fetch `file` of the given category. Returns the local path written.
    async fn fetch(&self, category: AssetCategory, file: &str) -> Result<PathBuf, RenderError>;
}

/// Fetches from a fixed remote repository laid out as `{base}/{pictures|animations}/{file}`.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: reqwest::Client,
    base_url: String,
    dir: PathBuf,
}

impl HttpAssetFetcher {
    pub fn new(config: &AssetConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dir: config.dir.clone(),
        }
    }

    pub fn url_for(&self, category: AssetCategory, file: &str) -> String {
        format!("{}/{}/{}", self.base_url, category.dir(), file)
    }

    pub fn local_path(&self, category: AssetCategory, file: &str) -> PathBuf {
        self.dir.join(category.dir()).join(file)
    }
}

async fn write_asset(path: &Path, body: &[u8]) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, body).await?;
    Ok(())
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, category: AssetCategory, file: &str) -> Result<PathBuf, RenderError> {
        let url = self.url_for(category, file);
        tracing::info!(url = %url, "Fetching asset");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RenderError::AssetFetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::AssetFetch(format!("{}: HTTP {}", url, status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RenderError::AssetFetch(format!("{}: {}", url, e)))?;

        let path = self.local_path(category, file);
        write_asset(&path, &body).await?;
        tracing::info!(path = %path.display(), bytes = body.len(), "Asset stored");
        Ok(path)
    }
}
