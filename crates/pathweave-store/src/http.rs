use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use pathweave_model::{Block, BlockId, Path, PathId, WorkflowId};

use crate::error::StoreError;
use crate::types::{
  ConnectPaths, CreateMergePath, CreateMinimalPath, MoveBlocks, PathsResponse, UpdateBlockType,
  UpdateMerge,
};
use crate::WorkflowStore;

/// Configuration for the HTTP store client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpStoreConfig {
  /// Base URL of the service, e.g. `https://api.example.com/v1/`.
  pub base_url: String,
  /// Per-request timeout. Transport defaults apply when unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
}

/// Workflow store backed by a remote HTTP service.
pub struct HttpWorkflowStore {
  client: Client,
  base_url: Url,
}

impl HttpWorkflowStore {
  /// Create a client for the service at `config.base_url`.
  pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
    let mut builder = Client::builder();
    if let Some(ms) = config.timeout_ms {
      builder = builder.timeout(Duration::from_millis(ms));
    }

    Ok(Self {
      client: builder.build()?,
      base_url: normalize_base(&config.base_url)?,
    })
  }

  /// Get the base URL requests are resolved against.
  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
    Ok(self.base_url.join(path)?)
  }

  async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
    let response = check_status(request.send().await?).await?;
    Ok(response.json::<T>().await?)
  }

  async fn send_empty(&self, request: RequestBuilder) -> Result<(), StoreError> {
    check_status(request.send().await?).await?;
    Ok(())
  }
}

/// Parse the base URL, making sure relative joins keep its last segment.
fn normalize_base(base_url: &str) -> Result<Url, StoreError> {
  let mut base = base_url.to_string();
  if !base.ends_with('/') {
    base.push('/');
  }
  Ok(Url::parse(&base)?)
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  Err(StoreError::Status {
    status: status.as_u16(),
    body,
  })
}

#[async_trait]
impl WorkflowStore for HttpWorkflowStore {
  async fn fetch_paths(&self, workflow_id: WorkflowId) -> Result<Vec<Path>, StoreError> {
    debug!(%workflow_id, "fetching paths");
    let request = self
      .client
      .get(self.endpoint("paths")?)
      .query(&[("workflow_id", workflow_id.0)]);
    let response: PathsResponse = self.send_json(request).await?;
    Ok(response.paths)
  }

  async fn create_minimal_path(&self, request: &CreateMinimalPath) -> Result<Path, StoreError> {
    let request = self
      .client
      .post(self.endpoint("paths/minimal")?)
      .json(request);
    self.send_json(request).await
  }

  async fn move_blocks(&self, request: &MoveBlocks) -> Result<(), StoreError> {
    let request = self.client.post(self.endpoint("blocks/move")?).json(request);
    self.send_empty(request).await
  }

  async fn connect_paths(&self, request: &ConnectPaths) -> Result<(), StoreError> {
    let request = self
      .client
      .post(self.endpoint("paths/connect")?)
      .json(request);
    self.send_empty(request).await
  }

  async fn create_merge_path(&self, request: &CreateMergePath) -> Result<Path, StoreError> {
    let request = self.client.post(self.endpoint("paths/merge")?).json(request);
    self.send_json(request).await
  }

  async fn update_merge(
    &self,
    merge_path_id: PathId,
    request: &UpdateMerge,
  ) -> Result<(), StoreError> {
    let url = self.endpoint(&format!("paths/merge/{merge_path_id}"))?;
    self.send_empty(self.client.patch(url).json(request)).await
  }

  async fn update_block_type(
    &self,
    block_id: BlockId,
    request: &UpdateBlockType,
  ) -> Result<Block, StoreError> {
    let url = self.endpoint(&format!("blocks/{block_id}"))?;
    self.send_json(self.client.patch(url).json(request)).await
  }
}
