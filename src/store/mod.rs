//! Persistence API surface and the resilient project store
//!
//! The host application provides the actual backend as a `ProjectApi`
//! implementation; this module wraps every call in the transport retry
//! policy and keeps the document-listing query readable while offline via
//! the durable read-through cache. Writes never fall back to the cache.

pub mod cache;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Document;
use crate::network::retry::RetryPolicy;
use crate::network::Connectivity;
use crate::store::cache::OfflineCache;
use crate::sync::SyncError;

/// The listing query returns at most this many records, newest first.
pub const LISTING_CAP: usize = 10;

/// Transport faults reported by `ProjectApi` implementations.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

/// Lifecycle state of a persisted project record.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Published,
    Archived,
}

/// What the engine sends when creating or updating a record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProjectPayload {
    pub name: String,
    pub content_data: Document,
    pub status: ProjectStatus,
}

/// A persisted project record as returned by the backend.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub content_data: Document,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The persistence backend, provided by the host.
///
/// All methods require connectivity; there is no offline queuing.
#[async_trait]
pub trait ProjectApi: Send + Sync {
    async fn create(&self, payload: ProjectPayload) -> Result<ProjectRecord, ApiError>;

    async fn update(&self, id: &str, payload: ProjectPayload) -> Result<ProjectRecord, ApiError>;

    async fn list(&self, user_id: &str) -> Result<Vec<ProjectRecord>, ApiError>;

    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// Where a listing came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListingSource {
    /// Fresh from the backend.
    Remote,
    /// Served from the offline cache because the fetch failed.
    Cached,
}

/// A document listing, tagged with its provenance so hosts can render a
/// degraded-mode notice when showing cached data.
#[derive(Clone, Debug)]
pub struct Listing {
    pub records: Vec<ProjectRecord>,
    pub source: ListingSource,
}

/// Persistence API wrapped with retries, connectivity preflight, and the
/// read-through listing cache.
#[derive(Clone)]
pub struct ProjectStore {
    api: Arc<dyn ProjectApi>,
    retry: RetryPolicy,
    connectivity: Connectivity,
    cache: OfflineCache,
}

impl ProjectStore {
    pub fn new(api: Arc<dyn ProjectApi>, connectivity: Connectivity, cache: OfflineCache) -> Self {
        Self {
            api,
            retry: RetryPolicy::default(),
            connectivity,
            cache,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Create a new record. Fails fast when offline.
    pub async fn create(&self, payload: ProjectPayload) -> Result<ProjectRecord, SyncError> {
        let api = self.api.clone();
        self.retry
            .execute(&self.connectivity, move || {
                let api = api.clone();
                let payload = payload.clone();
                async move { api.create(payload).await }
            })
            .await
    }

    /// Update an existing record. Fails fast when offline.
    pub async fn update(
        &self,
        id: &str,
        payload: ProjectPayload,
    ) -> Result<ProjectRecord, SyncError> {
        let api = self.api.clone();
        let id = id.to_string();
        self.retry
            .execute(&self.connectivity, move || {
                let api = api.clone();
                let id = id.clone();
                let payload = payload.clone();
                async move { api.update(&id, payload).await }
            })
            .await
    }

    /// Delete a record. Fails fast when offline and never touches the cache.
    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let api = self.api.clone();
        let id = id.to_string();
        self.retry
            .execute(&self.connectivity, move || {
                let api = api.clone();
                let id = id.clone();
                async move { api.delete(&id).await }
            })
            .await
    }

    /// Fetch the user's listing, newest first, capped at [`LISTING_CAP`].
    ///
    /// On success the offline cache is refreshed. On any failure (including
    /// offline) a previously cached listing is returned tagged as `Cached`;
    /// with no cached copy the failure surfaces as `CacheMiss`.
    pub async fn list(&self, user_id: &str) -> Result<Listing, SyncError> {
        let api = self.api.clone();
        let owned_user = user_id.to_string();
        let fetched = self
            .retry
            .execute(&self.connectivity, move || {
                let api = api.clone();
                let user_id = owned_user.clone();
                async move { api.list(&user_id).await }
            })
            .await;

        match fetched {
            Ok(mut records) => {
                records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                records.truncate(LISTING_CAP);

                if let Err(error) = self.cache.refresh(user_id, &records).await {
                    warn!("failed to refresh listing cache for {user_id}: {error}");
                }

                debug!("fetched {} records for {user_id}", records.len());
                Ok(Listing {
                    records,
                    source: ListingSource::Remote,
                })
            }
            Err(error) => {
                warn!("listing fetch failed for {user_id}: {error}, trying cache");
                match self.cache.read(user_id).await {
                    Some(records) => Ok(Listing {
                        records,
                        source: ListingSource::Cached,
                    }),
                    None => Err(SyncError::CacheMiss(Box::new(error))),
                }
            }
        }
    }
}
