// The shared document holding the snapshot, reached over HTTP.

use async_trait::async_trait;
use chrono::Utc;
use election_results::Snapshot;
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde_json::json;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::live::config_reader::RemoteStoreSettings;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("the remote document does not exist"))]
    NotFound {},
    #[snafu(display("the remote store denied access to the document"))]
    PermissionDenied {},
    #[snafu(display("the remote store answered with status {status}"))]
    Unavailable { status: u16 },
    #[snafu(display("cannot reach the remote store: {source}"))]
    Http { source: reqwest::Error },
    #[snafu(display("the remote document has no payload"))]
    MissingPayload {},
    #[snafu(display("the remote payload is not a valid snapshot: {source}"))]
    MalformedPayload { source: serde_json::Error },
}

impl StoreError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied {})
    }
}

/// The shared document store.
///
/// Every write replaces the whole document: the last write wins.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn read(&self) -> Result<Snapshot, StoreError>;

    /// Replaces the document, creating it if it does not exist yet.
    async fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Wraps a snapshot into a document: the serialized snapshot is stored as a
/// single string field named `payload`.
pub fn encode_document(snapshot: &Snapshot) -> Result<JSValue, StoreError> {
    let payload = serde_json::to_string(snapshot).context(MalformedPayloadSnafu {})?;
    Ok(json!({ "fields": { "payload": { "stringValue": payload } } }))
}

pub fn decode_document(document: &JSValue) -> Result<Snapshot, StoreError> {
    let payload = document["fields"]["payload"]["stringValue"]
        .as_str()
        .context(MissingPayloadSnafu {})?;
    serde_json::from_str(payload).context(MalformedPayloadSnafu {})
}

/// Maps the error statuses of the store. Successful responses are returned as is.
pub fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    match resp.status() {
        StatusCode::NOT_FOUND => NotFoundSnafu {}.fail(),
        StatusCode::FORBIDDEN => PermissionDeniedSnafu {}.fail(),
        s if !s.is_success() => UnavailableSnafu {
            status: s.as_u16(),
        }
        .fail(),
        _ => Ok(resp),
    }
}

pub struct HttpDocumentStore {
    http: reqwest::Client,
    document_url: String,
    collection_url: String,
    document_id: String,
}

impl HttpDocumentStore {
    pub fn new(settings: &RemoteStoreSettings) -> Result<HttpDocumentStore, StoreError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("livetally/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout())
            .build()
            .context(HttpSnafu {})?;
        Ok(HttpDocumentStore {
            http,
            document_url: settings.document_url(),
            collection_url: settings.collection_url(),
            document_id: settings.document_id.clone(),
        })
    }

    async fn create(&self, document: &JSValue) -> Result<(), StoreError> {
        let resp = self
            .http
            .post(&self.collection_url)
            .query(&[("documentId", self.document_id.as_str())])
            .json(document)
            .send()
            .await
            .context(HttpSnafu {})?;
        check_status(resp)?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for HttpDocumentStore {
    async fn read(&self) -> Result<Snapshot, StoreError> {
        // The timestamp defeats intermediate caches.
        let t = Utc::now().timestamp_millis().to_string();
        let resp = self
            .http
            .get(&self.document_url)
            .query(&[("t", t.as_str())])
            .send()
            .await
            .context(HttpSnafu {})?;
        let resp = check_status(resp)?;
        let document: JSValue = resp.json().await.context(HttpSnafu {})?;
        let snapshot = decode_document(&document)?;
        debug!("read: {} seats", snapshot.seats.len());
        Ok(snapshot)
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let document = encode_document(snapshot)?;
        let resp = self
            .http
            .patch(&self.document_url)
            .query(&[("updateMask.fieldPaths", "payload")])
            .json(&document)
            .send()
            .await
            .context(HttpSnafu {})?;
        match check_status(resp) {
            Ok(_) => {}
            Err(StoreError::PermissionDenied {}) => return PermissionDeniedSnafu {}.fail(),
            Err(e) => {
                warn!("write: update failed ({}), creating the document instead", e);
                self.create(&document).await?;
            }
        }
        info!("write: snapshot stored in the remote document");
        Ok(())
    }
}
