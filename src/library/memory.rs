//! In-memory photo library for tests and quick wiring.
//!
//! Nothing here touches the disk. Behaviour can be scripted: the access
//! answer, a deletion failure, and gates that hold deletions or image loads
//! "in flight" until the test releases them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use image::DynamicImage;
use tokio::sync::Notify;

use super::error::LibraryError;
use super::{AccessStatus, PhotoLibrary, TargetSize};
use crate::state::AssetInfo;

#[derive(Debug)]
struct Inner {
    access: AccessStatus,
    assets: Vec<AssetInfo>,
    deletion_failure: Option<String>,
    deletion_gate: Option<Arc<Notify>>,
    image_gate: Option<Arc<Notify>>,
    delete_calls: Vec<Vec<String>>,
}

/// Minimal in-memory library (not durable)
#[derive(Debug)]
pub struct InMemoryLibrary {
    inner: Mutex<Inner>,
}

impl InMemoryLibrary {
    /// A library holding `assets` in the given (newest-first) order.
    pub fn new(assets: Vec<AssetInfo>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                access: AccessStatus::Authorized,
                assets,
                deletion_failure: None,
                deletion_gate: None,
                image_gate: None,
                delete_calls: Vec::new(),
            }),
        }
    }

    pub fn set_access(&self, status: AccessStatus) {
        self.lock().access = status;
    }

    /// Make every following deletion fail with `reason`.
    pub fn fail_deletions(&self, reason: &str) {
        self.lock().deletion_failure = Some(reason.to_string());
    }

    pub fn allow_deletions(&self) {
        self.lock().deletion_failure = None;
    }

    /// Hold deletions until the returned handle is notified.
    pub fn hold_deletions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().deletion_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Hold image loads until the returned handle is notified.
    pub fn hold_images(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().image_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Drop an asset as if another app had deleted it.
    pub fn remove_externally(&self, id: &str) {
        self.lock().assets.retain(|asset| asset.id != id);
    }

    pub fn assets(&self) -> Vec<AssetInfo> {
        self.lock().assets.clone()
    }

    /// Id lists received by `delete_assets`, in call order
    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.lock().delete_calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PhotoLibrary for InMemoryLibrary {
    async fn request_access(&self) -> AccessStatus {
        self.lock().access
    }

    async fn list_all_photos(&self) -> Result<Vec<AssetInfo>, LibraryError> {
        Ok(self.lock().assets.clone())
    }

    async fn load_image(&self, id: &str, size: TargetSize) -> Option<DynamicImage> {
        let gate = self.lock().image_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let known = self.lock().assets.iter().any(|asset| asset.id == id);
        known.then(|| DynamicImage::new_rgb8(size.width, size.height))
    }

    async fn delete_assets(&self, ids: &[String]) -> Result<(), LibraryError> {
        let gate = {
            let mut inner = self.lock();
            inner.delete_calls.push(ids.to_vec());
            inner.deletion_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut inner = self.lock();
        if let Some(reason) = &inner.deletion_failure {
            return Err(LibraryError::Rejected(reason.clone()));
        }
        let doomed: HashSet<&String> = ids.iter().collect();
        inner.assets.retain(|asset| !doomed.contains(&asset.id));
        Ok(())
    }
}
