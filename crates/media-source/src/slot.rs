//! The single loaded source and exclusive access to it.
//!
//! Streaming and export both drive the same source's position. A driver
//! takes a [`SourceLease`] for its whole run; a second driver asking while
//! the lease is held gets [`PanelfeedError::SourceBusy`] instead of waiting.

use std::sync::Arc;

use panelfeed_common::{PanelfeedError, PanelfeedResult};
use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};

use crate::source::MediaSource;

type Slot = Option<Box<dyn MediaSource>>;

/// Exclusive access to the loaded source. Released on drop.
pub type SourceLease = OwnedMappedMutexGuard<Slot, dyn MediaSource>;

/// Holder of the currently loaded source, shared between drivers.
#[derive(Clone, Default)]
pub struct SourceSlot {
    inner: Arc<Mutex<Slot>>,
}

impl SourceSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot already holding `source`.
    pub fn with_source(source: impl MediaSource + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(Box::new(source)))),
        }
    }

    /// Replace the loaded source, waiting for any running driver to finish.
    /// Returns the previous source.
    pub async fn load(&self, source: Box<dyn MediaSource>) -> Option<Box<dyn MediaSource>> {
        tracing::info!(name = source.name(), "Loading source");
        self.inner.lock().await.replace(source)
    }

    /// Remove the loaded source, waiting for any running driver to finish.
    pub async fn unload(&self) -> Option<Box<dyn MediaSource>> {
        self.inner.lock().await.take()
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Take exclusive use of the loaded source without waiting.
    pub fn try_acquire(&self) -> PanelfeedResult<SourceLease> {
        let guard: OwnedMutexGuard<Slot> = self
            .inner
            .clone()
            .try_lock_owned()
            .map_err(|_| PanelfeedError::SourceBusy)?;

        OwnedMutexGuard::try_map(guard, |slot: &mut Slot| slot.as_deref_mut())
            .map_err(|_| PanelfeedError::NoSourceLoaded)
    }
}
