//! Host notification interface.

use crate::feature::Feature;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future for the host confirmation round-trip.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// The host's verdict on a pending delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDecision {
    /// Let the delete go ahead.
    Proceed,
    /// Veto the delete; nothing is removed.
    Cancel,
}

/// Failure of the host round-trip itself. Treated as an implicit cancel of
/// the operation that was awaiting confirmation.
#[derive(Debug, Error)]
#[error("host notification failed: {0}")]
pub struct HostError(pub String);

/// Notifications raised to the host application.
///
/// All methods default to no-ops so hosts implement only what they observe.
/// `feature_deleting` is the single cancelable round-trip: the engine
/// awaits the returned future before touching the store.
pub trait EditorHost {
    /// A drawing was confirmed and committed as a new feature.
    fn feature_created(&self, _feature: &Feature) {}

    /// A vertex-edit transaction wrote new geometry for this feature.
    fn feature_modified(&self, _feature: &Feature) {}

    /// The listed features are about to be deleted; the host may veto by
    /// resolving to [`DeleteDecision::Cancel`]. An error resolves the
    /// delete as cancelled too.
    fn feature_deleting<'a>(
        &'a self,
        _features: &'a [Feature],
    ) -> BoxFuture<'a, Result<DeleteDecision, HostError>> {
        Box::pin(async { Ok(DeleteDecision::Proceed) })
    }

    /// One feature was removed from the store. Raised once per feature.
    fn feature_deleted(&self, _feature: &Feature) {}

    /// An open drawing session was discarded without committing.
    fn drawing_cancelled(&self) {}

    /// The selection registry was emptied after a completed delete.
    fn selection_cleared(&self) {}
}

/// Host that ignores every notification and lets deletes proceed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl EditorHost for NullHost {}
