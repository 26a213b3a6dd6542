//! mirror-core: change-detection and conflict-resolution engine for
//! mirroring external task platforms into one task-management service.
//!
//! This crate provides the core functionality for:
//! - Diffing fetched remote items against locally persisted snapshots
//! - One-way reconciliation (remote platform authoritative)
//! - Bi-directional reconciliation with deterministic conflict resolution
//! - Stale-cache sweeping ahead of a reconcile pass
//! - The collaborator trait boundary (RemoteSource, MirrorService,
//!   SnapshotStore) the daemon wires platform clients into

pub mod bidir;
pub mod clients;
pub mod detect;
pub mod error;
pub mod item;
pub mod mapper;
pub mod memory;
pub mod oneway;
pub mod report;
pub mod resolve;
pub mod scope;
pub mod snapshot;
pub mod sweep;

pub use bidir::BidirReconciler;
pub use clients::{ContainerRef, MirrorService, RemoteSource};
pub use error::{Result, SyncError};
pub use item::{ItemStatus, MirrorFields, MirrorTask, SourceFields, SourceItem, SourceKind};
pub use oneway::OneWayReconciler;
pub use report::SyncReport;
pub use resolve::{ConflictPolicy, Resolution};
pub use scope::ScopeMapping;
pub use snapshot::{ChangeMarker, Snapshot, SnapshotStore};
pub use sweep::sweep_stale;
