//! circ-core: Coordination core for the circulation background-job fleet
//!
//! This crate provides:
//! - Store-backed coordination primitives (locks, sync statuses, identifier sets)
//! - The key-value store contract and its in-memory implementation
//! - Adapter traits for external collaborators (hold persistence, analytics,
//!   bibliographic apply, vendor clients)
//! - A dependency-injection `Services` context built once per worker process

pub mod clock;
pub mod token;

pub mod adapters;
pub mod config;
pub mod coordination;
pub mod store;

pub mod event;
pub mod hold;
pub mod services;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    ConfigError, CoordinationConfig, HoldSweepConfig, LockDefaults, RetryDefaults, SyncExpiry,
};
pub use event::CirculationEvent;
pub use hold::{CollectionId, Hold, HoldId, LicenseTerm, PatronId, ResourceId};
pub use token::{SequentialTokenGen, TokenGen, UuidTokenGen};

// Re-export store contract
pub use store::{KeyStore, MemoryStore, Namespace, SetMode, StoreError, StoreKey};

// Re-export coordination primitives
pub use coordination::{
    DistributedLock, Identifier, IdentifierSet, LockConfig, LockError, LockOutcome, SetError,
    SetHandle, StatusError, SyncOutcome, SyncState, SyncStatus, SyncStatusRecord, TaskIdentity,
    TaskLock,
};

// Re-export adapter seams
pub use adapters::{
    AnalyticsError, AnalyticsSink, ApplyError, ApplySink, AvailabilityDocument, HoldStore,
    HoldStoreError, VendorClient, VendorError, VendorProtocol, VendorRegistry,
};

pub use services::Services;
