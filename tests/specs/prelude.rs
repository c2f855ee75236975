//! Shared harness for the behavioral specs

pub use circ_core::adapters::{FakeHoldStore, RecordingAnalytics, RecordingApplySink};
pub use circ_core::clock::{Clock, FakeClock};
pub use circ_core::coordination::{
    DistributedLock, Identifier, IdentifierSet, LockConfig, SyncState, SyncStatus, TaskLock,
};
pub use circ_core::hold::{CollectionId, Hold, HoldId, LicenseTerm, PatronId, ResourceId};
pub use circ_core::services::Services;
pub use circ_core::store::{KeyStore, MemoryStore, Namespace};
pub use circ_core::token::SequentialTokenGen;
pub use circ_engine::HoldQueueEngine;
pub use std::sync::Arc;
pub use std::time::Duration;

/// One worker process's view of the world: a `Services` context plus direct
/// handles on the fakes behind it
pub struct Harness {
    pub services: Services,
    pub holds: Arc<FakeHoldStore>,
    pub analytics: Arc<RecordingAnalytics>,
    pub apply: Arc<RecordingApplySink>,
    pub clock: Arc<FakeClock>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(FakeClock::new());
        let holds = Arc::new(FakeHoldStore::new());
        let analytics = Arc::new(RecordingAnalytics::new());
        let apply = Arc::new(RecordingApplySink::new());
        let services = Services::new(
            Arc::new(MemoryStore::new(clock.clone())),
            holds.clone(),
            analytics.clone(),
            apply.clone(),
            clock.clone(),
            Arc::new(SequentialTokenGen::new("worker")),
        );
        Self {
            services,
            holds,
            analytics,
            apply,
            clock,
        }
    }

    /// A second worker sharing the same store but carrying its own token
    /// generator, the way a separate process would
    pub fn sibling(&self, owner: &str) -> Services {
        let mut services = self.services.clone();
        services.tokens = Arc::new(SequentialTokenGen::new(owner));
        services
    }

    pub fn store(&self) -> Arc<dyn KeyStore> {
        self.services.store.clone()
    }

    pub fn namespace(&self) -> Namespace {
        self.services.namespace()
    }
}

pub fn resource(id: &str) -> ResourceId {
    ResourceId::new(id)
}

pub fn collection(id: &str) -> CollectionId {
    CollectionId::new(id)
}

pub fn patron(id: &str) -> PatronId {
    PatronId::new(id)
}
