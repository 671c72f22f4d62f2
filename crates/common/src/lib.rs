// Naming, time and on-disk layout
pub mod clock;
pub mod repository;
pub mod ttl_index;

// External filesystem primitives (cvmfs_server, local snapshots)
pub mod primitive;

// Transactional core
pub mod coordinator;
pub mod housekeeping;
pub mod notifier;
pub mod store;
pub mod unpack;

pub mod prelude {
    pub use crate::clock::{unix_seconds, Clock, FixedClock, SystemClock};
    pub use crate::coordinator::{
        Committed, ExclusiveAccess, TransactionContext, TransactionCoordinator, TransactionError,
    };
    pub use crate::housekeeping::{
        FleetHousekeeper, HousekeepingError, HousekeepingReport, SweepOutcome,
    };
    pub use crate::notifier::{ChangeNotifier, NotifyError};
    pub use crate::primitive::{
        CvmfsServer, CvmfsServerConfig, LocalTransactions, MaintenancePrimitive, NotifyPrimitive,
        PrimitiveError, TransactionPrimitive,
    };
    pub use crate::repository::{
        is_reserved, validate_artifact_name, NameError, RepositoryName, StorageRoot,
        TTL_INDEX_FILENAME,
    };
    pub use crate::store::{
        ArtifactStore, ArtifactStoreBuilder, BuildError, StoreError, TtlUpdate, Upload,
        UploadOutcome,
    };
    pub use crate::ttl_index::{TtlIndex, TtlIndexError, TtlRecord};
    pub use crate::unpack::{ArchiveUnpacker, CommandUnpacker};
}
