pub mod audit;
pub mod directory_cache;
pub mod error;
pub mod group;
pub mod invalidation;
pub mod organization;
pub mod resolver;
pub mod role;
pub mod schema_sync;
pub mod warming;

pub use audit::{AuditEntry, AuditSink, HierarchyChangeEntry, PgAuditSink, RecordingAuditSink};
pub use directory_cache::DirectoryCache;
pub use error::ServiceError;
pub use group::GroupService;
pub use invalidation::{
    default_strategies, EventKind, InvalidationCoordinator, InvalidationEvent,
    InvalidationStats, InvalidationStrategy,
};
pub use organization::OrganizationService;
pub use resolver::EntitlementResolver;
pub use role::RoleService;
pub use schema_sync::{
    HttpSchemaSyncClient, NullSchemaSyncClient, RecordingSchemaSyncClient, SchemaSyncClient,
    Vocabulary,
};
pub use warming::{CacheWarmingService, WarmingReport};
