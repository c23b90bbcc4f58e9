pub mod activity;
pub mod audit;
pub mod cache;
pub mod device;
pub mod metrics;
pub mod storage;

pub use activity::{
    ActivityContext, ActivityLogger, ActivitySink, Metadata, TracingSink, TrustedProxies,
};
pub use audit::AuditService;
pub use cache::{ArrayCache, DatabaseCache, KeyValueCache, RedisCache};
pub use metrics::Timer;
pub use storage::LocalStorage;
