pub mod admission;
pub mod entry;
pub mod error;
pub mod ids;
pub mod registry;
pub mod venues;
pub mod weight;
mod time;

pub use admission::Admission;
pub use admission::Refusal;
pub use entry::IntervalUnit;
pub use entry::LimitDescriptor;
pub use entry::LimitEntry;
pub use entry::LimitKind;
pub use entry::ResetInterval;
pub use error::LedgerError;
pub use error::Result;
pub use ids::dimension_id;
pub use ids::limit_id;
pub use registry::RateLimitRegistry;
pub use weight::QueryWeight;
pub use weight::TieredWeight;
