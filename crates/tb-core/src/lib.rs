//! tb-core: stable foundation for the capacity-control testbed.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - ids (virtual machine identifiers)
//! - category (application and VM performance categories)
//! - units (uom time quantities for sampling/control intervals)
//! - error (shared error types)

pub mod category;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use category::{AppPerformanceCategory, VmPerformanceCategory};
pub use error::{TbError, TbResult};
pub use ids::VmId;
pub use numeric::*;
pub use units::*;
