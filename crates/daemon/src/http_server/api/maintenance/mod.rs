//! Fleet-wide maintenance endpoints.

pub mod gc;
pub mod housekeeping;
pub mod resign;

pub use gc::{GcRequest, GcResponse};
pub use housekeeping::{HousekeepingRequest, HousekeepingResponse};
pub use resign::{ResignRequest, ResignResponse};
