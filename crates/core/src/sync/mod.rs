pub mod operation_model;
pub mod sync_errors;
pub mod sync_traits;

pub use operation_model::*;
pub use sync_errors::SyncError;
pub use sync_traits::*;
