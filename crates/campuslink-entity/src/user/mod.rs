//! User entity and related enums.

pub mod model;
pub mod role;
pub mod status;

pub use model::UserRecord;
pub use role::UserRole;
pub use status::PresenceStatus;
