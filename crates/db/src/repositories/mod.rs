//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! `&PgPool`, or `&mut PgConnection` when the step belongs to a larger
//! transaction.

pub mod notification_repo;
pub mod project_repo;
pub mod reference_repo;
pub mod user_repo;

pub use notification_repo::NotificationRepo;
pub use project_repo::ProjectRepo;
pub use reference_repo::ReferenceRepo;
pub use user_repo::UserRepo;
