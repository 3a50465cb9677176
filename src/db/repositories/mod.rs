pub mod application_repository;
pub mod club_repository;
pub mod event_repository;
pub mod nomination_repository;
pub mod ticket_repository;
pub mod user_repository;
pub mod vote_repository;

pub use application_repository::*;
pub use club_repository::*;
pub use event_repository::*;
pub use nomination_repository::*;
pub use ticket_repository::*;
pub use user_repository::*;
pub use vote_repository::*;
