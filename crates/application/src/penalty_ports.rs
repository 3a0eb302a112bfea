mod lists;
mod repository;

pub use lists::UserList;
pub use repository::PenaltyRepository;
