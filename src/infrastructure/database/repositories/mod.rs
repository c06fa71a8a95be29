mod opponent_repo;

pub use opponent_repo::*;
