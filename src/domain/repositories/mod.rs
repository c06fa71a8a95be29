mod opponent_repository;

pub use opponent_repository::*;
