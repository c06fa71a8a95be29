mod solve_hand;

pub use solve_hand::*;
