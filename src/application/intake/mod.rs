mod process_hand;

pub use process_hand::*;
