pub mod card;
pub mod decision;
pub mod detection;
pub mod game_state;
