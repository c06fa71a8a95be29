mod run_equity;

pub use run_equity::*;
