pub mod lottery;
pub mod run;

pub use lottery::*;
pub use run::*;
