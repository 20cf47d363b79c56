mod attendance;
mod config;
mod csv;
mod league;
mod mock;
mod pr;
mod score;

pub use attendance::*;
pub use config::*;
pub use csv::*;
pub use league::*;
pub use mock::*;
pub use pr::*;
pub use score::*;

pub type GithubHandle = String;
