pub mod baseline;
pub mod beam;
pub mod config;
pub mod error;
pub mod knapsack;
pub mod lengths;
pub mod post_opt;
pub mod quantize;
pub mod ranker;
pub mod remnant;
pub mod scrap;
pub mod solver;
pub mod state;
pub mod types;

pub use error::{Result, SolveError};
pub use solver::solve;
