pub mod cache;
pub mod churn;
pub mod cli;
pub mod cloc;
pub mod coupling;
pub mod error;
pub mod export;
pub mod git;
pub mod logging;
pub mod model;
pub mod source;
pub mod util;
