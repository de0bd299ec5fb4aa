pub mod cli;
pub mod config;
mod db;
pub mod descriptor;
pub mod error;
pub mod hamming;
pub mod imdb;
pub mod matcher;
pub mod orb;
pub mod ranker;
pub mod scan;
pub mod utils;

pub use config::Opts;
pub use db::{FaceRecord, UpsertOutcome};
pub use error::{Error, Result};
pub use imdb::{IMDB, IMDBBuilder, LoadSummary, SearchReport};
pub use orb::ORBDetector;
