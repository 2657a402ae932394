pub mod config;
pub mod error;
pub mod optimizer;
pub mod scorer;
pub mod serde_inf;
pub mod simulator;
pub mod weights;

pub use error::{TfResult, TrackForgeError};
