pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use config::{ClusterSettings, SiebwerkConfig, SieveSettings};
pub use error::CoreError;
pub use transport::Transport;
pub use types::{CandidateRange, WorkerId};
