//! Work scheduling for distributed sieving.
//!
//! The crate has two layers. The matching engine is a generic work queue
//! over an abstract worker pool: submit operations, register workers,
//! and every queued unit is dispatched to exactly one idle worker. The
//! cluster layer binds that engine to concrete transports — an in-process
//! channel dispatcher for single-host runs and a ZeroMQ PUSH/PULL broker
//! for real remote workers — and the coordinator drives a full prime
//! discovery over whichever pool is wired in.

pub mod broker;
pub mod channel;
pub mod completion;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod events;
pub mod message;
pub mod metrics;
pub mod protocol;
pub mod traits;
pub mod worker;

mod state;

pub use broker::{ClusterEngine, ZmqBroker};
pub use channel::ChannelDispatcher;
pub use completion::{completion_pair, CompletionHandle, CompletionSetter, WorkError};
pub use coordinator::ClusterCoordinator;
pub use engine::{MatchingEngine, WorkHandle};
pub use error::SchedulerError;
pub use events::BrokerEvent;
pub use message::Message;
pub use metrics::EngineMetrics;
pub use protocol::topics;
pub use protocol::{SieveOutcome, SieveTask, WorkerGoodbye, WorkerHello};
pub use traits::WorkDispatcher;
pub use worker::SieveWorker;
