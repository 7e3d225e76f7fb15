//! Job admission and lifecycle

mod config;
mod dispatcher;

pub use config::{DispatcherConfig, MIN_STACK_SIZE};
pub use dispatcher::Dispatcher;
