pub mod config;
pub mod error;
pub mod node;
pub mod renderer;
pub mod scheduler;
pub mod shutdown;
pub mod source;
