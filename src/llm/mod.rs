// LLM abstraction layer

pub mod provider;
pub mod azure;

pub use provider::*;
