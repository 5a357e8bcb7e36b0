//! External service integrations.

pub mod completion_client {
    pub use crate::completion_client::*;
}

pub mod circuit_breaker {
    pub use crate::circuit_breaker::*;
}
