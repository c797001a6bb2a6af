pub mod connection;
pub mod error;
pub mod readiness;
pub mod relay;
pub mod replies;
pub mod services;
pub mod traits;
pub mod warmup;
