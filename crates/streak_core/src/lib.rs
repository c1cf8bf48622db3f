pub mod clock;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod model;
pub mod observe;
pub mod projector;
pub mod storage;
pub mod store;
pub mod streak;

pub use driver::{Driver, Tick};
pub use engine::{Engine, EngineSubscription, SharedEngine};
pub use error::AppError;
