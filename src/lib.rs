pub mod bus;
pub mod cache;
pub mod commands;
pub mod context;
pub mod db;
pub mod duration;
pub mod events;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod storage;

// Customize these constants for your deployment
pub const EVENT_TARGET: &str = "group_warden::events";
pub const ERROR_TARGET: &str = "group_warden::error";
pub const CONSOLE_TARGET: &str = "group_warden";

pub use bus::EventBus;
pub use context::AppContext;
pub use db::DocumentStore;
pub type Error = Box<dyn std::error::Error + Send + Sync>;
