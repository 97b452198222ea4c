pub mod analytics;
pub mod data;
pub mod endpoints;
pub mod planner;
pub mod projector;
pub mod save_queue;
pub mod store;
pub mod util;
