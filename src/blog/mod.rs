pub mod handlers;
pub mod reactions;
pub mod store;
pub mod thread;
