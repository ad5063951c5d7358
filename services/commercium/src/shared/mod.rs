//! 跨 context 共享的 HTTP 与事件基础设施

pub mod auth;
pub mod events;
pub mod router;
pub mod state;

#[cfg(test)]
pub mod testing;

pub use state::AppState;
