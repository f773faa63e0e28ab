//! Weighted-blended order-independent transparency demo
//!
//! Library half of the `wboit` binary: configuration loading and the window
//! and render systems driven by the event loop in `main.rs`.

pub mod config;
pub mod systems;
