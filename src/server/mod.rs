//! HTTP server for Bindery

mod http;

pub use http::{run, AppState};
