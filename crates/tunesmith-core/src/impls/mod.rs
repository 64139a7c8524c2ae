//! Implementations of the ports.
//!
//! - `HttpGenerationApi`: the real remote service over HTTP/JSON
//! - `SimulatedApi`: an in-process stand-in for demos and offline runs

pub mod http;
pub mod simulated;

pub use self::http::HttpGenerationApi;
pub use self::simulated::SimulatedApi;
