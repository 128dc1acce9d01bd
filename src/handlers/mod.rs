//! Route handlers and pipeline middleware of the edge service.
//!
//! ```text
//! GET /             → hello.rs    (greeting, logged)
//! GET /hello-world  → hello.rs
//! GET /weather      → weather.rs  (SecretCache + Geolocator + forecast API)
//! GET /skywards     → skywards.rs (rendered dashboard)
//! GET /esi          → esi.rs      (origin page through StreamRewriter)
//!
//! every request     → middleware.rs ServedBy
//! failed requests   → middleware.rs ErrorResponder
//! ```

pub mod esi;
pub mod hello;
pub mod middleware;
pub mod skywards;
pub mod weather;

pub use esi::EsiHandler;
pub use hello::HelloWorld;
pub use middleware::{ErrorResponder, ServedBy};
pub use skywards::SkywardsPage;
pub use weather::WeatherHandler;
