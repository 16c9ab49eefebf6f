//! # huehub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum). One router serves one hub.
//!
//! ## Responsibilities
//! - Serve the **Hue v1 API** (`/api/...`) over the hub's page of the registry
//! - Serve the **Hue v2 resource API** (`/clip/v2/resource/...`) and its
//!   **event stream** (`/eventstream/clip/v2`)
//! - Serve the UPnP **discovery descriptor** (`/description.xml`)
//! - Answer `503` while the hub is being torn down
//! - Map application results and errors into Hue-shaped JSON
//!
//! ## Dependency rule
//! Depends on `huehub-app` (for port traits and services) and `huehub-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod descriptor;
pub mod draining;
pub mod error;
pub mod router;
pub mod sse;
pub mod state;
#[allow(clippy::missing_errors_doc)]
pub mod v1;
#[allow(clippy::missing_errors_doc)]
pub mod v2;
