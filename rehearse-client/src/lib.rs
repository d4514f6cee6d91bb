//! rehearse-client library - session controller for interview practice
//!
//! Drives classic and live sessions against either guest storage or the API
//! service. Presentation is left to the front-end; the bundled `rehearse`
//! binary is a minimal terminal one.

pub mod auth;
pub mod backend;
pub mod classic;
pub mod error;
pub mod live;
pub mod reconcile;

pub use backend::{BackendKind, GuestBackend, LocalStorage, RemoteBackend, SessionBackend};
pub use classic::{ClassicController, ClassicState};
pub use error::{ClientError, ClientResult};
pub use live::{LiveController, LiveState};

/// Identification line logged at startup, filled in by `build.rs`
pub fn build_info() -> String {
    format!(
        "rehearse v{} [{}] ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE")
    )
}
