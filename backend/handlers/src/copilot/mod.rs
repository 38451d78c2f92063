pub mod client;
pub mod http;
pub mod options;
pub mod session_manager;

pub use client::{BackendClient, ClientConnector, ClientSession, RemoteModel};
pub use http::HttpConnector;
pub use options::{ClientOptions, SessionConfig};
pub use session_manager::{SessionManager, DEFAULT_CATALOG_TTL};
