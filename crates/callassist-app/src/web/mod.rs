// Web frontend module
pub mod routes;
pub mod server;
pub mod session_store;
pub mod template;

pub use routes::{create_router, AppError, AppState, ModelProvider, RouteSettings, TranscriptForm};
pub use server::WebServer;
pub use session_store::{SessionContext, SessionStore, SESSION_COOKIE};
