pub mod cookies;
pub mod manager;
pub mod session;

pub use cookies::CookieJar;
pub use manager::SessionManager;
pub use session::{Session, SessionPhase};
