//! PastCare Auth: refresh-token session management, password
//! verification, JWT access tokens and login orchestration.

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod session;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{AuthService, LoginInput, LoginOutput, RefreshOutput, RegisterChurchInput};
pub use session::{Clock, IssuedSession, SessionManager, SystemClock};
pub use token::AccessTokenClaims;
