//! Domain models for PastCare.

pub mod church;
pub mod login_attempt;
pub mod refresh_token;
pub mod user;
