//! PastCare SMS: phone number normalization, country detection and
//! routing of outgoing messages to the cheapest capable gateway.

pub mod config;
pub mod error;
pub mod gateway;
pub mod phone;
pub mod router;

pub use config::SmsConfig;
pub use error::SmsError;
pub use gateway::{GatewayCoverage, SmsGateway, SmsGatewayKind, SmsMessage, SmsReceipt};
pub use phone::{CountryCodeTable, PhoneNumbers, message_segments};
pub use router::SmsGatewayRouter;
