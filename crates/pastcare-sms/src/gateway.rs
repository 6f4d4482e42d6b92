//! SMS gateway abstraction.
//!
//! Carrier clients live in the embedding application; this crate only
//! needs to know which countries a gateway covers and how to hand it a
//! message.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SmsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmsGatewayKind {
    /// Regional carrier with cheaper rates inside Africa.
    Regional,
    /// Global carrier for everything else.
    International,
}

impl SmsGatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regional => "regional",
            Self::International => "international",
        }
    }
}

impl fmt::Display for SmsGatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const AFRICAN_PREFIXES: &[&str] = &[
    "+233", "+234", "+254", "+27", "+256", "+255", "+250", "+263", "+260", "+265", "+237", "+225",
    "+221", "+251", "+252", "+257", "+261", "+266", "+267", "+268", "+269",
];

const INTERNATIONAL_PREFIXES: &[&str] = &[
    "+1", "+44", "+49", "+33", "+39", "+34", "+81", "+86", "+91", "+61", "+55", "+52",
];

/// Country codes a gateway accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCoverage {
    /// Exactly the listed country codes.
    Listed(Vec<String>),
    /// The listed country codes plus any code outside `region_prefix`.
    ListedOrOutsideRegion {
        listed: Vec<String>,
        region_prefix: String,
    },
}

impl GatewayCoverage {
    /// Coverage of the African regional gateway.
    pub fn african() -> Self {
        Self::Listed(AFRICAN_PREFIXES.iter().map(|p| p.to_string()).collect())
    }

    /// Coverage of the international gateway: its listed countries and
    /// anything outside the `+2` zone.
    pub fn international() -> Self {
        Self::ListedOrOutsideRegion {
            listed: INTERNATIONAL_PREFIXES.iter().map(|p| p.to_string()).collect(),
            region_prefix: "+2".into(),
        }
    }

    pub fn covers(&self, country_code: &str) -> bool {
        match self {
            Self::Listed(listed) => listed.iter().any(|c| c == country_code),
            Self::ListedOrOutsideRegion {
                listed,
                region_prefix,
            } => {
                listed.iter().any(|c| c == country_code)
                    || !country_code.starts_with(region_prefix.as_str())
            }
        }
    }
}

/// An outgoing message, addressed to a normalized number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
    /// Caller-supplied tags passed through to the carrier.
    pub metadata: BTreeMap<String, String>,
}

/// What a gateway reports back after accepting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsReceipt {
    pub gateway: SmsGatewayKind,
    /// Carrier-side message identifier.
    pub message_id: String,
    pub segments: u32,
}

/// A carrier able to deliver SMS to some set of countries.
pub trait SmsGateway: Send + Sync {
    fn kind(&self) -> SmsGatewayKind;

    fn supports_country(&self, country_code: &str) -> bool;

    fn send(
        &self,
        message: SmsMessage,
    ) -> impl Future<Output = Result<SmsReceipt, SmsError>> + Send;
}
