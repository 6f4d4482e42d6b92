//! Gateway selection by destination country.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::SmsError;
use crate::gateway::{SmsGateway, SmsGatewayKind, SmsMessage, SmsReceipt};
use crate::phone::PhoneNumbers;

/// Routes each message to the regional gateway when it serves the
/// destination country, and to the international gateway otherwise.
pub struct SmsGatewayRouter<R: SmsGateway, I: SmsGateway> {
    regional: R,
    international: I,
    phones: PhoneNumbers,
}

impl<R: SmsGateway, I: SmsGateway> SmsGatewayRouter<R, I> {
    pub fn new(regional: R, international: I, phones: PhoneNumbers) -> Self {
        Self {
            regional,
            international,
            phones,
        }
    }

    pub fn regional(&self) -> &R {
        &self.regional
    }

    pub fn international(&self) -> &I {
        &self.international
    }

    pub fn phones(&self) -> &PhoneNumbers {
        &self.phones
    }

    /// Gateway that would carry a message to `phone_number`.
    pub fn select(&self, phone_number: &str) -> SmsGatewayKind {
        if self.routes_regional(phone_number) {
            self.regional.kind()
        } else {
            self.international.kind()
        }
    }

    fn routes_regional(&self, phone_number: &str) -> bool {
        let country_code = self.phones.country_code(phone_number);
        let regional = self.regional.supports_country(&country_code);
        let gateway = if regional {
            self.regional.kind()
        } else {
            self.international.kind()
        };
        debug!(%country_code, %gateway, "Selected SMS gateway");
        regional
    }

    /// Normalize `to`, pick a gateway and hand the message over.
    pub async fn send(
        &self,
        to: &str,
        body: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<SmsReceipt, SmsError> {
        if !self.phones.is_valid(to) {
            return Err(SmsError::InvalidNumber(to.to_string()));
        }

        let message = SmsMessage {
            to: self.phones.normalize(to),
            body: body.to_string(),
            metadata,
        };

        if self.routes_regional(&message.to) {
            self.regional.send(message).await
        } else {
            self.international.send(message).await
        }
    }
}
