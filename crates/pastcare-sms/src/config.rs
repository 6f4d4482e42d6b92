//! SMS routing configuration.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::phone::{CountryCodeTable, DEFAULT_LOCAL_PREFIX, PhoneNumbers};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    /// Prefix added to numbers written without one (default: `+233`).
    pub local_prefix: String,
    /// Extra prefix → country name entries on top of the built-in table.
    pub country_codes: BTreeMap<String, String>,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            local_prefix: DEFAULT_LOCAL_PREFIX.into(),
            country_codes: BTreeMap::new(),
        }
    }
}

impl SmsConfig {
    /// Built-in table extended with the configured entries. Configured
    /// names win over built-in ones for the same prefix.
    pub fn country_code_table(&self) -> CountryCodeTable {
        let builtin = CountryCodeTable::default();
        let mut entries: Vec<(String, String)> = self
            .country_codes
            .iter()
            .map(|(p, n)| (p.clone(), n.clone()))
            .collect();
        entries.extend(builtin.entries().map(|(p, n)| (p.to_string(), n.to_string())));
        CountryCodeTable::new(entries, self.local_prefix.clone())
    }

    pub fn phone_numbers(&self) -> PhoneNumbers {
        PhoneNumbers::new(self.country_code_table())
    }
}
