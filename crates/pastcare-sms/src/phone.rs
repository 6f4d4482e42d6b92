//! Phone number handling.
//!
//! Numbers are normalized towards E.164 before any routing decision.
//! Numbers written without an international prefix are assumed to be
//! local and get the configured local prefix.

/// Known international dialling prefixes and their country names.
#[derive(Debug, Clone)]
pub struct CountryCodeTable {
    /// Longest prefix first, so the first hit is the longest match.
    entries: Vec<(String, String)>,
    local_prefix: String,
}

const DEFAULT_COUNTRY_CODES: &[(&str, &str)] = &[
    ("+1", "USA/Canada"),
    ("+44", "United Kingdom"),
    ("+233", "Ghana"),
    ("+234", "Nigeria"),
    ("+254", "Kenya"),
    ("+27", "South Africa"),
    ("+256", "Uganda"),
    ("+255", "Tanzania"),
    ("+250", "Rwanda"),
    ("+263", "Zimbabwe"),
    ("+260", "Zambia"),
    ("+265", "Malawi"),
    ("+237", "Cameroon"),
    ("+225", "Ivory Coast"),
    ("+221", "Senegal"),
    ("+251", "Ethiopia"),
    ("+252", "Somalia"),
    ("+257", "Burundi"),
    ("+261", "Madagascar"),
    ("+266", "Lesotho"),
    ("+267", "Botswana"),
    ("+268", "Eswatini"),
    ("+269", "Comoros"),
    ("+91", "India"),
    ("+86", "China"),
    ("+81", "Japan"),
    ("+49", "Germany"),
    ("+33", "France"),
];

/// Prefix assumed for numbers written in national format.
pub const DEFAULT_LOCAL_PREFIX: &str = "+233";

impl CountryCodeTable {
    pub fn new<I, P, N>(entries: I, local_prefix: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (P, N)>,
        P: Into<String>,
        N: Into<String>,
    {
        let mut entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(p, n)| (p.into(), n.into()))
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        entries.dedup_by(|a, b| a.0 == b.0);

        Self {
            entries,
            local_prefix: local_prefix.into(),
        }
    }

    pub fn local_prefix(&self) -> &str {
        &self.local_prefix
    }

    /// Country name for an exact prefix.
    pub fn country_name(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, name)| name.as_str())
    }

    /// Longest known prefix of an already normalized number.
    pub fn longest_match(&self, normalized: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| normalized.starts_with(p.as_str()))
            .map(|(p, _)| p.as_str())
    }

    /// `(prefix, country name)` pairs, longest prefix first.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CountryCodeTable {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRY_CODES.iter().copied(), DEFAULT_LOCAL_PREFIX)
    }
}

/// Phone number operations bound to one country code table.
#[derive(Debug, Clone, Default)]
pub struct PhoneNumbers {
    table: CountryCodeTable,
}

impl PhoneNumbers {
    pub fn new(table: CountryCodeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CountryCodeTable {
        &self.table
    }

    /// Strip formatting and make the number international.
    ///
    /// `"024 123 4567"` becomes `"+233241234567"` with the default table.
    pub fn normalize(&self, raw: &str) -> String {
        let digits: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect();

        if digits.starts_with('+') {
            return digits;
        }

        let national = digits.strip_prefix('0').unwrap_or(&digits);
        format!("{}{national}", self.table.local_prefix)
    }

    /// Dialling prefix of a number, or `"OTHER"` when none can be found.
    ///
    /// Unknown prefixes fall back to the first (up to) four digits.
    pub fn country_code(&self, raw: &str) -> String {
        let normalized = self.normalize(raw);

        if let Some(prefix) = self.table.longest_match(&normalized) {
            return prefix.to_string();
        }

        let Some(rest) = normalized.strip_prefix('+') else {
            return "OTHER".into();
        };
        if rest.is_empty() {
            return "OTHER".into();
        }
        let end = rest.char_indices().nth(4).map_or(rest.len(), |(i, _)| i);
        format!("+{}", &rest[..end])
    }

    pub fn is_local(&self, raw: &str) -> bool {
        self.country_code(raw) == self.table.local_prefix
    }

    /// E.164 check: `+` followed by 7 to 15 digits after normalization.
    pub fn is_valid(&self, raw: &str) -> bool {
        if raw.trim().is_empty() {
            return false;
        }
        let normalized = self.normalize(raw);
        match normalized.strip_prefix('+') {
            Some(rest) => {
                (7..=15).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        }
    }
}

const GSM_SINGLE: usize = 160;
const GSM_PART: usize = 153;
const UNICODE_SINGLE: usize = 70;
const UNICODE_PART: usize = 67;

/// Number of SMS parts needed to deliver `text`.
///
/// Any non-ASCII character switches the whole message to the unicode
/// encoding. Concatenated parts lose room to the part header.
pub fn message_segments(text: &str) -> u32 {
    let len = text.chars().count();
    if len == 0 {
        return 0;
    }

    let unicode = !text.is_ascii();
    let (single, part) = if unicode {
        (UNICODE_SINGLE, UNICODE_PART)
    } else {
        (GSM_SINGLE, GSM_PART)
    };

    if len <= single {
        1
    } else {
        len.div_ceil(part) as u32
    }
}
