use super::project::project_from_host;
use super::properties::{Field, flatten};
use indexmap::IndexMap;
use serde::Deserialize;

/// HTTP Public-Key-Pinning validation failure report.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PkpReport {
    #[serde(rename = "date-time")]
    pub date_time: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    #[serde(rename = "effective-expiration-date")]
    pub effective_expiration_date: Option<String>,
    #[serde(rename = "include-subdomains")]
    pub include_subdomains: Option<bool>,
    #[serde(rename = "noted-hostname")]
    pub noted_hostname: Option<String>,
    #[serde(rename = "served-certificate-chain")]
    pub served_certificate_chain: Option<Vec<String>>,
    #[serde(rename = "validated-certificate-chain")]
    pub validated_certificate_chain: Option<Vec<String>>,
    #[serde(rename = "known-pins")]
    pub known_pins: Option<Vec<String>>,
    #[serde(skip)]
    pub host: Option<String>,
}

impl PkpReport {
    pub fn project(&self) -> Option<String> {
        project_from_host(self.hostname.as_deref()?)
    }

    pub fn properties(&self) -> IndexMap<String, String> {
        let fields: [Field<'_>; 10] = [
            ("date-time", &self.date_time),
            ("hostname", &self.hostname),
            ("port", &self.port),
            ("effective-expiration-date", &self.effective_expiration_date),
            ("include-subdomains", &self.include_subdomains),
            ("noted-hostname", &self.noted_hostname),
            ("served-certificate-chain", &self.served_certificate_chain),
            ("validated-certificate-chain", &self.validated_certificate_chain),
            ("known-pins", &self.known_pins),
            ("host", &self.host),
        ];
        flatten(&fields)
    }
}
