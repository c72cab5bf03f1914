use super::project::project_from_host;
use super::properties::{Field, flatten};
use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

/// Content-Security-Policy violation report.
///
/// Browsers wrap the violation in a `csp-report` object:
///
/// ```json
/// {
///   "csp-report": {
///     "document-uri": "https://www.example.ru/page",
///     "referrer": "",
///     "blocked-uri": "wss://www.example.ru",
///     "violated-directive": "connect-src 'self'",
///     "effective-directive": "connect-src",
///     "original-policy": "default-src 'self'; connect-src 'self'"
///   }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CspReport {
    #[serde(rename = "csp-report")]
    pub body: CspReportBody,
    #[serde(skip)]
    pub host: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CspReportBody {
    #[serde(rename = "document-uri")]
    pub document_uri: Option<String>,
    pub referrer: Option<String>,
    #[serde(rename = "blocked-uri")]
    pub blocked_uri: Option<String>,
    #[serde(rename = "violated-directive")]
    pub violated_directive: Option<String>,
    #[serde(rename = "effective-directive")]
    pub effective_directive: Option<String>,
    #[serde(rename = "original-policy")]
    pub original_policy: Option<String>,
}

impl CspReport {
    /// Project of the page the violation happened on.
    pub fn project(&self) -> Option<String> {
        let document_uri = self.body.document_uri.as_deref()?;
        let url = Url::parse(document_uri).ok()?;
        project_from_host(url.host_str()?)
    }

    pub fn properties(&self) -> IndexMap<String, String> {
        let body = &self.body;
        let fields: [Field<'_>; 7] = [
            ("document-uri", &body.document_uri),
            ("referrer", &body.referrer),
            ("blocked-uri", &body.blocked_uri),
            ("violated-directive", &body.violated_directive),
            ("effective-directive", &body.effective_directive),
            ("original-policy", &body.original_policy),
            ("host", &self.host),
        ];
        flatten(&fields)
    }
}
