use super::properties::{Field, PropertyValue, flatten};
use crate::log_event::{ExceptionInfo, FrameInfo};
use indexmap::IndexMap;
use serde::Deserialize;

/// A single frame as reported by stacktrace.js. Line and column are 1-based,
/// 0 means unknown.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub line_number: u32,
    #[serde(default)]
    pub column_number: u32,
}

impl From<&StackFrame> for FrameInfo {
    fn from(frame: &StackFrame) -> Self {
        FrameInfo {
            function: frame.function_name.clone(),
            filename: frame.file_name.clone(),
            line: frame.line_number,
            column: frame.column_number,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct NameAndVersion {
    pub name: Option<String>,
    pub version: Option<String>,
}

impl PropertyValue for NameAndVersion {
    fn to_property(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.name, &self.version]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

/// JavaScript error captured in the browser.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StacktraceReport {
    pub message: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stack: Vec<StackFrame>,
    pub browser: Option<NameAndVersion>,
    pub os: Option<NameAndVersion>,
    pub url: Option<String>,
    pub source_url: Option<String>,
    /// Name of the reporting service, used as the project.
    pub service: Option<String>,

    // Experimental, reporters may stop sending these at any time
    pub party_id: Option<String>,
    pub department_id: Option<String>,
    pub sales_point_id: Option<String>,
    pub retail_ui_version: Option<String>,
    pub app_version: Option<String>,

    #[serde(skip)]
    pub host: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<StackFrame>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<StackFrame>>::deserialize(deserializer)?.unwrap_or_default())
}

impl StacktraceReport {
    pub fn project(&self) -> Option<String> {
        self.service
            .as_deref()
            .map(str::trim)
            .filter(|service| !service.is_empty())
            .map(str::to_string)
    }

    pub fn properties(&self) -> IndexMap<String, String> {
        let fields: [Field<'_>; 12] = [
            ("message", &self.message),
            ("browser", &self.browser),
            ("os", &self.os),
            ("url", &self.url),
            ("sourceUrl", &self.source_url),
            ("service", &self.service),
            ("partyId", &self.party_id),
            ("departmentId", &self.department_id),
            ("salesPointId", &self.sales_point_id),
            ("retailUiVersion", &self.retail_ui_version),
            ("appVersion", &self.app_version),
            ("host", &self.host),
        ];
        flatten(&fields)
    }

    /// The error with its frames, absent when the report carries no stack.
    pub fn exception(&self) -> Option<ExceptionInfo> {
        if self.stack.is_empty() {
            return None;
        }

        Some(ExceptionInfo {
            message: self.message.clone().unwrap_or_default(),
            stack: self.stack.iter().map(FrameInfo::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let report: StacktraceReport = serde_json::from_str(
            r#"{
                "message": "Uncaught TypeError: Cannot read property 'shortName' of null",
                "stack": [
                    {"functionName": "o.constructor._getOrgName", "fileName": "https://www.example.ru/app.min.js", "lineNumber": 1, "columnNumber": 5021},
                    {"fileName": "https://www.example.ru/app.min.js", "lineNumber": 1}
                ],
                "browser": {"name": "chrome", "version": "61.0.3163"},
                "os": {"name": "Windows", "version": ""},
                "url": "https://www.example.ru/folder/outbox",
                "service": "example",
                "appVersion": "1.2.3"
            }"#,
        )
        .unwrap();

        assert_eq!(report.stack.len(), 2);
        assert_eq!(report.stack[1].function_name, None);
        assert_eq!(report.stack[1].column_number, 0);
        assert_eq!(report.project(), Some("example".to_string()));

        let properties = report.properties();
        assert_eq!(properties["browser"], "chrome 61.0.3163");
        assert_eq!(properties["os"], "Windows");
        assert_eq!(properties["appVersion"], "1.2.3");
        assert!(!properties.contains_key("sourceUrl"));

        let exception = report.exception().unwrap();
        assert_eq!(
            exception.message,
            "Uncaught TypeError: Cannot read property 'shortName' of null"
        );
        assert_eq!(
            exception.stack[0],
            FrameInfo {
                function: Some("o.constructor._getOrgName".into()),
                filename: Some("https://www.example.ru/app.min.js".into()),
                line: 1,
                column: 5021,
            }
        );
    }

    #[test]
    fn test_no_stack_no_exception() {
        let report: StacktraceReport =
            serde_json::from_str(r#"{"message": "Script error.", "stack": null}"#).unwrap();
        assert!(report.stack.is_empty());
        assert!(report.exception().is_none());
    }

    #[test]
    fn test_project_requires_service() {
        let mut report = StacktraceReport::default();
        assert_eq!(report.project(), None);

        report.service = Some("  ".into());
        assert_eq!(report.project(), None);

        report.service = Some("billing".into());
        assert_eq!(report.project(), Some("billing".to_string()));
    }
}
