//! Request/response types for the annotation HTTP API

use crate::model::ToneMode;
use serde::{Deserialize, Serialize};

/// Annotation route path
pub const ANNOTATE_PATH: &str = "/api/annotate";

/// POST /api/annotate request body
///
/// Every field is optional: with no lines the service tries to discover them from the title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hanzi_lines: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<AnnotateOptions>,
}

impl AnnotateRequest {
    pub fn tone_mode(&self) -> ToneMode {
        ToneMode::from_tone_numbers(self.options.as_ref().is_some_and(|o| o.tone_numbers))
    }

    /// True when the caller supplied at least one non-blank line
    pub fn has_lines(&self) -> bool {
        self.hanzi_lines
            .as_ref()
            .is_some_and(|lines| lines.iter().any(|l| !l.trim().is_empty()))
    }
}

/// Annotation options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateOptions {
    #[serde(default)]
    pub tone_numbers: bool,
}

/// Error body returned before the event stream starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_camel_case() {
        let request: AnnotateRequest = serde_json::from_str(
            r#"{"hanziLines":["你好"],"title":"t","options":{"toneNumbers":true}}"#,
        )
        .unwrap();

        assert_eq!(request.hanzi_lines.as_deref(), Some(&["你好".to_string()][..]));
        assert_eq!(request.tone_mode(), ToneMode::Numbers);
        assert!(request.has_lines());
    }

    #[test]
    fn test_empty_request_defaults() {
        let request: AnnotateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.tone_mode(), ToneMode::Marks);
        assert!(!request.has_lines());
    }

    #[test]
    fn test_blank_lines_are_not_lines() {
        let request = AnnotateRequest {
            hanzi_lines: Some(vec!["  ".to_string(), String::new()]),
            ..Default::default()
        };
        assert!(!request.has_lines());
    }
}
