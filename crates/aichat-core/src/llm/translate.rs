//! Upstream error code translation.
//!
//! Callers never see raw provider codes. Every code maps to one of a small
//! set of categories, each with a fixed user-facing message.

/// User-facing category of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidParameter,
    Connectivity,
    ContentSafety,
    IpInfringement,
    Unknown,
}

impl ErrorCategory {
    pub fn message(self) -> &'static str {
        match self {
            ErrorCategory::InvalidParameter => "AiChat AI服务器错误，请联系客服处理或稍后再试",
            ErrorCategory::Connectivity => "AiChat AI服务器网络出错，请稍后再试",
            ErrorCategory::ContentSafety => "敏感内容，生成失败",
            ErrorCategory::IpInfringement => "IP侵权，生成失败",
            ErrorCategory::Unknown => "服务错误，请稍后再试",
        }
    }
}

/// Known provider codes. Lookups are exact and case-sensitive: the provider
/// uses both `CamelCase` and `snake_case` spellings for the same condition.
static CODE_TABLE: &[(&str, ErrorCategory)] = &[
    ("InvalidParameter", ErrorCategory::InvalidParameter),
    ("invalid_request_error", ErrorCategory::InvalidParameter),
    ("APIConnectionError", ErrorCategory::Connectivity),
    ("DataInspectionFailed", ErrorCategory::ContentSafety),
    ("data_inspection_failed", ErrorCategory::ContentSafety),
    ("IPInfringementSuspect", ErrorCategory::IpInfringement),
];

/// Classify an upstream error code.
pub fn categorize(code: &str) -> ErrorCategory {
    CODE_TABLE
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, category)| *category)
        .unwrap_or(ErrorCategory::Unknown)
}

/// Translate an upstream error code into its user-facing message.
pub fn translate(code: &str) -> &'static str {
    categorize(code).message()
}
