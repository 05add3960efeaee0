//! Submission validation.
//!
//! Issues are collected rather than short-circuited so a client sees every
//! problem with its request in one round trip.

use serde::Serialize;

#[derive(Debug, Serialize, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub fn to_payload(issues: &[ValidationIssue]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for issue in issues {
        map.insert(
            issue.field.clone(),
            serde_json::json!({ "code": issue.code, "message": issue.message }),
        );
    }
    serde_json::json!({ "validation": serde_json::Value::Object(map) })
}

/// Extract the host from an http(s) URL.
pub fn url_host(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    Some(parsed.host_str()?.to_ascii_lowercase())
}

/// Validate a job submission against the configured domain allow-list.
pub fn validate_submission(
    url: &str,
    quality: Option<&str>,
    bitrate: Option<u32>,
    allowed_domains: &[String],
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if url.trim().is_empty() {
        issues.push(ValidationIssue::new("url", "required", "url is required"));
    } else {
        match url_host(url) {
            None => issues.push(ValidationIssue::new(
                "url",
                "invalid",
                "url must be a valid http(s) URL",
            )),
            Some(host) => {
                if !allowed_domains.iter().any(|d| d.eq_ignore_ascii_case(&host)) {
                    issues.push(ValidationIssue::new(
                        "url",
                        "domain_not_allowed",
                        format!("host {host} is not in the allowed domain list"),
                    ));
                }
            }
        }
    }

    if let Some(quality) = quality {
        let digits = quality
            .trim()
            .strip_suffix(['p', 'P'])
            .unwrap_or_else(|| quality.trim());
        if digits.is_empty() || digits.parse::<u32>().is_err() {
            issues.push(ValidationIssue::new(
                "quality",
                "invalid",
                "quality must be a resolution like 720p",
            ));
        }
    }

    if let Some(bitrate) = bitrate {
        if !(32..=320).contains(&bitrate) {
            issues.push(ValidationIssue::new(
                "bitrate",
                "out_of_range",
                "bitrate must be between 32 and 320 kbps",
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains() -> Vec<String> {
        vec![
            "www.youtube.com".to_string(),
            "youtube.com".to_string(),
            "m.youtube.com".to_string(),
            "youtu.be".to_string(),
        ]
    }

    #[test]
    fn extracts_hosts() {
        assert_eq!(
            url_host("https://www.youtube.com/watch?v=abc"),
            Some("www.youtube.com".to_string())
        );
        assert_eq!(url_host("https://youtu.be:443/abc"), Some("youtu.be".to_string()));
        assert_eq!(url_host("ftp://youtube.com/x"), None);
        assert_eq!(url_host("not a url"), None);
        assert_eq!(url_host("https:///path"), None);
    }

    #[test]
    fn ipv6_literal_host_stays_whole() {
        let host = url_host("https://[2001:db8::1]:8080/video").unwrap();
        assert_eq!(host, "[2001:db8::1]");
    }

    #[test]
    fn accepts_allowed_domains() {
        let issues = validate_submission(
            "https://youtu.be/dQw4w9WgXcQ",
            Some("720p"),
            Some(192),
            &domains(),
        );
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn rejects_unknown_host() {
        let issues = validate_submission("https://example.com/video", None, None, &domains());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "domain_not_allowed");
    }

    #[test]
    fn rejects_lookalike_host() {
        let issues =
            validate_submission("https://youtube.com.evil.example/v", None, None, &domains());
        assert_eq!(issues[0].code, "domain_not_allowed");
    }

    #[test]
    fn collects_multiple_issues() {
        let issues = validate_submission("", Some("best"), Some(9000), &domains());
        let codes: Vec<_> = issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["required", "invalid", "out_of_range"]);
    }

    #[test]
    fn host_match_is_case_insensitive() {
        let issues = validate_submission("https://YouTu.be/abc", None, None, &domains());
        assert!(issues.is_empty(), "{issues:?}");
    }
}
