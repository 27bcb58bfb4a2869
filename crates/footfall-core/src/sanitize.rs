//! Cleaning of free-text request fields before they are persisted.
//!
//! None of these functions fail: on anything unexpected they return a safe
//! default, never the raw input.

use url::Url;

use crate::error::CoreError;

pub const MAX_USER_AGENT_CHARS: usize = 500;
pub const MAX_REFERER_CHARS: usize = 1000;
pub const MAX_PAGE_PATH_CHARS: usize = 500;

const PATH_BASE: &str = "http://localhost";

/// Strip `<...>` tag-like runs and the characters `< > " '` and NUL, then cap
/// the length at [`MAX_USER_AGENT_CHARS`].
pub fn sanitize_user_agent(ua: &str) -> String {
    strip_tags(ua)
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '\0'))
        .take(MAX_USER_AGENT_CHARS)
        .collect()
}

/// Keep the referer only if it is an absolute http(s) URL.
pub fn sanitize_referer(referer: &str) -> String {
    if referer.is_empty() {
        return String::new();
    }
    match Url::parse(referer) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => truncate(referer, MAX_REFERER_CHARS),
        _ => String::new(),
    }
}

/// Reduce `path` to the path component of `http://localhost{path}`.
///
/// Anything containing a `..` segment collapses to `/`.
pub fn sanitize_page_path(path: &str) -> String {
    if path.is_empty() || path.contains("..") {
        return "/".to_string();
    }
    let Ok(url) = Url::parse(&format!("{PATH_BASE}{path}")) else {
        return "/".to_string();
    };
    let pathname = url.path();
    if pathname.contains("..") {
        return "/".to_string();
    }
    truncate(pathname, MAX_PAGE_PATH_CHARS)
}

/// Actions accepted by `POST /api/visitors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ResetDaily,
    GetStats,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::ResetDaily => "reset-daily",
            Action::GetStats => "get-stats",
        }
    }
}

/// Whitelist check for the `action` field of an admin request body.
pub fn validate_action(action: Option<&serde_json::Value>) -> Result<Action, CoreError> {
    let raw = match action {
        None | Some(serde_json::Value::Null) => return Err(CoreError::MissingAction),
        Some(serde_json::Value::String(s)) => s.as_str(),
        Some(other) => return Err(CoreError::InvalidAction(other.to_string())),
    };
    match raw {
        "reset-daily" => Ok(Action::ResetDaily),
        "get-stats" => Ok(Action::GetStats),
        other => Err(CoreError::InvalidAction(other.to_string())),
    }
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                // No closing bracket: nothing more to strip as a tag.
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
