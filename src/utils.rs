use std::time::{SystemTime, UNIX_EPOCH};

pub const IPFS_SCHEME: &str = "ipfs://";

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

//ipfs://<cid>[/path] -> <gateway>/ipfs/<cid>[/path], anything else untouched
pub fn resolve_gateway_url(content_ref: &str, gateway: &str) -> String {
    match content_ref.strip_prefix(IPFS_SCHEME) {
        Some(rest) => format!("{}/ipfs/{}", gateway.trim_end_matches('/'), rest),
        None => content_ref.to_string(),
    }
}

/// Cuts `text` to at most `max` chars, appending an ellipsis when it had to cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push('…');
    out
}
