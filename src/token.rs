//! Session token minting.
//!
//! Tokens are opaque to everything but this module. The format embeds a
//! sanitized fragment of the user id plus a UTC timestamp and a process-local
//! sequence number, so two submissions from the same user in the same second
//! still get distinct tokens.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Maximum length of the user fragment embedded in a token.
const MAX_USER_FRAGMENT: usize = 24;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Mint a fresh session token for `user_id` at `now`.
pub fn mint(user_id: &str, now: DateTime<Utc>) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{}-{}",
        sanitize_fragment(user_id),
        now.timestamp(),
        seq
    )
}

/// Reduce a user id to a lowercase alphanumeric-and-dash fragment.
fn sanitize_fragment(user_id: &str) -> String {
    let mapped: String = user_id
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();

    // Collapse consecutive dashes and trim leading/trailing dashes
    let mut result = String::new();
    let mut prev_dash = true;
    for c in mapped.chars() {
        if c == '-' {
            if !prev_dash {
                result.push(c);
            }
            prev_dash = true;
        } else {
            result.push(c);
            prev_dash = false;
        }
    }
    if result.ends_with('-') {
        result.pop();
    }

    if result.is_empty() {
        result.push_str("anon");
    }
    if result.chars().count() > MAX_USER_FRAGMENT {
        result = result.chars().take(MAX_USER_FRAGMENT).collect();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_is_unique_within_same_second() {
        let now = Utc::now();
        let a = mint("u1", now);
        let b = mint("u1", now);
        assert_ne!(a, b);
    }

    #[test]
    fn test_mint_embeds_user_fragment() {
        let token = mint("Telegram User 42", Utc::now());
        assert!(token.starts_with("telegram-user-42-"));
    }

    #[test]
    fn test_sanitize_fragment_empty_input() {
        assert_eq!(sanitize_fragment("!!!"), "anon");
        assert_eq!(sanitize_fragment(""), "anon");
    }

    #[test]
    fn test_sanitize_fragment_truncates() {
        let long = "x".repeat(100);
        assert!(sanitize_fragment(&long).len() <= MAX_USER_FRAGMENT);
    }
}
