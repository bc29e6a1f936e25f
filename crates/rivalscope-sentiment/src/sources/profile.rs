//! Profile URL to platform identifier resolution.
//!
//! Each platform encodes the account differently in its URLs. Anything that
//! does not resolve yields `None` and the adapter scrapes nothing.

use reqwest::Url;
use rivalscope_core::Platform;

/// First path segments on instagram.com that never name an account.
const INSTAGRAM_RESERVED: &[&str] = &["p", "reel", "reels", "explore", "stories", "tv", "accounts"];

const FACEBOOK_RESERVED: &[&str] = &[
    "groups",
    "events",
    "watch",
    "share",
    "photo.php",
    "permalink.php",
    "story.php",
    "marketplace",
];

/// Extracts the account identifier from a profile URL or bare handle.
#[must_use]
pub fn resolve_identifier(platform: Platform, profile: &str) -> Option<String> {
    let profile = profile.trim();
    if profile.is_empty() {
        return None;
    }

    match platform {
        Platform::Instagram => instagram(profile),
        Platform::Facebook => facebook(profile),
        Platform::TikTok => tiktok(profile),
        Platform::YouTube => youtube(profile),
    }
}

/// Canonical profile URL for a resolved identifier.
#[must_use]
pub fn canonical_profile_url(platform: Platform, identifier: &str) -> String {
    match platform {
        Platform::Instagram => format!("https://www.instagram.com/{identifier}/"),
        Platform::Facebook if identifier.chars().all(|c| c.is_ascii_digit()) => {
            format!("https://www.facebook.com/profile.php?id={identifier}")
        }
        Platform::Facebook => format!("https://www.facebook.com/{identifier}"),
        Platform::TikTok => format!("https://www.tiktok.com/@{identifier}"),
        Platform::YouTube => format!("https://www.youtube.com/{identifier}"),
    }
}

/// Name a brand's own replies are posted under, for a resolved identifier.
///
/// YouTube identifiers carry a `channel/`, `c/` or `user/` path prefix that
/// never appears in comment author names.
#[must_use]
pub fn brand_handle(platform: Platform, identifier: &str) -> &str {
    match platform {
        Platform::YouTube => identifier
            .split_once('/')
            .map_or(identifier, |(_, name)| name),
        _ => identifier,
    }
}

fn instagram(profile: &str) -> Option<String> {
    let Some(url) = parse_url(profile) else {
        return bare_handle(profile);
    };
    if !host_matches(&url, &["instagram.com"]) {
        return None;
    }
    let first = *segments(&url).first()?;
    if INSTAGRAM_RESERVED.contains(&first) {
        return None;
    }
    valid_handle(first).then(|| first.to_string())
}

fn facebook(profile: &str) -> Option<String> {
    let Some(url) = parse_url(profile) else {
        return bare_handle(profile);
    };
    if !host_matches(&url, &["facebook.com", "fb.com"]) {
        return None;
    }

    let segs = segments(&url);
    match segs.as_slice() {
        ["profile.php", ..] => url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, id)| id.into_owned())
            .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())),
        // /pages/<name>/<numeric id>
        ["pages", .., id] if id.chars().all(|c| c.is_ascii_digit()) => Some((*id).to_string()),
        [first, ..] if !FACEBOOK_RESERVED.contains(first) && valid_handle(first) => {
            Some((*first).to_string())
        }
        _ => None,
    }
}

fn tiktok(profile: &str) -> Option<String> {
    let Some(url) = parse_url(profile) else {
        return bare_handle(profile);
    };
    if !host_matches(&url, &["tiktok.com"]) {
        return None;
    }
    let handle = segments(&url).first()?.strip_prefix('@')?.to_string();
    valid_handle(&handle).then_some(handle)
}

fn youtube(profile: &str) -> Option<String> {
    let Some(url) = parse_url(profile) else {
        // Bare input must be an @handle; a plain word is ambiguous on YouTube.
        let handle = profile.strip_prefix('@')?;
        return valid_handle(handle).then(|| format!("@{handle}"));
    };
    if !host_matches(&url, &["youtube.com"]) {
        return None;
    }

    match segments(&url).as_slice() {
        [handle, ..] if handle.len() > 1 && handle.starts_with('@') => Some((*handle).to_string()),
        [kind @ ("channel" | "c" | "user"), name, ..] if valid_handle(name) => {
            Some(format!("{kind}/{name}"))
        }
        _ => None,
    }
}

fn parse_url(raw: &str) -> Option<Url> {
    let candidate = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else if raw.contains('/') {
        format!("https://{raw}")
    } else {
        return None;
    };
    Url::parse(&candidate).ok()
}

fn host_matches(url: &Url, domains: &[&str]) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

fn segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn bare_handle(raw: &str) -> Option<String> {
    let handle = raw.strip_prefix('@').unwrap_or(raw);
    valid_handle(handle).then(|| handle.to_string())
}

fn valid_handle(handle: &str) -> bool {
    !handle.is_empty()
        && handle
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
