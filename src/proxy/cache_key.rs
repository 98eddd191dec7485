//! Cache key derivation and cacheability policy
//!
//! Keys are built from the target's path and query with the credential
//! parameter removed, so requests that differ only in their API key share a
//! cache entry. Characters outside `[A-Za-z0-9._-]` become `_`, and a short
//! digest of the unsanitized input keeps distinct targets apart when the
//! sanitizer collapses them.

use crate::domain::types::CacheKey;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use url::Url;

/// Separator substituted for unsafe characters
pub const KEY_SEPARATOR: &str = "_";

/// Longest sanitized prefix kept before the digest suffix
const MAX_READABLE_LEN: usize = 200;

/// Hex characters of the SHA-256 digest appended to every key
const DIGEST_HEX_LEN: usize = 16;

/// Replacement shown in logs instead of the credential value
pub const REDACTED: &str = "***";

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static pattern compiles"));

/// Derives cache keys that ignore one credential query parameter
#[derive(Debug, Clone)]
pub struct CacheKeyNormalizer {
    secret_param: String,
}

impl CacheKeyNormalizer {
    pub fn new(secret_param: impl Into<String>) -> Self {
        Self {
            secret_param: secret_param.into(),
        }
    }

    /// Key for a raw target URL; `None` when it does not parse
    pub fn normalize(&self, raw_url: &str) -> Option<CacheKey> {
        Url::parse(raw_url)
            .ok()
            .and_then(|url| self.normalize_url(&url))
    }

    pub fn normalize_url(&self, url: &Url) -> Option<CacheKey> {
        let remaining = self.query_without_secret(url);
        let path_and_query = if remaining.is_empty() {
            url.path().to_string()
        } else {
            format!("{}?{}", url.path(), remaining)
        };

        let sanitized = UNSAFE_CHARS.replace_all(&path_and_query, KEY_SEPARATOR);
        let readable: String = sanitized.chars().take(MAX_READABLE_LEN).collect();

        let mut hasher = Sha256::new();
        hasher.update(url.host_str().unwrap_or_default().as_bytes());
        hasher.update(path_and_query.as_bytes());
        let digest = hex::encode(hasher.finalize());

        CacheKey::try_new(format!(
            "{readable}{KEY_SEPARATOR}{}",
            &digest[..DIGEST_HEX_LEN]
        ))
        .ok()
    }

    /// Raw query pairs, in their original order and encoding, minus the secret
    fn query_without_secret(&self, url: &Url) -> String {
        url.query()
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty() && !self.is_secret_pair(pair))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn is_secret_pair(&self, pair: &str) -> bool {
        pair_is_named(pair, &self.secret_param)
    }
}

fn pair_is_named(pair: &str, name: &str) -> bool {
    let key = pair.split('=').next().unwrap_or_default();
    urlencoding::decode(key)
        .map(|decoded| decoded == name)
        .unwrap_or(false)
}

/// The URL as a log-safe string, with the values of `params` masked
pub fn redact(url: &Url, params: &[String]) -> String {
    let Some(query) = url.query() else {
        return url.to_string();
    };

    let masked = query
        .split('&')
        .map(|pair| {
            if params.iter().any(|name| pair_is_named(pair, name)) {
                let name = pair.split('=').next().unwrap_or_default();
                format!("{name}={REDACTED}")
            } else {
                pair.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("&");

    let mut redacted = url.clone();
    redacted.set_query(Some(&masked));
    redacted.to_string()
}

/// Decides which targets belong to the cached API class
#[derive(Debug, Clone)]
pub struct CachePolicy {
    hosts: Vec<String>,
    path_prefixes: Vec<String>,
}

impl CachePolicy {
    pub fn new(hosts: &[String], path_prefixes: &[String]) -> Self {
        Self {
            hosts: hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            path_prefixes: path_prefixes.to_vec(),
        }
    }

    pub fn is_cacheable(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let host_matches = !host.is_empty() && self.hosts.iter().any(|h| host.contains(h.as_str()));
        let path_matches = self.path_prefixes.is_empty()
            || self
                .path_prefixes
                .iter()
                .any(|prefix| url.path().starts_with(prefix.as_str()));

        host_matches && path_matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalizer() -> CacheKeyNormalizer {
        CacheKeyNormalizer::new("serviceKey")
    }

    const APT_LIST: &str = "https://apis.data.go.kr/1613000/AptListService3/getRoadnameAptList3";

    #[test]
    fn test_secret_value_does_not_change_key() {
        let a = normalizer()
            .normalize(&format!("{APT_LIST}?serviceKey=abc%2B1&roadCode=1168&pageNo=1"))
            .unwrap();
        let b = normalizer()
            .normalize(&format!("{APT_LIST}?serviceKey=zzz&roadCode=1168&pageNo=1"))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_has_only_safe_characters() {
        let key = normalizer()
            .normalize(&format!("{APT_LIST}?serviceKey=abc&roadCode=1168&pageNo=1"))
            .unwrap();
        assert!(key
            .as_ref()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-".contains(c)));
        assert!(key
            .as_ref()
            .starts_with("_1613000_AptListService3_getRoadnameAptList3_roadCode_1168_pageNo_1_"));
        assert!(!key.as_ref().contains("abc"));
    }

    #[test]
    fn test_parameter_order_is_significant() {
        let a = normalizer().normalize(&format!("{APT_LIST}?a=1&b=2")).unwrap();
        let b = normalizer().normalize(&format!("{APT_LIST}?b=2&a=1")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitizer_collisions_are_separated_by_digest() {
        let a = normalizer().normalize(&format!("{APT_LIST}?q=a/b")).unwrap();
        let b = normalizer().normalize(&format!("{APT_LIST}?q=a_b")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unparseable_url_has_no_key() {
        assert!(normalizer().normalize("not a url").is_none());
        assert!(normalizer().normalize("").is_none());
    }

    #[test]
    fn test_long_queries_stay_bounded() {
        let long = "x".repeat(5000);
        let key = normalizer()
            .normalize(&format!("{APT_LIST}?q={long}"))
            .unwrap();
        assert!(key.as_ref().len() <= MAX_READABLE_LEN + 1 + DIGEST_HEX_LEN);
    }

    #[test]
    fn test_redact_masks_only_the_named_params() {
        let url = Url::parse(&format!("{APT_LIST}?serviceKey=abc%2B1&pageNo=1&key=vw")).unwrap();
        let redacted = redact(&url, &["serviceKey".to_string(), "key".to_string()]);
        assert!(redacted.contains("serviceKey=***"));
        assert!(redacted.contains("key=***"));
        assert!(redacted.contains("pageNo=1"));
        assert!(!redacted.contains("abc"));
        assert!(!redacted.contains("vw"));
    }

    #[test]
    fn test_cache_policy_by_host_and_prefix() {
        let policy = CachePolicy::new(&["apis.data.go.kr".to_string()], &[]);
        assert!(policy.is_cacheable(&Url::parse(APT_LIST).unwrap()));
        assert!(!policy.is_cacheable(&Url::parse("https://api.vworld.kr/req/address").unwrap()));

        let narrowed = CachePolicy::new(
            &["apis.data.go.kr".to_string()],
            &["/1741000/".to_string()],
        );
        assert!(!narrowed.is_cacheable(&Url::parse(APT_LIST).unwrap()));
        assert!(narrowed.is_cacheable(
            &Url::parse("https://apis.data.go.kr/1741000/StanReginCd/getStanReginCdList").unwrap()
        ));
    }

    proptest! {
        #[test]
        fn prop_keys_ignore_secret_value(
            secret_a in "[A-Za-z0-9+/=%]{0,40}",
            secret_b in "[A-Za-z0-9+/=%]{0,40}",
            page in 1u32..100,
        ) {
            let a = normalizer().normalize(&format!("{APT_LIST}?pageNo={page}&serviceKey={secret_a}&numOfRows=10"));
            let b = normalizer().normalize(&format!("{APT_LIST}?pageNo={page}&serviceKey={secret_b}&numOfRows=10"));
            prop_assert!(a.is_some());
            prop_assert_eq!(a, b);
        }
    }
}
