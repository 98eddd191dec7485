//! Domain allowlist guard
//!
//! A target host is forwarded only when it contains one of the configured
//! domain substrings, compared case-insensitively. The check is a pure
//! predicate and runs before any cache lookup or network call.

/// Fixed set of upstream domains the proxy may reach
#[derive(Debug, Clone)]
pub struct DomainAllowlist {
    domains: Vec<String>,
}

impl DomainAllowlist {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn is_allowed(&self, hostname: &str) -> bool {
        let hostname = hostname.to_ascii_lowercase();
        !hostname.is_empty() && self.domains.iter().any(|d| hostname.contains(d.as_str()))
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }
}
