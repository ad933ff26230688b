//! Domain utilities with Public Suffix List integration.
//!
//! Links are grouped by the domain a sender actually registered, so parsing
//! has to be public-suffix aware:
//! - news.example.co.uk -> example.co.uk
//! - mail.example.com -> example.com
//! - mysite.github.io -> github.io
//!
//! Only the ICANN section of the list counts. Private-section entries such as
//! `github.io` or `blogspot.com` name a hosting company, so every hosted
//! subdomain belongs to that company rather than being a service of its own.
//!
//! `resolve_link_domain` is the entry point used by the service grouper; it
//! accepts the raw `href` of an unsubscribe anchor.

use std::net::IpAddr;

use anyhow::{Result, anyhow};
use psl::Type;
use url::{Host, Url};

/// Display name used when no company label can be derived.
pub const UNKNOWN_COMPANY: &str = "Unknown";

/// Domain information extracted using PSL or fallback parsing
#[derive(Debug, Clone, PartialEq)]
pub struct DomainInfo {
    /// The full domain as provided
    pub full_domain: String,
    /// The registrable domain (what you can actually register)
    pub registrable_domain: Option<String>,
    /// The public suffix (TLD or effective TLD), ICANN section only
    pub suffix: Option<String>,
}

impl DomainInfo {
    /// Parse a domain string into structured domain information
    pub fn parse(domain: &str) -> Result<Self> {
        let clean_domain = clean_domain_input(domain)?;
        Ok(Self::parse_with_psl(&clean_domain))
    }

    fn parse_with_psl(domain: &str) -> Self {
        let suffix = icann_suffix(domain).filter(|s| !s.is_empty());
        let registrable_domain = suffix
            .as_deref()
            .and_then(|suffix| registrable_for(domain, suffix))
            .or_else(|| fallback_registrable_domain(domain));

        DomainInfo {
            full_domain: domain.to_string(),
            registrable_domain,
            suffix,
        }
    }

    /// Registrable domain, or the full domain when none could be derived.
    pub fn group_key(&self) -> &str {
        self.registrable_domain
            .as_deref()
            .unwrap_or(&self.full_domain)
    }

    /// The label directly below the public suffix (`example` in
    /// `news.example.co.uk`).
    pub fn domain_label(&self) -> Option<&str> {
        let registrable = self.registrable_domain.as_deref()?;
        let label = match self.suffix.as_deref() {
            Some(suffix) if registrable != suffix => registrable
                .strip_suffix(suffix)
                .and_then(|rest| rest.strip_suffix('.'))
                .unwrap_or(registrable),
            _ => registrable.split('.').next().unwrap_or(registrable),
        };
        if label.is_empty() { None } else { Some(label) }
    }
}

/// Where a single unsubscribe link belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDomain {
    /// Grouping key (registrable domain, or the IP literal)
    pub registrable: String,
    /// Human-friendly company name derived from the domain label
    pub display_name: String,
}

/// Resolve the registrable domain and display name for a raw link.
///
/// `mailto:` links resolve to the domain of their first address. Scheme-less
/// links such as `www.example.com/unsubscribe` are read as `http`. Links with
/// no host at all (relative paths, `javascript:`) are an error.
pub fn resolve_link_domain(link: &str) -> Result<LinkDomain> {
    let trimmed = link.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty link"));
    }

    let url = parse_link_url(trimmed)?;

    if url.scheme() == "mailto" {
        let host = mailto_host(&url)
            .ok_or_else(|| anyhow!("No address domain in mailto link: {}", trimmed))?;
        return domain_for_host(&host);
    }

    match url.host() {
        Some(Host::Domain(domain)) => domain_for_host(domain),
        Some(Host::Ipv4(ip)) => Ok(ip_domain(IpAddr::V4(ip))),
        Some(Host::Ipv6(ip)) => Ok(ip_domain(IpAddr::V6(ip))),
        None => Err(anyhow!("No host in link: {}", trimmed)),
    }
}

fn parse_link_url(link: &str) -> Result<Url> {
    match Url::parse(link) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            if link.starts_with('/') || link.starts_with('?') || link.starts_with('#') {
                return Err(anyhow!("Relative link without host: {}", link));
            }
            let host_part = link.split(['/', '?', '#']).next().unwrap_or("");
            if !host_part.contains('.') {
                return Err(anyhow!("Relative link without host: {}", link));
            }
            Url::parse(&format!("http://{link}"))
                .map_err(|e| anyhow!("Invalid link {}: {}", link, e))
        }
        Err(e) => Err(anyhow!("Invalid link {}: {}", link, e)),
    }
}

fn mailto_host(url: &Url) -> Option<String> {
    let first = url.path().split(',').next()?;
    let (_, host) = first.rsplit_once('@')?;
    let host = host.trim();
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

fn domain_for_host(host: &str) -> Result<LinkDomain> {
    if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
        return Ok(ip_domain(ip));
    }
    let info = DomainInfo::parse(host)?;
    let display_name = info
        .domain_label()
        .map(display_name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
    Ok(LinkDomain {
        registrable: info.group_key().to_string(),
        display_name,
    })
}

fn ip_domain(ip: IpAddr) -> LinkDomain {
    LinkDomain {
        registrable: ip.to_string(),
        display_name: UNKNOWN_COMPANY.to_string(),
    }
}

/// Turn a domain label into a company name: `-` and `_` become spaces and
/// each word is capitalized (`my-shop_online` -> `My Shop Online`).
pub fn display_name(label: &str) -> String {
    label
        .replace(['-', '_'], " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Clean domain input by removing common artifacts
fn clean_domain_input(domain: &str) -> Result<String> {
    let clean = domain
        .trim()
        .trim_end_matches('.') // Remove trailing dot
        .to_lowercase();

    if clean.is_empty() {
        return Err(anyhow!("Empty domain"));
    }

    if clean.starts_with('.') || clean.contains("..") {
        return Err(anyhow!("Invalid domain format: {}", clean));
    }

    Ok(clean)
}

/// Public suffix of `domain` under ICANN rules. A private-section match is
/// retried on its parent (`github.io` -> `io`) until a non-private rule wins.
fn icann_suffix(domain: &str) -> Option<String> {
    let mut candidate = domain;
    loop {
        let suffix = psl::suffix(candidate.as_bytes())?;
        let text = std::str::from_utf8(suffix.as_bytes()).ok()?;
        if suffix.typ() != Some(Type::Private) {
            return Some(text.to_string());
        }
        candidate = text.split_once('.')?.1;
    }
}

/// The suffix plus the one label in front of it; `None` when the domain is
/// itself a suffix.
fn registrable_for(domain: &str, suffix: &str) -> Option<String> {
    let rest = domain.strip_suffix(suffix)?.strip_suffix('.')?;
    let label = rest.rsplit('.').next().filter(|l| !l.is_empty())?;
    Some(format!("{label}.{suffix}"))
}

fn fallback_registrable_domain(domain: &str) -> Option<String> {
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return Some(domain.to_string());
    }
    Some(format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_domain_parsing() {
        let info = DomainInfo::parse("subdomain.example.com").unwrap();
        assert_eq!(info.registrable_domain, Some("example.com".to_string()));
        assert_eq!(info.suffix, Some("com".to_string()));
        assert_eq!(info.domain_label(), Some("example"));
    }

    #[test]
    fn test_complex_tld() {
        let info = DomainInfo::parse("subdomain.example.co.uk").unwrap();
        assert_eq!(info.registrable_domain, Some("example.co.uk".to_string()));
        assert_eq!(info.suffix, Some("co.uk".to_string()));
        assert_eq!(info.domain_label(), Some("example"));
    }

    #[test]
    fn test_private_suffixes_resolve_to_the_host() {
        let info = DomainInfo::parse("mysite.github.io").unwrap();
        assert_eq!(info.registrable_domain, Some("github.io".to_string()));
        assert_eq!(info.suffix, Some("io".to_string()));
        assert_eq!(info.domain_label(), Some("github"));

        let info = DomainInfo::parse("news.blogspot.com").unwrap();
        assert_eq!(info.registrable_domain, Some("blogspot.com".to_string()));
        assert_eq!(info.domain_label(), Some("blogspot"));
    }

    #[test]
    fn test_domain_cleaning() {
        let info = DomainInfo::parse("Example.Com.").unwrap();
        assert_eq!(info.full_domain, "example.com");
        assert!(DomainInfo::parse("  ").is_err());
        assert!(DomainInfo::parse("a..b.com").is_err());
    }

    #[test]
    fn test_multi_level_subdomains() {
        let info = DomainInfo::parse("a.b.c.example.co.uk").unwrap();
        assert_eq!(info.registrable_domain, Some("example.co.uk".to_string()));
        assert_eq!(info.group_key(), "example.co.uk");
    }

    #[test]
    fn resolves_http_links() {
        let d = resolve_link_domain("https://mail.service.co.uk/unsubscribe?id=1").unwrap();
        assert_eq!(d.registrable, "service.co.uk");
        assert_eq!(d.display_name, "Service");

        let d = resolve_link_domain("http://a.example.com/x").unwrap();
        assert_eq!(d.registrable, "example.com");
        assert_eq!(d.display_name, "Example");
    }

    #[test]
    fn display_name_normalizes_punctuation() {
        let d = resolve_link_domain("https://email.my-shop_online.com/unsubscribe").unwrap();
        assert_eq!(d.registrable, "my-shop_online.com");
        assert_eq!(d.display_name, "My Shop Online");
        assert_eq!(display_name("acme"), "Acme");
    }

    #[test]
    fn mailto_groups_under_address_domain() {
        let d = resolve_link_domain("mailto:unsubscribe@news.example.com?subject=stop").unwrap();
        assert_eq!(d.registrable, "example.com");
        assert_eq!(d.display_name, "Example");
        assert!(resolve_link_domain("mailto:?subject=unsubscribe").is_err());
    }

    #[test]
    fn hosted_subdomains_group_under_the_host() {
        let d = resolve_link_domain("https://alice.github.io/unsubscribe").unwrap();
        assert_eq!(d.registrable, "github.io");
        assert_eq!(d.display_name, "Github");
    }

    #[test]
    fn ip_hosts_are_unknown() {
        let d = resolve_link_domain("http://192.0.2.10/unsubscribe").unwrap();
        assert_eq!(d.registrable, "192.0.2.10");
        assert_eq!(d.display_name, UNKNOWN_COMPANY);
    }

    #[test]
    fn scheme_less_links_read_as_http() {
        let d = resolve_link_domain("www.example.org/unsubscribe").unwrap();
        assert_eq!(d.registrable, "example.org");
    }

    #[test]
    fn hostless_links_fail() {
        assert!(resolve_link_domain("/unsubscribe?u=1").is_err());
        assert!(resolve_link_domain("unsubscribe?u=1").is_err());
        assert!(resolve_link_domain("javascript:unsubscribe()").is_err());
        assert!(resolve_link_domain("").is_err());
    }
}
