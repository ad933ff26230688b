//! Grouping of unsubscribe links by sending service.
//!
//! Links stream in one at a time (from every HTML part of every message) and
//! are folded into a [`ServiceMap`]. Exact duplicates are dropped as part of
//! the fold; distinct links for the same registrable domain merge into one
//! [`ServiceEntry`] whose representative is the shortest link seen. Links with
//! no derivable domain are still kept, together under [`UNRESOLVED_DOMAIN`].

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain_utils::{UNKNOWN_COMPANY, resolve_link_domain};

/// Grouping key shared by every link whose domain could not be derived.
pub const UNRESOLVED_DOMAIN: &str = "";

/// One sending service and the link chosen to speak for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEntry {
    pub domain: String,
    pub display_name: String,
    pub representative_url: String,
    /// Distinct links seen for this domain, representative included.
    pub occurrence_count: usize,
}

/// Registrable domain -> entry. Read-only once grouping has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ServiceMap(BTreeMap<String, ServiceEntry>);

impl ServiceMap {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, domain: &str) -> Option<&ServiceEntry> {
        self.0.get(domain)
    }

    /// Entries in domain order.
    pub fn entries(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.0.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ServiceEntry)> {
        self.0.iter()
    }
}

/// What happened to a single observed link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// First link for a new domain.
    New { domain: String },
    /// Counted against an existing domain; `replaced` when it became the
    /// new representative.
    Merged { domain: String, replaced: bool },
    /// Exact string already seen.
    Duplicate,
}

/// A link whose domain could not be derived; it is grouped under
/// [`UNRESOLVED_DOMAIN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupingFailure {
    pub link: String,
    pub reason: String,
}

/// Result of a complete grouping pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Grouping {
    pub services: ServiceMap,
    pub distinct_links: usize,
    pub duplicate_links: usize,
    pub failures: Vec<GroupingFailure>,
}

/// Single-pass fold of links into a [`ServiceMap`].
#[derive(Debug, Default)]
pub struct ServiceGrouper {
    seen: HashSet<String>,
    services: BTreeMap<String, ServiceEntry>,
    duplicates: usize,
    failures: Vec<GroupingFailure>,
}

impl ServiceGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one raw link into the map.
    pub fn observe(&mut self, link: &str) -> Observation {
        if !self.seen.insert(link.to_string()) {
            self.duplicates += 1;
            return Observation::Duplicate;
        }

        let (domain, display_name) = match resolve_link_domain(link) {
            Ok(resolved) => (resolved.registrable, resolved.display_name),
            Err(e) => {
                warn!("Could not determine domain for {}: {}", link, e);
                self.failures.push(GroupingFailure {
                    link: link.to_string(),
                    reason: e.to_string(),
                });
                (UNRESOLVED_DOMAIN.to_string(), UNKNOWN_COMPANY.to_string())
            }
        };

        match self.services.get_mut(&domain) {
            Some(entry) => {
                entry.occurrence_count += 1;
                let replaced =
                    link.chars().count() < entry.representative_url.chars().count();
                if replaced {
                    entry.representative_url = link.to_string();
                }
                debug!(
                    "Merged link into {} (count {}, replaced: {})",
                    domain, entry.occurrence_count, replaced
                );
                Observation::Merged { domain, replaced }
            }
            None => {
                debug!("New service {} ({})", domain, display_name);
                self.services.insert(
                    domain.clone(),
                    ServiceEntry {
                        domain: domain.clone(),
                        display_name,
                        representative_url: link.to_string(),
                        occurrence_count: 1,
                    },
                );
                Observation::New { domain }
            }
        }
    }

    pub fn finish(self) -> Grouping {
        info!("Found {} unique services", self.services.len());
        Grouping {
            distinct_links: self.seen.len(),
            services: ServiceMap(self.services),
            duplicate_links: self.duplicates,
            failures: self.failures,
        }
    }
}

/// Group a batch of links in one call.
pub fn group_links<I, S>(links: I) -> Grouping
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut grouper = ServiceGrouper::new();
    for link in links {
        grouper.observe(link.as_ref());
    }
    grouper.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorter_link_becomes_representative() {
        let grouping = group_links(["http://a.example.com/x", "http://example.com/unsub"]);
        let entry = grouping.services.get("example.com").unwrap();
        assert_eq!(entry.representative_url, "http://example.com/unsub");
        assert_eq!(entry.occurrence_count, 2);
        assert_eq!(entry.display_name, "Example");
    }

    #[test]
    fn multi_label_suffixes_merge() {
        let grouping = group_links([
            "https://mail.service.co.uk/unsubscribe?id=1",
            "https://service.co.uk/u",
        ]);
        assert_eq!(grouping.services.len(), 1);
        let entry = grouping.services.get("service.co.uk").unwrap();
        assert_eq!(entry.representative_url, "https://service.co.uk/u");
        assert_eq!(entry.occurrence_count, 2);
    }

    #[test]
    fn ties_keep_first_seen() {
        let mut grouper = ServiceGrouper::new();
        assert_eq!(
            grouper.observe("https://example.com/aaaa"),
            Observation::New {
                domain: "example.com".into()
            }
        );
        assert_eq!(
            grouper.observe("https://example.com/bbbb"),
            Observation::Merged {
                domain: "example.com".into(),
                replaced: false
            }
        );
        let grouping = grouper.finish();
        let entry = grouping.services.get("example.com").unwrap();
        assert_eq!(entry.representative_url, "https://example.com/aaaa");
        assert_eq!(entry.occurrence_count, 2);
    }

    #[test]
    fn exact_duplicates_collapse_before_counting() {
        let grouping = group_links([
            "https://example.com/unsubscribe",
            "https://example.com/unsubscribe",
            "https://news.example.com/unsubscribe?id=2",
        ]);
        let entry = grouping.services.get("example.com").unwrap();
        assert_eq!(entry.occurrence_count, 2);
        assert_eq!(grouping.duplicate_links, 1);
        assert_eq!(grouping.distinct_links, 2);
    }

    #[test]
    fn length_is_measured_in_characters() {
        // 5 chars but 10 bytes in the path vs 7 ASCII chars
        let grouping = group_links([
            "https://example.com/abcdefg",
            "https://example.com/ééééé",
        ]);
        let entry = grouping.services.get("example.com").unwrap();
        assert_eq!(entry.representative_url, "https://example.com/ééééé");
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let grouping = group_links([
            "/relative/unsubscribe",
            "https://shop.example.org/unsubscribe",
        ]);
        assert_eq!(grouping.failures.len(), 1);
        assert_eq!(grouping.failures[0].link, "/relative/unsubscribe");
        assert_eq!(grouping.services.len(), 2);
        assert!(grouping.services.get("example.org").is_some());
    }

    #[test]
    fn hostless_links_are_kept_as_unknown() {
        let grouping = group_links([
            "/account/unsubscribe?id=9",
            "javascript:unsubscribe()",
        ]);
        assert_eq!(grouping.services.len(), 1);
        let entry = grouping.services.get(UNRESOLVED_DOMAIN).unwrap();
        assert_eq!(entry.display_name, "Unknown");
        assert_eq!(entry.representative_url, "javascript:unsubscribe()");
        assert_eq!(entry.occurrence_count, 2);
        assert_eq!(grouping.failures.len(), 2);
    }

    #[test]
    fn hosted_subdomains_share_one_service() {
        let grouping = group_links([
            "https://alice.github.io/unsubscribe",
            "https://bob.github.io/unsubscribe",
            "https://news.blogspot.com/unsubscribe",
        ]);
        assert_eq!(grouping.services.len(), 2);
        let github = grouping.services.get("github.io").unwrap();
        assert_eq!(github.display_name, "Github");
        assert_eq!(github.occurrence_count, 2);
        assert_eq!(
            grouping.services.get("blogspot.com").unwrap().display_name,
            "Blogspot"
        );
    }

    #[test]
    fn ip_hosts_group_as_unknown() {
        let grouping = group_links(["http://198.51.100.7/unsubscribe"]);
        let entry = grouping.services.get("198.51.100.7").unwrap();
        assert_eq!(entry.display_name, "Unknown");
    }

    #[test]
    fn empty_input_gives_empty_map() {
        let grouping = group_links(Vec::<String>::new());
        assert!(grouping.services.is_empty());
        assert!(grouping.failures.is_empty());
    }

    #[test]
    fn entries_iterate_in_domain_order() {
        let grouping = group_links([
            "https://zeta.com/unsubscribe",
            "https://alpha.com/unsubscribe",
        ]);
        let domains: Vec<_> = grouping.services.entries().map(|e| e.domain.as_str()).collect();
        assert_eq!(domains, vec!["alpha.com", "zeta.com"]);
    }
}
