//! Grouping and sorting helpers for entity, service and domain lists.
//!
//! Remote instances expose flat string id lists; the configuration forms
//! want them ordered by domain (the dot-prefix) with per-domain counts.

use std::collections::BTreeMap;

/// Sort entity ids by domain, then by full id within each domain, and count
/// entities per domain.
///
/// Ids without a dot count as their own domain.
pub fn organize_entities_with_counts(entities: &[String]) -> (Vec<String>, BTreeMap<String, usize>) {
    let mut by_domain: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entity in entities {
        let domain = entity.split('.').next().unwrap_or_default().to_owned();
        by_domain.entry(domain).or_default().push(entity.clone());
    }

    let mut ordered = Vec::with_capacity(entities.len());
    let mut counts = BTreeMap::new();
    for (domain, mut ids) in by_domain {
        ids.sort();
        counts.insert(domain, ids.len());
        ordered.extend(ids);
    }
    (ordered, counts)
}

/// Sort service ids by domain, then by full id. Dotless ids are grouped
/// under `other`.
pub fn organize_services(services: &[String]) -> Vec<String> {
    let mut by_domain: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for service in services {
        let domain = match service.split_once('.') {
            Some((domain, _)) => domain.to_owned(),
            None => "other".to_owned(),
        };
        by_domain.entry(domain).or_default().push(service.clone());
    }

    let mut ordered = Vec::with_capacity(services.len());
    for (_, mut ids) in by_domain {
        ids.sort();
        ordered.extend(ids);
    }
    ordered
}

/// The sorted, deduplicated set of dot-prefixes of the given entity ids.
pub fn domains_of(entities: &[String]) -> Vec<String> {
    let mut domains: Vec<String> = entities
        .iter()
        .filter_map(|id| id.split_once('.').map(|(domain, _)| domain.to_owned()))
        .collect();
    domains.sort();
    domains.dedup();
    domains
}

/// Slugify a title for use as a service prefix: lowercase alphanumeric with
/// single underscores, no leading or trailing underscore.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_separator = true;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_separator = false;
        } else if !last_was_separator {
            slug.push('_');
            last_was_separator = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}
