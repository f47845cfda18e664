//! Search-enabled select selectors
//!
//! Entity, service and domain pickers are rendered as searchable dropdowns
//! with items grouped by domain under disabled header rows.

use serde::Serialize;
use std::collections::BTreeMap;

use rha_core::organize_entities_with_counts;

/// Value of the disabled search-hint row at the top of grouped selectors.
pub const SEARCH_HINT: &str = "__search_hint__";

/// Rendering mode of a select selector; every picker here is a dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    Dropdown,
}

/// One selectable option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    /// Disabled rows are group headers, not selectable values
    pub disabled: bool,
    /// Lowercased terms the frontend search matches against
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_terms: Vec<String>,
}

impl SelectOption {
    fn item(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: false,
            search_terms: Vec::new(),
        }
    }

    fn header(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            disabled: true,
            ..Self::item(value, label)
        }
    }
}

/// Select selector configuration for the host's renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectSelector {
    pub options: Vec<SelectOption>,
    pub multiple: bool,
    pub custom_value: bool,
    pub mode: SelectMode,
    /// Grouping decides the order; the frontend must not re-sort
    pub sort: bool,
}

impl SelectSelector {
    /// Searchable multi-select over pre-ordered options
    pub fn searchable(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            multiple: true,
            custom_value: false,
            mode: SelectMode::Dropdown,
            sort: false,
        }
    }

    /// Single-choice dropdown over plain string values
    pub fn choices(values: &[&str]) -> Self {
        Self {
            options: values
                .iter()
                .map(|value| SelectOption::item(*value, *value))
                .collect(),
            multiple: false,
            custom_value: false,
            mode: SelectMode::Dropdown,
            sort: false,
        }
    }

    /// Multi-select where values and labels coincide
    pub fn multi(values: &[String]) -> Self {
        Self::searchable(
            values
                .iter()
                .map(|value| SelectOption::item(value.clone(), value.clone()))
                .collect(),
        )
    }

    pub fn with_custom_value(mut self) -> Self {
        self.custom_value = true;
        self
    }
}

/// Group dotted ids by domain into selector options with header rows and a
/// leading search hint. Returns the options and the per-domain item counts.
fn organize_options_by_domain(items: &[String]) -> (Vec<SelectOption>, BTreeMap<String, usize>) {
    let mut by_domain: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for item in items {
        let (domain, name) = match item.split_once('.') {
            Some((domain, name)) => (domain.to_owned(), name.to_owned()),
            None => ("other".to_owned(), item.clone()),
        };
        by_domain.entry(domain).or_default().push((item.clone(), name));
    }

    let mut options = vec![SelectOption::header(SEARCH_HINT, "🔍 Type to search...")];
    let mut counts = BTreeMap::new();

    for (domain, mut in_domain) in by_domain {
        in_domain.sort();
        counts.insert(domain.clone(), in_domain.len());

        options.push(SelectOption::header(
            format!("__{domain}__"),
            format!("━━━ {} ({} items) ━━━", domain.to_uppercase(), in_domain.len()),
        ));
        for (item, name) in in_domain {
            let mut option = SelectOption::item(item.clone(), format!("  {name}"));
            option.search_terms = vec![
                item.to_lowercase(),
                name.to_lowercase(),
                domain.to_lowercase(),
            ];
            options.push(option);
        }
    }

    (options, counts)
}

/// Searchable selector over entity ids, grouped by domain.
pub fn entity_search_selector(entities: &[String]) -> SelectSelector {
    let (options, _) = organize_options_by_domain(entities);
    SelectSelector::searchable(options)
}

/// Searchable selector over service ids, grouped by domain.
pub fn service_search_selector(services: &[String]) -> SelectSelector {
    let (options, _) = organize_options_by_domain(services);
    SelectSelector::searchable(options)
}

/// Searchable selector over domains, labeled with their entity counts.
pub fn domain_search_selector(
    domains: &[String],
    entity_counts: &BTreeMap<String, usize>,
) -> SelectSelector {
    let mut options = vec![SelectOption::header(
        SEARCH_HINT,
        "🔍 Type to search domains...",
    )];

    let mut sorted = domains.to_vec();
    sorted.sort();
    for domain in sorted {
        let count = entity_counts.get(&domain).copied().unwrap_or(0);
        let mut option = SelectOption::item(domain.clone(), format!("{domain} ({count} entities)"));
        option.search_terms = vec![domain.to_lowercase()];
        options.push(option);
    }

    SelectSelector::searchable(options)
}

/// Entity counts per domain, as used by the domain selector labels.
pub fn entity_counts(entities: &[String]) -> BTreeMap<String, usize> {
    organize_entities_with_counts(entities).1
}
