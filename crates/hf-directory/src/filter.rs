use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::services::ServiceWithDistance;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Distance,
    Alpha,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sort order `{0}`, expected `distance` or `alpha`")]
pub struct ParseSortOrderError(String);

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "distance" => Ok(SortOrder::Distance),
            "alpha" => Ok(SortOrder::Alpha),
            _ => Err(ParseSortOrderError(s.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Distance => write!(f, "distance"),
            SortOrder::Alpha => write!(f, "alpha"),
        }
    }
}

/// The user's filter selections. An empty category or sub-category means
/// "any".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    pub selected_category: String,
    pub selected_sub_category: String,
    pub sort_order: SortOrder,
}

impl Filters {
    pub fn matches(&self, service: &ServiceWithDistance) -> bool {
        let category_match = self.selected_category.is_empty()
            || service.service.category == self.selected_category;
        let sub_category_match = self.selected_sub_category.is_empty()
            || service.service.sub_category == self.selected_sub_category;
        category_match && sub_category_match
    }
}

/// Services passing both the category and the sub-category filter, in input
/// order.
pub fn filter(services: &[ServiceWithDistance], filters: &Filters) -> Vec<ServiceWithDistance> {
    services
        .iter()
        .filter(|service| filters.matches(service))
        .cloned()
        .collect()
}

/// Sort a copy of `services`.
///
/// Under `Distance`, a service with no distance counts as `0` km and so sorts
/// ahead of every service that has one.
pub fn sort(services: &[ServiceWithDistance], order: SortOrder) -> Vec<ServiceWithDistance> {
    let mut sorted = services.to_vec();
    match order {
        SortOrder::Alpha => sorted.sort_by(|a, b| compare_names(&a.service.name, &b.service.name)),
        SortOrder::Distance => sorted.sort_by(|a, b| {
            a.distance
                .unwrap_or(0.0)
                .total_cmp(&b.distance.unwrap_or(0.0))
        }),
    }
    sorted
}

/// Filter then sort.
pub fn apply(services: &[ServiceWithDistance], filters: &Filters) -> Vec<ServiceWithDistance> {
    sort(&filter(services, filters), filters.sort_order)
}

/// Letters that carry no combining mark under NFD but still read as a plain
/// Latin letter or pair.
fn fold_char(c: char, out: &mut String) {
    match c {
        'ß' => out.push_str("ss"),
        'æ' => out.push_str("ae"),
        'œ' => out.push_str("oe"),
        'ø' => out.push('o'),
        'ł' => out.push('l'),
        'đ' | 'ð' => out.push('d'),
        'ı' => out.push('i'),
        'þ' => out.push_str("th"),
        other => out.push(other),
    }
}

fn collation_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
    {
        fold_char(c, &mut key);
    }
    key
}

/// Compare names ignoring case and accents first, falling back to the exact
/// text so the order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

/// Distinct `(key, display name)` categories present in `services`, in the
/// order first seen.
pub fn available_categories(services: &[ServiceWithDistance]) -> Vec<(String, String)> {
    let mut seen: Vec<(String, String)> = Vec::new();
    for service in services {
        let service = &service.service;
        if service.category.is_empty() || seen.iter().any(|(key, _)| *key == service.category) {
            continue;
        }
        seen.push((service.category.clone(), service.category_name.clone()));
    }
    seen
}

/// Distinct sub-categories present under `category`.
pub fn available_sub_categories(
    services: &[ServiceWithDistance],
    category: &str,
) -> Vec<(String, String)> {
    let mut seen: Vec<(String, String)> = Vec::new();
    for service in services {
        let service = &service.service;
        if service.category != category
            || service.sub_category.is_empty()
            || seen.iter().any(|(key, _)| *key == service.sub_category)
        {
            continue;
        }
        seen.push((service.sub_category.clone(), service.sub_category_name.clone()));
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::FlattenedService;

    fn service(
        id: &str,
        name: &str,
        category: &str,
        sub: &str,
        distance: Option<f64>,
    ) -> ServiceWithDistance {
        ServiceWithDistance {
            service: FlattenedService {
                id: id.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                category_name: category.to_uppercase(),
                sub_category: sub.to_string(),
                sub_category_name: sub.to_uppercase(),
                ..Default::default()
            },
            distance,
        }
    }

    fn sample() -> Vec<ServiceWithDistance> {
        vec![
            service("1", "Zest Clinic", "health", "gp", Some(2.0)),
            service("2", "Ark Counselling", "support", "counselling", Some(1.2)),
            service("3", "Élan Dental", "health", "dentist", None),
            service("4", "bridge GP", "health", "gp", Some(0.5)),
            service("5", "Open Door", "support", "advice", Some(3.1)),
        ]
    }

    fn ids(services: &[ServiceWithDistance]) -> Vec<&str> {
        services.iter().map(|s| s.service.id.as_str()).collect()
    }

    #[test]
    fn sort_order_parses_and_displays() {
        assert_eq!("alpha".parse::<SortOrder>(), Ok(SortOrder::Alpha));
        assert_eq!(" Distance ".parse::<SortOrder>(), Ok(SortOrder::Distance));
        assert!("nearest".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::Alpha.to_string(), "alpha");
        assert_eq!(SortOrder::default(), SortOrder::Distance);
    }

    #[test]
    fn empty_filters_keep_everything() {
        let services = sample();
        assert_eq!(filter(&services, &Filters::default()), services);
    }

    #[test]
    fn filter_matches_exactly_the_selected_keys() {
        let services = sample();
        let cases = [
            ("", ""),
            ("health", ""),
            ("", "gp"),
            ("health", "gp"),
            ("support", "gp"),
        ];
        for (cat, sub) in cases {
            let filters = Filters {
                selected_category: cat.to_string(),
                selected_sub_category: sub.to_string(),
                sort_order: SortOrder::Distance,
            };
            let kept = filter(&services, &filters);
            let expected: Vec<_> = services
                .iter()
                .filter(|s| {
                    (cat.is_empty() || s.service.category == cat)
                        && (sub.is_empty() || s.service.sub_category == sub)
                })
                .cloned()
                .collect();
            assert_eq!(kept, expected, "category {cat:?}, sub-category {sub:?}");
        }
    }

    #[test]
    fn category_then_sub_category() {
        let filters = Filters {
            selected_category: "health".to_string(),
            selected_sub_category: "gp".to_string(),
            sort_order: SortOrder::Distance,
        };
        assert_eq!(ids(&apply(&sample(), &filters)), vec!["4", "1"]);
    }

    #[test]
    fn distance_sort_treats_missing_as_zero() {
        let sorted = sort(&sample(), SortOrder::Distance);
        assert_eq!(ids(&sorted), vec!["3", "4", "2", "1", "5"]);
    }

    #[test]
    fn alpha_sort_ignores_case_and_accents() {
        let sorted = sort(&sample(), SortOrder::Alpha);
        assert_eq!(ids(&sorted), vec!["2", "4", "3", "5", "1"]);
    }

    #[test]
    fn alpha_sort_folds_accents_outside_latin_1() {
        let services = vec![
            service("1", "Zebra Hub", "", "", None),
            service("2", "Šumava Café", "", "", None),
            service("3", "Tower Project", "", "", None),
            service("4", "Łódź Outreach", "", "", None),
        ];
        assert_eq!(
            ids(&sort(&services, SortOrder::Alpha)),
            vec!["4", "2", "3", "1"]
        );
    }

    #[test]
    fn alpha_sort_folds_decomposed_names() {
        let services = vec![
            service("1", "Eb Centre", "", "", None),
            service("2", "E\u{301}a Centre", "", "", None),
        ];
        assert_eq!(ids(&sort(&services, SortOrder::Alpha)), vec!["2", "1"]);
        assert_eq!(collation_key("E\u{301}a"), collation_key("Éa"));
    }

    #[test]
    fn alpha_sort_is_stable_for_identical_names() {
        let services = vec![
            service("a", "Drop In", "", "", Some(1.0)),
            service("b", "Drop In", "", "", Some(2.0)),
            service("c", "Drop In", "", "", Some(0.1)),
        ];
        assert_eq!(ids(&sort(&services, SortOrder::Alpha)), vec!["a", "b", "c"]);
    }

    #[test]
    fn sorting_does_not_touch_the_input() {
        let services = sample();
        let before = services.clone();
        let _ = apply(&services, &Filters::default());
        assert_eq!(services, before);
    }

    #[test]
    fn compare_names_is_total() {
        assert_eq!(compare_names("abc", "ABC"), "abc".cmp("ABC"));
        assert_eq!(compare_names("Straße", "strasse"), "Straße".cmp("strasse"));
        assert_eq!(compare_names("a", "a"), Ordering::Equal);
    }

    #[test]
    fn lists_available_categories() {
        let services = sample();
        assert_eq!(
            available_categories(&services),
            vec![
                ("health".to_string(), "HEALTH".to_string()),
                ("support".to_string(), "SUPPORT".to_string()),
            ]
        );
        assert_eq!(
            available_sub_categories(&services, "health"),
            vec![
                ("gp".to_string(), "GP".to_string()),
                ("dentist".to_string(), "DENTIST".to_string()),
            ]
        );
    }
}
