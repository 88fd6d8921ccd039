//! The declarative sitemap: a tree of typed selectors plus start URLs.
//!
//! Field names on the wire match the established sitemap JSON format
//! (`startUrl`, `parentSelectors`, `SelectorText`, ...), so existing sitemap
//! documents load unchanged. The tree is rooted at the virtual scope
//! [`ROOT_SCOPE`]; a selector participates in every parent scope it lists.

use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The virtual parent id of the top scope.
pub const ROOT_SCOPE: &str = "_root";

/// What a selector extracts from its matched nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorKind {
    #[serde(rename = "SelectorText")]
    Text,
    #[serde(rename = "SelectorLink")]
    Link,
    #[serde(rename = "SelectorImage")]
    Image,
    #[serde(rename = "SelectorElementAttribute")]
    ElementAttribute,
    #[serde(rename = "SelectorElement")]
    Element,
    #[serde(rename = "SelectorTable")]
    Table,
}

/// One typed extraction rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selector {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SelectorKind,
    /// Parent scopes; `parents[0]` decides which scope evaluates this selector.
    #[serde(rename = "parentSelectors")]
    pub parents: Vec<String>,
    /// CSS query addressing the DOM nodes to extract from.
    #[serde(rename = "selector")]
    pub query: String,
    /// When false, evaluation stops after the first DOM match.
    #[serde(default)]
    pub multiple: bool,
    /// Optional extraction pattern, applied to `Text` node text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub regex: String,
    /// Advisory pause before evaluating this selector, in milliseconds.
    #[serde(rename = "delay", default)]
    pub delay_ms: u64,
    /// Attribute name read by `ElementAttribute` selectors.
    #[serde(rename = "extractAttribute", default, skip_serializing_if = "String::is_empty")]
    pub extract_attribute: String,
}

impl Selector {
    /// The extraction regex, or `None` when unset.
    pub fn regex(&self) -> Option<&str> {
        if self.regex.is_empty() {
            None
        } else {
            Some(&self.regex)
        }
    }

    /// A `Link` selector listing its own id as a parent paginates the
    /// current scope instead of descending into a new one.
    pub fn is_self_paginating(&self) -> bool {
        self.kind == SelectorKind::Link && self.parents.iter().any(|p| p == &self.id)
    }
}

/// The loaded selector tree plus start URLs — a run's program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sitemap {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "startUrl")]
    pub start_urls: Vec<String>,
    pub selectors: Vec<Selector>,
}

impl Sitemap {
    /// Selectors evaluated under the given parent scope, in sitemap order.
    pub fn children_of<'a>(&'a self, parent_id: &'a str) -> impl Iterator<Item = &'a Selector> {
        self.selectors
            .iter()
            .filter(move |s| s.parents.first().map(String::as_str) == Some(parent_id))
    }

    /// Whether any selector lists `id` as its evaluating parent.
    pub fn has_children(&self, id: &str) -> bool {
        self.children_of(id).next().is_some()
    }

    /// Derive the sitemap for a nested scope: same selector tree, new start
    /// URLs, identified by the spawning selector.
    pub fn derive(&self, selector_id: &str, start_urls: Vec<String>) -> Sitemap {
        Sitemap {
            id: selector_id.to_string(),
            start_urls,
            selectors: self.selectors.clone(),
        }
    }

    /// Check the structural invariants. Violations fail the run at load.
    ///
    /// - selector ids are unique and never `_root`
    /// - every parent list is non-empty and references `_root` or a known id
    /// - the parent graph is acyclic, except the self-loop a `Link` selector
    ///   uses to encode pagination
    pub fn validate(&self) -> Result<(), ScrapeError> {
        let mut ids = HashSet::new();
        for selector in &self.selectors {
            if selector.id == ROOT_SCOPE {
                return Err(ScrapeError::Config(format!(
                    "selector id {ROOT_SCOPE:?} is reserved"
                )));
            }
            if !ids.insert(selector.id.as_str()) {
                return Err(ScrapeError::Config(format!(
                    "duplicate selector id {:?}",
                    selector.id
                )));
            }
        }
        for selector in &self.selectors {
            if selector.parents.is_empty() {
                return Err(ScrapeError::Config(format!(
                    "selector {:?} has no parent scopes",
                    selector.id
                )));
            }
            for parent in &selector.parents {
                if parent != ROOT_SCOPE && !ids.contains(parent.as_str()) {
                    return Err(ScrapeError::Config(format!(
                        "selector {:?} references unknown parent {:?}",
                        selector.id, parent
                    )));
                }
            }
            if selector.parents.iter().any(|p| p == &selector.id)
                && selector.kind != SelectorKind::Link
            {
                return Err(ScrapeError::Config(format!(
                    "selector {:?} lists itself as a parent but is not a link selector",
                    selector.id
                )));
            }
        }
        self.check_acyclic()?;
        Ok(())
    }

    /// Reject cycles in the parent graph, ignoring link self-loops.
    fn check_acyclic(&self) -> Result<(), ScrapeError> {
        for start in &self.selectors {
            let mut stack = vec![start.id.as_str()];
            let mut on_path: HashSet<&str> = HashSet::new();
            on_path.insert(start.id.as_str());
            while let Some(current) = stack.pop() {
                let Some(selector) = self.selectors.iter().find(|s| s.id == current) else {
                    continue;
                };
                for parent in &selector.parents {
                    if parent == ROOT_SCOPE || parent == &selector.id {
                        continue;
                    }
                    if parent == &start.id {
                        return Err(ScrapeError::Config(format!(
                            "selector {:?} is part of a parent cycle",
                            start.id
                        )));
                    }
                    if on_path.insert(parent.as_str()) {
                        stack.push(parent.as_str());
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(id: &str, kind: SelectorKind, parents: &[&str]) -> Selector {
        Selector {
            id: id.to_string(),
            kind,
            parents: parents.iter().map(|p| p.to_string()).collect(),
            query: "a".to_string(),
            multiple: true,
            regex: String::new(),
            delay_ms: 0,
            extract_attribute: String::new(),
        }
    }

    fn sitemap(selectors: Vec<Selector>) -> Sitemap {
        Sitemap {
            id: String::new(),
            start_urls: vec!["http://x/".to_string()],
            selectors,
        }
    }

    #[test]
    fn test_deserialize_wire_format() {
        let json = r#"{
            "_id": "books",
            "startUrl": ["http://x/catalog/[1-3]"],
            "selectors": [
                {
                    "id": "title",
                    "type": "SelectorText",
                    "parentSelectors": ["_root"],
                    "selector": "h1",
                    "multiple": false,
                    "regex": "",
                    "delay": 0
                },
                {
                    "id": "cover",
                    "type": "SelectorImage",
                    "parentSelectors": ["_root"],
                    "selector": "img.cover",
                    "multiple": true
                }
            ]
        }"#;
        let map: Sitemap = serde_json::from_str(json).unwrap();
        assert_eq!(map.id, "books");
        assert_eq!(map.start_urls.len(), 1);
        assert_eq!(map.selectors[0].kind, SelectorKind::Text);
        assert!(!map.selectors[0].multiple);
        assert_eq!(map.selectors[0].regex(), None);
        assert_eq!(map.selectors[1].kind, SelectorKind::Image);
        map.validate().unwrap();
    }

    #[test]
    fn test_round_trip_is_equivalent() {
        let map = sitemap(vec![
            selector("link", SelectorKind::Link, &["_root"]),
            selector("body", SelectorKind::Text, &["link"]),
        ]);
        let json = serde_json::to_string(&map).unwrap();
        let back: Sitemap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.start_urls, map.start_urls);
        assert_eq!(back.selectors.len(), map.selectors.len());
        assert_eq!(back.selectors[1].id, "body");
        assert_eq!(back.selectors[1].parents, vec!["link"]);
        // Empty `_id` is omitted on the wire.
        assert!(!json.contains("_id"));
    }

    #[test]
    fn test_children_follow_sitemap_order() {
        let map = sitemap(vec![
            selector("b", SelectorKind::Text, &["_root"]),
            selector("nested", SelectorKind::Text, &["b"]),
            selector("a", SelectorKind::Text, &["_root"]),
        ]);
        let ids: Vec<_> = map.children_of("_root").map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(map.has_children("b"));
        assert!(!map.has_children("a"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let map = sitemap(vec![
            selector("x", SelectorKind::Text, &["_root"]),
            selector("x", SelectorKind::Image, &["_root"]),
        ]);
        assert!(map.validate().is_err());
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let map = sitemap(vec![selector("x", SelectorKind::Text, &["ghost"])]);
        assert!(map.validate().is_err());
    }

    #[test]
    fn test_link_self_loop_allowed() {
        let map = sitemap(vec![selector("next", SelectorKind::Link, &["_root", "next"])]);
        map.validate().unwrap();
        assert!(map.selectors[0].is_self_paginating());
    }

    #[test]
    fn test_non_link_self_loop_rejected() {
        let map = sitemap(vec![selector("t", SelectorKind::Text, &["_root", "t"])]);
        assert!(map.validate().is_err());
    }

    #[test]
    fn test_two_node_cycle_rejected() {
        let map = sitemap(vec![
            selector("a", SelectorKind::Element, &["b"]),
            selector("b", SelectorKind::Element, &["a"]),
        ]);
        assert!(map.validate().is_err());
    }

    #[test]
    fn test_derive_keeps_selectors() {
        let map = sitemap(vec![
            selector("link", SelectorKind::Link, &["_root"]),
            selector("body", SelectorKind::Text, &["link"]),
        ]);
        let derived = map.derive("link", vec!["http://x/p1".to_string()]);
        assert_eq!(derived.id, "link");
        assert_eq!(derived.start_urls, vec!["http://x/p1"]);
        assert_eq!(derived.selectors.len(), 2);
    }
}
