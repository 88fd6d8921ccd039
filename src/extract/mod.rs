//! Selector evaluators: per selector kind, extract values from a parsed DOM.
//!
//! Everything here is synchronous — `scraper::Html` is not `Send`, so the
//! worker pool runs page evaluation inside `spawn_blocking` and keeps the
//! DOM off the async executor entirely.

use crate::logging::ErrorLog;
use crate::sitemap::{Selector as SitemapSelector, SelectorKind, Sitemap};
use crate::value::Value;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Links produced by a `Link` selector, resolved to absolute URLs. Routing
/// (pagination, flat value, or nested scrape) is decided by the worker.
#[derive(Debug)]
pub struct DiscoveredLinks {
    pub selector_id: String,
    pub urls: Vec<String>,
}

/// The outcome of evaluating one page under one parent scope.
#[derive(Debug, Default)]
pub struct PageExtraction {
    /// Terminal selector values, keyed by selector id.
    pub output: BTreeMap<String, Value>,
    /// Link discoveries awaiting routing by the worker.
    pub links: Vec<DiscoveredLinks>,
}

/// Evaluate every selector under `parent_id` against the page HTML, in
/// sitemap order. Empty results are omitted from the output map.
pub fn evaluate_page(
    sitemap: &Sitemap,
    parent_id: &str,
    page_url: &Url,
    html: &str,
    log: &ErrorLog,
) -> PageExtraction {
    let doc = Html::parse_document(html);
    let mut extraction = PageExtraction::default();

    for selector in sitemap.children_of(parent_id) {
        if selector.delay_ms > 0 {
            // Blocking-pool thread; an async sleep cannot hold the DOM.
            std::thread::sleep(Duration::from_millis(selector.delay_ms));
        }
        let Some(query) = parse_query(selector, log) else {
            continue;
        };
        match selector.kind {
            SelectorKind::Text => {
                if let Some(value) = Value::collapsed(select_text(&doc, &query, selector, log)) {
                    extraction.output.insert(selector.id.clone(), value);
                }
            }
            SelectorKind::Image => {
                if let Some(value) =
                    Value::collapsed(select_attr_values(&doc, &query, selector, "src"))
                {
                    extraction.output.insert(selector.id.clone(), value);
                }
            }
            SelectorKind::ElementAttribute => {
                let values =
                    select_attr_values(&doc, &query, selector, &selector.extract_attribute);
                if !values.is_empty() {
                    extraction
                        .output
                        .insert(selector.id.clone(), Value::list_of(values));
                }
            }
            SelectorKind::Link => {
                let urls = select_links(&doc, &query, selector, page_url);
                if !urls.is_empty() {
                    extraction.links.push(DiscoveredLinks {
                        selector_id: selector.id.clone(),
                        urls,
                    });
                }
            }
            SelectorKind::Element => {
                let items = select_element(&doc, &query, selector, sitemap, log);
                if !items.is_empty() {
                    extraction
                        .output
                        .insert(selector.id.clone(), Value::List(items));
                }
            }
            SelectorKind::Table => {
                if let Some(table) = select_table(&doc, &query) {
                    extraction.output.insert(selector.id.clone(), table);
                }
            }
        }
    }
    extraction
}

/// Parse a selector's CSS query, logging and skipping the selector on error.
fn parse_query(selector: &SitemapSelector, log: &ErrorLog) -> Option<Selector> {
    match Selector::parse(&selector.query) {
        Ok(query) => Some(query),
        Err(e) => {
            warn!(id = %selector.id, query = %selector.query, error = %e, "bad selector query");
            log.record(&crate::error::ScrapeError::Query {
                id: selector.id.clone(),
                query: selector.query.clone(),
            });
            None
        }
    }
}

fn matched_elements<'a>(
    doc: &'a Html,
    query: &'a Selector,
    selector: &SitemapSelector,
) -> impl Iterator<Item = ElementRef<'a>> {
    let limit = if selector.multiple { usize::MAX } else { 1 };
    doc.select(query).take(limit)
}

fn node_text(el: &ElementRef) -> String {
    el.text().collect::<String>()
}

/// `Text`: the regex match when one is set and matches, else the trimmed
/// node text. A non-matching regex falls back to the text — never to "".
fn select_text(
    doc: &Html,
    query: &Selector,
    selector: &SitemapSelector,
    log: &ErrorLog,
) -> Vec<String> {
    let pattern = selector.regex().and_then(|raw| match Regex::new(raw) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(id = %selector.id, regex = %raw, error = %e, "bad extraction regex, ignoring");
            log.record(&crate::error::ScrapeError::Query {
                id: selector.id.clone(),
                query: raw.to_string(),
            });
            None
        }
    });

    matched_elements(doc, query, selector)
        .map(|el| {
            let text = node_text(&el);
            match &pattern {
                Some(re) => match re.find(&text) {
                    Some(found) => found.as_str().trim().to_string(),
                    None => text.trim().to_string(),
                },
                None => text.trim().to_string(),
            }
        })
        .collect()
}

/// `Link`: `href` resolved against the page URL. A missing `href` resolves
/// the empty string, i.e. the page URL itself.
fn select_links(
    doc: &Html,
    query: &Selector,
    selector: &SitemapSelector,
    page_url: &Url,
) -> Vec<String> {
    matched_elements(doc, query, selector)
        .filter_map(|el| {
            let href = el.value().attr("href").unwrap_or("");
            match page_url.join(href) {
                Ok(resolved) => Some(resolved.to_string()),
                Err(e) => {
                    warn!(href, error = %e, "unresolvable link, skipping");
                    None
                }
            }
        })
        .collect()
}

/// `Image` / `ElementAttribute`: a named attribute per match; a missing
/// attribute yields an empty string rather than aborting the selector.
fn select_attr_values(
    doc: &Html,
    query: &Selector,
    selector: &SitemapSelector,
    attribute: &str,
) -> Vec<String> {
    matched_elements(doc, query, selector)
        .map(|el| el.value().attr(attribute).unwrap_or("").to_string())
        .collect()
}

/// `Element`: per matched element, one map of child selector id to the
/// first matching descendant's text / `src` / `href`.
fn select_element(
    doc: &Html,
    query: &Selector,
    selector: &SitemapSelector,
    sitemap: &Sitemap,
    log: &ErrorLog,
) -> Vec<Value> {
    // Parse each child's query once, not per matched element.
    let children: Vec<(&SitemapSelector, Selector)> = sitemap
        .children_of(&selector.id)
        .filter(|c| {
            matches!(
                c.kind,
                SelectorKind::Text | SelectorKind::Image | SelectorKind::Link
            )
        })
        .filter_map(|c| parse_query(c, log).map(|q| (c, q)))
        .collect();

    matched_elements(doc, query, selector)
        .filter_map(|el| {
            let mut entry = BTreeMap::new();
            for (child, child_query) in &children {
                let found = el.select(child_query).next();
                let value = match child.kind {
                    SelectorKind::Text => found.map(|n| node_text(&n)).unwrap_or_default(),
                    SelectorKind::Image => found
                        .and_then(|n| n.value().attr("src"))
                        .unwrap_or("")
                        .to_string(),
                    SelectorKind::Link => found
                        .and_then(|n| n.value().attr("href"))
                        .unwrap_or("")
                        .to_string(),
                    _ => unreachable!("filtered above"),
                };
                entry.insert(child.id.clone(), Value::Text(value));
            }
            if entry.is_empty() {
                None
            } else {
                Some(Value::Map(entry))
            }
        })
        .collect()
}

/// `Table`: `<th>` texts into `header`, each `<tr>`'s `<td>` texts into a
/// row of `rows`, aggregated over every matched table.
fn select_table(doc: &Html, query: &Selector) -> Option<Value> {
    let row_query = Selector::parse("tr").expect("static query");
    let heading_query = Selector::parse("th").expect("static query");
    let cell_query = Selector::parse("td").expect("static query");

    let mut header = Vec::new();
    let mut rows = Vec::new();
    let mut matched = false;
    for table in doc.select(query) {
        matched = true;
        for tr in table.select(&row_query) {
            for th in tr.select(&heading_query) {
                header.push(Value::Text(node_text(&th)));
            }
            let row: Vec<Value> = tr
                .select(&cell_query)
                .map(|td| Value::Text(node_text(&td)))
                .collect();
            if !row.is_empty() {
                rows.push(Value::List(row));
            }
        }
    }
    if !matched {
        return None;
    }
    let mut out = BTreeMap::new();
    out.insert("header".to_string(), Value::List(header));
    out.insert("rows".to_string(), Value::List(rows));
    Some(Value::Map(out))
}
