use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use markup5ever_rcdom::{Handle, RcDom};

use crate::analyzer::TextAnalyzer;
use crate::dom;
use crate::error::ScriptError;
use crate::page::{Behavior, KeyEvent, Page};
use crate::page_index::PageIndex;

pub const RESULT_CLASS: &str = "search-result";
pub const NOTHING_FOUND: &str = "Nothing found";

/// Link target of a result. Generated sites lay posts out under this path.
pub fn result_href(id: &str) -> String {
    format!("posts/{id}/index.html")
}

/// Page identifiers in first-seen order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    ids: Vec<String>,
    seen: HashSet<String>,
}

impl SearchResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `id` was already present.
    pub fn push_unique(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.to_string());
        self.ids.push(id.to_string());
        true
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for SearchResults {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut results = SearchResults::new();
        for id in iter {
            results.push_unique(id);
        }
        results
    }
}

pub fn match_query(query: &str, index: &PageIndex) -> SearchResults {
    match_query_with(&TextAnalyzer::default(), query, index)
}

/// Looks every query token up and accumulates the hits across tokens in
/// query order.
pub fn match_query_with(analyzer: &TextAnalyzer, query: &str, index: &PageIndex) -> SearchResults {
    let mut results = SearchResults::new();
    for token in analyzer.analyze(query) {
        if let Some(ids) = index.lookup(&token) {
            for id in ids {
                results.push_unique(id);
            }
        }
    }
    log::debug!("query {:?} matched {} pages", query, results.len());
    results
}

/// Replaces the container's contents with the results and makes it visible.
pub fn render(dom: &RcDom, container: &Handle, results: &SearchResults) {
    dom::clear_children(dom, container);

    if results.is_empty() {
        let item = dom::create_element(dom, "li", &[("class", RESULT_CLASS)]);
        dom::append_text(dom, &item, NOTHING_FOUND);
        dom::append_child(dom, container, item);
    } else {
        for id in results.iter() {
            let href = result_href(id);
            let link = dom::create_element(dom, "a", &[("href", href.as_str())]);
            dom::append_text(dom, &link, id);
            let item = dom::create_element(dom, "li", &[("class", RESULT_CLASS)]);
            dom::append_child(dom, &item, link);
            dom::append_child(dom, container, item);
        }
    }

    dom::set_visibility(container, true);
}

struct Wiring {
    input: Handle,
    results: Handle,
}

/// Keyword search over an injected page index. On load it binds to the first
/// `input` of the page and the results container; each Enter re-derives the
/// results from the input's current value.
pub struct SearchBox {
    index: Arc<PageIndex>,
    results_id: String,
    analyzer: TextAnalyzer,
    wiring: RefCell<Option<Wiring>>,
}

impl SearchBox {
    pub fn new(index: Arc<PageIndex>, results_id: impl Into<String>) -> Self {
        Self {
            index,
            results_id: results_id.into(),
            analyzer: TextAnalyzer::default(),
            wiring: RefCell::new(None),
        }
    }

    pub fn search(&self, query: &str) -> SearchResults {
        match_query_with(&self.analyzer, query, &self.index)
    }
}

impl Behavior for SearchBox {
    fn name(&self) -> &'static str {
        "search-box"
    }

    fn on_load(&self, page: &Page) -> Result<(), ScriptError> {
        let input = dom::first_element_by_tag(page.document(), "input")
            .ok_or_else(|| ScriptError::MissingElement("input".to_string()))?;
        let results = page
            .element_by_id(&self.results_id)
            .ok_or_else(|| ScriptError::MissingElement(format!("#{}", self.results_id)))?;
        *self.wiring.borrow_mut() = Some(Wiring { input, results });
        Ok(())
    }

    /// Without a successful load no listener exists, so keys are ignored.
    fn on_keydown(&self, page: &Page, event: &KeyEvent) -> Result<(), ScriptError> {
        if !event.is_enter() {
            return Ok(());
        }
        let wiring = self.wiring.borrow();
        let Some(wiring) = wiring.as_ref() else {
            return Ok(());
        };
        let query = dom::attr(&wiring.input, "value").unwrap_or_default();
        let results = self.search(&query);
        render(page.dom(), &wiring.results, &results);
        Ok(())
    }
}
