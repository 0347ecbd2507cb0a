use std::sync::Arc;

use blogsearch::dom;
use blogsearch::error::ScriptError;
use blogsearch::page::{Key, KeyEvent, Page};
use blogsearch::page_index::PageIndex;
use blogsearch::search::*;

const PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<input type="text" placeholder="search">
<ul id="search-results" style="visibility: hidden"><li>stale</li></ul>
</body></html>"#;

fn index() -> Arc<PageIndex> {
    Arc::new(PageIndex::from_json(r#"{"cat": ["page1","page2"], "dog": "page3"}"#).unwrap())
}

fn loaded_page(html: &str) -> Page {
    let mut page = Page::parse(html);
    page.install(Box::new(SearchBox::new(index(), "search-results")));
    assert!(page.fire_load().is_empty());
    page
}

fn submit(page: &Page, query: &str) {
    let input = dom::first_element_by_tag(page.document(), "input").unwrap();
    dom::set_attr(&input, "value", query);
    assert!(page.fire_keydown(&KeyEvent::new(Key::Enter)).is_empty());
}

fn result_items(page: &Page) -> Vec<(Option<String>, String)> {
    let list = page.element_by_id("search-results").unwrap();
    let items: Vec<_> = list
        .children
        .borrow()
        .iter()
        .filter(|c| dom::is_element(c))
        .cloned()
        .collect();
    items
        .iter()
        .map(|item| {
            let href = dom::first_element_by_tag(item, "a").and_then(|a| dom::attr(&a, "href"));
            (href, dom::text_content(item))
        })
        .collect()
}

mod matching {
    use super::*;

    #[test]
    fn test_concrete_scenario() {
        let results = match_query("cat dog", &index());
        assert_eq!(results.ids(), ["page1", "page2", "page3"]);
    }

    #[test]
    fn test_case_insensitive() {
        let index = PageIndex::from_json(r#"{"hello": "pageA"}"#).unwrap();
        assert_eq!(match_query("HELLO", &index), match_query("hello", &index));
        assert_eq!(match_query("HeLLo", &index).ids(), ["pageA"]);
    }

    #[test]
    fn test_no_duplicates_across_tokens() {
        let index =
            PageIndex::from_json(r#"{"a": ["x", "y"], "b": ["y", "z", "x"], "c": "z"}"#).unwrap();
        let results = match_query("b a c a", &index);
        assert_eq!(results.ids(), ["y", "z", "x"]);
    }

    #[test]
    fn test_empty_and_blank_queries() {
        let index = index();
        assert!(match_query("", &index).is_empty());
        assert!(match_query("    ", &index).is_empty());
        assert!(match_query("\n\t", &index).is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = PageIndex::from_json("{}").unwrap();
        assert!(match_query("cat", &index).is_empty());
    }
}

mod rendering {
    use super::*;

    #[test]
    fn test_render_results_in_order() {
        let page = Page::parse(PAGE);
        let list = page.element_by_id("search-results").unwrap();
        let results: SearchResults = ["pageA", "pageB"].into_iter().collect();
        render(page.dom(), &list, &results);

        assert_eq!(
            result_items(&page),
            vec![
                (Some("posts/pageA/index.html".to_string()), "pageA".to_string()),
                (Some("posts/pageB/index.html".to_string()), "pageB".to_string()),
            ]
        );
        assert!(dom::is_visible(&list));
        assert!(!dom::text_content(&list).contains("stale"));
    }

    #[test]
    fn test_render_nothing_found() {
        let page = Page::parse(PAGE);
        let list = page.element_by_id("search-results").unwrap();
        assert!(!dom::is_visible(&list));
        render(page.dom(), &list, &SearchResults::new());

        assert_eq!(result_items(&page), vec![(None, NOTHING_FOUND.to_string())]);
        assert!(dom::is_visible(&list));
    }

    #[test]
    fn test_render_markup() {
        let page = Page::parse(PAGE);
        let list = page.element_by_id("search-results").unwrap();
        render(
            page.dom(),
            &list,
            &["page1"].into_iter().collect::<SearchResults>(),
        );
        assert_eq!(
            dom::serialize_node(&list).unwrap(),
            r#"<ul id="search-results" style="visibility: visible"><li class="search-result"><a href="posts/page1/index.html">page1</a></li></ul>"#
        );
    }
}

mod search_box {
    use super::*;

    #[test]
    fn test_enter_renders_matches() {
        let page = loaded_page(PAGE);
        submit(&page, "cat dog");
        let hrefs: Vec<Option<String>> = result_items(&page).into_iter().map(|(h, _)| h).collect();
        assert_eq!(
            hrefs,
            vec![
                Some("posts/page1/index.html".to_string()),
                Some("posts/page2/index.html".to_string()),
                Some("posts/page3/index.html".to_string()),
            ]
        );
    }

    #[test]
    fn test_each_enter_rebuilds_results() {
        let page = loaded_page(PAGE);
        submit(&page, "cat");
        assert_eq!(result_items(&page).len(), 2);
        submit(&page, "DOG");
        assert_eq!(
            result_items(&page),
            vec![(Some("posts/page3/index.html".to_string()), "page3".to_string())]
        );
        submit(&page, "fish");
        assert_eq!(result_items(&page), vec![(None, NOTHING_FOUND.to_string())]);
    }

    #[test]
    fn test_other_keys_do_nothing() {
        let page = loaded_page(PAGE);
        let input = dom::first_element_by_tag(page.document(), "input").unwrap();
        dom::set_attr(&input, "value", "cat");
        page.fire_keydown(&KeyEvent::new(Key::Char('t')));
        page.fire_keydown(&KeyEvent::new(Key::Other("Tab".to_string())));

        let list = page.element_by_id("search-results").unwrap();
        assert!(!dom::is_visible(&list));
        assert_eq!(dom::text_content(&list), "stale");
    }

    #[test]
    fn test_missing_input_aborts_only_search() {
        let mut page = Page::parse(r#"<html><body><ul id="search-results"></ul></body></html>"#);
        page.install(Box::new(SearchBox::new(index(), "search-results")));
        let faults = page.fire_load();
        assert_eq!(faults.len(), 1);
        assert!(matches!(&faults[0].error, ScriptError::MissingElement(s) if s == "input"));

        // no listener was attached
        assert!(page.fire_keydown(&KeyEvent::new(Key::Enter)).is_empty());
        let list = page.element_by_id("search-results").unwrap();
        assert!(list.children.borrow().is_empty());
    }

    #[test]
    fn test_missing_results_container() {
        let mut page = Page::parse("<html><body><input></body></html>");
        page.install(Box::new(SearchBox::new(index(), "search-results")));
        let faults = page.fire_load();
        assert!(matches!(
            &faults[0].error,
            ScriptError::MissingElement(s) if s == "#search-results"
        ));
    }

    #[test]
    fn test_search_box_search() {
        let search_box = SearchBox::new(index(), "search-results");
        assert_eq!(search_box.search("dog cat").ids(), ["page3", "page1", "page2"]);
    }
}
