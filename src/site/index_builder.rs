use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::analyzer::TextAnalyzer;
use crate::error::IndexError;
use crate::page_index::PageIndex;
use crate::search::result_href;

use super::post::Post;

/// Keyword -> post names, in post order. Keywords differing only by case
/// share one entry under the first spelling seen, and a post is listed once
/// per keyword.
pub fn build_page_index(posts: &[Post]) -> Result<PageIndex, IndexError> {
    let analyzer = TextAnalyzer::default();
    let mut entries: Vec<(String, Vec<String>)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for post in posts {
        for keyword in &post.keywords {
            let normalized = analyzer.normalize_term(keyword);
            let slot = *slots.entry(normalized).or_insert_with(|| {
                entries.push((keyword.clone(), Vec::new()));
                entries.len() - 1
            });
            let names = &mut entries[slot].1;
            if !names.contains(&post.name) {
                names.push(post.name.clone());
            }
        }
    }

    PageIndex::from_entries(entries)
}

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

/// Substitutes `{{name}}` placeholders in a single pass, so substituted
/// content is never itself expanded. Unknown placeholders are kept.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let placeholder = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"));
    placeholder
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Newest posts first; undated posts last, in their original order.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Escapes text for html content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Article blocks for the most recent posts.
pub fn summary_block(posts: &[Post], count: usize) -> String {
    posts
        .iter()
        .take(count)
        .map(|post| {
            format!(
                "<article><h3>{title}</h3><p>{summary}</p><p>...</p><p>Read more of: <a href='{href}'>{title}</a></p></article>\n",
                title = escape_html(&post.title),
                summary = post.summary,
                href = escape_html(&result_href(&post.name)),
            )
        })
        .collect()
}

pub fn link_list(posts: &[Post]) -> String {
    posts
        .iter()
        .map(|post| {
            let date = post
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            format!(
                "<li><a href='{}'>{} <small>{}</small></a></li>\n",
                escape_html(&result_href(&post.name)),
                escape_html(&post.title),
                date
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::match_query;

    fn post(name: &str, date: &str) -> Post {
        Post::from_body(name, format!("<p>{date}</p>")).unwrap()
    }

    #[test]
    fn test_build_page_index_groups_posts() {
        let posts = vec![post("rust_tips", "2020-01-01"), post("more_rust", "2020-02-01")];
        let index = build_page_index(&posts).unwrap();
        assert_eq!(index.lookup("RUST").unwrap(), ["rust_tips", "more_rust"]);
        assert_eq!(index.lookup("TIPS").unwrap(), ["rust_tips"]);
        assert_eq!(
            index.to_json().unwrap(),
            r#"{"More":["more_rust"],"Rust":["rust_tips","more_rust"],"Tips":["rust_tips"]}"#
        );
    }

    #[test]
    fn test_repeated_keyword_lists_post_once() {
        let index = build_page_index(&[post("day_by_day", "2020-01-01")]).unwrap();
        assert_eq!(index.lookup("DAY").unwrap(), ["day_by_day"]);
        assert_eq!(match_query("day by", &index).ids(), ["day_by_day"]);
    }

    #[test]
    fn test_render_template_single_pass() {
        let out = render_template(
            "<h1>{{title}}</h1>{{body}}{{unknown}}",
            &[("body", "<p>{{title}}</p>"), ("title", "Hello")],
        );
        assert_eq!(out, "<h1>Hello</h1><p>{{title}}</p>{{unknown}}");
    }

    #[test]
    fn test_sort_newest_first() {
        let mut posts = vec![
            post("old", "2001-01-01"),
            post("undated", ""),
            post("new", "2020-01-01 10:30"),
        ];
        sort_newest_first(&mut posts);
        let names: Vec<&str> = posts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["new", "old", "undated"]);
    }

    #[test]
    fn test_link_list_and_summaries() {
        let posts = vec![post("first", "2020-01-01"), post("second", "")];
        assert_eq!(
            link_list(&posts),
            "<li><a href='posts/first/index.html'>First <small>2020-01-01</small></a></li>\n\
             <li><a href='posts/second/index.html'>Second <small></small></a></li>\n"
        );
        let block = summary_block(&posts, 1);
        assert!(block.contains("<h3>First</h3>"));
        assert!(!block.contains("Second"));
    }

    #[test]
    fn test_titles_and_links_are_escaped() {
        let posts = vec![post("a<b_&_c's", "2020-01-01")];
        assert_eq!(
            link_list(&posts),
            "<li><a href='posts/a&lt;b_&amp;_c&#39;s/index.html'>A&lt;b &amp; C&#39;s <small>2020-01-01</small></a></li>\n"
        );
        let block = summary_block(&posts, 1);
        assert!(block.contains("<h3>A&lt;b &amp; C&#39;s</h3>"));
        assert!(!block.contains("a<b"));
    }
}
