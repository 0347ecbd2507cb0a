use std::io;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::analyzer::{Tokenizer, WhiteSpaceTokenizer};
use crate::dom;

static DATE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn date_pattern() -> &'static Regex {
    DATE_PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4}-\d{2}-\d{2}) *(\d{2}:\d{2})?").expect("date pattern is valid")
    })
}

/// Paragraphs of a post shown on the index page.
const SUMMARY_PARAGRAPHS: usize = 3;

#[derive(Debug, Clone)]
pub struct Post {
    /// Source directory name, also the identifier used in links and the search index.
    pub name: String,
    pub title: String,
    pub date: Option<NaiveDateTime>,
    pub summary: String,
    pub keywords: Vec<String>,
    /// Rendered html body fragment.
    pub body: String,
}

impl Post {
    pub fn from_body(name: &str, body: String) -> io::Result<Post> {
        let title = title_from_dir_name(name);
        let date = extract_date(&body);
        if date.is_none() {
            log::warn!("{} doesn't contain a date", name);
        }
        let summary = summarize(&body, name)?;
        let keywords = WhiteSpaceTokenizer.tokenize(&title);
        Ok(Post {
            name: name.to_string(),
            title,
            date,
            summary,
            keywords,
            body,
        })
    }
}

/// `my_first_post` -> `My First Post`
pub fn title_from_dir_name(name: &str) -> String {
    name.split('_')
        .map(capitalize)
        .collect::<Vec<String>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// First `yyyy-mm-dd` or `yyyy-mm-dd hh:mm` in the text. Dates that match the
/// pattern but are not real calendar dates count as absent.
pub fn extract_date(text: &str) -> Option<NaiveDateTime> {
    let caps = date_pattern().captures(text)?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    match caps.get(2) {
        Some(t) => {
            let time = NaiveTime::parse_from_str(t.as_str(), "%H:%M").ok()?;
            Some(date.and_time(time))
        }
        None => date.and_hms_opt(0, 0, 0),
    }
}

/// The leading paragraphs of a post, with images pointed at their thumbnails
/// under the post's directory.
pub fn summarize(html: &str, post_name: &str) -> io::Result<String> {
    let dom = dom::get_dom(html);
    let mut summary = String::new();
    for paragraph in dom::elements_by_tag(&dom.document, "p")
        .into_iter()
        .take(SUMMARY_PARAGRAPHS)
    {
        for image in dom::elements_by_tag(&paragraph, "img") {
            if let Some(src) = dom::attr(&image, "src") {
                let thumb = format!("posts/{}/{}", post_name, thumbnail_name(&src));
                dom::set_attr(&image, "src", &thumb);
            }
        }
        summary.push_str(&dom::serialize_node(&paragraph)?);
    }
    Ok(summary)
}

/// `photo.jpg` -> `photo_thumb.jpg`
pub fn thumbnail_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_thumb.{ext}"),
        None => format!("{file_name}_thumb"),
    }
}
