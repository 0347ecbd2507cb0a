use std::collections::{BTreeMap, HashMap};
use std::fmt;

use markup5ever_rcdom::Handle;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::analyzer::TextAnalyzer;
use crate::dom;
use crate::error::IndexError;

/// Script call generated pages use to hand the index to the search box.
pub const SEARCH_DATA_CALL: &str = "set_search_data(";

/// One value of the page index as generators emit it: a bare identifier
/// when a single page carries the token, a list otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum IndexEntry {
    One(String),
    Many(Vec<String>),
}

impl IndexEntry {
    pub fn into_ids(self) -> Vec<String> {
        match self {
            IndexEntry::One(id) => vec![id],
            IndexEntry::Many(ids) => ids,
        }
    }
}

/// Object entries in document order. Repeated keys are all kept so that
/// `from_entries` sees every one of them.
struct RawEntries(Vec<(String, IndexEntry)>);

impl<'de> Deserialize<'de> for RawEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping tokens to page identifiers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, IndexEntry>()? {
                    entries.push(entry);
                }
                Ok(RawEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    raw_key: String,
    ids: Vec<String>,
}

/// Read-only token -> page identifiers mapping, keyed by normalized token.
#[derive(Debug, Clone)]
pub struct PageIndex {
    buckets: HashMap<String, Bucket>,
}

impl PageIndex {
    /// Parses the JSON object injected into pages, e.g.
    /// `{"cat": ["page1", "page2"], "dog": "page3"}`.
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        let RawEntries(raw) = serde_json::from_str(json)?;
        Self::from_entries(raw.into_iter().map(|(k, v)| (k, v.into_ids())))
    }

    /// Reads the index a generated page embeds as `set_search_data({...});`
    /// in one of its scripts. `Ok(None)` when no script carries one.
    pub fn from_document(document: &Handle) -> Result<Option<Self>, IndexError> {
        for script in dom::elements_by_tag(document, "script") {
            let text = dom::text_content(&script);
            if let Some(json) = embedded_json(&text) {
                return Self::from_json(json).map(Some);
            }
        }
        Ok(None)
    }

    pub fn from_entries<I>(entries: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let analyzer = TextAnalyzer::default();
        let mut buckets: HashMap<String, Bucket> = HashMap::new();

        for (raw_key, ids) in entries {
            if raw_key.is_empty() || raw_key.chars().any(char::is_whitespace) {
                log::warn!("dropping unmatchable page index key {:?}", raw_key);
                continue;
            }
            let normalized = analyzer.normalize_term(&raw_key);
            match buckets.entry(normalized) {
                std::collections::hash_map::Entry::Occupied(e) => {
                    return Err(IndexError::Collision {
                        normalized: e.key().clone(),
                        first: e.get().raw_key.clone(),
                        second: raw_key,
                    });
                }
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(Bucket { raw_key, ids });
                }
            }
        }

        log::debug!("loaded page index with {} tokens", buckets.len());
        Ok(Self { buckets })
    }

    /// Identifiers for an already normalized token.
    pub fn lookup(&self, normalized_token: &str) -> Option<&[String]> {
        self.buckets
            .get(normalized_token)
            .map(|bucket| bucket.ids.as_slice())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Emits the index with original key spelling, every value as a list.
    pub fn to_json(&self) -> Result<String, IndexError> {
        let out: BTreeMap<&str, &[String]> = self
            .buckets
            .values()
            .map(|bucket| (bucket.raw_key.as_str(), bucket.ids.as_slice()))
            .collect();
        Ok(serde_json::to_string(&out)?)
    }
}

/// Argument of the first `set_search_data(...)` call in a script body.
fn embedded_json(script: &str) -> Option<&str> {
    let start = script.find(SEARCH_DATA_CALL)? + SEARCH_DATA_CALL.len();
    let rest = &script[start..];
    let end = rest.rfind(')')?;
    Some(rest[..end].trim())
}
