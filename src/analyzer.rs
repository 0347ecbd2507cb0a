/// A tokenizer receives a stream of characters, breaks it up into individual tokens (usually individual words),
/// and outputs a stream of tokens.
/// A whitespace tokenizer breaks "Quick  brown fox!" into [Quick, brown, fox!]. Runs of whitespace never
/// yield empty tokens, so an empty or blank query produces nothing to look up.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

pub struct WhiteSpaceTokenizer;

impl Tokenizer for WhiteSpaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|w| w.to_string())
            .collect::<Vec<String>>()
    }
}

/// A token filter receives the token stream and may add, remove, or change tokens.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken>;
}

/// Case folding used on both sides of a lookup: query tokens and page index keys.
pub struct UpperCaseTokenFilter;

impl TokenFilter for UpperCaseTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .map(|mut t| {
                t.term = t.term.to_uppercase();
                t
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextToken {
    pub term: String,
    pub pos: usize,
}

impl std::ops::Deref for TextToken {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.term
    }
}

/// Pure text analysis pipeline
pub struct TextAnalyzer {
    tokenizer: Box<dyn Tokenizer>,
    token_filters: Vec<Box<dyn TokenFilter>>,
}

impl Default for TextAnalyzer {
    /// Whitespace split followed by uppercase normalization.
    fn default() -> Self {
        Self::new(
            Box::new(WhiteSpaceTokenizer),
            vec![Box::new(UpperCaseTokenFilter)],
        )
    }
}

impl TextAnalyzer {
    pub fn new(tokenizer: Box<dyn Tokenizer>, token_filters: Vec<Box<dyn TokenFilter>>) -> Self {
        Self {
            tokenizer,
            token_filters,
        }
    }

    pub fn tokenize(&self, content: &str) -> Vec<TextToken> {
        self.tokenizer
            .tokenize(content)
            .into_iter()
            .enumerate()
            .map(|(pos, term)| TextToken { term, pos })
            .collect()
    }

    pub fn token_filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        for filter in self.token_filters.iter() {
            tokens = filter.filter(tokens);
        }
        tokens
    }

    /// Analyzes raw content and returns a list of tokens
    pub fn analyze(&self, content: &str) -> Vec<TextToken> {
        let tokens = self.tokenize(content);
        self.token_filter(tokens)
    }

    /// Runs the token filters over a single term without tokenizing it.
    pub fn normalize_term(&self, term: &str) -> String {
        let tokens = vec![TextToken {
            term: term.to_string(),
            pos: 0,
        }];
        self.token_filter(tokens)
            .into_iter()
            .next()
            .map(|t| t.term)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(tokens: Vec<TextToken>) -> Vec<String> {
        tokens.into_iter().map(|t| t.term).collect()
    }

    #[test]
    fn test_whitespace_tokenizer_skips_runs() {
        let tokenizer = WhiteSpaceTokenizer;
        assert_eq!(tokenizer.tokenize("cat   dog\tbird\n"), vec!["cat", "dog", "bird"]);
        assert!(tokenizer.tokenize("   ").is_empty());
        assert!(tokenizer.tokenize("").is_empty());
    }

    #[test]
    fn test_positions_follow_query_order() {
        let analyzer = TextAnalyzer::default();
        let tokens = analyzer.analyze("Rust  is fun");
        let positions: Vec<usize> = tokens.iter().map(|t| t.pos).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(terms(tokens), vec!["RUST", "IS", "FUN"]);
    }

    #[test]
    fn test_uppercase_filter_is_unicode_aware() {
        let analyzer = TextAnalyzer::default();
        assert_eq!(analyzer.normalize_term("straße"), "STRASSE");
        assert_eq!(analyzer.normalize_term("Héllo"), "HÉLLO");
    }

    #[test]
    fn test_custom_pipeline_without_filters() {
        let analyzer = TextAnalyzer::new(Box::new(WhiteSpaceTokenizer), vec![]);
        assert_eq!(terms(analyzer.analyze("Keep Case")), vec!["Keep", "Case"]);
        assert_eq!(analyzer.normalize_term("Keep"), "Keep");
    }
}
