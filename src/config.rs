use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_env()
});

#[derive(Debug, Clone)]
pub struct Config {
    pub src_dir: PathBuf,
    pub live_dir: PathBuf,
    pub templates_dir: PathBuf,
    /// Id of the element holding the article body.
    pub article_id: String,
    /// Id of the initially hidden search results list.
    pub results_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
            live_dir: PathBuf::from("live"),
            templates_dir: PathBuf::from("templates"),
            article_id: "article-main".to_string(),
            results_id: "search-results".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Config {
            src_dir: get_env_or_default("SITE_SRC_DIR", defaults.src_dir),
            live_dir: get_env_or_default("SITE_LIVE_DIR", defaults.live_dir),
            templates_dir: get_env_or_default("SITE_TEMPLATES_DIR", defaults.templates_dir),
            article_id: get_env_or_default("SITE_ARTICLE_ID", defaults.article_id),
            results_id: get_env_or_default("SITE_RESULTS_ID", defaults.results_id),
        }
    }
}

fn get_env_or_default<T: From<String>>(key: &str, default: T) -> T {
    env::var(key).map(T::from).unwrap_or(default)
}
