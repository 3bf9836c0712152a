use serde::Serialize;
use std::collections::BTreeMap;

pub const KEY_FILENAME: &str = "filename";
pub const KEY_CACHE_IMPORTS: &str = "cache-imports";
/// Legacy registry-only cache refs, superseded by `cache-imports`
pub const KEY_CACHE_FROM: &str = "cache-from";
pub const KEY_TARGET_PLATFORM: &str = "platform";
pub const BUILD_ARG_PREFIX: &str = "build-arg:";

pub const DEFAULT_MANIFEST_FILENAME: &str = "pyfront.yaml";

/// Frontend options as handed over by the build client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildOptions {
    opts: BTreeMap<String, String>,
}

impl BuildOptions {
    pub fn new(opts: BTreeMap<String, String>) -> Self {
        Self { opts }
    }

    /// Builds options from `KEY=VALUE` pairs; a pair without `=` gets an empty value
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            opts: pairs
                .into_iter()
                .map(|pair| parse_pair(pair.as_ref()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.opts.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.opts.insert(key.into(), value.into());
    }

    pub fn manifest_filename<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.get(KEY_FILENAME)
            .filter(|name| !name.is_empty())
            .unwrap_or(fallback)
    }

    pub fn target_platforms(&self) -> Option<&str> {
        self.get(KEY_TARGET_PLATFORM)
    }

    /// `build-arg:` options with the prefix stripped, values verbatim
    pub fn build_args(&self) -> BTreeMap<String, String> {
        self.opts
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(BUILD_ARG_PREFIX)
                    .map(|name| (name.to_string(), value.clone()))
            })
            .collect()
    }
}

pub fn parse_pair(pair: &str) -> (String, String) {
    match pair.split_once('=') {
        Some((key, value)) => (key.to_string(), value.to_string()),
        None => (pair.to_string(), String::new()),
    }
}
