//! Keyword group configuration and occurrence counting.

use std::collections::BTreeMap;
use std::path::Path;

use crate::aggregator::FIXED_COLUMNS;
use crate::errors::ConfigError;

/// Named keyword groups, ordered by group name.
///
/// Matching is case-sensitive and literal. Case-insensitive groups are
/// expressed by pre-normalizing the keyword set in the configuration file,
/// which keeps the counter itself deterministic and auditable.
#[derive(Debug, Clone)]
pub struct KeywordGroups {
    groups: BTreeMap<String, Vec<String>>,
}

impl KeywordGroups {
    /// Load groups from a JSON object of `{"group name": ["keyword", ...]}`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Keywords(format!("cannot read {}: {}", path.display(), e)))?;
        let groups: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Keywords(format!("cannot parse {}: {}", path.display(), e)))?;
        Self::new(groups)
    }

    pub fn new(groups: BTreeMap<String, Vec<String>>) -> Result<Self, ConfigError> {
        if groups.is_empty() {
            return Err(ConfigError::Keywords("no keyword groups configured".to_string()));
        }

        let mut validated = BTreeMap::new();
        for (name, keywords) in groups {
            if FIXED_COLUMNS.contains(&name.as_str()) {
                return Err(ConfigError::Keywords(format!(
                    "group name '{}' collides with a fixed output column",
                    name
                )));
            }

            let keywords: Vec<String> = keywords.iter().map(|k| k.trim().to_string()).collect();
            if keywords.iter().any(|k| k.is_empty()) {
                return Err(ConfigError::Keywords(format!("group '{}' contains an empty keyword", name)));
            }
            let mut deduped = keywords.clone();
            deduped.sort();
            deduped.dedup();
            if deduped.len() != keywords.len() {
                return Err(ConfigError::Keywords(format!("group '{}' contains duplicate keywords", name)));
            }
            if keywords.is_empty() {
                return Err(ConfigError::Keywords(format!("group '{}' has no keywords", name)));
            }

            validated.insert(name, keywords);
        }

        Ok(KeywordGroups { groups: validated })
    }

    /// Group names in output-column order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Count occurrences of every group in the text.
    pub fn count(&self, text: &str) -> BTreeMap<String, u64> {
        self.groups
            .iter()
            .map(|(name, keywords)| (name.clone(), count_group(text, keywords)))
            .collect()
    }
}

/// Total non-overlapping occurrences of any keyword in the group.
///
/// Left-to-right scan: the leftmost match wins, ties at the same position go
/// to the longest keyword, and the scan resumes after the consumed match, so
/// a span of text is counted at most once per group.
fn count_group(text: &str, keywords: &[String]) -> u64 {
    let mut count = 0u64;
    let mut position = 0usize;

    while position < text.len() {
        let mut best: Option<(usize, usize)> = None;
        for keyword in keywords {
            if let Some(offset) = text[position..].find(keyword.as_str()) {
                let start = position + offset;
                let replace = match best {
                    None => true,
                    Some((best_start, best_len)) => {
                        start < best_start || (start == best_start && keyword.len() > best_len)
                    }
                };
                if replace {
                    best = Some((start, keyword.len()));
                }
            }
        }

        match best {
            Some((start, len)) => {
                count += 1;
                position = start + len;
            }
            None => break,
        }
    }

    count
}
