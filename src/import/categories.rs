use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::VideoCategory;

use super::normalize::KemonoPost;

const EMBEDDED_TABLE: &str = include_str!("../../config/categories.json");

#[derive(Debug, Error)]
pub enum CategoryTableError {
    #[error("failed to read category table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed category table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported category table version {0}")]
    UnsupportedVersion(u32),

    #[error("category names must be non-empty")]
    EmptyName,

    #[error("category '{0}' is listed more than once")]
    DuplicateCategory(String),

    #[error("category '{0}' has an empty keyword")]
    EmptyKeyword(String),

    #[error("keyword '{keyword}' appears in both '{first}' and '{second}'")]
    DuplicateKeyword {
        keyword: String,
        first: String,
        second: String,
    },

    #[error("keyword '{keyword}' in '{category}' is unreachable behind '{shadow}' in '{earlier}'")]
    ShadowedKeyword {
        keyword: String,
        category: String,
        shadow: String,
        earlier: String,
    },
}

impl From<CategoryTableError> for AppError {
    fn from(error: CategoryTableError) -> Self {
        AppError::Internal(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub fallback_keywords: Vec<String>,
}

/// The ordered keyword table used to classify video titles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable {
    pub version: u32,
    #[serde(default = "default_uncategorized")]
    pub uncategorized: String,
    pub categories: Vec<CategoryRule>,
}

fn default_uncategorized() -> String {
    "Uncategorized".to_string()
}

impl CategoryTable {
    pub fn embedded() -> Result<Self, CategoryTableError> {
        Self::from_json(EMBEDDED_TABLE)
    }

    pub fn from_json(raw: &str) -> Result<Self, CategoryTableError> {
        let table: CategoryTable = serde_json::from_str(raw)?;
        table.validate()?;
        Ok(table)
    }

    #[instrument]
    pub fn load(path: &Path) -> Result<Self, CategoryTableError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CategoryTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json(&raw)?;
        info!(version = table.version, categories = table.categories.len(), "Loaded category table");
        Ok(table)
    }

    /// Reads the table at `path` when given, the built-in table otherwise.
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self, CategoryTableError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::embedded(),
        }
    }

    pub fn validate(&self) -> Result<(), CategoryTableError> {
        if self.version < 1 {
            return Err(CategoryTableError::UnsupportedVersion(self.version));
        }

        if self.uncategorized.trim().is_empty() {
            return Err(CategoryTableError::EmptyName);
        }

        let mut names: Vec<&str> = vec![self.uncategorized.as_str()];
        let mut seen_keywords: HashMap<String, &str> = HashMap::new();
        let mut earlier_keywords: Vec<(String, &str)> = Vec::new();
        let mut earlier_fallbacks: Vec<(String, &str)> = Vec::new();

        for rule in &self.categories {
            if rule.name.trim().is_empty() {
                return Err(CategoryTableError::EmptyName);
            }
            if names.contains(&rule.name.as_str()) {
                return Err(CategoryTableError::DuplicateCategory(rule.name.clone()));
            }
            names.push(&rule.name);

            for keyword in rule.keywords.iter().chain(&rule.fallback_keywords) {
                if keyword.trim().is_empty() {
                    return Err(CategoryTableError::EmptyKeyword(rule.name.clone()));
                }

                let key = keyword.to_lowercase();
                if let Some(first) = seen_keywords.get(&key) {
                    return Err(CategoryTableError::DuplicateKeyword {
                        keyword: keyword.clone(),
                        first: first.to_string(),
                        second: rule.name.clone(),
                    });
                }
                seen_keywords.insert(key, &rule.name);
            }

            Self::check_reachable(&rule.name, &rule.keywords, &earlier_keywords)?;
            Self::check_reachable(&rule.name, &rule.fallback_keywords, &earlier_fallbacks)?;

            let name = rule.name.as_str();
            earlier_keywords.extend(rule.keywords.iter().map(|k| (k.to_lowercase(), name)));
            earlier_fallbacks.extend(
                rule.fallback_keywords
                    .iter()
                    .map(|k| (k.to_lowercase(), name)),
            );
        }

        Ok(())
    }

    /// Matching is first-substring-wins in table order, so a keyword that
    /// contains an earlier category's keyword can never be selected.
    fn check_reachable(
        category: &str,
        keywords: &[String],
        earlier: &[(String, &str)],
    ) -> Result<(), CategoryTableError> {
        for keyword in keywords {
            let key = keyword.to_lowercase();
            let shadowed_by = earlier
                .iter()
                .find(|(shadow, _)| key.contains(shadow.as_str()));

            if let Some((shadow, owner)) = shadowed_by {
                return Err(CategoryTableError::ShadowedKeyword {
                    keyword: keyword.clone(),
                    category: category.to_string(),
                    shadow: shadow.clone(),
                    earlier: owner.to_string(),
                });
            }
        }

        Ok(())
    }

    /// First category whose primary keywords occur in `title`.
    pub fn match_title(&self, title: &str) -> Option<&CategoryRule> {
        let title = title.to_lowercase();
        self.categories.iter().find(|rule| {
            rule.keywords
                .iter()
                .any(|keyword| title.contains(&keyword.to_lowercase()))
        })
    }

    /// Buckets posts by category. Every category and the uncategorized bucket
    /// are present in table order, even when empty.
    pub fn categorize(&self, posts: Vec<KemonoPost>) -> IndexMap<String, Vec<KemonoPost>> {
        let mut buckets: IndexMap<String, Vec<KemonoPost>> = self
            .categories
            .iter()
            .map(|rule| (rule.name.clone(), Vec::new()))
            .collect();
        buckets.insert(self.uncategorized.clone(), Vec::new());

        for post in posts {
            let name = self
                .match_title(post.title())
                .map(|rule| rule.name.clone())
                .unwrap_or_else(|| self.uncategorized.clone());

            buckets.entry(name).or_default().push(post);
        }

        buckets
    }
}

/// Resolves a title to a persisted category id.
#[derive(Debug, Clone, Default)]
pub struct CategoryResolver {
    exact: Vec<(String, i64)>,
    patterns: Vec<(String, i64)>,
    fallbacks: Vec<(String, i64)>,
    next: Option<Box<CategoryResolver>>,
}

impl CategoryResolver {
    /// Caller-supplied `pattern -> category id` mapping, tried in its order.
    pub fn explicit(mapping: &IndexMap<String, i64>) -> Self {
        let entries: Vec<(String, i64)> = mapping
            .iter()
            .filter(|(pattern, _)| !pattern.is_empty())
            .map(|(pattern, id)| (pattern.to_lowercase(), *id))
            .collect();

        Self {
            exact: entries.clone(),
            patterns: entries,
            ..Self::default()
        }
    }

    /// Consults `next` for titles this resolver has no match for.
    pub fn followed_by(mut self, next: CategoryResolver) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Joins the keyword table with the categories present in the store.
    /// Table categories that were never persisted are ignored.
    pub fn derived(table: &CategoryTable, persisted: &[VideoCategory]) -> Self {
        let ids: HashMap<String, i64> = persisted
            .iter()
            .map(|category| (category.name.to_lowercase(), category.id))
            .collect();

        let mut resolver = Self {
            exact: persisted
                .iter()
                .map(|category| (category.name.to_lowercase(), category.id))
                .collect(),
            ..Self::default()
        };

        for rule in &table.categories {
            let Some(&id) = ids.get(&rule.name.to_lowercase()) else {
                continue;
            };

            for keyword in &rule.keywords {
                resolver.exact.push((keyword.to_lowercase(), id));
                resolver.patterns.push((keyword.to_lowercase(), id));
            }
            for keyword in &rule.fallback_keywords {
                resolver.fallbacks.push((keyword.to_lowercase(), id));
            }
        }

        resolver
    }

    pub fn resolve(&self, title: &str) -> Option<i64> {
        let title = title.to_lowercase();

        self.exact
            .iter()
            .find(|(pattern, _)| *pattern == title)
            .or_else(|| self.patterns.iter().find(|(pattern, _)| title.contains(pattern)))
            .or_else(|| self.fallbacks.iter().find(|(pattern, _)| title.contains(pattern)))
            .map(|(_, id)| *id)
            .or_else(|| self.next.as_ref().and_then(|next| next.resolve(&title)))
    }
}
