use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

static PARAGRAPH_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<p(\s[^>]*)?>").expect("valid regex"));
static PARAGRAPH_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</p\s*>").expect("valid regex"));

/// A post as returned by the kemono creator feed. Every field is optional and
/// tolerates the wrong JSON type by reading as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KemonoPost {
    #[serde(default, deserialize_with = "string_like")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub added: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub published: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub service: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub file: Option<KemonoFile>,
    #[serde(default, deserialize_with = "lenient")]
    pub embed: Option<KemonoEmbed>,
    #[serde(default)]
    pub tags: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KemonoFile {
    #[serde(default, deserialize_with = "string_like")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KemonoEmbed {
    #[serde(default, deserialize_with = "string_like")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub description: Option<String>,
}

impl KemonoPost {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

fn string_like<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    Direct,
    Embed,
}

impl VideoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoType::Direct => "direct",
            VideoType::Embed => "embed",
        }
    }
}

/// The local shape of a remote post, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedVideo {
    pub title: String,
    pub creator: Option<String>,
    pub url: String,
    pub description: String,
    pub upload_date: Option<NaiveDateTime>,
    pub video_type: VideoType,
    pub key_points: String,
    pub kemono_id: Option<String>,
    pub service: Option<String>,
    pub creator_id: Option<String>,
    pub added_date: Option<NaiveDateTime>,
    pub published_date: Option<NaiveDateTime>,
    pub tags: Vec<String>,
}

impl NormalizedVideo {
    /// Posts with neither a playable file nor an embed are never persisted.
    pub fn is_skippable(&self) -> bool {
        self.url.is_empty()
    }
}

pub fn normalize(post: &KemonoPost, file_base_url: &str) -> NormalizedVideo {
    let file_path = post
        .file
        .as_ref()
        .and_then(|f| f.path.as_deref())
        .filter(|path| path.ends_with(".mp4"));

    let embed_url = post
        .embed
        .as_ref()
        .and_then(|e| e.url.as_deref())
        .filter(|url| !url.is_empty());

    let (url, video_type, description) = match (file_path, embed_url) {
        (Some(path), _) => (join_file_url(file_base_url, path), VideoType::Direct, String::new()),
        (None, Some(url)) => (
            url.to_string(),
            VideoType::Embed,
            post.embed
                .as_ref()
                .and_then(|e| e.description.clone())
                .unwrap_or_default(),
        ),
        (None, None) => (String::new(), VideoType::Embed, String::new()),
    };

    let published_date = post.published.as_deref().and_then(parse_remote_timestamp);

    NormalizedVideo {
        title: post.title().to_string(),
        creator: post.user.clone(),
        url,
        description,
        upload_date: published_date,
        video_type,
        key_points: strip_paragraphs(post.content.as_deref().unwrap_or_default()),
        kemono_id: post.id.clone(),
        service: post.service.clone(),
        creator_id: post.user.clone(),
        added_date: post.added.as_deref().and_then(parse_remote_timestamp),
        published_date,
        tags: post.tags.as_ref().map(parse_tags).unwrap_or_default(),
    }
}

fn join_file_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

pub fn strip_paragraphs(content: &str) -> String {
    let without_open = PARAGRAPH_OPEN.replace_all(content, "");
    PARAGRAPH_CLOSE
        .replace_all(&without_open, "\n")
        .trim()
        .to_string()
}

/// Accepts RFC 3339 and naive ISO-8601 timestamps, read as UTC.
pub fn parse_remote_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Reads tags from any of the shapes the feed has used over time.
pub fn parse_tags(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Value::String(tag) => tag.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(text) => parse_tag_text(text),
        _ => Vec::new(),
    }
}

/// `"{a,'b',\"c\"}"` -> `[a, b, c]`; any other non-empty text is one tag.
pub fn parse_tag_text(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let Some(inner) = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return vec![trimmed.to_string()];
    };

    inner
        .split(',')
        .map(|element| unquote(element.trim()).trim().to_string())
        .filter(|element| !element.is_empty())
        .collect()
}

fn unquote(element: &str) -> &str {
    for quote in ['"', '\''] {
        if element.len() >= 2 && element.starts_with(quote) && element.ends_with(quote) {
            return &element[1..element.len() - 1];
        }
    }
    element
}

/// Decodes the `tags` column. Rows written by older importers may hold a bare
/// string or a brace literal instead of a JSON array.
pub fn decode_stored_tags(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Array(_) | Value::String(_))) => parse_tags(&value),
        Ok(Value::Null) => Vec::new(),
        _ => parse_tag_text(raw),
    }
}

pub fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}
