use serde::{Deserialize, Serialize};

/// Maximum characters of a title shown on a list card.
pub const TITLE_MAX_CHARS: usize = 26;

/// A counter as sent by the server: either a number or text it already
/// formatted (e.g. "1k").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(u64),
    Text(String),
}

impl Default for Count {
    fn default() -> Self {
        Count::Number(0)
    }
}

impl std::fmt::Display for Count {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Count::Number(n) => f.write_str(&format_count(*n)),
            Count::Text(s) => match s.trim().parse::<u64>() {
                Ok(n) => f.write_str(&format_count(n)),
                Err(_) => f.write_str(s),
            },
        }
    }
}

/// One entry of the post listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub post_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author_nickname: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub views: Count,
    #[serde(default)]
    pub likes: Count,
    #[serde(default)]
    pub comments_count: Count,
    #[serde(default)]
    pub summary: Option<String>,
}

impl PostSummary {
    pub fn display_title(&self) -> &str {
        truncate_title(&self.title)
    }

    /// "likes · comments · views" line of a card.
    pub fn meta_line(&self) -> String {
        format!(
            "Likes {} · Comments {} · Views {}",
            self.likes, self.comments_count, self.views
        )
    }
}

/// Compact counter: 100k and 10k are caps, thousands are rounded.
pub fn format_count(value: u64) -> String {
    if value >= 100_000 {
        "100k".to_string()
    } else if value >= 10_000 {
        "10k".to_string()
    } else if value >= 1_000 {
        format!("{}k", (value + 500) / 1_000)
    } else {
        value.to_string()
    }
}

pub fn truncate_title(title: &str) -> &str {
    match title.char_indices().nth(TITLE_MAX_CHARS) {
        Some((idx, _)) => &title[..idx],
        None => title,
    }
}
