// src/models/post.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PostCategory {
    LatestUpdates,
    News,
    Advertisement,
}

impl PostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::LatestUpdates => "latest_updates",
            PostCategory::News => "news",
            PostCategory::Advertisement => "advertisement",
        }
    }
}

impl fmt::Display for PostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest_updates" => Ok(PostCategory::LatestUpdates),
            "news" => Ok(PostCategory::News),
            "advertisement" => Ok(PostCategory::Advertisement),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostFile {
    pub url: String,
    #[serde(rename = "type", default = "unknown_file_type")]
    pub kind: String,
}

fn unknown_file_type() -> String {
    "unknown".to_string()
}

// Post como está no armazenamento. A categoria fica como texto porque
// dados antigos podem ter valores fora do enum; quem decide é o feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub category: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub files: Vec<PostFile>,
    pub hyperlink: String,
    pub packages: Vec<i64>,
    pub posted_by: Option<String>,
}

impl Post {
    pub fn parsed_category(&self) -> Result<PostCategory, String> {
        self.category.parse()
    }
}

// Dados para criar um post (o timestamp é do armazenamento)
#[derive(Debug, Clone)]
pub struct NewPost {
    pub category: PostCategory,
    pub description: String,
    pub files: Vec<PostFile>,
    pub hyperlink: String,
    pub packages: Vec<i64>,
    pub posted_by: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub category: PostCategory,
    pub description: String,
    pub files: Vec<PostFile>,
    pub hyperlink: String,
    pub packages: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AllFolders {
    #[serde(rename = "all")]
    All,
}

// Público-alvo de um post: `"all"` ou uma lista explícita de pastas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PostTargets {
    All(AllFolders),
    Folders(Vec<i64>),
}

// Filtro de visibilidade empurrado para o armazenamento
#[derive(Debug, Clone, PartialEq)]
pub enum PostQuery {
    All,
    /// Posts cujo `packages` tem interseção com estas pastas.
    AnyOfFolders(Vec<i64>),
}

// Filtros do feed vindos da query string (?from=2025-01-01&to=2025-01-31&q=promo)
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedFilter {
    /// Data inicial (inclusiva), no fuso do feed.
    pub from: Option<NaiveDate>,
    /// Data final (inclusiva até 23:59:59.999), no fuso do feed.
    pub to: Option<NaiveDate>,
    /// Texto procurado na descrição, sem diferenciar maiúsculas.
    pub q: Option<String>,
}

// Os três baldes do feed, sempre em ordem de timestamp decrescente
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedBuckets {
    pub latest_updates: Vec<Post>,
    pub news: Vec<Post>,
    pub advertisements: Vec<Post>,
}

impl FeedBuckets {
    pub fn is_empty(&self) -> bool {
        self.latest_updates.is_empty() && self.news.is_empty() && self.advertisements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.latest_updates.len() + self.news.len() + self.advertisements.len()
    }

    pub fn bucket_mut(&mut self, category: PostCategory) -> &mut Vec<Post> {
        match category {
            PostCategory::LatestUpdates => &mut self.latest_updates,
            PostCategory::News => &mut self.news,
            PostCategory::Advertisement => &mut self.advertisements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_round_trip_through_their_wire_names() {
        for category in [
            PostCategory::LatestUpdates,
            PostCategory::News,
            PostCategory::Advertisement,
        ] {
            assert_eq!(category.as_str().parse::<PostCategory>(), Ok(category));
        }
        assert_eq!(
            "unknown_value".parse::<PostCategory>(),
            Err("unknown_value".to_string())
        );
    }

    #[test]
    fn file_type_defaults_to_unknown() {
        let file: PostFile = serde_json::from_str(r#"{"url":"https://cdn/x.png"}"#).unwrap();
        assert_eq!(file.kind, "unknown");
    }

    #[test]
    fn targets_accept_all_or_an_explicit_list() {
        let all: PostTargets = serde_json::from_str(r#""all""#).unwrap();
        assert_eq!(all, PostTargets::All(AllFolders::All));

        let some: PostTargets = serde_json::from_str("[1, 4]").unwrap();
        assert_eq!(some, PostTargets::Folders(vec![1, 4]));

        assert!(serde_json::from_str::<PostTargets>(r#""some""#).is_err());
    }
}
