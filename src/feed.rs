use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default page size for feed requests when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 24;
/// Hard ceiling on the effective page size, regardless of caller input.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Lenient parse: anything that is not "asc" means newest-first.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Structured geography attached to a feed entry. All fields nullable upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// One entry of the photo/video feed. `kind` alone decides the rendering
/// path; `poster` is only meaningful for videos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMedia {
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    /// Date used for feed sorting and placement.
    pub photo_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub geo: Geo,
}

/// One fetch result: a window of the feed plus a continuation flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub data: Vec<FeedMedia>,
    pub has_more: bool,
}

impl FeedPage {
    /// The degraded result for a failed fetch: nothing, and no more pages.
    pub fn empty() -> Self {
        FeedPage { data: Vec::new(), has_more: false }
    }

    /// A full page implies more items may exist; a short page is the last one.
    pub fn from_items(data: Vec<FeedMedia>, limit: usize) -> Self {
        let has_more = data.len() == limit;
        FeedPage { data, has_more }
    }
}

pub fn clamp_limit(limit: i64) -> usize {
    limit.clamp(1, MAX_PAGE_SIZE as i64) as usize
}

pub fn clamp_offset(offset: i64) -> usize {
    offset.max(0) as usize
}
