//! Schema validation at the backend boundary.
//!
//! The remote endpoints are edge functions whose response shapes drifted
//! over time: lists arrive bare or wrapped, fields moved between camelCase
//! and snake_case, and some fields have legacy aliases. All of that is
//! resolved here, once, into typed records or a `DecodeError`. Nothing
//! outside this module guesses at response shapes.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::feed::{FeedMedia, FeedPage, Geo, MediaKind};
use crate::types::{
    Article, PhotoJournal, Poem, Project, ProjectLink, UseItem, UsesCategory,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("expected an array or an object wrapping one of {expected:?}")]
    NotAList { expected: &'static [&'static str] },
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Unwrap a list response: either a bare array or an object carrying the
/// array under one of the known wrapper keys.
pub fn list_items<'a>(
    value: &'a Value,
    wrappers: &'static [&'static str],
) -> Result<&'a [Value], DecodeError> {
    if let Some(arr) = value.as_array() {
        return Ok(arr);
    }
    if let Some(obj) = value.as_object() {
        for key in wrappers {
            if let Some(arr) = obj.get(*key).and_then(Value::as_array) {
                return Ok(arr);
            }
        }
    }
    Err(DecodeError::NotAList { expected: wrappers })
}

/// Unwrap a single-item response: `{ "article": {...} }` or the bare object.
pub fn unwrap_item<'a>(value: &'a Value, wrappers: &[&str]) -> Result<&'a Value, DecodeError> {
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;
    for key in wrappers {
        if let Some(inner) = obj.get(*key) {
            if inner.is_object() {
                return Ok(inner);
            }
        }
    }
    Ok(value)
}

fn str_field(value: &Value, field: &'static str) -> Result<String, DecodeError> {
    match value.get(field) {
        None | Some(Value::Null) => Err(DecodeError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(DecodeError::InvalidField {
            field,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn opt_str(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

fn first_opt_str(value: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| opt_str(value, f))
}

fn opt_f64(value: &Value, field: &str) -> Option<f64> {
    value.get(field).and_then(Value::as_f64)
}

fn opt_bool(value: &Value, field: &str) -> Option<bool> {
    value.get(field).and_then(Value::as_bool)
}

/// Dates arrive as `YYYY-MM-DD` or full ISO timestamps; only the day part
/// matters for ordering and display.
fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, DecodeError> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|e| DecodeError::InvalidField {
        field,
        reason: format!("{raw:?}: {e}"),
    })
}

fn date_field(value: &Value, fields: &'static [&'static str]) -> Result<NaiveDate, DecodeError> {
    for f in fields {
        if let Some(s) = opt_str(value, f) {
            return parse_date(fields[0], &s);
        }
    }
    Err(DecodeError::MissingField(fields[0]))
}

// --- feed ---

pub fn feed_media(value: &Value) -> Result<FeedMedia, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    let id = match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(DecodeError::MissingField("id")),
    };
    let kind = match opt_str(value, "type").as_deref() {
        Some("video") => MediaKind::Video,
        _ => MediaKind::Image,
    };
    Ok(FeedMedia {
        id,
        src: str_field(value, "src")?,
        alt: opt_str(value, "alt").unwrap_or_default(),
        kind,
        poster: first_opt_str(value, &["thumbnail", "poster"]),
        photo_date: date_field(value, &["photo_date", "photoDate", "created_at"])?,
        location: opt_str(value, "location"),
        geo: Geo {
            city: opt_str(value, "city"),
            state: opt_str(value, "state"),
            country: opt_str(value, "country"),
            latitude: opt_f64(value, "latitude"),
            longitude: opt_f64(value, "longitude"),
        },
    })
}

/// Decode a feed page response: `{ data, hasMore }` or a bare array. When
/// the continuation flag is absent it is derived from the page being full.
pub fn feed_page(value: &Value, limit: usize) -> Result<FeedPage, DecodeError> {
    let (items, has_more): (&[Value], Option<bool>) = match value {
        Value::Array(arr) => (arr, None),
        Value::Object(obj) => {
            let data = obj
                .get("data")
                .and_then(Value::as_array)
                .ok_or(DecodeError::MissingField("data"))?;
            (data, obj.get("hasMore").and_then(Value::as_bool))
        }
        _ => return Err(DecodeError::NotAList { expected: &["data"] }),
    };
    let data: Vec<FeedMedia> = items.iter().map(feed_media).collect::<Result<_, _>>()?;
    let has_more = has_more.unwrap_or(data.len() == limit);
    Ok(FeedPage { data, has_more })
}

// --- content records ---

pub fn article(value: &Value) -> Result<Article, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    Ok(Article {
        slug: str_field(value, "slug")?,
        title: str_field(value, "title")?,
        description: first_opt_str(value, &["description", "excerpt"]).unwrap_or_default(),
        author: opt_str(value, "author").unwrap_or_default(),
        date: date_field(value, &["date"])?,
        published: opt_bool(value, "published"),
        content: None,
    })
}

pub fn poem(value: &Value) -> Result<Poem, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    Ok(Poem {
        slug: str_field(value, "slug")?,
        title: str_field(value, "title")?,
        description: first_opt_str(value, &["description", "excerpt"]).unwrap_or_default(),
        author: opt_str(value, "author"),
        date: date_field(value, &["date"])?,
        published: opt_bool(value, "published"),
        form: opt_str(value, "form"),
        content: None,
    })
}

pub fn photo_journal(value: &Value) -> Result<PhotoJournal, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    let trip_date = first_opt_str(value, &["tripDate", "trip_date"])
        .map(|s| parse_date("tripDate", &s))
        .transpose()?;
    Ok(PhotoJournal {
        slug: str_field(value, "slug")?,
        title: str_field(value, "title")?,
        description: first_opt_str(value, &["description", "excerpt"]).unwrap_or_default(),
        author: opt_str(value, "author"),
        date: date_field(value, &["date", "tripDate", "trip_date"])?,
        trip_date,
        section: opt_str(value, "section").unwrap_or_else(|| "Other".to_string()),
        published: opt_bool(value, "published"),
        content: None,
    })
}

pub fn project(value: &Value) -> Result<Project, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    let name = str_field(value, "name")?;
    let nested = value.get("link").filter(|l| l.is_object());
    let href = opt_str(value, "link_href")
        .or_else(|| nested.and_then(|l| opt_str(l, "href")))
        .unwrap_or_else(|| "#".to_string());
    let label = opt_str(value, "link_label")
        .or_else(|| nested.and_then(|l| opt_str(l, "label")))
        .unwrap_or_else(|| name.clone());
    Ok(Project {
        id: opt_str(value, "id"),
        slug: str_field(value, "slug")?,
        description: opt_str(value, "description").unwrap_or_default(),
        link: ProjectLink { href, label },
        logo_url: first_opt_str(value, &["featured_image", "featuredImage", "logo_url"]),
        name,
    })
}

fn use_item(value: &Value) -> Result<UseItem, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    let href = first_opt_str(value, &["href", "url"])
        .or_else(|| match value.get("link") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(link @ Value::Object(_)) => opt_str(link, "href"),
            _ => None,
        });
    Ok(UseItem {
        title: first_opt_str(value, &["title", "name"]).ok_or(DecodeError::MissingField("title"))?,
        href,
        description: first_opt_str(value, &["description", "body", "content"]).unwrap_or_default(),
    })
}

fn uses_category(value: &Value) -> Result<UsesCategory, DecodeError> {
    let title =
        first_opt_str(value, &["title", "name"]).ok_or(DecodeError::MissingField("title"))?;
    let tools = ["tools", "items", "uses"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_array))
        .map(|arr| arr.iter().map(use_item).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();
    Ok(UsesCategory { title, tools })
}

/// The uses endpoint has two historical shapes: an object keyed by section
/// name whose values are item arrays, or a wrapped list of categories.
pub fn uses_categories(value: &Value) -> Result<Vec<UsesCategory>, DecodeError> {
    const WRAPPERS: &[&str] = &["categories", "data", "items"];
    if let Some(obj) = value.as_object() {
        if !WRAPPERS.iter().any(|k| obj.contains_key(*k)) {
            return obj
                .iter()
                .map(|(title, raw)| {
                    let tools = raw
                        .as_array()
                        .map(|arr| arr.iter().map(use_item).collect::<Result<Vec<_>, _>>())
                        .transpose()?
                        .unwrap_or_default();
                    Ok(UsesCategory { title: title.clone(), tools })
                })
                .collect();
        }
    }
    list_items(value, &["categories", "data", "items"])?
        .iter()
        .map(uses_category)
        .collect()
}

/// Body text of a single-item response, empty when the backend omits it.
pub fn content_body(value: &Value) -> String {
    opt_str(value, "content").unwrap_or_default()
}
