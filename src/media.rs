//! Slide projection and video playback routing for the lightbox.

use chrono::NaiveDate;
use serde::Serialize;

use crate::feed::{FeedMedia, MediaKind};

/// How a video source should be played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPath {
    /// The element can play the source natively.
    Native,
    /// The source is an adaptive-bitrate manifest and needs a decoder attached.
    Hls,
}

/// HLS manifests are recognized by extension or by known streaming hosts.
pub fn is_hls_url(src: &str) -> bool {
    src.ends_with(".m3u8") || src.contains("cloudflarestream.com") || src.contains("/manifest/")
}

pub fn playback_path(src: &str) -> PlaybackPath {
    if is_hls_url(src) {
        PlaybackPath::Hls
    } else {
        PlaybackPath::Native
    }
}

/// MIME type for a video source, by extension. Query strings are ignored.
pub fn video_mime(src: &str) -> &'static str {
    if is_hls_url(src) {
        return "application/vnd.apple.mpegurl";
    }
    let ext = src
        .rsplit('.')
        .next()
        .map(|e| e.split('?').next().unwrap_or(e))
        .unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "mov" => "video/mp4", // browsers treat mov as mp4
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",
        _ => "video/mp4",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSource {
    pub src: String,
    pub mime: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum SlideSource {
    Image {
        src: String,
    },
    Video {
        sources: Vec<VideoSource>,
        #[serde(skip_serializing_if = "Option::is_none")]
        poster: Option<String>,
    },
}

/// Display-only projection of a feed entry: a source set plus caption.
/// Recomputed from the visible filtered list, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    #[serde(flatten)]
    pub source: SlideSource,
    pub caption: String,
}

impl Slide {
    pub fn src(&self) -> &str {
        match &self.source {
            SlideSource::Image { src } => src,
            SlideSource::Video { sources, .. } => {
                sources.first().map(|s| s.src.as_str()).unwrap_or("")
            }
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self.source, SlideSource::Video { .. })
    }
}

/// Free-text location if present, else "city, state, country" from geography.
pub fn display_location(item: &FeedMedia) -> Option<String> {
    if let Some(loc) = &item.location {
        let loc = loc.trim();
        if !loc.is_empty() {
            return Some(loc.to_string());
        }
    }
    let parts: Vec<&str> = [&item.geo.city, &item.geo.state, &item.geo.country]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

pub fn format_photo_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Caption shown under a slide: location, date and alt text joined with " · ".
pub fn caption(item: &FeedMedia) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(loc) = display_location(item) {
        parts.push(loc);
    }
    parts.push(format_photo_date(item.photo_date));
    if !item.alt.is_empty() {
        parts.push(item.alt.clone());
    }
    parts.join(" · ")
}

pub fn slide(item: &FeedMedia) -> Slide {
    let source = match item.kind {
        MediaKind::Video => SlideSource::Video {
            sources: vec![VideoSource { src: item.src.clone(), mime: video_mime(&item.src) }],
            poster: item.poster.clone(),
        },
        MediaKind::Image => SlideSource::Image { src: item.src.clone() },
    };
    Slide { source, caption: caption(item) }
}

pub fn build_slides(media: &[FeedMedia]) -> Vec<Slide> {
    media.iter().map(slide).collect()
}
