//! Client-side state of the photos page, kept pure so it can be driven
//! headlessly: the feed view (infinite scroll, search, sort toggling) and
//! the lightbox overlay.
//!
//! The view never performs I/O. It hands out `FetchPlan`s describing the
//! page to request next; the driver executes a plan against the fetcher
//! and feeds the resulting page back through `complete`. Tokens carry a
//! generation so a page requested under a previous sort order is dropped
//! when it resolves late.

use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::feed::{FeedMedia, FeedPage, SortOrder, DEFAULT_PAGE_SIZE};
use crate::media::{self, PlaybackPath, Slide, SlideSource};

/// Identifies one issued fetch. `generation` changes on sort-order flips,
/// `serial` distinguishes successive fetches within a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken {
    generation: u64,
    serial: u64,
}

/// One page request the driver should execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    pub order: SortOrder,
    pub limit: usize,
    pub offset: usize,
    pub token: FetchToken,
}

#[derive(Debug)]
pub struct FeedView {
    items: Vec<FeedMedia>,
    order: SortOrder,
    query: String,
    has_more: bool,
    page_size: usize,
    generation: u64,
    next_serial: u64,
    in_flight: Option<FetchToken>,
    replace_on_complete: bool,
}

impl FeedView {
    /// Starts in the loaded state with a server-rendered initial page.
    pub fn new(order: SortOrder, initial: FeedPage) -> Self {
        Self::with_page_size(order, initial, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(order: SortOrder, initial: FeedPage, page_size: usize) -> Self {
        FeedView {
            items: initial.data,
            order,
            query: String::new(),
            has_more: initial.has_more,
            page_size,
            generation: 0,
            next_serial: 0,
            in_flight: None,
            replace_on_complete: false,
        }
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// The full loaded list, unaffected by the search query.
    pub fn items(&self) -> &[FeedMedia] {
        &self.items
    }

    fn issue_token(&mut self) -> FetchToken {
        let token = FetchToken { generation: self.generation, serial: self.next_serial };
        self.next_serial += 1;
        self.in_flight = Some(token);
        token
    }

    /// Switch sort order. The accumulated list is flushed and a fetch for
    /// the new order's first page is planned; returns `None` when the
    /// order is unchanged.
    pub fn set_order(&mut self, order: SortOrder) -> Option<FetchPlan> {
        if order == self.order {
            return None;
        }
        self.order = order;
        self.items.clear();
        self.has_more = false;
        self.generation += 1;
        self.replace_on_complete = true;
        let token = self.issue_token();
        Some(FetchPlan { order, limit: self.page_size, offset: 0, token })
    }

    pub fn toggle_order(&mut self) -> Option<FetchPlan> {
        self.set_order(self.order.toggled())
    }

    /// The scroll sentinel became visible. Plans the next page unless a
    /// fetch is already in flight or the feed is exhausted.
    pub fn notice_sentinel(&mut self) -> Option<FetchPlan> {
        if self.in_flight.is_some() || !self.has_more {
            return None;
        }
        let order = self.order;
        let offset = self.items.len();
        let token = self.issue_token();
        Some(FetchPlan { order, limit: self.page_size, offset, token })
    }

    /// A planned fetch resolved. Completions whose token is not the one
    /// currently in flight (a later sort flip superseded them, or a
    /// duplicate delivery) are dropped.
    pub fn complete(&mut self, token: FetchToken, page: FeedPage) {
        if self.in_flight != Some(token) {
            debug!(?token, "dropping stale fetch completion");
            return;
        }
        self.in_flight = None;
        if self.replace_on_complete {
            self.replace_on_complete = false;
            self.items = page.data;
        } else {
            self.items.extend(page.data);
        }
        self.has_more = page.has_more;
    }

    // --- search ---

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The loaded list narrowed by the search query: case-insensitive,
    /// diacritic-normalized substring match on each item's caption text.
    /// Pure and non-destructive; the underlying list is untouched.
    pub fn visible(&self) -> Vec<&FeedMedia> {
        let needle = normalize_search(self.query.trim());
        if needle.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|item| normalize_search(&media::caption(item)).contains(&needle))
            .collect()
    }

    /// Lightbox slides for the visible filtered set.
    pub fn slides(&self) -> Vec<Slide> {
        self.visible().into_iter().map(media::slide).collect()
    }
}

/// Lowercase and strip combining marks, so "São Paulo" matches "sao".
fn normalize_search(s: &str) -> String {
    s.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// A decoder attached to an HLS video element. Dropping it releases the
/// decoder; the lightbox guarantees the previous session is dropped before
/// the next slide attaches one.
#[derive(Debug)]
pub struct HlsSession {
    src: String,
}

impl HlsSession {
    fn attach(src: &str) -> Self {
        debug!(src, "attaching hls decoder");
        HlsSession { src: src.to_string() }
    }

    pub fn src(&self) -> &str {
        &self.src
    }
}

impl Drop for HlsSession {
    fn drop(&mut self) {
        debug!(src = %self.src, "detaching hls decoder");
    }
}

/// Full-screen slide viewer over the current filtered slide list.
#[derive(Debug, Default)]
pub struct Lightbox {
    slides: Vec<Slide>,
    index: usize,
    open: bool,
    hls: Option<HlsSession>,
}

impl Lightbox {
    pub fn new(slides: Vec<Slide>) -> Self {
        Lightbox { slides, index: 0, open: false, hls: None }
    }

    /// Replace the slide list (the filtered set changed). The index is
    /// clamped and the decoder attachment re-synced.
    pub fn set_slides(&mut self, slides: Vec<Slide>) {
        self.slides = slides;
        if self.slides.is_empty() {
            self.index = 0;
            self.open = false;
        } else if self.index >= self.slides.len() {
            self.index = self.slides.len() - 1;
        }
        self.sync_attachment();
    }

    pub fn open_at(&mut self, index: usize) {
        if self.slides.is_empty() {
            return;
        }
        self.index = index.min(self.slides.len() - 1);
        self.open = true;
        self.sync_attachment();
    }

    pub fn close(&mut self) {
        self.open = false;
        // Stop the decoder before the element goes away.
        self.hls = None;
    }

    pub fn next(&mut self) {
        if self.open && self.index + 1 < self.slides.len() {
            self.index += 1;
            self.sync_attachment();
        }
    }

    pub fn prev(&mut self) {
        if self.open && self.index > 0 {
            self.index -= 1;
            self.sync_attachment();
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&Slide> {
        if self.open {
            self.slides.get(self.index)
        } else {
            None
        }
    }

    pub fn hls_attached(&self) -> bool {
        self.hls.is_some()
    }

    /// Detach the previous slide's decoder, then attach one if the current
    /// slide is an HLS video.
    fn sync_attachment(&mut self) {
        self.hls = None;
        if !self.open {
            return;
        }
        let src = match self.slides.get(self.index).map(|s| &s.source) {
            Some(SlideSource::Video { sources, .. }) => {
                sources.first().map(|s| s.src.clone())
            }
            _ => None,
        };
        if let Some(src) = src {
            if media::playback_path(&src) == PlaybackPath::Hls {
                self.hls = Some(HlsSession::attach(&src));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::feed::{Geo, MediaKind};

    fn media(id: &str, alt: &str) -> FeedMedia {
        FeedMedia {
            id: id.to_string(),
            src: format!("https://cdn.example.com/{id}.jpg"),
            alt: alt.to_string(),
            kind: MediaKind::Image,
            poster: None,
            photo_date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            location: None,
            geo: Geo::default(),
        }
    }

    fn video(id: &str, src: &str) -> FeedMedia {
        FeedMedia {
            id: id.to_string(),
            src: src.to_string(),
            alt: String::new(),
            kind: MediaKind::Video,
            poster: None,
            photo_date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            location: None,
            geo: Geo::default(),
        }
    }

    fn page(ids: &[&str], has_more: bool) -> FeedPage {
        FeedPage { data: ids.iter().map(|id| media(id, "")).collect(), has_more }
    }

    #[test]
    fn starts_loaded_with_initial_page() {
        let view = FeedView::new(SortOrder::Desc, page(&["a", "b"], true));
        assert!(!view.is_loading());
        assert_eq!(view.items().len(), 2);
        assert!(view.has_more());
    }

    #[test]
    fn sentinel_plans_next_page_at_current_length() {
        let mut view = FeedView::with_page_size(SortOrder::Desc, page(&["a", "b"], true), 2);
        let plan = view.notice_sentinel().expect("plan");
        assert_eq!(plan.offset, 2);
        assert_eq!(plan.limit, 2);
        assert_eq!(plan.order, SortOrder::Desc);
        assert!(view.is_loading());
    }

    #[test]
    fn in_flight_fetch_suppresses_further_plans() {
        let mut view = FeedView::with_page_size(SortOrder::Desc, page(&["a"], true), 1);
        let plan = view.notice_sentinel().expect("plan");
        assert!(view.notice_sentinel().is_none());
        view.complete(plan.token, page(&["b"], true));
        assert!(view.notice_sentinel().is_some());
    }

    #[test]
    fn exhausted_feed_plans_nothing() {
        let mut view = FeedView::new(SortOrder::Desc, page(&["a"], false));
        assert!(view.notice_sentinel().is_none());
    }

    #[test]
    fn completion_appends_and_updates_continuation() {
        let mut view = FeedView::with_page_size(SortOrder::Desc, page(&["a", "b"], true), 2);
        let plan = view.notice_sentinel().unwrap();
        view.complete(plan.token, page(&["c"], false));
        assert!(!view.is_loading());
        assert_eq!(view.items().len(), 3);
        assert!(!view.has_more());
    }

    #[test]
    fn sort_change_flushes_and_replaces_with_fresh_page() {
        let mut view = FeedView::with_page_size(SortOrder::Desc, page(&["a", "b"], true), 2);
        let plan = view.set_order(SortOrder::Asc).expect("plan");
        assert_eq!(plan.offset, 0);
        assert!(view.items().is_empty());
        assert!(view.is_loading());

        view.complete(plan.token, page(&["x", "y"], true));
        let ids: Vec<&str> = view.items().iter().map(|m| m.id.as_str()).collect();
        // Nothing from the previous order remains mixed in.
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn unchanged_order_is_a_no_op() {
        let mut view = FeedView::new(SortOrder::Desc, page(&["a"], true));
        assert!(view.set_order(SortOrder::Desc).is_none());
        assert_eq!(view.items().len(), 1);
    }

    #[test]
    fn stale_completion_from_previous_order_is_dropped() {
        let mut view = FeedView::with_page_size(SortOrder::Desc, page(&["a"], true), 1);
        let stale = view.notice_sentinel().unwrap();
        // Sort flips while the page fetch is still in flight.
        let fresh = view.set_order(SortOrder::Asc).unwrap();
        view.complete(stale.token, page(&["late"], true));
        assert!(view.items().is_empty());
        assert!(view.is_loading());

        view.complete(fresh.token, page(&["z"], false));
        let ids: Vec<&str> = view.items().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["z"]);
    }

    #[test]
    fn duplicate_completion_is_dropped() {
        let mut view = FeedView::with_page_size(SortOrder::Desc, page(&["a"], true), 1);
        let plan = view.notice_sentinel().unwrap();
        view.complete(plan.token, page(&["b"], true));
        view.complete(plan.token, page(&["b"], true));
        assert_eq!(view.items().len(), 2);
    }

    #[test]
    fn search_narrows_without_mutating_and_clearing_restores() {
        let mut view = FeedView::new(
            SortOrder::Desc,
            FeedPage {
                data: vec![media("1", "Sunset"), media("2", "São Paulo"), media("3", "harbor")],
                has_more: false,
            },
        );
        let before: Vec<String> = view.items().iter().map(|m| m.id.clone()).collect();

        view.set_query("sao");
        let ids: Vec<&str> = view.visible().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["2"]);

        // Repeated application is idempotent.
        view.set_query("sao");
        assert_eq!(view.visible().len(), 1);

        view.clear_query();
        let after: Vec<String> = view.items().iter().map(|m| m.id.clone()).collect();
        assert_eq!(before, after);
        assert_eq!(view.visible().len(), 3);
    }

    #[test]
    fn search_is_case_insensitive_on_captions() {
        let mut item = media("1", "Sunset");
        item.location = Some("Lisboa".into());
        let mut view =
            FeedView::new(SortOrder::Desc, FeedPage { data: vec![item], has_more: false });
        view.set_query("LISBOA");
        assert_eq!(view.visible().len(), 1);
        view.set_query("nowhere");
        assert!(view.visible().is_empty());
    }

    #[test]
    fn hls_slide_attaches_decoder_and_mp4_does_not() {
        let slides = media::build_slides(&[
            video("v1", "https://stream.example.com/a.m3u8"),
            video("v2", "https://cdn.example.com/b.mp4"),
        ]);
        let mut lb = Lightbox::new(slides);
        lb.open_at(0);
        assert!(lb.hls_attached());
        lb.next();
        assert!(!lb.hls_attached());
    }

    #[test]
    fn closing_detaches_decoder() {
        let slides = media::build_slides(&[video("v1", "https://h/a.m3u8")]);
        let mut lb = Lightbox::new(slides);
        lb.open_at(0);
        assert!(lb.hls_attached());
        lb.close();
        assert!(!lb.hls_attached());
        assert!(lb.current().is_none());
    }

    #[test]
    fn navigation_is_clamped() {
        let slides = media::build_slides(&[media("1", ""), media("2", "")]);
        let mut lb = Lightbox::new(slides);
        lb.open_at(5);
        assert_eq!(lb.index(), 1);
        lb.next();
        assert_eq!(lb.index(), 1);
        lb.prev();
        lb.prev();
        assert_eq!(lb.index(), 0);
    }

    #[test]
    fn shrinking_slide_list_clamps_index() {
        let slides = media::build_slides(&[media("1", ""), media("2", ""), media("3", "")]);
        let mut lb = Lightbox::new(slides);
        lb.open_at(2);
        lb.set_slides(media::build_slides(&[media("1", "")]));
        assert_eq!(lb.index(), 0);
        lb.set_slides(Vec::new());
        assert!(!lb.is_open());
    }
}
