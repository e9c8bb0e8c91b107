//! Layered, best-effort discovery of the page's video element.
//!
//! Order: cache, site selectors, site strategy, player containers, shadow
//! trees, same-origin frames, full tree scan. The first hit is cached and
//! served until the observer replaces it; the cache is never invalidated, so a
//! handle can outlive its element if the page tears the player down.

mod observer;
mod search;
mod sites;

pub use observer::{classify_insertion, Insertion, PLAYER_CONTAINER_CLASSES};
pub use search::{find_in_frames, find_in_shadow_roots, first_video};
pub use sites::{
    LocateStrategy, PlayerPropertyVideo, ScriptedPlayerVideo, SiteProfile, VueComponentVideo,
    GENERIC_PROFILE, SITE_PROFILES,
};

use std::fmt;

use serde::Serialize;

use crate::dom::{Expando, NodeRef, Page, PlayerId};

/// Selector for elements that may carry a third-party player instance (`el.art`).
pub const PLAYER_CONTAINER_SELECTOR: &str = ".artplayer-app, [class*=\"artplayer\"]";

/// Located video plus the player control surface found with it, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoHandle {
    pub video: NodeRef,
    pub surface: Option<PlayerId>,
}

impl VideoHandle {
    pub fn new(video: NodeRef) -> Self {
        Self {
            video,
            surface: None,
        }
    }
}

/// Which step of the search produced a handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "detail", rename_all = "snake_case")]
pub enum LocateStep {
    Cache,
    Selector(String),
    SiteStrategy,
    PlayerContainer,
    ShadowDom,
    Frame,
    TreeScan,
}

impl fmt::Display for LocateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateStep::Cache => write!(f, "cached handle"),
            LocateStep::Selector(selector) => write!(f, "selector `{}`", selector),
            LocateStep::SiteStrategy => write!(f, "site strategy"),
            LocateStep::PlayerContainer => write!(f, "player container"),
            LocateStep::ShadowDom => write!(f, "shadow DOM"),
            LocateStep::Frame => write!(f, "iframe"),
            LocateStep::TreeScan => write!(f, "element tree scan"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoLocator {
    cache: Option<VideoHandle>,
}

impl VideoLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self) -> Option<VideoHandle> {
        self.cache
    }

    pub fn cache(&mut self, handle: VideoHandle) {
        self.cache = Some(handle);
    }

    pub fn locate(&mut self, page: &Page) -> Option<VideoHandle> {
        self.locate_traced(page).map(|(handle, _)| handle)
    }

    pub fn locate_traced(&mut self, page: &Page) -> Option<(VideoHandle, LocateStep)> {
        if let Some(handle) = self.cache {
            tracing::debug!("Using cached video element");
            return Some((handle, LocateStep::Cache));
        }

        tracing::debug!("Searching for video element on {}", page.hostname());
        let found = search(page);
        match &found {
            Some((handle, step)) => {
                tracing::debug!("Found video element via {}", step);
                self.cache = Some(*handle);
            }
            None => tracing::debug!("No video element found"),
        }
        found
    }
}

/// The uncached search sequence.
pub fn search(page: &Page) -> Option<(VideoHandle, LocateStep)> {
    let profile = SiteProfile::for_host(page.hostname());
    let main = page.main_document();
    let root = page.root(main)?;

    for selector in profile.selectors {
        match page.query_selector(root, selector) {
            Ok(Some(video)) => {
                return Some((
                    VideoHandle::new(video),
                    LocateStep::Selector(selector.to_string()),
                ))
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping site selector: {}", e),
        }
    }

    if let Some(video) = profile.strategy.and_then(|strategy| strategy.locate(page)) {
        return Some((VideoHandle::new(video), LocateStep::SiteStrategy));
    }

    if let Some(handle) = find_player_container(page, root) {
        return Some((handle, LocateStep::PlayerContainer));
    }

    if let Some(video) = find_in_shadow_roots(page, main) {
        return Some((VideoHandle::new(video), LocateStep::ShadowDom));
    }

    if let Some(video) = find_in_frames(page) {
        return Some((VideoHandle::new(video), LocateStep::Frame));
    }

    first_video(page, main).map(|video| (VideoHandle::new(video), LocateStep::TreeScan))
}

/// Player widgets that keep their instance on the container (`el.art.video`).
fn find_player_container(page: &Page, root: NodeRef) -> Option<VideoHandle> {
    let containers = page
        .query_selector_all(root, PLAYER_CONTAINER_SELECTOR)
        .unwrap_or_default();

    containers.into_iter().find_map(|container| {
        match page.probe(container, &["art"])? {
            Expando::Player(id) => {
                let video = page.player(*id)?.video?;
                tracing::debug!("Found player instance on container");
                Some(VideoHandle {
                    video,
                    surface: Some(*id),
                })
            }
            other => other
                .get("video")
                .and_then(Expando::as_element)
                .map(VideoHandle::new),
        }
    })
}
