//! Reaction to nodes the page inserts after load.

use super::{VideoHandle, VideoLocator};
use crate::dom::{NodeRef, Page};

/// Class names player widgets put on the nodes they insert while booting.
pub const PLAYER_CONTAINER_CLASSES: &[&str] = &["artplayer-app", "artplayer-video"];

/// How the mutation observer reacts to one inserted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The node is a video; it becomes the cached handle immediately.
    Video(NodeRef),
    /// A player container is booting; re-run the full search after a delay.
    PlayerContainer(NodeRef),
    Ignored,
}

/// Only the inserted node itself is inspected, not its subtree.
pub fn classify_insertion(page: &Page, node: NodeRef) -> Insertion {
    let Some(element) = page.element(node) else {
        return Insertion::Ignored;
    };
    if element.is_tag("video") {
        Insertion::Video(node)
    } else if PLAYER_CONTAINER_CLASSES
        .iter()
        .any(|class| element.has_class(class))
    {
        Insertion::PlayerContainer(node)
    } else {
        Insertion::Ignored
    }
}

impl VideoLocator {
    /// Apply the observer's reaction to a batch of inserted nodes.
    /// Returns how many delayed rescans the caller should schedule.
    pub fn observe_insertions(&mut self, page: &Page, nodes: &[NodeRef]) -> usize {
        let mut rescans = 0;
        for node in nodes {
            match classify_insertion(page, *node) {
                Insertion::Video(video) => {
                    tracing::debug!("Observed inserted video element");
                    self.cache(VideoHandle::new(video));
                }
                Insertion::PlayerContainer(_) => rescans += 1,
                Insertion::Ignored => {}
            }
        }
        rescans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;

    #[test]
    fn inserted_video_replaces_cached_handle() {
        let mut page = Page::new("example.com");
        let root = page.root(page.main_document()).unwrap();
        let old = page.append_element(root, Element::new("video")).unwrap();
        let mut locator = VideoLocator::new();
        locator.locate(&page);
        assert_eq!(locator.cached().map(|h| h.video), Some(old));

        let fresh = page.append_element(root, Element::new("VIDEO")).unwrap();
        assert_eq!(locator.observe_insertions(&page, &[fresh]), 0);
        assert_eq!(locator.cached().map(|h| h.video), Some(fresh));
    }

    #[test]
    fn player_containers_request_rescans_and_subtrees_are_ignored() {
        let mut page = Page::new("example.com");
        let root = page.root(page.main_document()).unwrap();
        let app = page
            .append_element(root, Element::new("div").with_class("artplayer-app"))
            .unwrap();
        let skin = page
            .append_element(root, Element::new("div").with_class("skin artplayer-video"))
            .unwrap();
        let wrapper = page.append_element(root, Element::new("section")).unwrap();
        page.append_element(wrapper, Element::new("video"));

        assert_eq!(classify_insertion(&page, app), Insertion::PlayerContainer(app));
        assert_eq!(classify_insertion(&page, wrapper), Insertion::Ignored);

        let mut locator = VideoLocator::new();
        assert_eq!(locator.observe_insertions(&page, &[app, skin, wrapper]), 2);
        assert_eq!(locator.cached(), None);
    }
}
