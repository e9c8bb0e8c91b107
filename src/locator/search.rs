//! Structural searches that do not depend on the site: shadow trees,
//! same-origin frames and the last-resort full scan.

use crate::dom::{Document, DocumentId, NodeId, NodeRef, Page};

fn is_video(doc: &Document, id: NodeId) -> bool {
    doc.element(id).is_some_and(|el| el.is_tag("video"))
}

/// First `<video>` in the light tree of `document`.
pub fn first_video(page: &Page, document: DocumentId) -> Option<NodeRef> {
    let doc = page.document(document)?;
    doc.elements()
        .into_iter()
        .find(|id| is_video(doc, *id))
        .map(|id| NodeRef::new(document, id))
}

/// Depth-first search of every shadow tree reachable from `document`.
///
/// Each shadow root is checked for a video in its own tree before the roots
/// nested inside it are visited. Uses an explicit work stack; there is no
/// depth limit, so a pathologically nested page costs time proportional to
/// its size but never stack depth.
pub fn find_in_shadow_roots(page: &Page, document: DocumentId) -> Option<NodeRef> {
    let doc = page.document(document)?;
    let mut stack: Vec<NodeId> = doc
        .elements()
        .into_iter()
        .filter_map(|id| doc.shadow_root(id))
        .rev()
        .collect();

    while let Some(shadow_root) = stack.pop() {
        let inner = doc.descendants(shadow_root);
        if let Some(video) = inner.iter().copied().find(|id| is_video(doc, *id)) {
            tracing::debug!("Found video element inside a shadow root");
            return Some(NodeRef::new(document, video));
        }
        stack.extend(inner.iter().rev().filter_map(|id| doc.shadow_root(*id)));
    }
    None
}

/// Video inside any same-origin `<iframe>` of the main document.
/// Frames the page may not look into are skipped.
pub fn find_in_frames(page: &Page) -> Option<NodeRef> {
    let main = page.main_document();
    let frames = page
        .elements(main)
        .into_iter()
        .filter(|node| page.element(*node).is_some_and(|el| el.is_tag("iframe")));

    for frame in frames {
        match page.content_document(frame) {
            Ok(Some(document)) => {
                tracing::debug!("Checking iframe content");
                if let Some(video) = first_video(page, document) {
                    tracing::debug!("Found video element inside an iframe");
                    return Some(video);
                }
                if let Some(video) = find_in_shadow_roots(page, document) {
                    return Some(video);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("Skipping iframe: {}", e),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Element, FrameContent};

    #[test]
    fn finds_video_two_shadow_levels_deep() {
        let mut page = Page::new("example.com");
        let root = page.root(page.main_document()).unwrap();
        let outer_host = page.append_element(root, Element::new("x-shell")).unwrap();
        let outer = page.attach_shadow(outer_host).unwrap();
        let inner_host = page.append_element(outer, Element::new("x-player")).unwrap();
        let inner = page.attach_shadow(inner_host).unwrap();
        let video = page.append_element(inner, Element::new("video")).unwrap();

        assert_eq!(first_video(&page, page.main_document()), None);
        assert_eq!(find_in_shadow_roots(&page, page.main_document()), Some(video));
    }

    #[test]
    fn shadow_search_prefers_outer_tree_of_first_host() {
        let mut page = Page::new("example.com");
        let root = page.root(page.main_document()).unwrap();
        let first_host = page.append_element(root, Element::new("x-a")).unwrap();
        let second_host = page.append_element(root, Element::new("x-b")).unwrap();

        let first = page.attach_shadow(first_host).unwrap();
        let nested_host = page.append_element(first, Element::new("x-c")).unwrap();
        let nested = page.attach_shadow(nested_host).unwrap();
        let nested_video = page.append_element(nested, Element::new("video")).unwrap();

        let second = page.attach_shadow(second_host).unwrap();
        page.append_element(second, Element::new("video")).unwrap();

        // depth first: the nested tree under the first host is searched before the second host
        assert_eq!(find_in_shadow_roots(&page, page.main_document()), Some(nested_video));
    }

    #[test]
    fn deep_shadow_nesting_does_not_grow_the_call_stack() {
        let mut page = Page::new("example.com");
        let mut scope = page.root(page.main_document()).unwrap();
        for _ in 0..5_000 {
            let host = page.append_element(scope, Element::new("x-layer")).unwrap();
            scope = page.attach_shadow(host).unwrap();
        }
        let video = page.append_element(scope, Element::new("video")).unwrap();

        assert_eq!(find_in_shadow_roots(&page, page.main_document()), Some(video));
    }

    #[test]
    fn frame_search_skips_cross_origin_frames() {
        let mut page = Page::new("example.com");
        let root = page.root(page.main_document()).unwrap();

        let mut blocked = Element::new("iframe");
        blocked.frame = Some(FrameContent::CrossOrigin { src: None });
        page.append_element(root, blocked);

        let inner = page.add_document();
        let inner_root = page.root(inner).unwrap();
        let video = page.append_element(inner_root, Element::new("video")).unwrap();
        let mut open = Element::new("iframe");
        open.frame = Some(FrameContent::SameOrigin(inner));
        page.append_element(root, open);

        assert_eq!(find_in_frames(&page), Some(video));
    }
}
