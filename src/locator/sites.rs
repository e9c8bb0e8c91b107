//! Per-site knowledge: where each known video site keeps its `<video>` and
//! how to reach into its player object when selectors are not enough.

use std::fmt;

use crate::dom::{Expando, NodeRef, Page};

/// A site-specific way of digging the video element out of a player's object graph.
pub trait LocateStrategy: fmt::Debug + Send + Sync {
    fn locate(&self, page: &Page) -> Option<NodeRef>;
}

/// Selectors and optional custom strategy for one site.
#[derive(Debug)]
pub struct SiteProfile {
    /// Registrable domain the profile applies to; `None` for the generic profile.
    pub domain: Option<&'static str>,
    pub selectors: &'static [&'static str],
    pub strategy: Option<&'static dyn LocateStrategy>,
}

impl SiteProfile {
    /// Profile for `hostname`: exact domain or any subdomain of it, else the generic one.
    pub fn for_host(hostname: &str) -> &'static SiteProfile {
        let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
        SITE_PROFILES
            .iter()
            .find(|profile| {
                profile.domain.is_some_and(|domain| {
                    hostname == domain
                        || hostname
                            .strip_suffix(domain)
                            .is_some_and(|prefix| prefix.ends_with('.'))
                })
            })
            .unwrap_or(&GENERIC_PROFILE)
    }

    pub fn is_generic(&self) -> bool {
        self.domain.is_none()
    }
}

fn main_query(page: &Page, selector: &str) -> Option<NodeRef> {
    let root = page.root(page.main_document())?;
    page.query_selector(root, selector).ok().flatten()
}

/// Player component exposing its state through a Vue instance (`el.__vue__.video`).
#[derive(Debug)]
pub struct VueComponentVideo {
    pub container: &'static str,
}

impl LocateStrategy for VueComponentVideo {
    fn locate(&self, page: &Page) -> Option<NodeRef> {
        let host = main_query(page, self.container)?;
        page.probe(host, &["__vue__", "video"]).and_then(Expando::as_element)
    }
}

/// Player object hung on its container element (`el.player.video`).
#[derive(Debug)]
pub struct PlayerPropertyVideo {
    pub container: &'static str,
}

impl LocateStrategy for PlayerPropertyVideo {
    fn locate(&self, page: &Page) -> Option<NodeRef> {
        let host = main_query(page, self.container)?;
        page.probe(host, &["player", "video"]).and_then(Expando::as_element)
    }
}

/// Container that is itself the player API; only trusted once the API is present.
#[derive(Debug)]
pub struct ScriptedPlayerVideo {
    pub container: &'static str,
    pub api_probe: &'static str,
}

impl LocateStrategy for ScriptedPlayerVideo {
    fn locate(&self, page: &Page) -> Option<NodeRef> {
        let host = main_query(page, self.container)?;
        if !page.probe(host, &[self.api_probe]).is_some_and(Expando::is_truthy) {
            return None;
        }
        page.query_selector(host, "video").ok().flatten()
    }
}

pub static GENERIC_PROFILE: SiteProfile = SiteProfile {
    domain: None,
    selectors: &[
        "video",
        ".artplayer-video",
        ".video-player video",
        ".player video",
        ".media-player video",
        "[class*=\"video\"] video",
        "[class*=\"player\"] video",
    ],
    strategy: None,
};

pub static SITE_PROFILES: &[SiteProfile] = &[
    SiteProfile {
        domain: Some("bilibili.com"),
        selectors: &[
            ".bilibili-player video",
            ".bpx-player video",
            ".bilibili-player-video video",
            ".bpx-player-video video",
        ],
        strategy: Some(&VueComponentVideo {
            container: ".bilibili-player",
        }),
    },
    SiteProfile {
        domain: Some("iqiyi.com"),
        selectors: &[
            ".iqiyi-player video",
            ".qy-player video",
            ".qy-player-container video",
        ],
        strategy: Some(&PlayerPropertyVideo {
            container: ".qy-player",
        }),
    },
    SiteProfile {
        domain: Some("youku.com"),
        selectors: &[
            ".youku-player video",
            ".yk-player video",
            ".yk-player-container video",
        ],
        strategy: Some(&PlayerPropertyVideo {
            container: ".yk-player",
        }),
    },
    SiteProfile {
        domain: Some("qq.com"),
        selectors: &[
            ".txp-player video",
            ".txp-player-container video",
            ".txp-video video",
        ],
        strategy: Some(&PlayerPropertyVideo {
            container: ".txp-player",
        }),
    },
    SiteProfile {
        domain: Some("youtube.com"),
        selectors: &[
            ".html5-video-player video",
            ".ytp-video video",
            "#movie_player video",
        ],
        strategy: Some(&ScriptedPlayerVideo {
            container: "#movie_player",
            api_probe: "getPlayerState",
        }),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Element, SelectorList};
    use std::collections::BTreeMap;

    #[test]
    fn hostnames_match_domain_and_subdomains_only() {
        assert_eq!(SiteProfile::for_host("bilibili.com").domain, Some("bilibili.com"));
        assert_eq!(SiteProfile::for_host("www.bilibili.com").domain, Some("bilibili.com"));
        assert_eq!(SiteProfile::for_host("M.YouTube.com.").domain, Some("youtube.com"));
        assert!(SiteProfile::for_host("notbilibili.com").is_generic());
        assert!(SiteProfile::for_host("example.org").is_generic());
    }

    #[test]
    fn every_builtin_selector_parses() {
        for profile in SITE_PROFILES.iter().chain(std::iter::once(&GENERIC_PROFILE)) {
            for selector in profile.selectors {
                assert!(SelectorList::parse(selector).is_ok(), "{}", selector);
            }
        }
    }

    #[test]
    fn vue_strategy_reads_component_video() {
        let mut page = Page::new("www.bilibili.com");
        let root = page.root(page.main_document()).unwrap();
        let video = page.append_element(root, Element::new("video")).unwrap();
        let mut vue = BTreeMap::new();
        vue.insert("video".to_string(), Expando::Element(video));
        page.append_element(
            root,
            Element::new("div")
                .with_class("bilibili-player")
                .with_prop("__vue__", Expando::Object(vue)),
        );

        let strategy = SiteProfile::for_host(page.hostname()).strategy.unwrap();
        assert_eq!(strategy.locate(&page), Some(video));
    }

    #[test]
    fn scripted_player_requires_its_api() {
        let mut page = Page::new("www.youtube.com");
        let root = page.root(page.main_document()).unwrap();
        let player = page
            .append_element(root, Element::new("div").with_id("movie_player"))
            .unwrap();
        let video = page.append_element(player, Element::new("video")).unwrap();

        let strategy = SiteProfile::for_host(page.hostname()).strategy.unwrap();
        assert_eq!(strategy.locate(&page), None);

        page.element_mut(player)
            .unwrap()
            .props
            .insert("getPlayerState".to_string(), Expando::Function);
        assert_eq!(strategy.locate(&page), Some(video));
    }
}
