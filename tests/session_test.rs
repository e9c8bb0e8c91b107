//! Session behaviour over time: retry chains, observer rescans and the
//! periodic search, driven with tokio's paused clock.

use std::time::Duration;

use tokio::time::Instant;
use video_skipper::config::Config;
use video_skipper::dom::{NodeSnapshot, Page, PageSnapshot};
use video_skipper::groups::{ConfigGroup, GroupStore};
use video_skipper::session::{PageEvent, Reply, Session};

fn page(json: serde_json::Value) -> Page {
    let snapshot: PageSnapshot = serde_json::from_value(json).unwrap();
    Page::from_snapshot(&snapshot).unwrap()
}

fn nodes(json: serde_json::Value) -> Vec<NodeSnapshot> {
    serde_json::from_value(json).unwrap()
}

fn drama_and_news() -> GroupStore {
    GroupStore::new()
        .with("News", ConfigGroup::new(15.0, 45.0))
        .with("Drama", ConfigGroup::new(90.0, 30.0).pinned_at(1000))
}

fn video_page(at: f64) -> Page {
    page(serde_json::json!({
        "hostname": "example.com",
        "document": {"children": [
            {"tag": "body", "children": [{"tag": "video", "media": {"currentTime": at}}]}
        ]}
    }))
}

fn empty_page() -> Page {
    page(serde_json::json!({
        "hostname": "example.com",
        "document": {"children": [{"tag": "body"}]}
    }))
}

async fn position(session: &Session) -> Option<f64> {
    session.status().await.position
}

async fn cached(session: &Session) -> bool {
    session.inspect(|state| state.locator.cached().is_some()).await
}

mod shortcuts {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pinned_group_skip_and_undo() {
        let session = Session::new(video_page(100.0), drama_and_news(), &Config::default());
        assert_eq!(session.status().await.active_group.as_deref(), Some("Drama"));

        session.key_down("[").await;
        assert_eq!(position(&session).await, Some(190.0));
        assert_eq!(session.status().await.undo_position, Some(100.0));

        session.key_down("\\").await;
        assert_eq!(position(&session).await, Some(100.0));
        assert_eq!(session.status().await.undo_position, None);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_performs_no_locate() {
        let store = GroupStore::new().with("Clips", ConfigGroup::new(10.0, 0.0));
        let session = Session::new(video_page(5.0), store, &Config::default());

        session.key_down("]").await;
        session.settle().await;

        assert!(!cached(&session).await);
        assert_eq!(
            session
                .inspect(|state| state.page.elements(state.page.main_document()).len())
                .await,
            2
        );
        assert_eq!(session.status().await.undo_position, None);
        let video = session
            .inspect(|state| {
                let root = state.page.root(state.page.main_document()).unwrap();
                state.page.query_selector(root, "video").unwrap().unwrap()
            })
            .await;
        assert_eq!(
            session.inspect(|state| state.page.current_time(video)).await,
            Some(5.0)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn undo_without_skip_and_twice_in_a_row_are_no_ops() {
        let session = Session::new(video_page(40.0), drama_and_news(), &Config::default());

        session.key_down("\\").await;
        session.settle().await;
        assert!(!cached(&session).await);
        assert_eq!(position(&session).await, None);

        session.key_down("[").await;
        session.key_down("\\").await;
        assert_eq!(position(&session).await, Some(40.0));

        let video = session
            .inspect(|state| state.locator.cached().unwrap().video)
            .await;
        session
            .inspect(|state| state.page.set_current_time(video, 75.0).unwrap())
            .await;
        session.key_down("\\").await;
        assert_eq!(position(&session).await, Some(75.0));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_keys_are_ignored() {
        let session = Session::new(video_page(1.0), drama_and_news(), &Config::default());

        for key in ["{", "}", "|", "ArrowRight", "a"] {
            assert_eq!(session.key_down(key).await, None);
        }
        assert!(!cached(&session).await);
    }
}

mod retry {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_configured_attempts() {
        let session = Session::new(empty_page(), drama_and_news(), &Config::default());
        let start = Instant::now();

        session.key_down("[").await;
        session.settle().await;

        assert_eq!(start.elapsed(), Duration::from_secs(9));
        assert!(!cached(&session).await);
        assert_eq!(session.status().await.undo_position, None);
    }

    #[tokio::test(start_paused = true)]
    async fn honours_custom_retry_policy() {
        let mut config = Config::default();
        config.retry.max_attempts = 3;
        config.retry.interval_ms = 250;
        let session = Session::new(empty_page(), drama_and_news(), &config);
        let start = Instant::now();

        session.key_down("[").await;
        session.settle().await;

        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_when_video_appears_mid_chain() {
        let session = Session::new(empty_page(), drama_and_news(), &Config::default());
        let start = Instant::now();

        session.key_down("[").await;
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // nested, so the observer does not see the video itself
        session
            .nodes_inserted(
                Some("body"),
                &nodes(serde_json::json!([
                    {"tag": "section", "children": [
                        {"tag": "video", "media": {"currentTime": 50}}
                    ]}
                ])),
            )
            .await
            .unwrap();
        assert!(!cached(&session).await);

        session.settle().await;
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(position(&session).await, Some(140.0));
        assert_eq!(session.status().await.undo_position, Some(50.0));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_chains_both_apply() {
        let session = Session::new(empty_page(), drama_and_news(), &Config::default());

        session.key_down("[").await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        session.key_down("[").await;
        tokio::time::sleep(Duration::from_millis(700)).await;

        session
            .nodes_inserted(
                None,
                &nodes(serde_json::json!([
                    {"tag": "div", "children": [
                        {"tag": "video", "media": {"currentTime": 0}}
                    ]}
                ])),
            )
            .await
            .unwrap();
        session.settle().await;

        // first chain lands at 2s, the second at 2.5s on top of it
        assert_eq!(position(&session).await, Some(180.0));
        assert_eq!(session.status().await.undo_position, Some(90.0));
    }
}

mod locate {
    use super::*;

    async fn skip_lands_on(page: Page) -> Option<String> {
        let session = Session::new(page, drama_and_news(), &Config::default());
        session.key_down("[").await;
        session.settle().await;
        let status = session.status().await;
        assert_eq!(status.position, Some(100.0));
        status.video
    }

    #[tokio::test(start_paused = true)]
    async fn finds_video_two_shadow_roots_deep() {
        let page = page(serde_json::json!({
            "hostname": "example.com",
            "document": {"children": [
                {"tag": "x-app", "shadow": [
                    {"tag": "x-player", "shadow": [
                        {"tag": "video", "id": "deep", "media": {"currentTime": 10}}
                    ]}
                ]}
            ]}
        }));

        assert_eq!(skip_lands_on(page).await.as_deref(), Some("video#deep"));
    }

    #[tokio::test(start_paused = true)]
    async fn finds_video_in_same_origin_frame() {
        let page = page(serde_json::json!({
            "hostname": "example.com",
            "document": {"children": [
                {"tag": "iframe", "frame": {"document": {"children": [
                    {"tag": "video", "media": {"currentTime": 10}}
                ]}}}
            ]}
        }));

        assert_eq!(
            skip_lands_on(page).await.as_deref(),
            Some("video (frame document 1)")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn skips_cross_origin_frame_without_failing() {
        let page = page(serde_json::json!({
            "hostname": "example.com",
            "document": {"children": [
                {"tag": "iframe", "frame": {"crossOrigin": true, "src": "https://ads.example.net/"}},
                {"tag": "iframe", "frame": {"document": {"children": [
                    {"tag": "div", "children": [
                        {"tag": "video", "class": "inner", "media": {"currentTime": 10}}
                    ]}
                ]}}}
            ]}
        }));

        assert_eq!(
            skip_lands_on(page).await.as_deref(),
            Some("video.inner (frame document 1)")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn skips_through_player_control_surface() {
        let page = page(serde_json::json!({
            "hostname": "anime.example",
            "document": {"children": [
                {"tag": "div", "class": "artplayer-app",
                 "props": {"art": {"$player": {"video": "v"}}},
                 "shadow": [
                    {"tag": "video", "ref": "v", "media": {"currentTime": 10, "duration": 60}}
                 ]}
            ]}
        }));
        let session = Session::new(page, drama_and_news(), &Config::default());

        session.key_down("[").await;
        // clamped to the media duration
        assert_eq!(position(&session).await, Some(60.0));

        session.key_down("\\").await;
        assert_eq!(position(&session).await, Some(10.0));
    }
}

mod observer {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn inserted_video_is_cached_immediately() {
        let session = Session::new(empty_page(), drama_and_news(), &Config::default());

        let rescans = session
            .nodes_inserted(
                Some("body"),
                &nodes(serde_json::json!([{"tag": "video", "id": "late", "media": {"currentTime": 3}}])),
            )
            .await
            .unwrap();

        assert_eq!(rescans, 0);
        assert_eq!(session.status().await.video.as_deref(), Some("video#late"));
    }

    #[tokio::test(start_paused = true)]
    async fn player_container_triggers_delayed_rescan() {
        let session = Session::new(empty_page(), drama_and_news(), &Config::default());
        let start = Instant::now();

        let rescans = session
            .nodes_inserted(
                None,
                &nodes(serde_json::json!([
                    {"tag": "div", "class": "artplayer-app", "children": [
                        {"tag": "video", "media": {"currentTime": 0}}
                    ]}
                ])),
            )
            .await
            .unwrap();
        assert_eq!(rescans, 1);
        assert!(!cached(&session).await);

        session.settle().await;
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert!(cached(&session).await);
    }

    #[tokio::test(start_paused = true)]
    async fn poller_searches_while_nothing_is_cached() {
        let session = Session::new(empty_page(), drama_and_news(), &Config::default());
        let poller = session.spawn_poller();

        tokio::time::sleep(Duration::from_secs(1)).await;
        session
            .nodes_inserted(
                None,
                &nodes(serde_json::json!([
                    {"tag": "div", "children": [{"tag": "video", "media": {"currentTime": 0}}]}
                ])),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(3900)).await;
        assert!(!cached(&session).await);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(cached(&session).await);
        poller.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn batch_with_tagless_node_inserts_nothing() {
        let session = Session::new(empty_page(), drama_and_news(), &Config::default());

        let result = session
            .nodes_inserted(
                Some("body"),
                &nodes(serde_json::json!([
                    {"tag": "video", "media": {"currentTime": 3}},
                    {"tag": " "}
                ])),
            )
            .await;

        assert!(result.is_err());
        assert!(!cached(&session).await);
        let elements = session
            .inspect(|state| state.page.elements(state.page.main_document()).len())
            .await;
        assert_eq!(elements, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_insertion_parent_is_rejected() {
        let session = Session::new(empty_page(), drama_and_news(), &Config::default());

        let result = session
            .nodes_inserted(Some("#player"), &nodes(serde_json::json!([{"tag": "video"}])))
            .await;

        assert!(result.is_err());
        assert!(!cached(&session).await);
    }
}

mod events {
    use super::*;

    fn event(json: serde_json::Value) -> PageEvent {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn storage_change_reapplies_policy() {
        let session = Session::new(video_page(0.0), GroupStore::new(), &Config::default());
        assert_eq!(session.status().await.active_group, None);

        session
            .handle_event(event(serde_json::json!({
                "type": "storageChanged",
                "groups": {"A": {"skip1": 5}, "B": {"skip1": 7, "pinned": true, "pinnedTime": 3}}
            })))
            .await
            .unwrap();
        assert_eq!(session.status().await.active_group.as_deref(), Some("B"));

        session
            .handle_event(event(serde_json::json!({"type": "storageChanged", "groups": null})))
            .await
            .unwrap();
        assert_eq!(session.status().await.active_group, None);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_duration_in_store_change_keeps_other_groups() {
        let session = Session::new(video_page(100.0), GroupStore::new(), &Config::default());

        session
            .handle_event(event(serde_json::json!({
                "type": "storageChanged",
                "groups": {
                    "Drama": {"skip1": 90, "skip2": 30},
                    "Clips": {"skip1": null, "skip2": 10}
                }
            })))
            .await
            .unwrap();
        assert_eq!(session.status().await.active_group.as_deref(), Some("Drama"));

        session.key_down("[").await;
        assert_eq!(position(&session).await, Some(190.0));

        session
            .handle_event(event(serde_json::json!({
                "type": "message", "action": "updateCurrentGroup", "group": "Clips"
            })))
            .await
            .unwrap();
        session.key_down("[").await;
        assert_eq!(position(&session).await, Some(190.0));
        session.key_down("]").await;
        assert_eq!(position(&session).await, Some(200.0));
    }

    #[tokio::test(start_paused = true)]
    async fn update_current_group_is_not_validated() {
        let session = Session::new(video_page(0.0), drama_and_news(), &Config::default());

        session
            .handle_event(event(serde_json::json!({
                "type": "message", "action": "updateCurrentGroup", "group": "Gone"
            })))
            .await
            .unwrap();
        assert_eq!(session.status().await.active_group.as_deref(), Some("Gone"));

        // skip against a dangling group does nothing
        session.key_down("[").await;
        assert!(!cached(&session).await);

        session
            .handle_event(event(serde_json::json!({
                "type": "message", "action": "updateCurrentGroup", "group": "News"
            })))
            .await
            .unwrap();
        session.key_down("[").await;
        assert_eq!(position(&session).await, Some(15.0));
    }

    #[tokio::test(start_paused = true)]
    async fn status_event_reports_state() {
        let session = Session::new(video_page(12.0), drama_and_news(), &Config::default());
        session.key_down("]").await;

        let reply = session
            .handle_event(event(serde_json::json!({"type": "status"})))
            .await
            .unwrap();
        let Reply::Status(status) = reply else {
            panic!("expected status reply");
        };
        assert_eq!(status.position, Some(42.0));
        assert_eq!(status.undo_position, Some(12.0));
        assert_eq!(status.groups, 2);
    }
}
