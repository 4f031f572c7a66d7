//! Tests for the Douyin post normalizer.

use feedgate::douyin::normalize::{feed_author, normalize, resolve_url};
use feedgate::douyin::types::{Author, BitRate, Post, PostList, UrlList, VideoTag};

fn urls(list: &[&str]) -> UrlList {
    UrlList {
        url_list: list.iter().map(|s| s.to_string()).collect(),
    }
}

fn post(aweme_id: &str, create_time: i64) -> Post {
    Post {
        aweme_id: aweme_id.to_string(),
        create_time,
        ..Default::default()
    }
}

#[test]
fn title_falls_back_to_desc_with_hashtags_stripped() {
    let mut p = post("1", 1_700_000_000);
    p.desc = "cool stuff #fun #more".to_string();

    let items = normalize("alice", &PostList { aweme_list: vec![p] });
    assert_eq!(items[0].title.as_deref(), Some("cool stuff"));

    let mut tags = items[0].tags.clone();
    tags.sort();
    assert_eq!(tags, vec!["fun".to_string(), "more".to_string()]);
}

#[test]
fn explicit_item_title_wins_over_desc() {
    let mut p = post("1", 1_700_000_000);
    p.item_title = "the title".to_string();
    p.desc = "ignored #tag".to_string();

    let items = normalize("alice", &PostList { aweme_list: vec![p] });
    assert_eq!(items[0].title.as_deref(), Some("the title"));
}

#[test]
fn protocol_relative_cover_url_is_completed() {
    let mut p = post("1", 1_700_000_000);
    p.video = Some(feedgate::douyin::types::Video {
        bit_rate: Vec::new(),
        cover: Some(urls(&["//img.example/cover.jpg"])),
    });

    let items = normalize("alice", &PostList { aweme_list: vec![p] });
    let html = items[0].content_html.as_deref().unwrap();
    assert!(html.contains("<img src=\"https://img.example/cover.jpg\">"), "got {html}");
}

#[test]
fn video_stream_beats_cover_and_images_append() {
    let mut p = post("1", 1_700_000_000);
    p.video = Some(feedgate::douyin::types::Video {
        bit_rate: vec![BitRate {
            play_addr: Some(urls(&["//v.example/play.mp4"])),
        }],
        cover: Some(urls(&["//img.example/cover.jpg"])),
    });
    p.images = Some(vec![urls(&["//img.example/1.webp"])]);

    let items = normalize("alice", &PostList { aweme_list: vec![p] });
    let html = items[0].content_html.as_deref().unwrap();
    assert_eq!(
        html,
        "<video src=\"https://v.example/play.mp4\" preload=\"auto\"></video>\
         <br><img src=\"https://img.example/1.webp\">"
    );
}

#[test]
fn tags_union_desc_and_video_tags_as_a_set() {
    let mut p = post("1", 1_700_000_000);
    p.desc = "#a #b".to_string();
    p.video_tag = vec![
        VideoTag { tag_name: "b".to_string() },
        VideoTag { tag_name: "c".to_string() },
        VideoTag { tag_name: String::new() },
    ];

    let items = normalize("alice", &PostList { aweme_list: vec![p] });
    let mut tags = items[0].tags.clone();
    tags.sort();
    assert_eq!(tags, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
}

#[test]
fn items_sort_newest_first_with_stable_ties() {
    let list = PostList {
        aweme_list: vec![post("old", 100), post("tie1", 300), post("tie2", 300), post("mid", 200)],
    };
    let ids: Vec<String> = normalize("alice", &list)
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(
        ids,
        vec![
            "douyin.user.alice.tie1",
            "douyin.user.alice.tie2",
            "douyin.user.alice.mid",
            "douyin.user.alice.old",
        ]
    );
}

#[test]
fn dates_render_in_shanghai_offset() {
    let items = normalize(
        "alice",
        &PostList { aweme_list: vec![post("1", 1_700_000_000)] },
    );
    let date = items[0].date_published.as_deref().unwrap();
    assert!(date.ends_with("+08:00"), "got {date}");
    assert_eq!(date, "2023-11-15T06:13:20+08:00");
}

#[test]
fn author_prefers_highest_resolution_avatar() {
    let mut p = post("1", 1_700_000_000);
    p.author = Some(Author {
        nickname: "Alice".to_string(),
        avatar_thumb: Some(urls(&["//a.example/thumb.jpg"])),
        avatar_medium: Some(urls(&["//a.example/medium.jpg"])),
        avatar_larger: Some(urls(&["//a.example/large.jpg"])),
    });

    let author = feed_author("alice", &PostList { aweme_list: vec![p] }).unwrap();
    assert_eq!(author.name.as_deref(), Some("Alice"));
    assert_eq!(author.avatar.as_deref(), Some("https://a.example/large.jpg"));
    assert_eq!(author.url.as_deref(), Some("https://www.douyin.com/user/alice"));
}

#[test]
fn url_resolution_handles_empty_and_absolute() {
    assert_eq!(resolve_url(""), "");
    assert_eq!(resolve_url("https://x.example/a"), "https://x.example/a");
    assert_eq!(resolve_url("//x.example/a"), "https://x.example/a");
}

#[test]
fn text_only_post_keeps_a_renderable_body() {
    let mut p = post("1", 1_700_000_000);
    p.desc = "just words".to_string();

    let items = normalize("alice", &PostList { aweme_list: vec![p] });
    assert!(items[0].content_html.is_none());
    assert_eq!(items[0].content_text.as_deref(), Some("just words"));
}
