//! Douyin post list → ordered JSON Feed items.
//!
//! Pure shaping: stable IDs, hashtag extraction, media markup, +08:00
//! timestamps. Newest first, input order preserved on ties.

use crate::douyin::types::{Post, PostList};
use crate::feed::{FeedAuthor, FeedItem};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref HASHTAG: Regex = Regex::new(r"#(\w+)").expect("static pattern");
}

/// Offset the source reports timestamps in (Asia/Shanghai, no DST).
fn shanghai() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("static offset")
}

/// Complete a protocol-relative URL; empty input stays empty.
pub fn resolve_url(url: &str) -> String {
    if url.is_empty() {
        String::new()
    } else if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        url.to_string()
    }
}

pub fn normalize(username: &str, list: &PostList) -> Vec<FeedItem> {
    let author = feed_author(username, list);

    // Newest first; sort_by_key is stable, so equal timestamps keep
    // their input order.
    let mut posts: Vec<&Post> = list.aweme_list.iter().collect();
    posts.sort_by_key(|post| std::cmp::Reverse(post.create_time));

    posts
        .into_iter()
        .map(|post| normalize_post(username, post, author.clone()))
        .collect()
}

/// Author block of the feed, taken from the first post.
pub fn feed_author(username: &str, list: &PostList) -> Option<FeedAuthor> {
    let author = list.aweme_list.first()?.author.as_ref()?;
    let avatar = author
        .avatar_larger
        .as_ref()
        .or(author.avatar_medium.as_ref())
        .or(author.avatar_thumb.as_ref())
        .and_then(|l| l.first())
        .map(resolve_url);
    Some(FeedAuthor {
        name: Some(author.nickname.clone()),
        avatar,
        url: Some(format!("https://www.douyin.com/user/{username}")),
    })
}

fn normalize_post(username: &str, post: &Post, author: Option<FeedAuthor>) -> FeedItem {
    let mut item = FeedItem::new(format!("douyin.user.{}.{}", username, post.aweme_id));
    item.url = Some(format!("https://www.douyin.com/video/{}", post.aweme_id));
    item.title = Some(title_of(post));
    item.tags = tags_of(post);
    item.author = author;

    if let Some(published) = DateTime::from_timestamp(post.create_time, 0) {
        item.date_published = Some(
            published
                .with_timezone(&shanghai())
                .to_rfc3339_opts(SecondsFormat::Secs, false),
        );
    }

    let html = media_html(post);
    if html.is_empty() {
        // Keep the item renderable even for text-only posts.
        let text = if post.desc.is_empty() {
            item.title.clone().unwrap_or_default()
        } else {
            post.desc.clone()
        };
        item.content_text = Some(text);
    } else {
        item.content_html = Some(html);
    }

    item
}

/// Prefer the explicit title, then the description with its `#tag`
/// tokens stripped, then the raw description.
fn title_of(post: &Post) -> String {
    if !post.item_title.is_empty() {
        return post.item_title.clone();
    }
    let stripped = HASHTAG.replace_all(&post.desc, "").trim().to_string();
    if !stripped.is_empty() {
        stripped
    } else {
        post.desc.clone()
    }
}

/// Union of `#tag` tokens in the description and non-empty video tags.
fn tags_of(post: &Post) -> Vec<String> {
    let mut tags: BTreeSet<String> = HASHTAG
        .captures_iter(&post.desc)
        .map(|c| c[1].to_string())
        .collect();
    tags.extend(
        post.video_tag
            .iter()
            .filter(|t| !t.tag_name.is_empty())
            .map(|t| t.tag_name.clone()),
    );
    tags.into_iter().collect()
}

/// Media markup: the video stream (or its cover as fallback), then each
/// image of an image-mode post, `<br>`-separated.
fn media_html(post: &Post) -> String {
    let mut blocks = Vec::new();

    if let Some(video) = &post.video {
        let stream = video.bit_rate.iter().find_map(|b| {
            b.play_addr.as_ref().and_then(|a| a.first())
        });
        if let Some(src) = stream {
            blocks.push(format!(
                "<video src=\"{}\" preload=\"auto\"></video>",
                resolve_url(src)
            ));
        } else if let Some(cover) = video.cover.as_ref().and_then(|c| c.first()) {
            blocks.push(format!("<img src=\"{}\">", resolve_url(cover)));
        }
    }

    if let Some(images) = &post.images {
        for image in images {
            if let Some(src) = image.first() {
                blocks.push(format!("<img src=\"{}\">", resolve_url(src)));
            }
        }
    }

    blocks.join("<br>")
}
