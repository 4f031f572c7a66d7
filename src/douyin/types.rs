//! Typed records for the Douyin post-feed payload.
//!
//! Upstream JSON is loosely shaped; every field the normalizer touches is
//! either `Option` or defaulted so that partial payloads deserialize
//! instead of failing the whole feed.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostList {
    #[serde(default)]
    pub aweme_list: Vec<Post>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub aweme_id: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub item_title: String,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub video: Option<Video>,
    /// Present on image-mode posts.
    #[serde(default)]
    pub images: Option<Vec<UrlList>>,
    #[serde(default)]
    pub video_tag: Vec<VideoTag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar_thumb: Option<UrlList>,
    #[serde(default)]
    pub avatar_medium: Option<UrlList>,
    #[serde(default)]
    pub avatar_larger: Option<UrlList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Video {
    #[serde(default)]
    pub bit_rate: Vec<BitRate>,
    #[serde(default)]
    pub cover: Option<UrlList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitRate {
    #[serde(default)]
    pub play_addr: Option<UrlList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlList {
    #[serde(default)]
    pub url_list: Vec<String>,
}

impl UrlList {
    /// First non-empty URL of the list.
    pub fn first(&self) -> Option<&str> {
        self.url_list
            .iter()
            .map(String::as_str)
            .find(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoTag {
    #[serde(default)]
    pub tag_name: String,
}
