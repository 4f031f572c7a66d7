//! NGA emoji table.
//!
//! The rewriter only needs a `group:code → file` map. The map is
//! bootstrapped once per process from the forum's bbcode script when
//! reachable and falls back to a built-in snapshot otherwise, so the
//! rewriter itself stays pure.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Host serving the smiley images.
pub const EMOJI_IMG_BASE: &str = "https://img4.nga.178.com/ngabbs/post/smile/";

/// Script the table is scraped from.
const EMOJI_SCRIPT_URL: &str = "https://img4.nga.178.com/common_res/js_bbscode_core.js";

static TABLE: OnceCell<Arc<EmojiTable>> = OnceCell::const_new();

#[derive(Debug, Clone)]
pub struct EmojiTable {
    map: HashMap<String, String>,
}

impl EmojiTable {
    /// Image URL for an `[s:group:code]` token.
    pub fn lookup(&self, group: &str, code: &str) -> Option<String> {
        self.map
            .get(&format!("{group}:{code}"))
            .map(|file| format!("{EMOJI_IMG_BASE}{file}"))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Scrape `group: { 'code':'file', ... }` blocks out of the forum's
    /// bbcode script. Tolerant by design: anything that does not look
    /// like a smiley block is skipped.
    pub fn from_script(source: &str) -> Self {
        lazy_static! {
            static ref GROUP: Regex =
                Regex::new(r"(\w+)\s*:\s*\{([^{}]*)\}").expect("static pattern");
            static ref PAIR: Regex =
                Regex::new(r#"['"]([^'"]+)['"]\s*:\s*['"]([^'"]+\.(?:png|gif))['"]"#)
                    .expect("static pattern");
        }

        let mut map = HashMap::new();
        for group in GROUP.captures_iter(source) {
            let group_name = &group[1];
            for pair in PAIR.captures_iter(&group[2]) {
                map.insert(format!("{group_name}:{}", &pair[1]), pair[2].to_string());
            }
        }
        Self { map }
    }

    /// Snapshot of the common smilies, used when the script source is
    /// unreachable.
    pub fn builtin() -> Self {
        let entries: &[(&str, &str)] = &[
            ("ng:偷笑", "a2_05.png"),
            ("ac:blink", "ac0.png"),
            ("ac:goodjob", "ac1.png"),
            ("ac:心", "ac2.png"),
            ("ac:哭", "ac3.png"),
            ("ac:哭笑", "ac4.png"),
            ("ac:无语", "ac5.png"),
            ("ac:凌乱", "ac6.png"),
            ("ac:上", "ac7.png"),
            ("ac:衰", "ac8.png"),
            ("ac:懒", "ac9.png"),
            ("ac:黑枪", "ac10.png"),
            ("ac:怕", "ac11.png"),
            ("ac:羡慕", "ac12.png"),
            ("ac:委屈", "ac13.png"),
            ("ac:喷", "ac14.png"),
            ("a2:goodjob", "a2_02.png"),
            ("a2:诶嘿", "a2_03.png"),
            ("a2:偷笑", "a2_05.png"),
            ("a2:怒", "a2_07.png"),
            ("a2:笑", "a2_10.png"),
            ("a2:那个", "a2_12.png"),
            ("a2:哦嗬嗬嗬", "a2_14.png"),
            ("a2:舔", "a2_16.png"),
            ("a2:鬼脸", "a2_18.png"),
            ("a2:冷", "a2_21.png"),
            ("a2:大哭", "a2_23.png"),
            ("a2:惊", "a2_27.png"),
            ("a2:抓狂", "a2_30.png"),
            ("a2:黑线", "a2_33.png"),
            ("pg:战斗力", "pg01.png"),
            ("pg:哈啤", "pg05.png"),
            ("pg:满分", "pg09.png"),
            ("pg:衰", "pg13.png"),
            ("pst:举手", "pt00.png"),
            ("pst:基情", "pt04.png"),
            ("dt:ROLL", "dt01.png"),
            ("dt:注意", "dt07.png"),
        ];
        Self {
            map: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Process-wide table, fetched at most once.
pub async fn shared(client: &reqwest::Client) -> Arc<EmojiTable> {
    TABLE
        .get_or_init(|| async {
            match fetch(client).await {
                Ok(table) if !table.is_empty() => {
                    debug!(entries = table.len(), "emoji table loaded from script");
                    Arc::new(table)
                }
                Ok(_) => {
                    warn!("emoji script yielded no entries, using builtin snapshot");
                    Arc::new(EmojiTable::builtin())
                }
                Err(e) => {
                    warn!(error = %e, "emoji script unreachable, using builtin snapshot");
                    Arc::new(EmojiTable::builtin())
                }
            }
        })
        .await
        .clone()
}

async fn fetch(client: &reqwest::Client) -> reqwest::Result<EmojiTable> {
    let source = client
        .get(EMOJI_SCRIPT_URL)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(EmojiTable::from_script(&source))
}
