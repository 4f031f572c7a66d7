//! NGA markup → HTML rewriter.
//!
//! NGA posts arrive as BBCode-flavored text with forum-specific emoji
//! and attachment tokens. The rewriter is an ordered pipeline of regex
//! substitutions; the order is observable (the author prefix inside a
//! quote must become `<b>` before the quote itself is wrapped) and must
//! not be shuffled. Applying the rewriter twice equals applying it once:
//! the output contains no residual tokens for supported tags.

pub mod emoji;

use self::emoji::EmojiTable;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::sync::Arc;

/// Root for relative attachment references (`./mon_...`).
pub const ATTACHMENT_BASE: &str = "https://img.nga.178.com/attachments/";

lazy_static! {
    static ref EMOJI_TOKEN: Regex =
        Regex::new(r"\[s:([^:\]\s]+):([^\]]+)\]").expect("static pattern");
    static ref IMG_REL_DOTDOT: Regex =
        Regex::new(r"\[img\]\./\./(mon[^\[]*)\[/img\]").expect("static pattern");
    static ref IMG_REL: Regex =
        Regex::new(r"\[img\]\./(mon[^\[]*)\[/img\]").expect("static pattern");
    static ref IMG_ABS: Regex =
        Regex::new(r"\[img\](https?://[^\[]+)\[/img\]").expect("static pattern");
    static ref BOLD: Regex = Regex::new(r"(?s)\[b\](.*?)\[/b\]").expect("static pattern");
    static ref QUOTE_PID: Regex =
        Regex::new(r"\[pid=[^\]]*\](.*?)\[/pid\]").expect("static pattern");
    static ref QUOTE_UID: Regex =
        Regex::new(r"\[uid=?[^\]]*\](.*?)\[/uid\]").expect("static pattern");
    static ref QUOTE: Regex =
        Regex::new(r"(?s)\[quote\](.*?)\[/quote\]").expect("static pattern");
    static ref COLOR: Regex =
        Regex::new(r"(?s)\[color=[^\]]*\](.*?)\[/color\]").expect("static pattern");
    static ref SIZE_OPEN: Regex = Regex::new(r"\[size=[^\]]*\]").expect("static pattern");
    static ref SIZE_CLOSE: Regex = Regex::new(r"\[/size\]").expect("static pattern");
    static ref COLLAPSE_TITLED: Regex =
        Regex::new(r"(?s)\[collapse=([^\]]*)\](.*?)\[/collapse\]").expect("static pattern");
    static ref COLLAPSE_PLAIN: Regex =
        Regex::new(r"(?s)\[collapse\](.*?)\[/collapse\]").expect("static pattern");
    static ref ALIGN: Regex =
        Regex::new(r"(?s)\[align=([^\]]*)\](.*?)\[/align\]").expect("static pattern");
    static ref DEL: Regex = Regex::new(r"(?s)\[del\](.*?)\[/del\]").expect("static pattern");
    static ref URL_PAIRED: Regex =
        Regex::new(r"\[([^\[\]]+)\]\s*\[url\]([^\[]+)\[/url\]").expect("static pattern");
    static ref URL_TITLED: Regex =
        Regex::new(r"(?s)\[url=([^\]]+)\](.*?)\[/url\]").expect("static pattern");
    static ref URL_PLAIN: Regex =
        Regex::new(r"\[url\]([^\[]+)\[/url\]").expect("static pattern");
    static ref FLASH_VIDEO: Regex =
        Regex::new(r"\[flash=video\]\./([^\[]+)\[/flash\]").expect("static pattern");
    static ref FLASH_AUDIO: Regex =
        Regex::new(r"\[flash=audio\]\./([^\[]+)\[/flash\]").expect("static pattern");
    static ref ALBUM: Regex =
        Regex::new(r"(?s)\[album=([^\]]*)\](.*?)\[/album\]").expect("static pattern");
    static ref ALBUM_IMG: Regex =
        Regex::new(r"\./(mon[^\s<\[]*\.(?:jpg|png|jpeg))").expect("static pattern");
}

pub struct MarkupRewriter {
    emoji: Arc<EmojiTable>,
}

impl MarkupRewriter {
    pub fn new(emoji: Arc<EmojiTable>) -> Self {
        Self { emoji }
    }

    pub fn rewrite(&self, input: &str) -> String {
        // 1. entity decode
        let text = html_escape::decode_html_entities(input).into_owned();

        // 2. emoji tokens; unknown codes stay untouched
        let text = EMOJI_TOKEN.replace_all(&text, |caps: &Captures| {
            match self.emoji.lookup(&caps[1], &caps[2]) {
                Some(url) => format!("<img src=\"{url}\">"),
                None => caps[0].to_string(),
            }
        });

        // 3. attachment and absolute images
        let text = IMG_REL_DOTDOT.replace_all(&text, format!("<img src=\"{ATTACHMENT_BASE}$1\"></img>"));
        let text = IMG_REL.replace_all(&text, format!("<img src=\"{ATTACHMENT_BASE}$1\"></img>"));
        let text = IMG_ABS.replace_all(&text, "<img src=\"$1\"></img>");

        // 4. bold
        let text = BOLD.replace_all(&text, "<b>$1</b>");

        // 5. quote; the reply/author tokens inside the prefix reduce to
        // their visible text first
        let text = QUOTE_PID.replace_all(&text, "$1");
        let text = QUOTE_UID.replace_all(&text, "$1");
        let text = QUOTE.replace_all(&text, "<blockquote>$1</blockquote>");

        // 6.–7. presentation-only tags are stripped
        let text = COLOR.replace_all(&text, "$1");
        let text = SIZE_OPEN.replace_all(&text, "");
        let text = SIZE_CLOSE.replace_all(&text, "");

        // 8. collapse
        let text = COLLAPSE_TITLED.replace_all(&text, "<details><summary>$1</summary>$2</details>");
        let text =
            COLLAPSE_PLAIN.replace_all(&text, "<details><summary>点击显示隐藏的内容</summary>$1</details>");

        // 9.–10. align, del
        let text = ALIGN.replace_all(&text, "<span style=\"text-align:$1\">$2</span>");
        let text = DEL.replace_all(&text, "<del>$1</del>");

        // 11. links; the paired `[title] [url]…[/url]` form must run
        // before the plain form consumes the url tag
        let text = URL_PAIRED.replace_all(&text, "<a href=\"$2\">$1</a>");
        let text = URL_TITLED.replace_all(&text, "<a href=\"$1\">$2</a>");
        let text = URL_PLAIN.replace_all(&text, "<a href=\"$1\">$1</a>");

        // 12.–13. attachment flash players
        let text =
            FLASH_VIDEO.replace_all(&text, format!("<video src=\"{ATTACHMENT_BASE}$1\"></video>"));
        let text = FLASH_AUDIO.replace_all(
            &text,
            format!(
                "<audio controls><source type=\"audio/mp3\" src=\"{ATTACHMENT_BASE}$1\"></audio>"
            ),
        );

        // 14. album: wrap, then rewrite the inner attachment references
        let text = ALBUM.replace_all(&text, |caps: &Captures| {
            let inner = ALBUM_IMG.replace_all(
                &caps[2],
                format!("<img src=\"{ATTACHMENT_BASE}$1\"></img>"),
            );
            format!("<details><summary>{}</summary>{inner}</details>", &caps[1])
        });

        text.into_owned()
    }
}
