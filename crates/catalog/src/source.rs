//! Source locator classification.
//!
//! Matching is plain substring/suffix work against fixed lists, the same way
//! the site decides between a `<video>` element and an `<iframe>`. A
//! self-hosted file on an unknown domain without a video extension is a
//! false negative: it is treated as an embed and simply never prefetched.

use regex::Regex;
use std::sync::LazyLock;

/// Object-storage domains the portfolio's raw video files are served from.
const DIRECT_HOSTS: &[&str] = &["qiniucs.com", "sabkt.gdipper.com", "myqcloud.com"];
/// File extensions that identify a raw video regardless of host.
const DIRECT_EXTENSIONS: &[&str] = &[".mp4", ".webm"];
/// Third-party player platforms. These always win over the checks above.
const EMBED_HOSTS: &[&str] = &["bilibili.com", "youtube.com", "youtu.be", "vimeo.com"];
const BILIBILI_HOST: &str = "bilibili.com";
const BILIBILI_PLAYER: &str = "//player.bilibili.com/player.html";

static BVID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"video/(BV\w+)").unwrap());

/// What kind of resource a source locator points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Raw media file on self-hosted object storage; eligible for prefetch.
    Direct,
    /// Bilibili video page; `bvid` is `None` when the id can't be found.
    Bilibili { bvid: Option<String> },
    /// Any other player page, embedded verbatim.
    Embed,
}

impl SourceKind {
    /// Player URL to load in an embedded frame, or `None` for direct files.
    ///
    /// ```
    /// use showreel_catalog::classify;
    ///
    /// let kind = classify("https://www.bilibili.com/video/BV1Rz42197ht/?spm_id_from=333");
    /// assert_eq!(
    ///     kind.embed_url("https://www.bilibili.com/video/BV1Rz42197ht/?spm_id_from=333").as_deref(),
    ///     Some("//player.bilibili.com/player.html?bvid=BV1Rz42197ht&page=1&high_quality=1&autoplay=0&danmaku=0"),
    /// );
    /// ```
    pub fn embed_url(&self, source: &str) -> Option<String> {
        match self {
            Self::Direct => None,
            Self::Bilibili { bvid } => Some(format!(
                "{BILIBILI_PLAYER}?bvid={}&page=1&high_quality=1&autoplay=0&danmaku=0",
                bvid.as_deref().unwrap_or_default()
            )),
            Self::Embed => Some(source.to_string()),
        }
    }
}

/// Classify a source locator.
pub fn classify(source: &str) -> SourceKind {
    if is_embed_host(source) {
        if source.contains(BILIBILI_HOST) {
            let bvid = BVID_REGEX.captures(source).map(|c| c[1].to_string());
            return SourceKind::Bilibili { bvid };
        }
        return SourceKind::Embed;
    }
    let path = strip_query(source);
    let direct_host = DIRECT_HOSTS.iter().any(|host| source.contains(host));
    let direct_ext = DIRECT_EXTENSIONS.iter().any(|ext| path.to_ascii_lowercase().ends_with(ext));
    match direct_host || direct_ext {
        true => SourceKind::Direct,
        false => SourceKind::Embed,
    }
}

/// Returns `true` iff the locator is a raw video file that may be fetched
/// ahead of playback.
///
/// ```
/// use showreel_catalog::is_direct_video_url;
///
/// assert!(is_direct_video_url("a.mp4"));
/// assert!(is_direct_video_url("https://bucket.cos.ap-shanghai.myqcloud.com/clip"));
/// assert!(!is_direct_video_url("bilibili.com/x"));
/// assert!(!is_direct_video_url("https://www.bilibili.com/video/clip.mp4"));
/// ```
pub fn is_direct_video_url(source: &str) -> bool {
    classify(source) == SourceKind::Direct
}

fn is_embed_host(source: &str) -> bool {
    EMBED_HOSTS.iter().any(|host| source.contains(host))
}

fn strip_query(source: &str) -> &str {
    source.split(['?', '#']).next().unwrap_or(source)
}
