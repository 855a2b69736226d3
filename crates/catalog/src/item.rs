use crate::source::{SourceKind, classify};
use serde::{Deserialize, Serialize};

/// One entry of the video catalog.
///
/// Hand-written catalog files use `videoUrl` for the
/// source locator; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Often left blank in hand-written catalogs.
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<String>,
    /// Site-relative path of the thumbnail image.
    pub thumbnail: String,
    /// Where the video lives: a raw file URL or a third-party player page.
    #[serde(alias = "videoUrl")]
    pub source: String,
    pub category: String,
}

impl MediaItem {
    pub fn source_kind(&self) -> SourceKind {
        classify(&self.source)
    }

    /// Whether this item may be fetched ahead of playback.
    pub fn is_direct(&self) -> bool {
        self.source_kind() == SourceKind::Direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_video_url_alias() {
        let json = r#"{
            "id": "",
            "title": "LPL",
            "description": "Player Story | JDG 369",
            "date": "",
            "thumbnail": "/thumbnails/03.jpg",
            "videoUrl": "https://botamon24-1351813449.cos.ap-shanghai.myqcloud.com/369.mp4",
            "category": "Yuetui Productions"
        }"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.title, "LPL");
        assert_eq!(item.category, "Yuetui Productions");
        assert!(item.is_direct());
    }

    #[test]
    fn test_deserialize_minimal() {
        let json = r#"{"title": "Valorant", "thumbnail": "/t.webp", "source": "https://www.bilibili.com/video/BV1Rz42197ht/", "category": "Trace Esports"}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert!(item.id.is_empty());
        assert!(item.description.is_empty());
        assert_eq!(item.date, None);
        assert!(!item.is_direct());
    }
}
