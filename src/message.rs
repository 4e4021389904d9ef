//! Message types for the WeChat Official Account XML protocol
//!
//! Inbound messages and events parse into [`MixedMessage`]. Passive replies are
//! one struct per reply type, each serializing to an `<xml>` root the platform
//! accepts; [`Reply`] wraps them when the type is only known at runtime.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Maximum number of articles in a news reply
pub const MAX_NEWS_ARTICLES: usize = 8;

// =============================================================================
// Inbound
// =============================================================================

/// Message type enumeration (inbound)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
    Text,
    Image,
    Voice,
    Video,
    ShortVideo,
    Location,
    Link,
    Event,
    Unknown,
}

impl From<&str> for MsgType {
    fn from(s: &str) -> Self {
        match s.trim() {
            "text" => MsgType::Text,
            "image" => MsgType::Image,
            "voice" => MsgType::Voice,
            "video" => MsgType::Video,
            "shortvideo" => MsgType::ShortVideo,
            "location" => MsgType::Location,
            "link" => MsgType::Link,
            "event" => MsgType::Event,
            _ => MsgType::Unknown,
        }
    }
}

/// Any message or event pushed by the platform
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "xml")]
pub struct MixedMessage {
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    /// Raw `MsgType` text; see [`MixedMessage::kind`]
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "Content", default)]
    pub content: Option<String>,
    #[serde(rename = "MsgId", default)]
    pub msg_id: Option<i64>,
    #[serde(rename = "PicUrl", default)]
    pub pic_url: Option<String>,
    #[serde(rename = "MediaId", default)]
    pub media_id: Option<String>,
    #[serde(rename = "Format", default)]
    pub format: Option<String>,
    #[serde(rename = "Recognition", default)]
    pub recognition: Option<String>,
    #[serde(rename = "ThumbMediaId", default)]
    pub thumb_media_id: Option<String>,
    #[serde(rename = "Location_X", default)]
    pub location_x: Option<f64>,
    #[serde(rename = "Location_Y", default)]
    pub location_y: Option<f64>,
    #[serde(rename = "Scale", default)]
    pub scale: Option<u32>,
    #[serde(rename = "Label", default)]
    pub label: Option<String>,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Url", default)]
    pub url: Option<String>,
    #[serde(rename = "Event", default)]
    pub event: Option<String>,
    #[serde(rename = "EventKey", default)]
    pub event_key: Option<String>,
    #[serde(rename = "Ticket", default)]
    pub ticket: Option<String>,
}

impl MixedMessage {
    /// Parse the (already decrypted) XML of an inbound message
    pub fn from_xml(raw_xml: &[u8]) -> Result<Self> {
        Ok(serde_xml_rs::from_reader(raw_xml)?)
    }

    pub fn kind(&self) -> MsgType {
        MsgType::from(self.msg_type.as_str())
    }

    /// Text reply addressed back to the sender
    pub fn text_reply(&self, content: impl Into<String>) -> Text {
        Text::new(
            &self.from_user_name,
            &self.to_user_name,
            chrono::Utc::now().timestamp(),
            content,
        )
    }
}

// =============================================================================
// Passive replies
// =============================================================================

/// `<Image>`, `<Voice>` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaBody {
    #[serde(rename = "MediaId")]
    pub media_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "xml")]
pub struct Text {
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "Content")]
    pub content: String,
}

impl Text {
    pub fn new(
        to_user: &str,
        from_user: &str,
        create_time: i64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            to_user_name: to_user.to_string(),
            from_user_name: from_user.to_string(),
            create_time,
            msg_type: "text".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "xml")]
pub struct Image {
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "Image")]
    pub image: MediaBody,
}

impl Image {
    pub fn new(to_user: &str, from_user: &str, create_time: i64, media_id: &str) -> Self {
        Self {
            to_user_name: to_user.to_string(),
            from_user_name: from_user.to_string(),
            create_time,
            msg_type: "image".to_string(),
            image: MediaBody {
                media_id: media_id.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "xml")]
pub struct Voice {
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "Voice")]
    pub voice: MediaBody,
}

impl Voice {
    pub fn new(to_user: &str, from_user: &str, create_time: i64, media_id: &str) -> Self {
        Self {
            to_user_name: to_user.to_string(),
            from_user_name: from_user.to_string(),
            create_time,
            msg_type: "voice".to_string(),
            voice: MediaBody {
                media_id: media_id.to_string(),
            },
        }
    }
}

/// `<Video>` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoBody {
    #[serde(rename = "MediaId")]
    pub media_id: String,
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "xml")]
pub struct Video {
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "Video")]
    pub video: VideoBody,
}

impl Video {
    pub fn new(
        to_user: &str,
        from_user: &str,
        create_time: i64,
        media_id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Self {
        Self {
            to_user_name: to_user.to_string(),
            from_user_name: from_user.to_string(),
            create_time,
            msg_type: "video".to_string(),
            video: VideoBody {
                media_id: media_id.to_string(),
                title: title.map(|s| s.to_string()),
                description: description.map(|s| s.to_string()),
            },
        }
    }
}

/// `<Music>` body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MusicBody {
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "MusicUrl", default, skip_serializing_if = "Option::is_none")]
    pub music_url: Option<String>,
    #[serde(rename = "HQMusicUrl", default, skip_serializing_if = "Option::is_none")]
    pub hq_music_url: Option<String>,
    #[serde(rename = "ThumbMediaId")]
    pub thumb_media_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "xml")]
pub struct Music {
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "Music")]
    pub music: MusicBody,
}

impl Music {
    pub fn new(to_user: &str, from_user: &str, create_time: i64, music: MusicBody) -> Self {
        Self {
            to_user_name: to_user.to_string(),
            from_user_name: from_user.to_string(),
            create_time,
            msg_type: "music".to_string(),
            music,
        }
    }
}

/// One entry of a news reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "PicUrl", default, skip_serializing_if = "Option::is_none")]
    pub pic_url: Option<String>,
    #[serde(rename = "Url", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// `<Articles>` body holding repeated `<item>` elements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Articles {
    #[serde(rename = "item", default)]
    pub items: Vec<Article>,
}

/// News reply. `ArticleCount` always matches the number of items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename = "xml")]
pub struct News {
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "ArticleCount")]
    article_count: usize,
    #[serde(rename = "Articles")]
    articles: Articles,
}

impl News {
    /// Articles beyond [`MAX_NEWS_ARTICLES`] are dropped; the platform rejects longer lists.
    pub fn new(
        to_user: &str,
        from_user: &str,
        create_time: i64,
        mut articles: Vec<Article>,
    ) -> Self {
        articles.truncate(MAX_NEWS_ARTICLES);
        Self {
            to_user_name: to_user.to_string(),
            from_user_name: from_user.to_string(),
            create_time,
            msg_type: "news".to_string(),
            article_count: articles.len(),
            articles: Articles { items: articles },
        }
    }

    pub fn article_count(&self) -> usize {
        self.article_count
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles.items
    }
}

/// `<TransInfo>` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransInfo {
    #[serde(rename = "KfAccount")]
    pub kf_account: String,
}

/// Hand the conversation over to the customer-service system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "xml")]
pub struct TransferToCustomerService {
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "TransInfo", default, skip_serializing_if = "Option::is_none")]
    pub trans_info: Option<TransInfo>,
}

impl TransferToCustomerService {
    /// `kf_account` pins the session to one agent; `None` lets the platform pick.
    pub fn new(
        to_user: &str,
        from_user: &str,
        create_time: i64,
        kf_account: Option<&str>,
    ) -> Self {
        Self {
            to_user_name: to_user.to_string(),
            from_user_name: from_user.to_string(),
            create_time,
            msg_type: "transfer_customer_service".to_string(),
            trans_info: kf_account.map(|account| TransInfo {
                kf_account: account.to_string(),
            }),
        }
    }
}

/// Any passive reply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Text(Text),
    Image(Image),
    Voice(Voice),
    Video(Video),
    Music(Music),
    News(News),
    TransferToCustomerService(TransferToCustomerService),
}

impl Reply {
    pub fn msg_type(&self) -> &str {
        match self {
            Reply::Text(m) => &m.msg_type,
            Reply::Image(m) => &m.msg_type,
            Reply::Voice(m) => &m.msg_type,
            Reply::Video(m) => &m.msg_type,
            Reply::Music(m) => &m.msg_type,
            Reply::News(m) => &m.msg_type,
            Reply::TransferToCustomerService(m) => &m.msg_type,
        }
    }
}

impl From<Text> for Reply {
    fn from(m: Text) -> Self {
        Reply::Text(m)
    }
}

impl From<Image> for Reply {
    fn from(m: Image) -> Self {
        Reply::Image(m)
    }
}

impl From<Voice> for Reply {
    fn from(m: Voice) -> Self {
        Reply::Voice(m)
    }
}

impl From<Video> for Reply {
    fn from(m: Video) -> Self {
        Reply::Video(m)
    }
}

impl From<Music> for Reply {
    fn from(m: Music) -> Self {
        Reply::Music(m)
    }
}

impl From<News> for Reply {
    fn from(m: News) -> Self {
        Reply::News(m)
    }
}

impl From<TransferToCustomerService> for Reply {
    fn from(m: TransferToCustomerService) -> Self {
        Reply::TransferToCustomerService(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_message_parsing() {
        let xml = r#"<xml>
            <ToUserName><![CDATA[gh_abc]]></ToUserName>
            <FromUserName><![CDATA[openid123]]></FromUserName>
            <CreateTime>1348831860</CreateTime>
            <MsgType><![CDATA[text]]></MsgType>
            <Content><![CDATA[this is a test]]></Content>
            <MsgId>1234567890123456</MsgId>
        </xml>"#;

        let msg = MixedMessage::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(msg.to_user_name, "gh_abc");
        assert_eq!(msg.from_user_name, "openid123");
        assert_eq!(msg.kind(), MsgType::Text);
        assert_eq!(msg.msg_type, "text");
        assert_eq!(msg.content.as_deref(), Some("this is a test"));
        assert_eq!(msg.msg_id, Some(1234567890123456));
    }

    #[test]
    fn test_event_parsing() {
        let xml = r#"<xml>
            <ToUserName><![CDATA[gh_abc]]></ToUserName>
            <FromUserName><![CDATA[openid123]]></FromUserName>
            <CreateTime>123456789</CreateTime>
            <MsgType><![CDATA[event]]></MsgType>
            <Event><![CDATA[subscribe]]></Event>
        </xml>"#;

        let msg = MixedMessage::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(msg.kind(), MsgType::Event);
        assert_eq!(msg.event.as_deref(), Some("subscribe"));
        assert!(msg.content.is_none());
    }

    #[test]
    fn test_text_reply_swaps_users() {
        let xml = r#"<xml><ToUserName>gh_abc</ToUserName><FromUserName>openid123</FromUserName><CreateTime>1</CreateTime><MsgType>text</MsgType><Content>hi</Content></xml>"#;
        let msg = MixedMessage::from_xml(xml.as_bytes()).unwrap();

        let reply = msg.text_reply("hello back");
        assert_eq!(reply.to_user_name, "openid123");
        assert_eq!(reply.from_user_name, "gh_abc");
        assert_eq!(reply.msg_type, "text");
        assert!(reply.create_time > 1);
    }

    #[test]
    fn test_msg_type_from_str() {
        assert_eq!(MsgType::from("shortvideo"), MsgType::ShortVideo);
        assert_eq!(MsgType::from("location"), MsgType::Location);
        assert_eq!(MsgType::from("miniprogrampage"), MsgType::Unknown);

        let xml = "<xml><ToUserName>gh_abc</ToUserName><FromUserName>openid123</FromUserName>\
            <CreateTime>1</CreateTime><MsgType>location</MsgType>\
            <Location_X>23.134521</Location_X><Location_Y>113.358803</Location_Y>\
            <Scale>20</Scale><Label>somewhere</Label><MsgId>42</MsgId></xml>";
        let msg = MixedMessage::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(msg.kind(), MsgType::Location);
        assert_eq!(msg.scale, Some(20));
        assert_eq!(msg.label.as_deref(), Some("somewhere"));
    }

    #[test]
    fn test_text_serialize() {
        let reply = Text::new("openid123", "gh_abc", 1700000000, "hi");
        let xml = serde_xml_rs::to_string(&reply).unwrap();

        assert!(xml.contains("<xml><ToUserName>openid123</ToUserName>"));
        assert!(xml.contains("<CreateTime>1700000000</CreateTime>"));
        assert!(xml.contains("<MsgType>text</MsgType><Content>hi</Content></xml>"));
    }

    #[test]
    fn test_image_serialize() {
        let reply = Image::new("openid123", "gh_abc", 1, "media-1");
        let xml = serde_xml_rs::to_string(&reply).unwrap();
        assert!(xml.contains("<Image><MediaId>media-1</MediaId></Image>"));
    }

    #[test]
    fn test_video_and_music_skip_empty_fields() {
        let video = Video::new("openid123", "gh_abc", 1, "media-2", Some("clip"), None);
        let xml = serde_xml_rs::to_string(&video).unwrap();
        assert!(xml.contains("<Video><MediaId>media-2</MediaId><Title>clip</Title></Video>"));

        let music = Music::new(
            "openid123",
            "gh_abc",
            1,
            MusicBody {
                music_url: Some("https://example.com/a.mp3".to_string()),
                thumb_media_id: "thumb-1".to_string(),
                ..Default::default()
            },
        );
        let xml = serde_xml_rs::to_string(&music).unwrap();
        assert!(xml.contains(
            "<Music><MusicUrl>https://example.com/a.mp3</MusicUrl><ThumbMediaId>thumb-1</ThumbMediaId></Music>"
        ));
        assert!(!xml.contains("HQMusicUrl"));
    }

    #[test]
    fn test_news_serialize_truncates() {
        let articles = (0..10)
            .map(|i| Article {
                title: Some(format!("title {i}")),
                url: Some(format!("https://example.com/{i}")),
                ..Default::default()
            })
            .collect();
        let reply = News::new("openid123", "gh_abc", 1, articles);
        assert_eq!(reply.article_count(), MAX_NEWS_ARTICLES);
        assert_eq!(reply.articles().len(), reply.article_count());

        let xml = serde_xml_rs::to_string(&reply).unwrap();
        assert!(xml.contains("<ArticleCount>8</ArticleCount>"));
        assert_eq!(xml.matches("<item>").count(), MAX_NEWS_ARTICLES);
        assert!(xml.contains("<item><Title>title 0</Title><Url>https://example.com/0</Url></item>"));
        assert!(!xml.contains("title 8"));
    }

    #[test]
    fn test_transfer_without_account() {
        let reply = TransferToCustomerService::new("openid123", "gh_abc", 1, None);
        let xml = serde_xml_rs::to_string(&reply).unwrap();
        assert!(xml.contains("<MsgType>transfer_customer_service</MsgType>"));
        assert!(!xml.contains("TransInfo"));
    }

    #[test]
    fn test_reply_enum_serializes_inner() {
        let text = Text::new("openid123", "gh_abc", 1, "hi");
        let reply = Reply::from(text.clone());
        assert_eq!(reply.msg_type(), "text");
        assert_eq!(
            serde_xml_rs::to_string(&reply).unwrap(),
            serde_xml_rs::to_string(&text).unwrap()
        );
    }
}
