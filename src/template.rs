//! Template message shapes
//!
//! Template messages are pushed through the platform's JSON API rather than
//! as passive replies. Only the payload shapes live here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::Result;

/// Template message sent to one follower
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMessage {
    /// Receiver OpenID
    pub touser: String,
    pub template_id: String,
    /// Opened when the user taps the message; must be in a configured domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topcolor: Option<String>,
    /// Pre-encoded JSON object matching the template's fields, emitted verbatim
    pub data: Box<RawValue>,
}

impl TemplateMessage {
    pub fn new(to_user: &str, template_id: &str, data: Box<RawValue>) -> Self {
        Self {
            touser: to_user.to_string(),
            template_id: template_id.to_string(),
            url: None,
            topcolor: None,
            data,
        }
    }

    /// Build from structured field data
    pub fn from_data(
        to_user: &str,
        template_id: &str,
        data: &TemplateMessageData,
    ) -> Result<Self> {
        Ok(Self::new(to_user, template_id, data.to_raw_json()?))
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_top_color(mut self, color: &str) -> Self {
        self.topcolor = Some(color.to_string());
        self
    }
}

/// Template message data (key-value pairs)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateMessageData {
    #[serde(flatten)]
    pub fields: BTreeMap<String, TemplateField>,
}

impl TemplateMessageData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(mut self, key: &str, value: &str, color: Option<&str>) -> Self {
        self.fields.insert(
            key.to_string(),
            TemplateField {
                value: value.to_string(),
                color: color.map(|s| s.to_string()),
            },
        );
        self
    }

    /// Encode into the raw `data` fragment of a [`TemplateMessage`]
    pub fn to_raw_json(&self) -> Result<Box<RawValue>> {
        Ok(serde_json::value::to_raw_value(self)?)
    }
}

/// A single field in a template message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateField {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Entry of the account's template list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub template_id: String,
    pub title: String,
    pub primary_industry: String,
    pub deputy_industry: String,
    pub content: String,
    pub example: String,
}

/// First/second class of an industry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndustryClass {
    pub first_class: String,
    pub second_class: String,
}

/// Industries the account is registered under
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndustryInfo {
    pub primary_industry: IndustryClass,
    pub secondary_industry: IndustryClass,
}
