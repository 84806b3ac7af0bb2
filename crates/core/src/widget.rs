//! The preview widget served to the client as an MCP resource.

use crate::tools::tattoo::WIDGET_URI;
use rmcp::model::{AnnotateAble, JsonObject, Meta, RawResource, Resource, ResourceContents};
use serde_json::json;
use std::path::Path;

pub const WIDGET_NAME: &str = "inkmatch-widget";
pub const WIDGET_MIME_TYPE: &str = "text/html+skybridge";

/// Widget HTML loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    html: String,
}

impl Widget {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        std::fs::read_to_string(path).map(Self::from_html)
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Listing entry for `resources/list`.
    pub fn resource(&self) -> Resource {
        let mut raw = RawResource::new(WIDGET_URI, WIDGET_NAME);
        raw.description =
            Some("AI tattoo design preview with personalized recommendations".to_string());
        raw.mime_type = Some(WIDGET_MIME_TYPE.to_string());
        raw.no_annotation()
    }

    /// Body returned by `resources/read`, with the rendering hints the client
    /// needs to sandbox the widget.
    pub fn contents(&self) -> ResourceContents {
        let mut meta = JsonObject::new();
        meta.insert("openai/widgetPrefersBorder".into(), json!(true));
        meta.insert(
            "openai/widgetCSP".into(),
            json!({
                "connect_domains": ["https://inkmatch.io"],
                "image_domains": ["https://replicate.delivery", "https://*.replicate.delivery"],
            }),
        );

        ResourceContents::TextResourceContents {
            uri: WIDGET_URI.to_string(),
            mime_type: Some(WIDGET_MIME_TYPE.to_string()),
            text: self.html.clone(),
            meta: Some(Meta(meta)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_contents_carry_csp_hints() {
        let widget = Widget::from_html("<div id=\"root\"></div>");
        let value = serde_json::to_value(widget.contents()).unwrap();

        assert_eq!(value["uri"], "ui://widget/inkmatch.html");
        assert_eq!(value["mimeType"], "text/html+skybridge");
        assert_eq!(value["text"], "<div id=\"root\"></div>");
        assert_eq!(value["_meta"]["openai/widgetPrefersBorder"], Value::Bool(true));
        assert_eq!(
            value["_meta"]["openai/widgetCSP"]["image_domains"][1],
            "https://*.replicate.delivery"
        );
    }

    #[test]
    fn test_resource_listing() {
        let resource = Widget::from_html("").resource();
        assert_eq!(resource.raw.name, WIDGET_NAME);
        assert_eq!(resource.raw.mime_type.as_deref(), Some(WIDGET_MIME_TYPE));
    }
}
