//! Prompt and Handoff Translation
//!
//! Pure functions that turn the structured preview request into the text
//! prompt sent to the image model and into the InkMatch handoff link that
//! carries the caller's preferences over to the web app.

use crate::catalog;
use reqwest::Url;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured input of a preview request.
///
/// Enumerated fields are checked against the catalog vocabularies before a
/// value of this type is ever built, so the translator never sees them out
/// of range.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq)]
pub struct PreviewParams {
    pub style: String,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub elements: Option<String>,
    #[serde(default)]
    pub placement: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color_preference: Option<String>,
}

impl PreviewParams {
    pub fn new(style: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            ..Default::default()
        }
    }
}

/// Treats empty strings the same as absent values.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn color_instruction(color_preference: Option<&str>) -> &'static str {
    match color_preference {
        Some("black_and_gray") => "black and gray ink",
        Some("full_color") => "vibrant full color ink",
        _ => "limited color palette",
    }
}

/// Builds the image-model prompt for a preview request.
pub fn build_prompt(params: &PreviewParams) -> String {
    let style = catalog::style_or_fallback(&params.style);
    let location = catalog::body_location(present(&params.placement));
    let tone = present(&params.tone).unwrap_or("balanced");

    let mut parts = vec![
        format!("Beautiful {} tattoo {},", style.name, location),
        format!("{} mood,", tone),
    ];
    if let Some(meaning) = present(&params.meaning) {
        parts.push(format!("representing {},", meaning));
    }
    if let Some(elements) = present(&params.elements) {
        parts.push(format!("featuring {},", elements));
    }
    parts.push(format!(
        "{},",
        color_instruction(present(&params.color_preference))
    ));
    parts.push(format!("{},", style.keywords));
    parts.extend(
        [
            "professional tattoo photography,",
            "high quality editorial photo,",
            "natural lighting,",
            "sharp detail,",
            "beautiful composition",
        ]
        .map(String::from),
    );

    parts.join(" ")
}

/// Builds the InkMatch link that pre-fills the caller's preferences.
///
/// `ref=chatgpt` always comes first; every other pair is added only when the
/// corresponding field is present.
pub fn build_handoff_url(base: &Url, params: &PreviewParams) -> Url {
    let mut url = base.clone();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("ref", "chatgpt");
        let pairs = [
            ("style", Some(params.style.as_str()).filter(|s| !s.is_empty())),
            ("meaning", present(&params.meaning)),
            ("tone", present(&params.tone)),
            ("placement", present(&params.placement)),
            ("size", present(&params.size)),
            ("color", present(&params.color_preference)),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                query.append_pair(key, value);
            }
        }
    }
    url
}
