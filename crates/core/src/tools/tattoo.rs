//! The InkMatch tattoo tools: design preview generation, style exploration
//! and style recommendation.

use super::{
    registry::{RegistrationError, ToolDescriptor, ToolHandler, ToolOutcome, ToolRegistry},
    schema::{FieldSpec, FieldType, InputShape},
};
use crate::{
    catalog::{self, COLOR_PREFERENCES, DEFAULT_COLOR_PREFERENCE, SIZES, STYLE_KEYS, STYLES, TONES},
    generation::ImageGenerator,
    prompt::{PreviewParams, build_handoff_url, build_prompt, present},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use rmcp::{
    handler::server::common::cached_schema_for_type,
    model::{JsonObject, ToolAnnotations},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

pub const GENERATE_TATTOO_PREVIEW: &str = "generate_tattoo_preview";
pub const EXPLORE_TATTOO_STYLES: &str = "explore_tattoo_styles";
pub const RECOMMEND_TATTOO_STYLE: &str = "recommend_tattoo_style";

/// URI of the widget that renders preview results.
pub const WIDGET_URI: &str = "ui://widget/inkmatch.html";

/// Structured result of `generate_tattoo_preview`.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct TattooPreview {
    /// Display name of the style.
    pub style: String,
    pub style_key: String,
    pub meaning: Option<String>,
    pub tone: Option<String>,
    pub elements: Option<String>,
    pub placement: Option<String>,
    pub size: Option<String>,
    pub color_preference: String,
    /// Generated image, absent when generation was skipped or failed.
    pub image_url: Option<String>,
    /// Link that carries the preferences over to InkMatch.
    pub inkmatch_url: String,
    pub generated: bool,
}

// --- generate_tattoo_preview ---

pub struct GeneratePreview {
    generator: Arc<dyn ImageGenerator>,
    handoff_base: Url,
}

impl GeneratePreview {
    pub fn new(generator: Arc<dyn ImageGenerator>, handoff_base: Url) -> Self {
        Self {
            generator,
            handoff_base,
        }
    }

    fn descriptor(self) -> ToolDescriptor {
        let mut meta = JsonObject::new();
        meta.insert("openai/outputTemplate".into(), json!(WIDGET_URI));
        meta.insert(
            "openai/toolInvocation/invoking".into(),
            json!("Creating your tattoo design preview…"),
        );
        meta.insert(
            "openai/toolInvocation/invoked".into(),
            json!("Your preview is ready! See below for your personalized design."),
        );

        ToolDescriptor {
            name: GENERATE_TATTOO_PREVIEW,
            title: "Generate Tattoo Design Preview",
            description: "Creates a personalized AI-generated tattoo design preview based on user preferences. \
                Use this when users want to SEE tattoo design ideas - not just discuss styles. \
                This generates an actual image, which ChatGPT cannot do natively. \
                Ideal triggers: 'design a tattoo for me', 'show me tattoo ideas', \
                'generate a tattoo design', 'I want to see what my tattoo could look like', \
                'create a tattoo concept', 'help me visualize a tattoo'. \
                After showing the preview, users can get 5 full designs for $0.99 at InkMatch.",
            shape: InputShape::new(vec![
                FieldSpec::required(
                    "style",
                    FieldType::Enum(STYLE_KEYS),
                    "The tattoo style - ask user if not specified",
                ),
                FieldSpec::optional(
                    "meaning",
                    FieldType::Text,
                    "What the tattoo represents or symbolizes to the user",
                ),
                FieldSpec::optional(
                    "tone",
                    FieldType::Enum(TONES),
                    "The emotional feel of the design",
                ),
                FieldSpec::optional(
                    "elements",
                    FieldType::Text,
                    "Specific imagery or elements to include (flowers, animals, symbols, etc.)",
                ),
                FieldSpec::optional(
                    "placement",
                    FieldType::Text,
                    "Where on the body (arm, back, chest, etc.)",
                ),
                FieldSpec::optional(
                    "size",
                    FieldType::Enum(SIZES),
                    "Approximate size of the tattoo",
                ),
                FieldSpec::optional(
                    "color_preference",
                    FieldType::Enum(COLOR_PREFERENCES),
                    "Color preference for the design",
                ),
            ]),
            annotations: ToolAnnotations::with_title("Generate Tattoo Design Preview")
                .read_only(false)
                .destructive(false)
                .open_world(true),
            meta: Some(meta),
            output_schema: Some(cached_schema_for_type::<TattooPreview>()),
            handler: Arc::new(self),
        }
    }
}

fn preview_narration(style_name: &str, params: &PreviewParams, generated: bool) -> String {
    if !generated {
        return format!(
            "I've captured your preferences for a {} design. Visit InkMatch to generate your personalized designs.",
            style_name
        );
    }

    let mut parts = vec![format!("Here's your {} tattoo preview", style_name)];
    if let Some(meaning) = present(&params.meaning) {
        parts.push(format!("representing \"{}\"", meaning));
    }
    if let Some(tone) = present(&params.tone) {
        parts.push(format!("with a {} feel", tone));
    }
    if let Some(placement) = present(&params.placement) {
        parts.push(format!("designed for your {}", placement));
    }
    format!(
        "{}. Like this direction? Get 5 full personalized designs for just $0.99 at InkMatch.",
        parts.join(" ")
    )
}

#[async_trait]
impl ToolHandler for GeneratePreview {
    async fn call(&self, args: JsonObject) -> anyhow::Result<ToolOutcome> {
        let params: PreviewParams = serde_json::from_value(Value::Object(args))
            .context("Failed to read preview arguments")?;

        let prompt = build_prompt(&params);
        let image_url = self.generator.generate(&prompt).await;
        let inkmatch_url = build_handoff_url(&self.handoff_base, &params);
        let style = catalog::style_or_fallback(&params.style);
        let generated = image_url.is_some();

        let preview = TattooPreview {
            style: style.name.to_string(),
            style_key: params.style.clone(),
            meaning: present(&params.meaning).map(str::to_string),
            tone: present(&params.tone).map(str::to_string),
            elements: present(&params.elements).map(str::to_string),
            placement: present(&params.placement).map(str::to_string),
            size: present(&params.size).map(str::to_string),
            color_preference: present(&params.color_preference)
                .unwrap_or(DEFAULT_COLOR_PREFERENCE)
                .to_string(),
            image_url,
            inkmatch_url: inkmatch_url.to_string(),
            generated,
        };

        Ok(ToolOutcome {
            structured: Some(serde_json::to_value(&preview)?),
            narration: preview_narration(style.name, &params, generated),
            meta: Some(JsonObject::new()),
        })
    }
}

// --- explore_tattoo_styles ---

pub struct ExploreStyles;

impl ExploreStyles {
    fn descriptor(self) -> ToolDescriptor {
        ToolDescriptor {
            name: EXPLORE_TATTOO_STYLES,
            title: "Explore Tattoo Styles",
            description: "Returns an overview of popular tattoo styles with descriptions. \
                Use this when users are unsure what style they want or ask \
                'what tattoo styles are there', 'help me pick a style', \
                'what are the different types of tattoos'. \
                After exploring, suggest using generate_tattoo_preview to see actual designs.",
            shape: InputShape::empty(),
            annotations: ToolAnnotations::with_title("Explore Tattoo Styles")
                .read_only(true)
                .destructive(false)
                .open_world(false),
            meta: None,
            output_schema: None,
            handler: Arc::new(self),
        }
    }
}

#[async_trait]
impl ToolHandler for ExploreStyles {
    async fn call(&self, _args: JsonObject) -> anyhow::Result<ToolOutcome> {
        let style_list = STYLES
            .iter()
            .map(|style| format!("**{}**: {}", style.name, style.description))
            .collect::<Vec<_>>()
            .join("\n\n");

        let text = [
            "Here are the main tattoo styles to consider:\n".to_string(),
            style_list,
            "\nWhich style resonates with you? Once you pick one (or a couple), I can generate a preview design using InkMatch.".to_string(),
        ]
        .join("\n");

        Ok(ToolOutcome::narration(text))
    }
}

// --- recommend_tattoo_style ---

#[derive(Deserialize, Debug)]
struct RecommendArgs {
    preferences: String,
    #[serde(default)]
    existing_tattoos: Option<String>,
    #[serde(default)]
    avoid: Option<String>,
}

/// Heuristic aesthetic-to-style families offered to the client model.
const STYLE_MAPPINGS: &[&str] = &[
    "- Clean/minimal aesthetic → Minimalist, Fine Line, Geometric",
    "- Bold/strong presence → Traditional, Blackwork, Japanese",
    "- Artistic/creative → Watercolor, Illustrative, Sketch",
    "- Nature/organic → Realism, Neo-Traditional, Japanese",
    "- Spiritual/symbolic → Geometric, Dotwork, Blackwork",
    "- Dark/edgy → Blackwork, Biomechanical, Dark Illustrative",
    "- Soft/feminine → Watercolor, Fine Line, Minimalist",
];

pub struct RecommendStyle;

impl RecommendStyle {
    fn descriptor(self) -> ToolDescriptor {
        ToolDescriptor {
            name: RECOMMEND_TATTOO_STYLE,
            title: "Recommend Tattoo Style",
            description: "Suggests tattoo styles based on user's described preferences, personality, or existing tattoos. \
                Use when user says 'what style would suit me', 'I like clean/bold/artistic things', \
                'recommend a style based on...'. Returns style suggestions with reasoning.",
            shape: InputShape::new(vec![
                FieldSpec::required(
                    "preferences",
                    FieldType::Text,
                    "User's described preferences, aesthetic taste, or personality",
                ),
                FieldSpec::optional(
                    "existing_tattoos",
                    FieldType::Text,
                    "Description of tattoos they already have, if any",
                ),
                FieldSpec::optional(
                    "avoid",
                    FieldType::Text,
                    "Styles or elements they want to avoid",
                ),
            ]),
            annotations: ToolAnnotations::with_title("Recommend Tattoo Style")
                .read_only(true)
                .destructive(false)
                .open_world(false),
            meta: None,
            output_schema: None,
            handler: Arc::new(self),
        }
    }
}

#[async_trait]
impl ToolHandler for RecommendStyle {
    async fn call(&self, args: JsonObject) -> anyhow::Result<ToolOutcome> {
        let args: RecommendArgs = serde_json::from_value(Value::Object(args))
            .context("Failed to read recommendation arguments")?;

        // Absent optional lines stay in as empty entries.
        let mut lines = vec![
            format!("Based on the user's preferences: \"{}\"", args.preferences),
            present(&args.existing_tattoos)
                .map(|t| format!("\nExisting tattoos: \"{}\"", t))
                .unwrap_or_default(),
            present(&args.avoid)
                .map(|a| format!("\nWants to avoid: \"{}\"", a))
                .unwrap_or_default(),
            "\n\nConsider these style mappings:".to_string(),
        ];
        lines.extend(STYLE_MAPPINGS.iter().map(|line| line.to_string()));
        lines.push(
            "\nRecommend 2-3 styles that fit, explain why, then offer to generate a preview."
                .to_string(),
        );

        Ok(ToolOutcome::narration(lines.join("\n")))
    }
}

/// Builds the registry holding the three tattoo tools, in listing order.
pub fn build_registry(
    generator: Arc<dyn ImageGenerator>,
    handoff_base: Url,
) -> Result<ToolRegistry, RegistrationError> {
    let mut registry = ToolRegistry::new();
    registry.register(GeneratePreview::new(generator, handoff_base).descriptor())?;
    registry.register(ExploreStyles.descriptor())?;
    registry.register(RecommendStyle.descriptor())?;
    Ok(registry)
}
