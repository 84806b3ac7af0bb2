//! Static Tattoo Catalog
//!
//! Ordered lookup tables shared by the translator and the tool handlers:
//! the style catalog, the closed vocabularies accepted by the tools, and the
//! placement phrases used when describing where a design sits on the body.

/// A single entry of the style catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleInfo {
    /// The machine key accepted by the tools (e.g. `neo_traditional`).
    pub key: &'static str,
    /// The human-readable display name.
    pub name: &'static str,
    pub description: &'static str,
    /// Comma-separated imagery keywords folded into generation prompts.
    pub keywords: &'static str,
}

/// Key of the style used when a lookup misses.
pub const FALLBACK_STYLE: &str = "minimalist";

/// Every supported style, in presentation order.
pub const STYLES: &[StyleInfo] = &[
    StyleInfo {
        key: "traditional",
        name: "Traditional / Old School",
        description: "Bold black outlines, limited color palette, iconic imagery like anchors, roses, eagles",
        keywords: "bold lines, saturated colors, classic americana, sailor jerry",
    },
    StyleInfo {
        key: "neo_traditional",
        name: "Neo-Traditional",
        description: "Evolution of traditional with more colors, detail, and artistic freedom",
        keywords: "ornate, decorative, rich colors, art nouveau influence",
    },
    StyleInfo {
        key: "realism",
        name: "Realism",
        description: "Photorealistic portraits, nature, or objects with incredible detail",
        keywords: "photorealistic, portraits, detailed shading, lifelike",
    },
    StyleInfo {
        key: "watercolor",
        name: "Watercolor",
        description: "Fluid, painterly style with color splashes and soft edges",
        keywords: "splashes, drips, soft edges, artistic, flowing",
    },
    StyleInfo {
        key: "geometric",
        name: "Geometric",
        description: "Precise shapes, patterns, and mathematical designs",
        keywords: "sacred geometry, mandalas, patterns, symmetry, dotwork",
    },
    StyleInfo {
        key: "minimalist",
        name: "Minimalist",
        description: "Simple, clean lines with minimal detail - less is more",
        keywords: "fine line, simple, delicate, small, subtle",
    },
    StyleInfo {
        key: "japanese",
        name: "Japanese / Irezumi",
        description: "Traditional Japanese imagery: koi, dragons, waves, cherry blossoms",
        keywords: "irezumi, waves, koi fish, dragons, cherry blossoms, full sleeves",
    },
    StyleInfo {
        key: "blackwork",
        name: "Blackwork",
        description: "Bold black ink only - tribal, ornamental, or illustrative",
        keywords: "solid black, tribal, ornamental, bold, graphic",
    },
    StyleInfo {
        key: "dotwork",
        name: "Dotwork",
        description: "Images created entirely from dots, often geometric or mandala designs",
        keywords: "stippling, pointillism, mandalas, gradients from dots",
    },
    StyleInfo {
        key: "illustrative",
        name: "Illustrative",
        description: "Like illustrations from books - can range from whimsical to dark",
        keywords: "storybook, artistic, sketch-like, creative",
    },
    StyleInfo {
        key: "sketch",
        name: "Sketch / Brushstroke",
        description: "Looks like pencil sketches or brush paintings, intentionally unfinished",
        keywords: "raw, artistic, brushstrokes, sketch marks visible",
    },
    StyleInfo {
        key: "biomechanical",
        name: "Biomechanical",
        description: "Fusion of organic and mechanical - skin peeled back to reveal machinery",
        keywords: "mechanical, organic, giger, futuristic, 3D effect",
    },
];

pub const STYLE_KEYS: &[&str] = &[
    "traditional",
    "neo_traditional",
    "realism",
    "watercolor",
    "geometric",
    "minimalist",
    "japanese",
    "blackwork",
    "dotwork",
    "illustrative",
    "sketch",
    "biomechanical",
];

pub const TONES: &[&str] = &[
    "dark", "soft", "bold", "peaceful", "playful", "raw", "elegant", "fierce",
];

pub const SIZES: &[&str] = &["tiny", "small", "medium", "large", "extra large"];

pub const COLOR_PREFERENCES: &[&str] = &["black_and_gray", "full_color", "limited_palette"];

/// Colour preference reported when the caller did not state one.
pub const DEFAULT_COLOR_PREFERENCE: &str = "black_and_gray";

/// Placement name to the body phrase used in prompts.
pub const PLACEMENTS: &[(&str, &str)] = &[
    ("forearm", "on inner forearm"),
    ("upper arm", "on upper arm"),
    ("shoulder", "on shoulder"),
    ("back", "on back"),
    ("chest", "on chest"),
    ("ribs", "on ribcage"),
    ("leg", "on leg"),
    ("thigh", "on thigh"),
    ("calf", "on calf"),
    ("ankle", "on ankle"),
    ("wrist", "on wrist"),
    ("hand", "on hand"),
    ("neck", "on neck"),
    ("behind ear", "behind ear"),
];

/// Phrase used for placements missing from [`PLACEMENTS`].
pub const FALLBACK_PLACEMENT: &str = "on skin";

/// Looks up a style by key, returning `None` for unknown keys.
pub fn find_style(key: &str) -> Option<&'static StyleInfo> {
    STYLES.iter().find(|style| style.key == key)
}

/// Looks up a style by key, falling back to the minimalist entry.
pub fn style_or_fallback(key: &str) -> &'static StyleInfo {
    find_style(key)
        .or_else(|| find_style(FALLBACK_STYLE))
        .unwrap_or(&STYLES[5])
}

/// Maps a placement to its prompt phrase.
pub fn body_location(placement: Option<&str>) -> &'static str {
    placement
        .and_then(|p| PLACEMENTS.iter().find(|(name, _)| *name == p))
        .map(|(_, phrase)| *phrase)
        .unwrap_or(FALLBACK_PLACEMENT)
}
