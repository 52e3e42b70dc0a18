//! Instruction builder for the try-on model.
//!
//! The model receives an ordered image list: the subject photo first, then
//! each garment. The instruction refers to images by that 1-based position.

use std::str::FromStr;
use strum::EnumString;

use crate::models::tryon::TryOnInput;

/// Label used when a garment has no tag or an unrecognized one.
pub const GENERIC_LABEL: &str = "clothing item";

const PRESERVE_CLAUSE: &str =
    "while preserving their face and identity, their exact pose, and the original background";

/// Closed set of garment categories the client can tag an image with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum GarmentCategory {
    #[strum(serialize = "top", serialize = "tops", serialize = "shirt", serialize = "t-shirt", serialize = "blouse")]
    Top,
    #[strum(serialize = "bottom", serialize = "bottoms", serialize = "pants", serialize = "trousers", serialize = "jeans")]
    Bottom,
    #[strum(serialize = "skirt", serialize = "skirts")]
    Skirt,
    #[strum(serialize = "dress", serialize = "dresses")]
    Dress,
    #[strum(serialize = "outerwear", serialize = "jacket", serialize = "coat")]
    Outerwear,
    #[strum(serialize = "shoes", serialize = "footwear", serialize = "sneakers")]
    Shoes,
    #[strum(serialize = "accessory", serialize = "accessories", serialize = "bag", serialize = "hat")]
    Accessory,
}

impl GarmentCategory {
    pub fn label(self) -> &'static str {
        match self {
            GarmentCategory::Top => "top",
            GarmentCategory::Bottom => "pants",
            GarmentCategory::Skirt => "skirt",
            GarmentCategory::Dress => "dress",
            GarmentCategory::Outerwear => "jacket",
            GarmentCategory::Shoes => "shoes",
            GarmentCategory::Accessory => "accessory",
        }
    }
}

/// Human-readable label for an optional category tag.
pub fn garment_label(tag: Option<&str>) -> &'static str {
    tag.and_then(|t| GarmentCategory::from_str(t.trim()).ok())
        .map(GarmentCategory::label)
        .unwrap_or(GENERIC_LABEL)
}

/// Images in the order the model expects: subject first, garments after.
pub fn image_inputs(input: &TryOnInput) -> Vec<String> {
    std::iter::once(input.user_photo_url.clone())
        .chain(input.garment_urls.iter().cloned())
        .collect()
}

/// The caller's explicit prompt, or a synthesized one.
pub fn build_instruction(input: &TryOnInput) -> String {
    if let Some(prompt) = &input.prompt {
        return prompt.clone();
    }

    let labels: Vec<&'static str> = (0..input.garment_urls.len())
        .map(|i| garment_label(input.categories.get(i).map(String::as_str)))
        .collect();

    synthesize_instruction(&labels)
}

fn synthesize_instruction(labels: &[&str]) -> String {
    if let [label] = labels {
        return format!(
            "Make the person in the first image wear the {} from the second image, {}.",
            label, PRESERVE_CLAUSE
        );
    }

    // Garment i sits at image position i + 2.
    let items: Vec<String> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("the {} from image {}", label, i + 2))
        .collect();

    format!(
        "Make the person in image 1 wear {}, {}.",
        join_with_and(&items),
        PRESERVE_CLAUSE
    )
}

fn join_with_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
