/// Applying a resolved texture to a player's property list
use crate::skin::{TextureProperty, TEXTURES_PROPERTY};
use serde::{Deserialize, Serialize};

/// One entry of a player's game profile properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    pub signature: Option<String>,
}

impl From<&TextureProperty> for ProfileProperty {
    fn from(texture: &TextureProperty) -> Self {
        Self {
            name: TEXTURES_PROPERTY.to_string(),
            value: texture.value.clone(),
            signature: Some(texture.signature.clone()),
        }
    }
}

/// A connected player whose displayed properties can be replaced.
///
/// Implemented by the host proxy glue.
pub trait SkinTarget: Send + Sync {
    fn username(&self) -> &str;
    fn properties(&self) -> Vec<ProfileProperty>;
    fn set_properties(&self, properties: Vec<ProfileProperty>);
}

/// Replace every `textures` entry with `texture`, or append it if there is none
pub fn with_texture(properties: &[ProfileProperty], texture: &TextureProperty) -> Vec<ProfileProperty> {
    let replacement = ProfileProperty::from(texture);
    let mut applied = false;

    let mut merged: Vec<ProfileProperty> = properties
        .iter()
        .map(|property| {
            if property.name == TEXTURES_PROPERTY {
                applied = true;
                replacement.clone()
            } else {
                property.clone()
            }
        })
        .collect();

    if !applied {
        merged.push(replacement);
    }
    merged
}

pub fn has_skin(properties: &[ProfileProperty]) -> bool {
    properties.iter().any(|p| p.name == TEXTURES_PROPERTY)
}

pub fn apply_skin(target: &dyn SkinTarget, texture: &TextureProperty) {
    let properties = with_texture(&target.properties(), texture);
    target.set_properties(properties);
}
