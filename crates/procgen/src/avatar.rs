//! Procedural avatar generator.
//!
//! [`build_avatar`] is pure: the same appearance always yields the same
//! parts, offsets and colors. The avatar faces -Z; offsets are relative to the
//! avatar root (feet at the origin) and scale with `height`.

use crate::mesh::Mesh;
use glam::Vec3;
use gridview_common::Rgb;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyShape {
    #[default]
    Athletic,
    Slim,
    Heavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HairStyle {
    #[default]
    Short,
    Ponytail,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutfitStyle {
    #[default]
    Casual,
    Formal,
    Fantasy,
}

/// Returned by the strict `FromStr` impls; UI input goes through
/// `parse_or_default` instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} option: {value:?}")]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! option_enum {
    ($ty:ident, $kind:literal, { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = UnknownOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(UnknownOption { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl $ty {
            /// Parse a user-supplied option, falling back to the default
            /// variant for anything unrecognized.
            pub fn parse_or_default(s: &str) -> Self {
                s.parse().unwrap_or_else(|e: UnknownOption| {
                    tracing::warn!("{e}, using {:?}", Self::default());
                    Self::default()
                })
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

option_enum!(BodyShape, "body shape", { "athletic" => Athletic, "slim" => Slim, "heavy" => Heavy });
option_enum!(HairStyle, "hair style", { "short" => Short, "ponytail" => Ponytail, "long" => Long });
option_enum!(OutfitStyle, "outfit style", { "casual" => Casual, "formal" => Formal, "fantasy" => Fantasy });

/// Geometric proportions selected by body shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyProportions {
    pub torso_width: f32,
    pub torso_depth: f32,
    pub limb_thickness: f32,
}

impl BodyShape {
    pub fn proportions(self) -> BodyProportions {
        match self {
            BodyShape::Athletic => BodyProportions {
                torso_width: 0.42,
                torso_depth: 0.24,
                limb_thickness: 0.07,
            },
            BodyShape::Slim => BodyProportions {
                torso_width: 0.34,
                torso_depth: 0.2,
                limb_thickness: 0.055,
            },
            BodyShape::Heavy => BodyProportions {
                torso_width: 0.55,
                torso_depth: 0.34,
                limb_thickness: 0.09,
            },
        }
    }
}

/// Physically-based material parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub roughness: f32,
    pub metalness: f32,
}

const SKIN: Surface = Surface {
    roughness: 0.7,
    metalness: 0.0,
};
const HAIR: Surface = Surface {
    roughness: 0.9,
    metalness: 0.0,
};
const FEATURE: Surface = Surface {
    roughness: 0.4,
    metalness: 0.0,
};

impl OutfitStyle {
    pub fn surface(self) -> Surface {
        match self {
            OutfitStyle::Casual => Surface {
                roughness: 0.8,
                metalness: 0.0,
            },
            OutfitStyle::Formal => Surface {
                roughness: 0.5,
                metalness: 0.1,
            },
            OutfitStyle::Fantasy => Surface {
                roughness: 0.3,
                metalness: 0.6,
            },
        }
    }

    fn shoe_color(self) -> Rgb {
        match self {
            OutfitStyle::Casual => Rgb::from_u32(0x5d4037),
            OutfitStyle::Formal => Rgb::from_u32(0x111111),
            OutfitStyle::Fantasy => Rgb::from_u32(0x8d6e63),
        }
    }
}

/// Full avatar appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarAppearance {
    pub height: f32,
    pub body_shape: BodyShape,
    pub skin_color: Rgb,
    pub hair_style: HairStyle,
    pub hair_color: Rgb,
    pub outfit_style: OutfitStyle,
    pub outfit_primary: Rgb,
    pub outfit_secondary: Rgb,
}

impl Default for AvatarAppearance {
    fn default() -> Self {
        Self {
            height: 1.0,
            body_shape: BodyShape::Athletic,
            skin_color: Rgb::from_u32(0xf2d2bd),
            hair_style: HairStyle::Short,
            hair_color: Rgb::from_u32(0x523b22),
            outfit_style: OutfitStyle::Casual,
            outfit_primary: Rgb::from_u32(0x3f51b5),
            outfit_secondary: Rgb::from_u32(0xf44336),
        }
    }
}

/// Partial appearance as it comes from editing controls: options and colors
/// are strings, and every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppearanceUpdate {
    pub height: Option<f32>,
    pub body_shape: Option<String>,
    pub skin_color: Option<String>,
    pub hair_style: Option<String>,
    pub hair_color: Option<String>,
    pub outfit_style: Option<String>,
    pub outfit_primary_color: Option<String>,
    pub outfit_secondary_color: Option<String>,
}

fn merge_color(target: &mut Rgb, value: Option<&String>, field: &str) {
    if let Some(hex) = value {
        match Rgb::from_hex(hex) {
            Some(c) => *target = c,
            None => tracing::warn!(field, value = %hex, "ignoring malformed color"),
        }
    }
}

impl AvatarAppearance {
    /// Apply the fields present in `update`. Unknown options fall back to
    /// their defaults; malformed colors and non-positive heights are ignored.
    pub fn merge(&mut self, update: &AppearanceUpdate) {
        if let Some(h) = update.height {
            if h.is_finite() && h > 0.0 {
                self.height = h;
            } else {
                tracing::warn!(height = h, "ignoring invalid avatar height");
            }
        }
        if let Some(s) = &update.body_shape {
            self.body_shape = BodyShape::parse_or_default(s);
        }
        if let Some(s) = &update.hair_style {
            self.hair_style = HairStyle::parse_or_default(s);
        }
        if let Some(s) = &update.outfit_style {
            self.outfit_style = OutfitStyle::parse_or_default(s);
        }
        merge_color(&mut self.skin_color, update.skin_color.as_ref(), "skinColor");
        merge_color(&mut self.hair_color, update.hair_color.as_ref(), "hairColor");
        merge_color(
            &mut self.outfit_primary,
            update.outfit_primary_color.as_ref(),
            "outfitPrimaryColor",
        );
        merge_color(
            &mut self.outfit_secondary,
            update.outfit_secondary_color.as_ref(),
            "outfitSecondaryColor",
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Head,
    Hair,
    Eye,
    Mouth,
    Torso,
    Arm,
    Hand,
    Leg,
    Shoe,
}

/// One disjoint piece of the avatar.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarPart {
    pub kind: PartKind,
    pub mesh: Mesh,
    /// Position relative to the avatar root.
    pub offset: Vec3,
    pub color: Rgb,
    pub surface: Surface,
}

/// Generated avatar geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarModel {
    pub parts: Vec<AvatarPart>,
}

impl AvatarModel {
    pub fn count(&self, kind: PartKind) -> usize {
        self.parts.iter().filter(|p| p.kind == kind).count()
    }

    /// Top of the tallest part, relative to the root.
    pub fn height(&self) -> f32 {
        self.parts
            .iter()
            .filter_map(|p| p.mesh.bounds().map(|(_, hi)| hi.y + p.offset.y))
            .fold(0.0, f32::max)
    }
}

/// Build the avatar parts for `appearance`.
pub fn build_avatar(appearance: &AvatarAppearance) -> AvatarModel {
    let h = appearance.height;
    let body = appearance.body_shape.proportions();
    let outfit = appearance.outfit_style.surface();
    let limb = body.limb_thickness * h;
    let hip = body.torso_width * 0.25 * h;
    let shoulder = body.torso_width * 0.5 * h + limb * 0.8 + 0.02 * h;

    let mut parts = Vec::new();
    let mut push = |kind, mesh, offset, color, surface| {
        parts.push(AvatarPart {
            kind,
            mesh,
            offset,
            color,
            surface,
        })
    };

    // Head and face
    let head_radius = 0.15 * h;
    let head_y = 1.65 * h;
    push(
        PartKind::Head,
        Mesh::icosphere(head_radius, 2),
        Vec3::new(0.0, head_y, 0.0),
        appearance.skin_color,
        SKIN,
    );
    for side in [-1.0, 1.0] {
        push(
            PartKind::Eye,
            Mesh::icosphere(0.025 * h, 1),
            Vec3::new(side * 0.05 * h, head_y + 0.02 * h, -0.13 * h),
            Rgb::from_u32(0x222222),
            FEATURE,
        );
    }
    push(
        PartKind::Mouth,
        Mesh::cuboid(0.06 * h, 0.015 * h, 0.01 * h),
        Vec3::new(0.0, head_y - 0.06 * h, -0.14 * h),
        Rgb::from_u32(0xaa4444),
        FEATURE,
    );

    // Hair
    push(
        PartKind::Hair,
        Mesh::hemisphere(head_radius * 1.07, 12),
        Vec3::new(0.0, head_y + 0.01 * h, 0.0),
        appearance.hair_color,
        HAIR,
    );
    match appearance.hair_style {
        HairStyle::Short => {}
        HairStyle::Ponytail => push(
            PartKind::Hair,
            Mesh::cylinder(0.04 * h, 0.03 * h, 0.25 * h, 8),
            Vec3::new(0.0, head_y - 0.1 * h, 0.17 * h),
            appearance.hair_color,
            HAIR,
        ),
        HairStyle::Long => push(
            PartKind::Hair,
            Mesh::cuboid(0.3 * h, 0.45 * h, 0.06 * h),
            Vec3::new(0.0, head_y - 0.2 * h, 0.12 * h),
            appearance.hair_color,
            HAIR,
        ),
    }

    // Torso
    push(
        PartKind::Torso,
        Mesh::cuboid(body.torso_width * h, 0.6 * h, body.torso_depth * h),
        Vec3::new(0.0, 1.18 * h, 0.0),
        appearance.outfit_primary,
        outfit,
    );

    // Arms and hands
    let arm_length = 0.55 * h;
    let arm_y = 1.48 * h - arm_length * 0.5;
    for side in [-1.0, 1.0] {
        push(
            PartKind::Arm,
            Mesh::cylinder(limb * 0.8, limb * 0.8, arm_length, 10),
            Vec3::new(side * shoulder, arm_y, 0.0),
            appearance.outfit_primary,
            outfit,
        );
        push(
            PartKind::Hand,
            Mesh::icosphere(limb, 1),
            Vec3::new(side * shoulder, arm_y - arm_length * 0.5 - limb * 0.5, 0.0),
            appearance.skin_color,
            SKIN,
        );
    }

    // Legs and shoes
    let shoe_height = 0.08 * h;
    let leg_length = 0.8 * h;
    for side in [-1.0, 1.0] {
        push(
            PartKind::Leg,
            Mesh::cylinder(limb, limb, leg_length, 10),
            Vec3::new(side * hip, shoe_height + leg_length * 0.5, 0.0),
            appearance.outfit_secondary,
            outfit,
        );
        push(
            PartKind::Shoe,
            Mesh::cuboid(limb * 2.4, shoe_height, 0.24 * h),
            Vec3::new(side * hip, shoe_height * 0.5, -0.03 * h),
            appearance.outfit_style.shoe_color(),
            outfit,
        );
    }

    AvatarModel { parts }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_is_deterministic() {
        let a = AvatarAppearance::default();
        let first = build_avatar(&a);
        let second = build_avatar(&a);
        assert_eq!(first.parts.len(), second.parts.len());
        for (p, q) in first.parts.iter().zip(&second.parts) {
            assert_eq!(p.kind, q.kind);
            assert_eq!(p.offset, q.offset);
            assert_eq!(p.color, q.color);
            assert_eq!(p.mesh, q.mesh);
        }
    }

    #[test]
    fn default_part_inventory() {
        let model = build_avatar(&AvatarAppearance::default());
        assert_eq!(model.count(PartKind::Head), 1);
        assert_eq!(model.count(PartKind::Hair), 1);
        assert_eq!(model.count(PartKind::Eye), 2);
        assert_eq!(model.count(PartKind::Mouth), 1);
        assert_eq!(model.count(PartKind::Torso), 1);
        assert_eq!(model.count(PartKind::Arm), 2);
        assert_eq!(model.count(PartKind::Hand), 2);
        assert_eq!(model.count(PartKind::Leg), 2);
        assert_eq!(model.count(PartKind::Shoe), 2);
    }

    #[test]
    fn hair_style_adds_geometry() {
        let mut a = AvatarAppearance::default();
        a.hair_style = HairStyle::Ponytail;
        assert_eq!(build_avatar(&a).count(PartKind::Hair), 2);
        a.hair_style = HairStyle::Long;
        assert_eq!(build_avatar(&a).count(PartKind::Hair), 2);
    }

    #[test]
    fn offsets_scale_with_height() {
        let base = build_avatar(&AvatarAppearance::default());
        let tall = build_avatar(&AvatarAppearance {
            height: 2.0,
            ..AvatarAppearance::default()
        });
        for (p, q) in base.parts.iter().zip(&tall.parts) {
            assert!((q.offset - p.offset * 2.0).length() < 1e-5);
        }
        assert!((tall.height() - base.height() * 2.0).abs() < 1e-4);
    }

    #[test]
    fn body_shape_changes_torso_width() {
        let torso_width = |shape| {
            let model = build_avatar(&AvatarAppearance {
                body_shape: shape,
                ..AvatarAppearance::default()
            });
            let torso = model.parts.iter().find(|p| p.kind == PartKind::Torso).unwrap();
            let (lo, hi) = torso.mesh.bounds().unwrap();
            hi.x - lo.x
        };
        assert!(torso_width(BodyShape::Slim) < torso_width(BodyShape::Athletic));
        assert!(torso_width(BodyShape::Athletic) < torso_width(BodyShape::Heavy));
    }

    #[test]
    fn outfit_selects_material() {
        let model = build_avatar(&AvatarAppearance {
            outfit_style: OutfitStyle::Fantasy,
            ..AvatarAppearance::default()
        });
        let torso = model.parts.iter().find(|p| p.kind == PartKind::Torso).unwrap();
        assert_eq!(torso.surface, OutfitStyle::Fantasy.surface());
    }

    #[test]
    fn unknown_options_fall_back() {
        assert_eq!(BodyShape::parse_or_default("giant"), BodyShape::Athletic);
        assert_eq!(HairStyle::parse_or_default(""), HairStyle::Short);
        assert_eq!(OutfitStyle::parse_or_default("Formal"), OutfitStyle::Formal);
        assert!("giant".parse::<BodyShape>().is_err());
    }

    #[test]
    fn merge_applies_only_present_fields() {
        let mut a = AvatarAppearance::default();
        a.merge(&AppearanceUpdate {
            hair_style: Some("long".into()),
            skin_color: Some("#000000".into()),
            outfit_primary_color: Some("not-a-color".into()),
            height: Some(-1.0),
            ..AppearanceUpdate::default()
        });
        assert_eq!(a.hair_style, HairStyle::Long);
        assert_eq!(a.skin_color, Rgb::BLACK);
        assert_eq!(a.outfit_primary, AvatarAppearance::default().outfit_primary);
        assert_eq!(a.height, 1.0);
        assert_eq!(a.body_shape, BodyShape::Athletic);
    }

    #[test]
    fn update_deserializes_from_control_names() {
        let update: AppearanceUpdate =
            serde_json::from_str(r##"{ "bodyShape": "heavy", "hairColor": "#ffffff" }"##).unwrap();
        assert_eq!(update.body_shape.as_deref(), Some("heavy"));
        assert_eq!(update.hair_color.as_deref(), Some("#ffffff"));
        assert!(update.height.is_none());
    }
}
