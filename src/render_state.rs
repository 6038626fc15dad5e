// src/render_state.rs
//! Render-state vocabulary shared by materials and compiled render groups.

use std::fmt;
use std::str::FromStr;

use crate::error::MaterialError;

// ---------- Shading type ----------

/// Lighting model of a material. Selects the invariant set and the group
/// construction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadingType {
    Unlit,
    Blinn,
    #[default]
    Custom,
    Skybox,
}

impl ShadingType {
    pub fn as_str(self) -> &'static str {
        match self {
            ShadingType::Unlit => "unlit",
            ShadingType::Blinn => "blinn",
            ShadingType::Custom => "custom",
            ShadingType::Skybox => "skybox",
        }
    }
}

impl fmt::Display for ShadingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShadingType {
    type Err = MaterialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unlit" => Ok(ShadingType::Unlit),
            "blinn" => Ok(ShadingType::Blinn),
            "custom" => Ok(ShadingType::Custom),
            "skybox" => Ok(ShadingType::Skybox),
            _ => Err(MaterialError::UnsupportedShadingType(s.to_owned())),
        }
    }
}

// ---------- Fixed-function state ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlendMode {
    Zero,
    One,
    SourceCol,
    OneMinusSourceCol,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestCol,
    OneMinusDestCol,
    DestAlpha,
    OneMinusDestAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CullFace {
    Front,
    Back,
}

/// Comparison used by the depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TestFunc {
    Never,
    Less,
    LessEqual,
    Equal,
    Greater,
    GreaterEqual,
    NotEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Increment,
    IncrementWrap,
    Decrement,
    DecrementWrap,
    Invert,
}

// ---------- Passes & vertex formats ----------

/// Stage of the forward pipeline a render material can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RenderPass {
    Base,
    DirectionalLight,
    DirectionalLightShadows,
    PointLight,
    Transparent,
    Skybox,
    ShadowMap,
}

impl RenderPass {
    pub const COUNT: usize = 7;

    pub const ALL: [RenderPass; Self::COUNT] = [
        RenderPass::Base,
        RenderPass::DirectionalLight,
        RenderPass::DirectionalLightShadows,
        RenderPass::PointLight,
        RenderPass::Transparent,
        RenderPass::Skybox,
        RenderPass::ShadowMap,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum VertexFormat {
    Sprite,
    #[default]
    StaticMesh,
    AnimatedMesh,
}

// ---------- Aggregated state ----------

/// Every fixed-function flag a render material carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderStates {
    pub transparency_enabled: bool,
    pub colour_write_enabled: bool,
    pub depth_write_enabled: bool,
    pub depth_test_enabled: bool,
    pub face_culling_enabled: bool,
    pub stencil_test_enabled: bool,
    pub depth_test_func: TestFunc,
    pub source_blend_mode: BlendMode,
    pub destination_blend_mode: BlendMode,
    pub stencil_fail_op: StencilOp,
    pub stencil_depth_fail_op: StencilOp,
    pub stencil_pass_op: StencilOp,
    pub stencil_test_func: TestFunc,
    pub stencil_ref: i32,
    pub stencil_mask: u32,
    pub cull_face: CullFace,
}

impl Default for RenderStates {
    fn default() -> Self {
        Self {
            transparency_enabled: false,
            colour_write_enabled: true,
            depth_write_enabled: true,
            depth_test_enabled: true,
            face_culling_enabled: true,
            stencil_test_enabled: false,
            depth_test_func: TestFunc::LessEqual,
            source_blend_mode: BlendMode::One,
            destination_blend_mode: BlendMode::OneMinusSourceAlpha,
            stencil_fail_op: StencilOp::Keep,
            stencil_depth_fail_op: StencilOp::Keep,
            stencil_pass_op: StencilOp::Keep,
            stencil_test_func: TestFunc::Always,
            stencil_ref: 1,
            stencil_mask: 0xff,
            cull_face: CullFace::Back,
        }
    }
}

impl RenderStates {
    /// Compact byte form, used for content hashing.
    pub(crate) fn to_bytes(&self) -> [u8; 22] {
        let mut out = [0u8; 22];
        out[0] = self.transparency_enabled as u8;
        out[1] = self.colour_write_enabled as u8;
        out[2] = self.depth_write_enabled as u8;
        out[3] = self.depth_test_enabled as u8;
        out[4] = self.face_culling_enabled as u8;
        out[5] = self.stencil_test_enabled as u8;
        out[6] = self.depth_test_func as u8;
        out[7] = self.source_blend_mode as u8;
        out[8] = self.destination_blend_mode as u8;
        out[9] = self.stencil_fail_op as u8;
        out[10] = self.stencil_depth_fail_op as u8;
        out[11] = self.stencil_pass_op as u8;
        out[12] = self.stencil_test_func as u8;
        out[13] = self.cull_face as u8;
        out[14..18].copy_from_slice(&self.stencil_ref.to_le_bytes());
        out[18..22].copy_from_slice(&self.stencil_mask.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_states_are_opaque_back_culled() {
        let s = RenderStates::default();
        assert!(!s.transparency_enabled);
        assert!(s.depth_write_enabled && s.depth_test_enabled && s.colour_write_enabled);
        assert!(s.face_culling_enabled);
        assert_eq!(s.cull_face, CullFace::Back);
    }

    #[test]
    fn test_shading_type_parse() {
        assert_eq!("Blinn".parse::<ShadingType>().unwrap(), ShadingType::Blinn);
        assert_eq!("skybox".parse::<ShadingType>().unwrap(), ShadingType::Skybox);
        let err = "toon".parse::<ShadingType>().unwrap_err();
        assert!(matches!(err, MaterialError::UnsupportedShadingType(ref s) if s == "toon"));
    }

    #[test]
    fn test_pass_indices_are_dense() {
        for (i, pass) in RenderPass::ALL.iter().enumerate() {
            assert_eq!(pass.index(), i);
        }
    }

    #[test]
    fn test_state_bytes_differ_on_change() {
        let a = RenderStates::default();
        let mut b = a;
        b.cull_face = CullFace::Front;
        assert_ne!(a.to_bytes(), b.to_bytes());
    }
}
