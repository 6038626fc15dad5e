// src/materials/description.rs
//! Typed, fully resolved descriptions of a render material group.
//!
//! A `Material` is a flat bag of mutable state; a description is what survives
//! validation. Each shading type has its own struct carrying only the fields its
//! group needs, so the manager never sees an illegal combination (an unlit group
//! with a cubemap, a blinn group with transparency, ...).

use xxhash_rust::xxh3::Xxh3;

use crate::colour::Colour;
use crate::render_state::{RenderPass, RenderStates, ShadingType, VertexFormat};
use crate::shader::RenderShaderId;
use crate::shader_vars::ShaderVariables;
use crate::texture::RenderTextureId;

/// Unlit: one texture, caller-controlled render state.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlitGroupDesc {
    pub render_texture: RenderTextureId,
    pub states: RenderStates,
    pub emissive: Colour,
    pub ambient: Colour,
}

/// Blinn: one texture, fixed opaque render state.
#[derive(Debug, Clone, PartialEq)]
pub struct BlinnGroupDesc {
    pub render_texture: RenderTextureId,
    pub emissive: Colour,
    pub ambient: Colour,
    pub diffuse: Colour,
    pub specular: Colour,
}

/// Skybox: one cubemap, nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyboxGroupDesc {
    pub render_cubemap: RenderTextureId,
}

/// Custom: user shaders bound to passes, everything passed through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomGroupDesc {
    /// Shading type used to fill passes no custom shader covers.
    pub fallback: ShadingType,
    pub vertex_format: VertexFormat,
    pub render_shaders: Vec<(RenderShaderId, RenderPass)>,
    pub render_textures: Vec<RenderTextureId>,
    pub render_cubemaps: Vec<RenderTextureId>,
    pub states: RenderStates,
    pub emissive: Colour,
    pub ambient: Colour,
    pub diffuse: Colour,
    pub specular: Colour,
    pub variables: ShaderVariables,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderMaterialGroupDesc {
    Unlit(UnlitGroupDesc),
    Blinn(BlinnGroupDesc),
    Skybox(SkyboxGroupDesc),
    Custom(CustomGroupDesc),
}

impl RenderMaterialGroupDesc {
    pub fn shading_type(&self) -> ShadingType {
        match self {
            Self::Unlit(_) => ShadingType::Unlit,
            Self::Blinn(_) => ShadingType::Blinn,
            Self::Skybox(_) => ShadingType::Skybox,
            Self::Custom(_) => ShadingType::Custom,
        }
    }

    /// xxh3 digest of the whole description. Equal descriptions always hash
    /// equal; callers still compare with `==` on a hit.
    pub fn content_hash(&self) -> u64 {
        let mut h = Xxh3::new();
        h.update(&[self.shading_type() as u8]);
        match self {
            Self::Unlit(d) => {
                h.update(&d.render_texture.raw().to_le_bytes());
                h.update(&d.states.to_bytes());
                hash_colours(&mut h, &[d.emissive, d.ambient]);
            }
            Self::Blinn(d) => {
                h.update(&d.render_texture.raw().to_le_bytes());
                hash_colours(&mut h, &[d.emissive, d.ambient, d.diffuse, d.specular]);
            }
            Self::Skybox(d) => {
                h.update(&d.render_cubemap.raw().to_le_bytes());
            }
            Self::Custom(d) => {
                h.update(&[d.fallback as u8, d.vertex_format as u8]);
                h.update(&(d.render_shaders.len() as u64).to_le_bytes());
                for (shader, pass) in &d.render_shaders {
                    h.update(&shader.raw().to_le_bytes());
                    h.update(&[*pass as u8]);
                }
                hash_ids(&mut h, &d.render_textures);
                hash_ids(&mut h, &d.render_cubemaps);
                h.update(&d.states.to_bytes());
                hash_colours(&mut h, &[d.emissive, d.ambient, d.diffuse, d.specular]);
                d.variables.hash_into(&mut h);
            }
        }
        h.digest()
    }
}

fn hash_ids(h: &mut Xxh3, ids: &[RenderTextureId]) {
    h.update(&(ids.len() as u64).to_le_bytes());
    for id in ids {
        h.update(&id.raw().to_le_bytes());
    }
}

fn hash_colours(h: &mut Xxh3, colours: &[Colour]) {
    h.update(bytemuck::cast_slice(colours));
}

macro_rules! impl_from_desc {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for RenderMaterialGroupDesc {
            fn from(d: $ty) -> Self {
                Self::$variant(d)
            }
        }
    };
}

impl_from_desc!(UnlitGroupDesc, Unlit);
impl_from_desc!(BlinnGroupDesc, Blinn);
impl_from_desc!(SkyboxGroupDesc, Skybox);
impl_from_desc!(CustomGroupDesc, Custom);
