// src/lib.rs
//! Material state caching and render group generation.
//!
//! A `Material` holds mutable render state (textures, cubemaps, blend and
//! depth/stencil flags, colours, custom shaders, shader variables). Asking it
//! for its render group validates that state against the shading type and
//! compiles it, through a `RenderMaterialGroupManager`, into an immutable
//! `RenderMaterialGroup` the renderer consumes. The compiled group is cached
//! until the material changes or one of its textures is reloaded.

pub mod colour;
pub mod config;
pub mod error;
pub mod gpu;
pub mod materials;
pub mod render_state;
pub mod shader;
pub mod shader_vars;
pub mod texture;

#[cfg(test)]
pub(crate) mod testing;

pub use colour::Colour;
pub use config::{GroupManagerConfig, RenderCapabilities};
pub use error::{MaterialError, Result};
pub use gpu::{
    ForwardRenderMaterialGroupManager, GroupManagerStats, RenderMaterialGroup,
    RenderMaterialGroupHandle, RenderMaterialGroupManager, RenderSnapshot,
};
pub use materials::{Material, MaterialFactory};
pub use render_state::{
    BlendMode, CullFace, RenderPass, RenderStates, ShadingType, StencilOp, TestFunc, VertexFormat,
};
pub use shader::{RenderShaderId, Shader};
pub use shader_vars::{ShaderVarType, ShaderVarValue, ShaderVariables};
pub use texture::{Cubemap, RenderTextureId, Texture};
