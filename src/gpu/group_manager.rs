// src/gpu/group_manager.rs
//! Contract between materials and whoever owns compiled render groups.

use std::sync::Arc;

use crate::error::Result;
use crate::gpu::render_material_group::{RenderMaterialGroup, RenderMaterialGroupHandle};
use crate::materials::description::{
    BlinnGroupDesc, CustomGroupDesc, RenderMaterialGroupDesc, SkyboxGroupDesc, UnlitGroupDesc,
};

/// Factory and owner of `RenderMaterialGroup`s.
///
/// Every `create_*` call hands back a handle the caller owns until it passes
/// it to `destroy_render_material_group`. Implementations may pool, share or
/// recycle groups behind those handles. Destroying a handle that is unknown or
/// already destroyed must be a no-op.
pub trait RenderMaterialGroupManager: Send + Sync {
    fn create_unlit_render_material_group(
        &self,
        desc: UnlitGroupDesc,
    ) -> Result<RenderMaterialGroupHandle>;

    fn create_blinn_render_material_group(
        &self,
        desc: BlinnGroupDesc,
    ) -> Result<RenderMaterialGroupHandle>;

    fn create_skybox_render_material_group(
        &self,
        desc: SkyboxGroupDesc,
    ) -> Result<RenderMaterialGroupHandle>;

    fn create_custom_render_material_group(
        &self,
        desc: CustomGroupDesc,
    ) -> Result<RenderMaterialGroupHandle>;

    fn destroy_render_material_group(&self, handle: RenderMaterialGroupHandle);

    /// Resolve a live handle.
    fn render_material_group(
        &self,
        handle: RenderMaterialGroupHandle,
    ) -> Option<Arc<RenderMaterialGroup>>;

    /// Route a validated description to its factory.
    fn create_render_material_group(
        &self,
        desc: RenderMaterialGroupDesc,
    ) -> Result<RenderMaterialGroupHandle> {
        match desc {
            RenderMaterialGroupDesc::Unlit(d) => self.create_unlit_render_material_group(d),
            RenderMaterialGroupDesc::Blinn(d) => self.create_blinn_render_material_group(d),
            RenderMaterialGroupDesc::Skybox(d) => self.create_skybox_render_material_group(d),
            RenderMaterialGroupDesc::Custom(d) => self.create_custom_render_material_group(d),
        }
    }
}
