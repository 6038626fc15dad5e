// src/testing.rs
//! Test double for `RenderMaterialGroupManager`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::gpu::group_manager::RenderMaterialGroupManager;
use crate::gpu::render_material_group::{RenderMaterialGroup, RenderMaterialGroupHandle};
use crate::gpu::resource_pool::HandlePool;
use crate::materials::description::{
    BlinnGroupDesc, CustomGroupDesc, RenderMaterialGroupDesc, SkyboxGroupDesc, UnlitGroupDesc,
};
use crate::render_state::ShadingType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub unlit: usize,
    pub blinn: usize,
    pub skybox: usize,
    pub custom: usize,
    pub destroyed: usize,
}

impl CallCounts {
    pub fn created(&self) -> usize {
        self.unlit + self.blinn + self.skybox + self.custom
    }
}

#[derive(Default)]
struct Recorded {
    live: HandlePool<Arc<RenderMaterialGroup>>,
    counts: CallCounts,
    last: Option<RenderMaterialGroupDesc>,
}

/// Counts construct/destroy calls and remembers the last description. Every
/// create gets its own handle, nothing is shared or recycled.
#[derive(Default)]
pub struct RecordingGroupManager {
    inner: Mutex<Recorded>,
}

impl RecordingGroupManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn counts(&self) -> CallCounts {
        self.inner.lock().counts
    }

    pub fn last_desc(&self) -> Option<RenderMaterialGroupDesc> {
        self.inner.lock().last.clone()
    }

    pub fn live(&self) -> usize {
        self.inner.lock().live.len()
    }

    fn record(&self, desc: RenderMaterialGroupDesc) -> Result<RenderMaterialGroupHandle> {
        let mut inner = self.inner.lock();
        match desc.shading_type() {
            ShadingType::Unlit => inner.counts.unlit += 1,
            ShadingType::Blinn => inner.counts.blinn += 1,
            ShadingType::Skybox => inner.counts.skybox += 1,
            ShadingType::Custom => inner.counts.custom += 1,
        }
        inner.last = Some(desc.clone());
        let group = Arc::new(RenderMaterialGroup::new(desc, Vec::new(), Vec::new()));
        Ok(inner.live.insert(group).into())
    }
}

impl RenderMaterialGroupManager for RecordingGroupManager {
    fn create_unlit_render_material_group(&self, desc: UnlitGroupDesc) -> Result<RenderMaterialGroupHandle> {
        self.record(desc.into())
    }

    fn create_blinn_render_material_group(&self, desc: BlinnGroupDesc) -> Result<RenderMaterialGroupHandle> {
        self.record(desc.into())
    }

    fn create_skybox_render_material_group(&self, desc: SkyboxGroupDesc) -> Result<RenderMaterialGroupHandle> {
        self.record(desc.into())
    }

    fn create_custom_render_material_group(&self, desc: CustomGroupDesc) -> Result<RenderMaterialGroupHandle> {
        self.record(desc.into())
    }

    fn destroy_render_material_group(&self, handle: RenderMaterialGroupHandle) {
        let mut inner = self.inner.lock();
        if inner.live.remove(handle.pool_handle()).is_some() {
            inner.counts.destroyed += 1;
        }
    }

    fn render_material_group(&self, handle: RenderMaterialGroupHandle) -> Option<Arc<RenderMaterialGroup>> {
        self.inner.lock().live.get(handle.pool_handle()).cloned()
    }
}
