// src/materials/factory.rs
//! The only way to create materials.
//!
//! The factory captures the thread it was created on as the render thread for
//! every material it produces, along with the group manager they build with.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::gpu::group_manager::RenderMaterialGroupManager;
use crate::materials::material::Material;
use crate::render_state::ShadingType;
use crate::texture::{Cubemap, Texture};

pub struct MaterialFactory {
    manager: Arc<dyn RenderMaterialGroupManager>,
    render_thread: ThreadId,
}

impl MaterialFactory {
    /// Create on the render thread.
    pub fn new(manager: Arc<dyn RenderMaterialGroupManager>) -> Self {
        Self {
            manager,
            render_thread: thread::current().id(),
        }
    }

    pub fn render_thread(&self) -> ThreadId {
        self.render_thread
    }

    pub fn manager(&self) -> &Arc<dyn RenderMaterialGroupManager> {
        &self.manager
    }

    /// Empty material with default state and custom shading.
    pub fn create_custom(&self, name: impl Into<String>) -> Material {
        Material::new(name, Arc::clone(&self.manager), self.render_thread)
    }

    pub fn create_unlit(&self, name: impl Into<String>, texture: &Arc<Texture>, transparent: bool) -> Material {
        let mut material = self.create_custom(name);
        material.set_shading_type(ShadingType::Unlit);
        material.add_texture(texture);
        material.set_transparency_enabled(transparent);
        material
    }

    pub fn create_blinn(&self, name: impl Into<String>, texture: &Arc<Texture>) -> Material {
        let mut material = self.create_custom(name);
        material.set_shading_type(ShadingType::Blinn);
        material.add_texture(texture);
        material
    }

    pub fn create_skybox(&self, name: impl Into<String>, cubemap: &Arc<Cubemap>) -> Material {
        let mut material = self.create_custom(name);
        material.set_shading_type(ShadingType::Skybox);
        material.add_cubemap(cubemap);
        material
    }
}
