// src/gpu/render_material_group.rs
//! Immutable, renderer-ready material groups.
//!
//! A group owns a flat list of `RenderMaterial`s and one `Collection` per
//! vertex format it supports. A collection maps each `RenderPass` to at most one
//! of the group's materials, which is what the forward renderer looks up when it
//! batches a draw for a given pass.

use std::fmt;

use crate::colour::Colour;
use crate::gpu::resource_pool::PoolHandle;
use crate::materials::description::RenderMaterialGroupDesc;
use crate::render_state::{RenderPass, RenderStates, ShadingType, VertexFormat};
use crate::shader::RenderShaderId;
use crate::shader_vars::ShaderVariables;
use crate::texture::RenderTextureId;

/// Handle to a group owned by a `RenderMaterialGroupManager`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderMaterialGroupHandle(PoolHandle);

impl RenderMaterialGroupHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0.index()
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.0.generation()
    }

    #[inline]
    pub(crate) fn pool_handle(self) -> PoolHandle {
        self.0
    }
}

impl From<PoolHandle> for RenderMaterialGroupHandle {
    fn from(h: PoolHandle) -> Self {
        Self(h)
    }
}

impl fmt::Debug for RenderMaterialGroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RenderMaterialGroup({:?})", self.0)
    }
}

// ---------- RenderMaterial ----------

/// One shader plus everything bound alongside it for a single pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderMaterial {
    pub shader: RenderShaderId,
    pub textures: Vec<RenderTextureId>,
    pub cubemaps: Vec<RenderTextureId>,
    pub states: RenderStates,
    pub emissive: Colour,
    pub ambient: Colour,
    pub diffuse: Colour,
    pub specular: Colour,
    pub variables: Option<ShaderVariables>,
}

// ---------- Collection ----------

/// Pass slots for one vertex format. Slots index into the owning group's
/// material list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    vertex_format: VertexFormat,
    slots: [Option<usize>; RenderPass::COUNT],
}

impl Collection {
    pub fn new(vertex_format: VertexFormat) -> Self {
        Self {
            vertex_format,
            slots: [None; RenderPass::COUNT],
        }
    }

    #[inline]
    pub fn vertex_format(&self) -> VertexFormat {
        self.vertex_format
    }

    /// Index into the group's material list bound to `pass`, if any.
    #[inline]
    pub fn slot(&self, pass: RenderPass) -> Option<usize> {
        self.slots[pass.index()]
    }

    /// Bind `material` to `pass`, replacing whatever was there.
    pub fn set_slot(&mut self, pass: RenderPass, material: usize) {
        self.slots[pass.index()] = Some(material);
    }

    pub fn passes(&self) -> impl Iterator<Item = RenderPass> + '_ {
        RenderPass::ALL
            .into_iter()
            .filter(|p| self.slots[p.index()].is_some())
    }
}

// ---------- RenderMaterialGroup ----------

#[derive(Debug)]
pub struct RenderMaterialGroup {
    desc: RenderMaterialGroupDesc,
    content_hash: u64,
    materials: Vec<RenderMaterial>,
    collections: Vec<Collection>,
}

impl RenderMaterialGroup {
    pub fn new(
        desc: RenderMaterialGroupDesc,
        materials: Vec<RenderMaterial>,
        collections: Vec<Collection>,
    ) -> Self {
        debug_assert!(collections
            .iter()
            .flat_map(|c| c.slots.iter().flatten())
            .all(|&i| i < materials.len()));
        let content_hash = desc.content_hash();
        Self {
            desc,
            content_hash,
            materials,
            collections,
        }
    }

    #[inline]
    pub fn shading_type(&self) -> ShadingType {
        self.desc.shading_type()
    }

    /// The description this group was compiled from.
    #[inline]
    pub fn desc(&self) -> &RenderMaterialGroupDesc {
        &self.desc
    }

    #[inline]
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    pub fn materials(&self) -> &[RenderMaterial] {
        &self.materials
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collection(&self, vertex_format: VertexFormat) -> Option<&Collection> {
        self.collections
            .iter()
            .find(|c| c.vertex_format == vertex_format)
    }

    /// Material to draw `vertex_format` geometry with in `pass`. `None` means
    /// the group does not take part in that pass.
    pub fn render_material(
        &self,
        vertex_format: VertexFormat,
        pass: RenderPass,
    ) -> Option<&RenderMaterial> {
        let idx = self.collection(vertex_format)?.slot(pass)?;
        self.materials.get(idx)
    }
}
