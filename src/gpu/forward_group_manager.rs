// src/gpu/forward_group_manager.rs
//! Forward-renderer implementation of `RenderMaterialGroupManager`.
//!
//! * **Layout** – unlit groups get sprite/static/animated collections, blinn
//!   groups static/animated with one material per light pass, skybox groups a
//!   single static collection. Custom groups get one collection in their own
//!   vertex format, seeded from the fallback shading type.
//! * **Pooling** – groups live in a generational `HandlePool`, so a destroyed
//!   handle never resolves to a later group in the same slot.
//! * **Dedup** – identical live descriptions share one group (xxh3 + `==`),
//!   reference counted per handle.
//! * **Recycling** – fully released groups park in an LRU keyed by content hash
//!   and are handed back, under a fresh handle, when the same content returns.
//! * **Render snapshot** – newly compiled groups are queued as loads, evicted
//!   ones as unloads; the renderer drains both once per frame.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use log::{debug, warn};
use lru::LruCache;
use parking_lot::Mutex;

use crate::colour::Colour;
use crate::config::GroupManagerConfig;
use crate::error::{MaterialError, Result};
use crate::gpu::group_manager::RenderMaterialGroupManager;
use crate::gpu::render_material_group::{
    Collection, RenderMaterial, RenderMaterialGroup, RenderMaterialGroupHandle,
};
use crate::gpu::resource_pool::HandlePool;
use crate::materials::description::{
    BlinnGroupDesc, CustomGroupDesc, RenderMaterialGroupDesc, SkyboxGroupDesc, UnlitGroupDesc,
};
use crate::render_state::{
    BlendMode, CullFace, RenderPass, RenderStates, ShadingType, VertexFormat,
};
use crate::shader::RenderShaderId;
use crate::texture::RenderTextureId;

// ---------- Built-in shaders ----------

/// Programs the forward pipeline binds for the built-in shading types.
#[derive(Debug, Clone)]
pub struct BuiltinShaders {
    pub sprite_unlit: RenderShaderId,
    pub static_unlit: RenderShaderId,
    pub static_blinn_base: RenderShaderId,
    pub static_blinn_directional: RenderShaderId,
    pub static_blinn_directional_shadows: RenderShaderId,
    pub static_blinn_point: RenderShaderId,
    pub static_shadow_map: RenderShaderId,
    pub animated_unlit: RenderShaderId,
    pub animated_blinn_base: RenderShaderId,
    pub animated_blinn_directional: RenderShaderId,
    pub animated_blinn_directional_shadows: RenderShaderId,
    pub animated_blinn_point: RenderShaderId,
    pub animated_shadow_map: RenderShaderId,
    pub skybox: RenderShaderId,
}

impl Default for BuiltinShaders {
    fn default() -> Self {
        let id = RenderShaderId::from_name;
        Self {
            sprite_unlit: id("Shaders/Sprite-Unlit.csshader"),
            static_unlit: id("Shaders/Static-Unlit.csshader"),
            static_blinn_base: id("Shaders/Static-Blinn-Base.csshader"),
            static_blinn_directional: id("Shaders/Static-Blinn-Directional.csshader"),
            static_blinn_directional_shadows: id("Shaders/Static-Blinn-DirectionalShadows.csshader"),
            static_blinn_point: id("Shaders/Static-Blinn-Point.csshader"),
            static_shadow_map: id("Shaders/Static-ShadowMap.csshader"),
            animated_unlit: id("Shaders/Animated-Unlit.csshader"),
            animated_blinn_base: id("Shaders/Animated-Blinn-Base.csshader"),
            animated_blinn_directional: id("Shaders/Animated-Blinn-Directional.csshader"),
            animated_blinn_directional_shadows: id(
                "Shaders/Animated-Blinn-DirectionalShadows.csshader",
            ),
            animated_blinn_point: id("Shaders/Animated-Blinn-Point.csshader"),
            animated_shadow_map: id("Shaders/Animated-ShadowMap.csshader"),
            skybox: id("Shaders/Skybox.csshader"),
        }
    }
}

// ---------- Render material templates ----------

fn unlit_material(
    shader: RenderShaderId,
    texture: RenderTextureId,
    states: RenderStates,
    emissive: Colour,
    ambient: Colour,
) -> RenderMaterial {
    RenderMaterial {
        shader,
        textures: vec![texture],
        cubemaps: Vec::new(),
        states,
        emissive,
        ambient,
        diffuse: Colour::BLACK,
        specular: Colour::BLACK,
        variables: None,
    }
}

fn shadow_map_material(shader: RenderShaderId) -> RenderMaterial {
    RenderMaterial {
        shader,
        textures: Vec::new(),
        cubemaps: Vec::new(),
        states: RenderStates {
            colour_write_enabled: false,
            source_blend_mode: BlendMode::One,
            destination_blend_mode: BlendMode::One,
            cull_face: CullFace::Front,
            ..RenderStates::default()
        },
        emissive: Colour::BLACK,
        ambient: Colour::BLACK,
        diffuse: Colour::BLACK,
        specular: Colour::BLACK,
        variables: None,
    }
}

fn skybox_material(shader: RenderShaderId, cubemap: RenderTextureId) -> RenderMaterial {
    RenderMaterial {
        shader,
        textures: Vec::new(),
        cubemaps: vec![cubemap],
        states: RenderStates {
            depth_write_enabled: false,
            ..RenderStates::default()
        },
        emissive: Colour::BLACK,
        ambient: Colour::BLACK,
        diffuse: Colour::BLACK,
        specular: Colour::BLACK,
        variables: None,
    }
}

fn blinn_base_material(
    shader: RenderShaderId,
    texture: RenderTextureId,
    emissive: Colour,
    ambient: Colour,
) -> RenderMaterial {
    RenderMaterial {
        shader,
        textures: vec![texture],
        cubemaps: Vec::new(),
        states: RenderStates::default(),
        emissive,
        ambient,
        diffuse: Colour::BLACK,
        specular: Colour::BLACK,
        variables: None,
    }
}

/// Additive light pass on top of the base pass.
fn blinn_light_material(
    shader: RenderShaderId,
    texture: RenderTextureId,
    diffuse: Colour,
    specular: Colour,
) -> RenderMaterial {
    RenderMaterial {
        shader,
        textures: vec![texture],
        cubemaps: Vec::new(),
        states: RenderStates {
            transparency_enabled: true,
            depth_write_enabled: false,
            source_blend_mode: BlendMode::One,
            destination_blend_mode: BlendMode::One,
            ..RenderStates::default()
        },
        emissive: Colour::BLACK,
        ambient: Colour::BLACK,
        diffuse,
        specular,
        variables: None,
    }
}

/// Accumulates the materials of one group while its collections are filled.
#[derive(Default)]
struct GroupBuilder {
    materials: Vec<RenderMaterial>,
}

impl GroupBuilder {
    fn bind(&mut self, collection: &mut Collection, pass: RenderPass, material: RenderMaterial) {
        collection.set_slot(pass, self.materials.len());
        self.materials.push(material);
    }
}

// ---------- Stats & snapshot ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupManagerStats {
    /// Groups compiled from scratch.
    pub created: u64,
    /// Create calls answered by sharing a live group.
    pub deduplicated: u64,
    /// Create calls answered from the recycle cache.
    pub recycled: u64,
    /// Destroy calls that released a handle.
    pub destroyed: u64,
    /// Live handles.
    pub live: usize,
    /// Render materials across live groups.
    pub render_materials: usize,
}

/// Group churn since the previous snapshot.
#[derive(Debug, Default)]
pub struct RenderSnapshot {
    pub loaded: Vec<Arc<RenderMaterialGroup>>,
    pub unloaded: Vec<Arc<RenderMaterialGroup>>,
}

impl RenderSnapshot {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty()
    }
}

// ---------- Manager ----------

struct GroupRecord {
    group: Arc<RenderMaterialGroup>,
    refcount: u32,
}

struct Inner {
    groups: HandlePool<GroupRecord>,
    // dedupe: content hash -> live handle
    by_hash: HashMap<u64, RenderMaterialGroupHandle>,
    recycle: Option<LruCache<u64, Arc<RenderMaterialGroup>>>,
    pending_loads: Vec<Arc<RenderMaterialGroup>>,
    pending_unloads: Vec<Arc<RenderMaterialGroup>>,
    stats: GroupManagerStats,
}

pub struct ForwardRenderMaterialGroupManager {
    cfg: GroupManagerConfig,
    shaders: BuiltinShaders,
    inner: Mutex<Inner>,
}

impl ForwardRenderMaterialGroupManager {
    pub fn new(cfg: GroupManagerConfig) -> Self {
        Self::with_shaders(cfg, BuiltinShaders::default())
    }

    pub fn with_shaders(cfg: GroupManagerConfig, shaders: BuiltinShaders) -> Self {
        let recycle = NonZeroUsize::new(cfg.recycle_capacity).map(LruCache::new);
        let inner = Inner {
            groups: HandlePool::with_capacity(cfg.group_pool_size),
            by_hash: HashMap::with_capacity(cfg.group_pool_size),
            recycle,
            pending_loads: Vec::new(),
            pending_unloads: Vec::new(),
            stats: GroupManagerStats::default(),
        };
        Self {
            cfg,
            shaders,
            inner: Mutex::new(inner),
        }
    }

    pub fn config(&self) -> &GroupManagerConfig {
        &self.cfg
    }

    pub fn shaders(&self) -> &BuiltinShaders {
        &self.shaders
    }

    pub fn stats(&self) -> GroupManagerStats {
        self.inner.lock().stats
    }

    /// Drain groups compiled or released since the last call.
    pub fn take_render_snapshot(&self) -> RenderSnapshot {
        let mut inner = self.inner.lock();
        RenderSnapshot {
            loaded: std::mem::take(&mut inner.pending_loads),
            unloaded: std::mem::take(&mut inner.pending_unloads),
        }
    }

    #[inline]
    fn shadows_supported(&self) -> bool {
        self.cfg.capabilities.shadow_mapping_supported
    }

    // ---------- Collection builders ----------

    fn fill_unlit(
        &self,
        builder: &mut GroupBuilder,
        collection: &mut Collection,
        texture: RenderTextureId,
        states: RenderStates,
        emissive: Colour,
        ambient: Colour,
    ) {
        let (shader, shadow_map) = match collection.vertex_format() {
            VertexFormat::Sprite => (self.shaders.sprite_unlit, None),
            VertexFormat::StaticMesh => (self.shaders.static_unlit, Some(self.shaders.static_shadow_map)),
            VertexFormat::AnimatedMesh => {
                (self.shaders.animated_unlit, Some(self.shaders.animated_shadow_map))
            }
        };

        let pass = if states.transparency_enabled {
            RenderPass::Transparent
        } else {
            RenderPass::Base
        };
        builder.bind(collection, pass, unlit_material(shader, texture, states, emissive, ambient));

        if let Some(shadow_map) = shadow_map {
            if self.shadows_supported() && !states.transparency_enabled {
                builder.bind(collection, RenderPass::ShadowMap, shadow_map_material(shadow_map));
            }
        }
    }

    fn fill_blinn(
        &self,
        builder: &mut GroupBuilder,
        collection: &mut Collection,
        texture: RenderTextureId,
        colours: [Colour; 4],
    ) {
        let [emissive, ambient, diffuse, specular] = colours;
        let s = &self.shaders;
        let (base, directional, point, directional_shadows, shadow_map) =
            match collection.vertex_format() {
                // no lit sprite pipeline
                VertexFormat::Sprite => return,
                VertexFormat::StaticMesh => (
                    s.static_blinn_base,
                    s.static_blinn_directional,
                    s.static_blinn_point,
                    s.static_blinn_directional_shadows,
                    s.static_shadow_map,
                ),
                VertexFormat::AnimatedMesh => (
                    s.animated_blinn_base,
                    s.animated_blinn_directional,
                    s.animated_blinn_point,
                    s.animated_blinn_directional_shadows,
                    s.animated_shadow_map,
                ),
            };

        builder.bind(collection, RenderPass::Base, blinn_base_material(base, texture, emissive, ambient));
        builder.bind(
            collection,
            RenderPass::DirectionalLight,
            blinn_light_material(directional, texture, diffuse, specular),
        );
        builder.bind(
            collection,
            RenderPass::PointLight,
            blinn_light_material(point, texture, diffuse, specular),
        );

        if self.shadows_supported() {
            builder.bind(collection, RenderPass::ShadowMap, shadow_map_material(shadow_map));
            builder.bind(
                collection,
                RenderPass::DirectionalLightShadows,
                blinn_light_material(directional_shadows, texture, diffuse, specular),
            );
        }
    }

    fn fill_skybox(
        &self,
        builder: &mut GroupBuilder,
        collection: &mut Collection,
        cubemap: RenderTextureId,
    ) -> Result<()> {
        if collection.vertex_format() != VertexFormat::StaticMesh {
            return Err(MaterialError::custom(format!(
                "skybox materials only work with static meshes, got {:?}",
                collection.vertex_format()
            )));
        }
        builder.bind(collection, RenderPass::Skybox, skybox_material(self.shaders.skybox, cubemap));
        Ok(())
    }

    // ---------- Group compilation ----------

    fn build_group(&self, desc: RenderMaterialGroupDesc) -> Result<RenderMaterialGroup> {
        let mut builder = GroupBuilder::default();
        let mut collections = Vec::new();

        match &desc {
            RenderMaterialGroupDesc::Unlit(d) => {
                for format in [VertexFormat::Sprite, VertexFormat::StaticMesh, VertexFormat::AnimatedMesh] {
                    let mut collection = Collection::new(format);
                    self.fill_unlit(&mut builder, &mut collection, d.render_texture, d.states, d.emissive, d.ambient);
                    collections.push(collection);
                }
            }
            RenderMaterialGroupDesc::Blinn(d) => {
                for format in [VertexFormat::StaticMesh, VertexFormat::AnimatedMesh] {
                    let mut collection = Collection::new(format);
                    self.fill_blinn(
                        &mut builder,
                        &mut collection,
                        d.render_texture,
                        [d.emissive, d.ambient, d.diffuse, d.specular],
                    );
                    collections.push(collection);
                }
            }
            RenderMaterialGroupDesc::Skybox(d) => {
                let mut collection = Collection::new(VertexFormat::StaticMesh);
                self.fill_skybox(&mut builder, &mut collection, d.render_cubemap)?;
                collections.push(collection);
            }
            RenderMaterialGroupDesc::Custom(d) => {
                let mut collection = Collection::new(d.vertex_format);
                self.fill_custom_fallback(&mut builder, &mut collection, d)?;

                // later shaders on the same pass replace earlier ones
                for &(shader, pass) in &d.render_shaders {
                    let material = RenderMaterial {
                        shader,
                        textures: d.render_textures.clone(),
                        cubemaps: d.render_cubemaps.clone(),
                        states: d.states,
                        emissive: d.emissive,
                        ambient: d.ambient,
                        diffuse: d.diffuse,
                        specular: d.specular,
                        variables: Some(d.variables.clone()),
                    };
                    builder.bind(&mut collection, pass, material);
                }
                collections.push(collection);
            }
        }

        Ok(RenderMaterialGroup::new(desc, builder.materials, collections))
    }

    fn fill_custom_fallback(
        &self,
        builder: &mut GroupBuilder,
        collection: &mut Collection,
        d: &CustomGroupDesc,
    ) -> Result<()> {
        let first_texture = || {
            d.render_textures.first().copied().ok_or_else(|| {
                MaterialError::custom(format!(
                    "custom group falling back to {} needs a texture",
                    d.fallback
                ))
            })
        };

        match d.fallback {
            ShadingType::Unlit => {
                let texture = first_texture()?;
                self.fill_unlit(builder, collection, texture, d.states, d.emissive, d.ambient);
            }
            ShadingType::Blinn => {
                let texture = first_texture()?;
                self.fill_blinn(builder, collection, texture, [d.emissive, d.ambient, d.diffuse, d.specular]);
            }
            ShadingType::Skybox => {
                let cubemap = d.render_cubemaps.first().copied().ok_or_else(|| {
                    MaterialError::custom("custom group falling back to skybox needs a cubemap")
                })?;
                self.fill_skybox(builder, collection, cubemap)?;
            }
            // passes without a custom shader stay empty
            ShadingType::Custom => {}
        }
        Ok(())
    }

    fn create(&self, desc: RenderMaterialGroupDesc) -> Result<RenderMaterialGroupHandle> {
        let hash = desc.content_hash();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        // fast path: identical live group
        if self.cfg.deduplicate_groups {
            if let Some(&handle) = inner.by_hash.get(&hash) {
                if let Some(rec) = inner.groups.get_mut(handle.pool_handle()) {
                    if *rec.group.desc() == desc {
                        rec.refcount = rec.refcount.saturating_add(1);
                        inner.stats.deduplicated += 1;
                        debug!("{} render group {:?} shared (refs {})", desc.shading_type(), handle, rec.refcount);
                        return Ok(handle);
                    }
                }
            }
        }

        let recycled = inner.recycle.as_mut().and_then(|lru| lru.pop(&hash));
        let group = match recycled {
            Some(group) if *group.desc() == desc => {
                inner.stats.recycled += 1;
                debug!("{} render group recycled ({:016x})", desc.shading_type(), hash);
                group
            }
            other => {
                // hash collision: the parked group is not coming back
                if let Some(stale) = other {
                    inner.pending_unloads.push(stale);
                }
                let group = Arc::new(self.build_group(desc)?);
                inner.stats.created += 1;
                inner.pending_loads.push(Arc::clone(&group));
                group
            }
        };

        let material_count = group.materials().len();
        let handle: RenderMaterialGroupHandle = inner
            .groups
            .insert(GroupRecord {
                group,
                refcount: 1,
            })
            .into();

        if inner.groups.slot_count() == self.cfg.group_pool_size + 1 {
            debug!("render group pool expanded past {}", self.cfg.group_pool_size);
        }
        inner.stats.live = inner.groups.len();
        let before = inner.stats.render_materials;
        inner.stats.render_materials += material_count;
        if before <= self.cfg.material_pool_size && inner.stats.render_materials > self.cfg.material_pool_size {
            debug!("render material pool expanded past {}", self.cfg.material_pool_size);
        }

        if self.cfg.deduplicate_groups {
            inner.by_hash.entry(hash).or_insert(handle);
        }
        Ok(handle)
    }
}

impl RenderMaterialGroupManager for ForwardRenderMaterialGroupManager {
    fn create_unlit_render_material_group(&self, desc: UnlitGroupDesc) -> Result<RenderMaterialGroupHandle> {
        self.create(desc.into())
    }

    fn create_blinn_render_material_group(&self, desc: BlinnGroupDesc) -> Result<RenderMaterialGroupHandle> {
        self.create(desc.into())
    }

    fn create_skybox_render_material_group(&self, desc: SkyboxGroupDesc) -> Result<RenderMaterialGroupHandle> {
        self.create(desc.into())
    }

    fn create_custom_render_material_group(&self, desc: CustomGroupDesc) -> Result<RenderMaterialGroupHandle> {
        self.create(desc.into())
    }

    fn destroy_render_material_group(&self, handle: RenderMaterialGroupHandle) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let Some(rec) = inner.groups.get_mut(handle.pool_handle()) else {
            warn!("destroy of unknown or stale render group {:?} ignored", handle);
            return;
        };
        inner.stats.destroyed += 1;
        rec.refcount -= 1;
        if rec.refcount > 0 {
            return;
        }

        let Some(rec) = inner.groups.remove(handle.pool_handle()) else {
            return;
        };
        let hash = rec.group.content_hash();
        if inner.by_hash.get(&hash) == Some(&handle) {
            inner.by_hash.remove(&hash);
        }
        inner.stats.live = inner.groups.len();
        inner.stats.render_materials = inner
            .stats
            .render_materials
            .saturating_sub(rec.group.materials().len());

        match inner.recycle.as_mut() {
            Some(lru) => {
                // push hands back whatever fell out: the LRU tail or a same-key entry
                if let Some((_, evicted)) = lru.push(hash, rec.group) {
                    inner.pending_unloads.push(evicted);
                }
            }
            None => inner.pending_unloads.push(rec.group),
        }
    }

    fn render_material_group(&self, handle: RenderMaterialGroupHandle) -> Option<Arc<RenderMaterialGroup>> {
        self.inner
            .lock()
            .groups
            .get(handle.pool_handle())
            .map(|rec| Arc::clone(&rec.group))
    }
}
