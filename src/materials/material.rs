// src/materials/material.rs
//! User-facing material: mutable render state plus a lazily rebuilt render
//! group.
//!
//! Every mutator drops the cache. `render_material_group` rebuilds it on
//! demand: destroy the old group, snapshot the resolved texture identities,
//! validate the state against the shading type, hand the resulting description
//! to the group manager. At most one group is alive per material and the old
//! one is always destroyed before the next is built.
//!
//! Validation is deferred: mutators accept any combination (a cubemap on an
//! unlit material, say) and the next build reports what is wrong.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use log::debug;

use crate::colour::Colour;
use crate::error::{MaterialError, Result};
use crate::gpu::group_manager::RenderMaterialGroupManager;
use crate::gpu::render_material_group::RenderMaterialGroupHandle;
use crate::materials::description::{
    BlinnGroupDesc, CustomGroupDesc, RenderMaterialGroupDesc, SkyboxGroupDesc, UnlitGroupDesc,
};
use crate::render_state::{
    BlendMode, CullFace, RenderPass, RenderStates, ShadingType, StencilOp, TestFunc, VertexFormat,
};
use crate::shader::{RenderShaderId, Shader};
use crate::shader_vars::{ShaderVarValue, ShaderVariables};
use crate::texture::{Cubemap, RenderTextureId, Texture};

pub struct Material {
    name: String,
    manager: Arc<dyn RenderMaterialGroupManager>,
    render_thread: ThreadId,

    shading_type: ShadingType,
    textures: Vec<Arc<Texture>>,
    cubemaps: Vec<Arc<Cubemap>>,
    states: RenderStates,
    emissive: Colour,
    ambient: Colour,
    diffuse: Colour,
    specular: Colour,

    custom_shaders: Vec<(Arc<Shader>, RenderPass)>,
    custom_shader_vertex_format: VertexFormat,
    custom_shader_fallback: ShadingType,
    custom_shaders_prepped: bool,
    variables: ShaderVariables,

    // derived
    is_cache_valid: bool,
    is_variable_cache_valid: bool,
    render_material_group: Option<RenderMaterialGroupHandle>,
    cached_render_textures: Vec<Option<RenderTextureId>>,
}

impl Material {
    /// Empty custom material. Only `MaterialFactory` creates these.
    pub(crate) fn new(
        name: impl Into<String>,
        manager: Arc<dyn RenderMaterialGroupManager>,
        render_thread: ThreadId,
    ) -> Self {
        Self {
            name: name.into(),
            manager,
            render_thread,
            shading_type: ShadingType::Custom,
            textures: Vec::new(),
            cubemaps: Vec::new(),
            states: RenderStates::default(),
            emissive: Colour::BLACK,
            ambient: Colour::WHITE,
            diffuse: Colour::WHITE,
            specular: Colour::BLACK,
            custom_shaders: Vec::new(),
            custom_shader_vertex_format: VertexFormat::default(),
            custom_shader_fallback: ShadingType::Custom,
            custom_shaders_prepped: false,
            variables: ShaderVariables::new(),
            is_cache_valid: false,
            is_variable_cache_valid: false,
            render_material_group: None,
            cached_render_textures: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render_thread(&self) -> ThreadId {
        self.render_thread
    }

    #[inline]
    fn invalidate(&mut self) {
        self.is_cache_valid = false;
    }

    // ---------- Shading type ----------

    pub fn shading_type(&self) -> ShadingType {
        self.shading_type
    }

    pub fn set_shading_type(&mut self, shading_type: ShadingType) {
        self.shading_type = shading_type;
        self.invalidate();
    }

    // ---------- Textures ----------

    pub fn add_texture(&mut self, texture: &Arc<Texture>) {
        self.textures.push(Arc::clone(texture));
        self.invalidate();
    }

    /// Replace the texture in slot `index`. Always invalidates, even when the
    /// same texture is set again.
    pub fn set_texture(&mut self, texture: &Arc<Texture>, index: usize) -> Result<()> {
        if index >= self.textures.len() {
            return Err(MaterialError::out_of_bounds(&self.name, "texture", index, self.textures.len()));
        }
        self.textures[index] = Arc::clone(texture);
        self.invalidate();
        Ok(())
    }

    pub fn texture(&self, index: usize) -> Result<&Arc<Texture>> {
        self.textures
            .get(index)
            .ok_or_else(|| MaterialError::out_of_bounds(&self.name, "texture", index, self.textures.len()))
    }

    pub fn textures(&self) -> &[Arc<Texture>] {
        &self.textures
    }

    pub fn remove_all_textures(&mut self) {
        self.textures.clear();
        self.invalidate();
    }

    // ---------- Cubemaps ----------

    pub fn add_cubemap(&mut self, cubemap: &Arc<Cubemap>) {
        self.cubemaps.push(Arc::clone(cubemap));
        self.invalidate();
    }

    pub fn set_cubemap(&mut self, cubemap: &Arc<Cubemap>, index: usize) -> Result<()> {
        if index >= self.cubemaps.len() {
            return Err(MaterialError::out_of_bounds(&self.name, "cubemap", index, self.cubemaps.len()));
        }
        self.cubemaps[index] = Arc::clone(cubemap);
        self.invalidate();
        Ok(())
    }

    pub fn cubemap(&self, index: usize) -> Result<&Arc<Cubemap>> {
        self.cubemaps
            .get(index)
            .ok_or_else(|| MaterialError::out_of_bounds(&self.name, "cubemap", index, self.cubemaps.len()))
    }

    pub fn cubemaps(&self) -> &[Arc<Cubemap>] {
        &self.cubemaps
    }

    pub fn remove_all_cubemaps(&mut self) {
        self.cubemaps.clear();
        self.invalidate();
    }

    // ---------- Render state ----------

    pub fn render_states(&self) -> &RenderStates {
        &self.states
    }

    pub fn is_transparency_enabled(&self) -> bool {
        self.states.transparency_enabled
    }

    /// Toggle alpha blending. Depth write is forced to the opposite value:
    /// transparent materials never write depth.
    pub fn set_transparency_enabled(&mut self, enable: bool) {
        self.states.transparency_enabled = enable;
        self.states.depth_write_enabled = !enable;
        self.invalidate();
    }

    pub fn is_depth_write_enabled(&self) -> bool {
        self.states.depth_write_enabled
    }

    pub fn set_depth_write_enabled(&mut self, enable: bool) -> Result<()> {
        if enable && self.states.transparency_enabled {
            return Err(MaterialError::invalid_state(
                &self.name,
                "depth write cannot be enabled on a transparent material",
            ));
        }
        self.states.depth_write_enabled = enable;
        self.invalidate();
        Ok(())
    }

    pub fn is_colour_write_enabled(&self) -> bool {
        self.states.colour_write_enabled
    }

    pub fn set_colour_write_enabled(&mut self, enable: bool) {
        self.states.colour_write_enabled = enable;
        self.invalidate();
    }

    pub fn is_depth_test_enabled(&self) -> bool {
        self.states.depth_test_enabled
    }

    pub fn set_depth_test_enabled(&mut self, enable: bool) {
        self.states.depth_test_enabled = enable;
        self.invalidate();
    }

    pub fn is_face_culling_enabled(&self) -> bool {
        self.states.face_culling_enabled
    }

    pub fn set_face_culling_enabled(&mut self, enable: bool) {
        self.states.face_culling_enabled = enable;
        self.invalidate();
    }

    pub fn is_stencil_test_enabled(&self) -> bool {
        self.states.stencil_test_enabled
    }

    pub fn set_stencil_test_enabled(&mut self, enable: bool) {
        self.states.stencil_test_enabled = enable;
        self.invalidate();
    }

    pub fn set_blend_modes(&mut self, source: BlendMode, destination: BlendMode) {
        self.states.source_blend_mode = source;
        self.states.destination_blend_mode = destination;
        self.invalidate();
    }

    pub fn set_cull_face(&mut self, cull_face: CullFace) {
        self.states.cull_face = cull_face;
        self.invalidate();
    }

    pub fn set_depth_test_func(&mut self, func: TestFunc) {
        self.states.depth_test_func = func;
        self.invalidate();
    }

    /// What the stencil buffer does on stencil fail, depth fail and pass.
    pub fn set_stencil_post_test_ops(&mut self, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        self.states.stencil_fail_op = fail;
        self.states.stencil_depth_fail_op = depth_fail;
        self.states.stencil_pass_op = pass;
        self.invalidate();
    }

    pub fn set_stencil_test_func(&mut self, func: TestFunc, reference: i32, mask: u32) {
        self.states.stencil_test_func = func;
        self.states.stencil_ref = reference;
        self.states.stencil_mask = mask;
        self.invalidate();
    }

    // ---------- Colours ----------

    pub fn emissive(&self) -> Colour {
        self.emissive
    }

    pub fn set_emissive(&mut self, colour: Colour) {
        self.emissive = colour;
        self.invalidate();
    }

    pub fn ambient(&self) -> Colour {
        self.ambient
    }

    pub fn set_ambient(&mut self, colour: Colour) {
        self.ambient = colour;
        self.invalidate();
    }

    pub fn diffuse(&self) -> Colour {
        self.diffuse
    }

    pub fn set_diffuse(&mut self, colour: Colour) {
        self.diffuse = colour;
        self.invalidate();
    }

    pub fn specular(&self) -> Colour {
        self.specular
    }

    pub fn set_specular(&mut self, colour: Colour) {
        self.specular = colour;
        self.invalidate();
    }

    // ---------- Custom shaders ----------

    /// Start a fresh custom shader list. Passes no custom shader covers are
    /// filled from `fallback`.
    pub fn prep_custom_shaders(&mut self, vertex_format: VertexFormat, fallback: ShadingType) {
        self.custom_shaders.clear();
        self.custom_shader_vertex_format = vertex_format;
        self.custom_shader_fallback = fallback;
        self.custom_shaders_prepped = true;
        self.invalidate();
    }

    /// Bind `shader` to `pass`. Several shaders may target the same pass; the
    /// manager decides which one wins.
    pub fn add_custom_shader(&mut self, shader: &Arc<Shader>, pass: RenderPass) -> Result<()> {
        if !self.custom_shaders_prepped {
            return Err(MaterialError::invalid_state(
                &self.name,
                "add_custom_shader called before prep_custom_shaders",
            ));
        }
        self.custom_shaders.push((Arc::clone(shader), pass));
        self.invalidate();
        Ok(())
    }

    pub fn custom_shaders(&self) -> &[(Arc<Shader>, RenderPass)] {
        &self.custom_shaders
    }

    pub fn custom_shader_vertex_format(&self) -> VertexFormat {
        self.custom_shader_vertex_format
    }

    pub fn custom_shader_fallback(&self) -> ShadingType {
        self.custom_shader_fallback
    }

    // ---------- Shader variables ----------

    pub fn set_shader_var<V: ShaderVarValue>(&mut self, name: impl Into<String>, value: V) {
        self.variables.set(name, value);
        self.is_cache_valid = false;
        self.is_variable_cache_valid = false;
    }

    pub fn shader_var<V: ShaderVarValue>(&self, name: &str) -> Option<&V> {
        self.variables.get(name)
    }

    pub fn shader_variables(&self) -> &ShaderVariables {
        &self.variables
    }

    // ---------- Render group cache ----------

    pub fn is_cache_valid(&self) -> bool {
        self.is_cache_valid
    }

    pub fn is_variable_cache_valid(&self) -> bool {
        self.is_variable_cache_valid
    }

    /// Handle of the current group without triggering a rebuild.
    pub fn current_render_material_group(&self) -> Option<RenderMaterialGroupHandle> {
        self.render_material_group
    }

    /// The render group for the current state, rebuilt if anything changed
    /// since the last call. Render thread only.
    pub fn render_material_group(&mut self) -> Result<RenderMaterialGroupHandle> {
        let current = thread::current().id();
        if current != self.render_thread {
            return Err(MaterialError::ConcurrencyViolation {
                material: self.name.clone(),
                expected: self.render_thread,
                actual: current,
            });
        }

        if let Some(handle) = self.render_material_group {
            if self.is_cache_valid && self.is_variable_cache_valid && self.verify_textures_are_valid() {
                return Ok(handle);
            }
        }

        let reason = self.rebuild_reason();
        self.destroy_render_material_group();

        self.cached_render_textures = self
            .textures
            .iter()
            .map(|t| t.render_texture())
            .chain(self.cubemaps.iter().map(|c| c.render_texture()))
            .collect();
        self.is_cache_valid = true;
        self.is_variable_cache_valid = true;

        let desc = self.describe()?;
        let handle = self.manager.create_render_material_group(desc)?;
        self.render_material_group = Some(handle);
        debug!(
            "material '{}': rebuilt {} render group {:?} ({})",
            self.name, self.shading_type, handle, reason
        );
        Ok(handle)
    }

    /// True while every texture then cubemap still resolves to the identity it
    /// had when the group was built.
    fn verify_textures_are_valid(&self) -> bool {
        if self.cached_render_textures.len() != self.textures.len() + self.cubemaps.len() {
            return false;
        }
        let current = self
            .textures
            .iter()
            .map(|t| t.render_texture())
            .chain(self.cubemaps.iter().map(|c| c.render_texture()));
        current
            .zip(&self.cached_render_textures)
            .all(|(now, cached)| now == *cached)
    }

    fn rebuild_reason(&self) -> &'static str {
        if self.render_material_group.is_none() {
            "no group"
        } else if !self.is_variable_cache_valid {
            "shader variables changed"
        } else if !self.is_cache_valid {
            "state changed"
        } else {
            "render texture identity changed"
        }
    }

    fn destroy_render_material_group(&mut self) {
        if let Some(handle) = self.render_material_group.take() {
            self.manager.destroy_render_material_group(handle);
        }
    }

    // ---------- Validation ----------

    fn describe(&self) -> Result<RenderMaterialGroupDesc> {
        Ok(match self.shading_type {
            ShadingType::Unlit => self.describe_unlit()?.into(),
            ShadingType::Blinn => self.describe_blinn()?.into(),
            ShadingType::Skybox => self.describe_skybox()?.into(),
            ShadingType::Custom => self.describe_custom()?.into(),
        })
    }

    /// Counts shared by every built-in shading type.
    fn require_builtin_layout(&self, textures: usize, cubemaps: usize) -> Result<()> {
        let st = self.shading_type;
        if self.textures.len() != textures {
            return Err(MaterialError::invalid_state(
                &self.name,
                format!("{st} material needs exactly {textures} texture(s), has {}", self.textures.len()),
            ));
        }
        if self.cubemaps.len() != cubemaps {
            return Err(MaterialError::invalid_state(
                &self.name,
                format!("{st} material needs exactly {cubemaps} cubemap(s), has {}", self.cubemaps.len()),
            ));
        }
        if !self.custom_shaders.is_empty() {
            return Err(MaterialError::invalid_state(
                &self.name,
                format!("{st} material cannot have custom shaders"),
            ));
        }
        if !self.variables.is_empty() {
            return Err(MaterialError::invalid_state(
                &self.name,
                format!("{st} material cannot have shader variables"),
            ));
        }
        Ok(())
    }

    fn describe_unlit(&self) -> Result<UnlitGroupDesc> {
        self.require_builtin_layout(1, 0)?;
        if self.states.transparency_enabled && self.states.depth_write_enabled {
            return Err(MaterialError::invalid_state(
                &self.name,
                "transparency and depth write cannot both be enabled",
            ));
        }
        Ok(UnlitGroupDesc {
            render_texture: self.resolve_texture(&self.textures[0])?,
            states: self.states,
            emissive: self.emissive,
            ambient: self.ambient,
        })
    }

    fn describe_blinn(&self) -> Result<BlinnGroupDesc> {
        self.require_builtin_layout(1, 0)?;
        let s = &self.states;
        let broken = if s.transparency_enabled {
            Some("transparency enabled")
        } else if !s.depth_write_enabled {
            Some("depth write disabled")
        } else if !s.colour_write_enabled {
            Some("colour write disabled")
        } else if !s.depth_test_enabled {
            Some("depth test disabled")
        } else if !s.face_culling_enabled {
            Some("face culling disabled")
        } else if s.cull_face != CullFace::Back {
            Some("culling front faces")
        } else {
            None
        };
        if let Some(what) = broken {
            return Err(MaterialError::invalid_state(
                &self.name,
                format!("blinn material requires default render state ({what})"),
            ));
        }
        Ok(BlinnGroupDesc {
            render_texture: self.resolve_texture(&self.textures[0])?,
            emissive: self.emissive,
            ambient: self.ambient,
            diffuse: self.diffuse,
            specular: self.specular,
        })
    }

    fn describe_skybox(&self) -> Result<SkyboxGroupDesc> {
        self.require_builtin_layout(0, 1)?;
        Ok(SkyboxGroupDesc {
            render_cubemap: self.resolve_cubemap(&self.cubemaps[0])?,
        })
    }

    fn describe_custom(&self) -> Result<CustomGroupDesc> {
        if self.custom_shaders.is_empty() {
            return Err(MaterialError::invalid_state(
                &self.name,
                "custom material needs at least one custom shader",
            ));
        }
        match self.custom_shader_fallback {
            ShadingType::Unlit | ShadingType::Blinn if self.textures.is_empty() => {
                return Err(MaterialError::invalid_state(
                    &self.name,
                    format!("{} fallback needs a texture", self.custom_shader_fallback),
                ));
            }
            ShadingType::Skybox if self.cubemaps.is_empty() => {
                return Err(MaterialError::invalid_state(&self.name, "skybox fallback needs a cubemap"));
            }
            ShadingType::Skybox if self.custom_shader_vertex_format != VertexFormat::StaticMesh => {
                return Err(MaterialError::invalid_state(
                    &self.name,
                    "skybox fallback only works with static meshes",
                ));
            }
            _ => {}
        }

        let render_shaders = self
            .custom_shaders
            .iter()
            .map(|(shader, pass)| Ok((self.resolve_shader(shader)?, *pass)))
            .collect::<Result<Vec<_>>>()?;
        let render_textures = self
            .textures
            .iter()
            .map(|t| self.resolve_texture(t))
            .collect::<Result<Vec<_>>>()?;
        let render_cubemaps = self
            .cubemaps
            .iter()
            .map(|c| self.resolve_cubemap(c))
            .collect::<Result<Vec<_>>>()?;

        Ok(CustomGroupDesc {
            fallback: self.custom_shader_fallback,
            vertex_format: self.custom_shader_vertex_format,
            render_shaders,
            render_textures,
            render_cubemaps,
            states: self.states,
            emissive: self.emissive,
            ambient: self.ambient,
            diffuse: self.diffuse,
            specular: self.specular,
            variables: self.variables.clone(),
        })
    }

    fn resolve_texture(&self, texture: &Texture) -> Result<RenderTextureId> {
        texture
            .render_texture()
            .ok_or_else(|| MaterialError::null_argument(&self.name, format!("texture '{}'", texture.name())))
    }

    fn resolve_cubemap(&self, cubemap: &Cubemap) -> Result<RenderTextureId> {
        cubemap
            .render_texture()
            .ok_or_else(|| MaterialError::null_argument(&self.name, format!("cubemap '{}'", cubemap.name())))
    }

    fn resolve_shader(&self, shader: &Shader) -> Result<RenderShaderId> {
        shader
            .render_shader()
            .ok_or_else(|| MaterialError::null_argument(&self.name, format!("shader '{}'", shader.name())))
    }
}

impl Drop for Material {
    fn drop(&mut self) {
        self.destroy_render_material_group();
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("shading_type", &self.shading_type)
            .field("textures", &self.textures.len())
            .field("cubemaps", &self.cubemaps.len())
            .field("custom_shaders", &self.custom_shaders.len())
            .field("is_cache_valid", &self.is_cache_valid)
            .field("render_material_group", &self.render_material_group)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingGroupManager;
    use glam::{Mat4, Vec2, Vec3, Vec4};

    fn material(mgr: &Arc<RecordingGroupManager>) -> Material {
        let manager: Arc<dyn RenderMaterialGroupManager> = mgr.clone();
        Material::new("test", manager, thread::current().id())
    }

    fn texture(name: &str) -> Arc<Texture> {
        Texture::new(name, RenderTextureId::next())
    }

    fn cubemap(name: &str) -> Arc<Cubemap> {
        Cubemap::new(name, RenderTextureId::next())
    }

    fn unlit(mgr: &Arc<RecordingGroupManager>) -> Material {
        let mut m = material(mgr);
        m.set_shading_type(ShadingType::Unlit);
        m.add_texture(&texture("t.png"));
        m
    }

    #[test]
    fn test_defaults() {
        let mgr = RecordingGroupManager::new();
        let m = material(&mgr);
        assert_eq!(m.shading_type(), ShadingType::Custom);
        assert!(!m.is_transparency_enabled());
        assert!(m.is_colour_write_enabled() && m.is_depth_write_enabled() && m.is_depth_test_enabled());
        assert!(m.is_face_culling_enabled());
        assert_eq!(m.render_states().cull_face, CullFace::Back);
        assert!(!m.is_cache_valid());
    }

    #[test]
    fn test_repeated_reads_are_idempotent() {
        let mgr = RecordingGroupManager::new();
        let mut m = unlit(&mgr);
        let a = m.render_material_group().unwrap();
        let b = m.render_material_group().unwrap();
        assert_eq!(a, b);
        assert_eq!(mgr.counts().created(), 1);
        assert_eq!(mgr.counts().destroyed, 0);
        assert!(m.is_cache_valid() && m.is_variable_cache_valid());
    }

    #[test]
    fn test_every_mutator_triggers_one_rebuild() {
        let tex = texture("t.png");
        let mutators: Vec<(&str, Box<dyn Fn(&mut Material)>)> = vec![
            ("set_texture", Box::new(move |m: &mut Material| m.set_texture(&tex, 0).unwrap())),
            ("set_shading_type", Box::new(|m: &mut Material| m.set_shading_type(ShadingType::Unlit))),
            ("set_transparency", Box::new(|m: &mut Material| m.set_transparency_enabled(false))),
            ("set_depth_write", Box::new(|m: &mut Material| m.set_depth_write_enabled(true).unwrap())),
            ("set_colour_write", Box::new(|m: &mut Material| m.set_colour_write_enabled(true))),
            ("set_depth_test", Box::new(|m: &mut Material| m.set_depth_test_enabled(true))),
            ("set_face_culling", Box::new(|m: &mut Material| m.set_face_culling_enabled(true))),
            ("set_stencil_test", Box::new(|m: &mut Material| m.set_stencil_test_enabled(false))),
            ("set_blend_modes", Box::new(|m: &mut Material| m.set_blend_modes(BlendMode::SourceAlpha, BlendMode::OneMinusSourceAlpha))),
            ("set_cull_face", Box::new(|m: &mut Material| m.set_cull_face(CullFace::Back))),
            ("set_depth_test_func", Box::new(|m: &mut Material| m.set_depth_test_func(TestFunc::Less))),
            ("set_stencil_ops", Box::new(|m: &mut Material| m.set_stencil_post_test_ops(StencilOp::Keep, StencilOp::Zero, StencilOp::Replace))),
            ("set_stencil_func", Box::new(|m: &mut Material| m.set_stencil_test_func(TestFunc::Equal, 2, 0x0f))),
            ("set_emissive", Box::new(|m: &mut Material| m.set_emissive(Colour::WHITE))),
            ("set_ambient", Box::new(|m: &mut Material| m.set_ambient(Colour::BLACK))),
            ("set_diffuse", Box::new(|m: &mut Material| m.set_diffuse(Colour::BLACK))),
            ("set_specular", Box::new(|m: &mut Material| m.set_specular(Colour::WHITE))),
        ];

        for (label, mutate) in &mutators {
            let mgr = RecordingGroupManager::new();
            let mut m = unlit(&mgr);
            let first = m.render_material_group().unwrap();

            // same setter, same value, twice: still one rebuild
            mutate(&mut m);
            mutate(&mut m);
            assert!(!m.is_cache_valid(), "{label} left the cache valid");
            let second = m.render_material_group().unwrap();

            let counts = mgr.counts();
            assert_eq!(counts.created(), 2, "{label}");
            assert_eq!(counts.destroyed, 1, "{label}");
            assert_ne!(first, second, "{label}");
        }
    }

    #[test]
    fn test_list_mutators_trigger_rebuild() {
        let mgr = RecordingGroupManager::new();
        let mut m = material(&mgr);
        m.prep_custom_shaders(VertexFormat::StaticMesh, ShadingType::Custom);
        m.add_custom_shader(&Shader::new("A.csshader"), RenderPass::Base).unwrap();
        m.render_material_group().unwrap();

        m.add_texture(&texture("a.png"));
        m.render_material_group().unwrap();
        m.add_cubemap(&cubemap("c.csimage"));
        m.render_material_group().unwrap();
        m.remove_all_textures();
        m.render_material_group().unwrap();
        m.remove_all_cubemaps();
        m.render_material_group().unwrap();
        m.add_custom_shader(&Shader::new("B.csshader"), RenderPass::Transparent).unwrap();
        m.render_material_group().unwrap();

        assert_eq!(mgr.counts().custom, 6);
        assert_eq!(mgr.counts().destroyed, 5);
        assert_eq!(mgr.live(), 1);
    }

    #[test]
    fn test_shader_var_invalidates_both_flags() {
        let mgr = RecordingGroupManager::new();
        let mut m = material(&mgr);
        m.prep_custom_shaders(VertexFormat::StaticMesh, ShadingType::Custom);
        m.add_custom_shader(&Shader::new("A.csshader"), RenderPass::Base).unwrap();
        m.render_material_group().unwrap();

        m.set_shader_var("u_time", 1.0f32);
        m.set_shader_var("u_time", 1.0f32);
        assert!(!m.is_cache_valid());
        assert!(!m.is_variable_cache_valid());
        m.render_material_group().unwrap();
        assert!(m.is_variable_cache_valid());
        assert_eq!(mgr.counts().custom, 2);
        assert_eq!(mgr.counts().destroyed, 1);
    }

    #[test]
    fn test_texture_reload_forces_rebuild() {
        let mgr = RecordingGroupManager::new();
        let tex = texture("t.png");
        let mut m = material(&mgr);
        m.set_shading_type(ShadingType::Unlit);
        m.add_texture(&tex);
        m.render_material_group().unwrap();

        tex.reload(RenderTextureId::next());
        assert!(m.is_cache_valid());
        m.render_material_group().unwrap();
        assert_eq!(mgr.counts().unlit, 2);
        assert_eq!(mgr.counts().destroyed, 1);

        match mgr.last_desc().unwrap() {
            RenderMaterialGroupDesc::Unlit(d) => assert_eq!(Some(d.render_texture), tex.render_texture()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cubemap_reload_forces_rebuild() {
        let mgr = RecordingGroupManager::new();
        let sky = cubemap("sky.csimage");
        let mut m = material(&mgr);
        m.set_shading_type(ShadingType::Skybox);
        m.add_cubemap(&sky);
        m.render_material_group().unwrap();
        m.render_material_group().unwrap();
        assert_eq!(mgr.counts().skybox, 1);

        sky.reload(RenderTextureId::next());
        m.render_material_group().unwrap();
        assert_eq!(mgr.counts().skybox, 2);
    }

    #[test]
    fn test_unlit_invariants() {
        let mgr = RecordingGroupManager::new();
        let mut m = unlit(&mgr);
        assert!(m.render_material_group().is_ok());

        m.add_texture(&texture("second.png"));
        assert!(m.render_material_group().unwrap_err().is_invalid_state());

        let mut m = unlit(&mgr);
        m.add_cubemap(&cubemap("c.csimage"));
        assert!(m.render_material_group().unwrap_err().is_invalid_state());

        let mut m = unlit(&mgr);
        m.set_shader_var("u_tint", Colour::WHITE);
        assert!(m.render_material_group().unwrap_err().is_invalid_state());

        let mut m = unlit(&mgr);
        m.prep_custom_shaders(VertexFormat::StaticMesh, ShadingType::Custom);
        m.add_custom_shader(&Shader::new("A.csshader"), RenderPass::Base).unwrap();
        assert!(m.render_material_group().unwrap_err().is_invalid_state());

        // transparent unlit is fine: depth write follows transparency
        let mut m = unlit(&mgr);
        m.set_transparency_enabled(true);
        assert!(m.render_material_group().is_ok());
    }

    #[test]
    fn test_failed_build_leaves_no_group() {
        let mgr = RecordingGroupManager::new();
        let mut m = unlit(&mgr);
        m.render_material_group().unwrap();
        m.add_texture(&texture("second.png"));
        assert!(m.render_material_group().is_err());

        assert_eq!(m.current_render_material_group(), None);
        assert_eq!(mgr.live(), 0);
        // still broken on the next call, not silently served from cache
        assert!(m.render_material_group().is_err());
    }

    #[test]
    fn test_blinn_invariants() {
        let mgr = RecordingGroupManager::new();
        let blinn = || {
            let mut m = material(&mgr);
            m.set_shading_type(ShadingType::Blinn);
            m.add_texture(&texture("b.png"));
            m
        };

        assert!(blinn().render_material_group().is_ok());

        let mut m = blinn();
        m.set_transparency_enabled(true);
        assert!(m.render_material_group().unwrap_err().is_invalid_state());

        let mut m = blinn();
        m.set_face_culling_enabled(false);
        assert!(m.render_material_group().unwrap_err().is_invalid_state());

        let mut m = blinn();
        m.set_cull_face(CullFace::Front);
        let err = m.render_material_group().unwrap_err();
        assert!(err.is_invalid_state());
        assert!(err.to_string().contains("culling front faces"));

        let mut m = blinn();
        m.add_texture(&texture("extra.png"));
        assert!(m.render_material_group().unwrap_err().is_invalid_state());
        // not trimmed to fit
        assert_eq!(m.textures().len(), 2);
    }

    #[test]
    fn test_skybox_invariants() {
        let mgr = RecordingGroupManager::new();
        let mut m = material(&mgr);
        m.set_shading_type(ShadingType::Skybox);
        assert!(m.render_material_group().unwrap_err().is_invalid_state());
        m.add_cubemap(&cubemap("sky.csimage"));
        assert!(m.render_material_group().is_ok());
        m.add_texture(&texture("t.png"));
        assert!(m.render_material_group().unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_depth_write_transparency_coupling() {
        let mgr = RecordingGroupManager::new();
        let mut m = material(&mgr);
        m.set_transparency_enabled(true);
        assert!(!m.is_depth_write_enabled());

        let err = m.set_depth_write_enabled(true).unwrap_err();
        assert!(err.is_invalid_state());
        assert!(!m.is_depth_write_enabled());
        // turning it off is always allowed
        m.set_depth_write_enabled(false).unwrap();

        m.set_transparency_enabled(false);
        assert!(m.is_depth_write_enabled());
    }

    #[test]
    fn test_custom_pass_through() {
        let mgr = RecordingGroupManager::new();
        let mut m = material(&mgr);
        let textures = [texture("a.png"), texture("b.png"), texture("c.png")];
        let cubemaps = [cubemap("x.csimage"), cubemap("y.csimage")];
        for t in &textures {
            m.add_texture(t);
        }
        for c in &cubemaps {
            m.add_cubemap(c);
        }
        let water = Shader::new("Water.csshader");
        let caustics = Shader::new("Caustics.csshader");
        m.prep_custom_shaders(VertexFormat::AnimatedMesh, ShadingType::Unlit);
        m.add_custom_shader(&water, RenderPass::Base).unwrap();
        m.add_custom_shader(&caustics, RenderPass::Transparent).unwrap();

        m.set_shader_var("u_time", 2.5f32);
        m.set_shader_var("u_uv", Vec2::new(0.25, 0.75));
        m.set_shader_var("u_dir", Vec3::new(0.0, -1.0, 0.0));
        m.set_shader_var("u_params", Vec4::new(1.0, 2.0, 3.0, 4.0));
        m.set_shader_var("u_world", Mat4::from_scale(Vec3::splat(2.0)));
        m.set_shader_var("u_fog", Colour::from_rgb8(10, 20, 30));
        let expected_vars = m.shader_variables().clone();

        m.render_material_group().unwrap();
        assert_eq!(mgr.counts().custom, 1);

        let RenderMaterialGroupDesc::Custom(d) = mgr.last_desc().unwrap() else {
            panic!("expected a custom description");
        };
        assert_eq!(d.fallback, ShadingType::Unlit);
        assert_eq!(d.vertex_format, VertexFormat::AnimatedMesh);
        assert_eq!(
            d.render_textures,
            textures.iter().map(|t| t.render_texture().unwrap()).collect::<Vec<_>>()
        );
        assert_eq!(
            d.render_cubemaps,
            cubemaps.iter().map(|c| c.render_texture().unwrap()).collect::<Vec<_>>()
        );
        assert_eq!(
            d.render_shaders,
            vec![
                (water.render_shader().unwrap(), RenderPass::Base),
                (caustics.render_shader().unwrap(), RenderPass::Transparent),
            ]
        );
        assert_eq!(d.variables, expected_vars);
        assert_eq!(d.variables.len(), 6);
        assert_eq!(d.variables.get::<f32>("u_time"), Some(&2.5));
        assert_eq!(d.variables.get::<Colour>("u_fog"), Some(&Colour::from_rgb8(10, 20, 30)));
    }

    #[test]
    fn test_custom_requires_shader_and_prep() {
        let mgr = RecordingGroupManager::new();
        let mut m = material(&mgr);
        let err = m
            .add_custom_shader(&Shader::new("A.csshader"), RenderPass::Base)
            .unwrap_err();
        assert!(err.is_invalid_state());
        assert!(m.render_material_group().unwrap_err().is_invalid_state());

        m.prep_custom_shaders(VertexFormat::StaticMesh, ShadingType::Blinn);
        m.add_custom_shader(&Shader::new("A.csshader"), RenderPass::Base).unwrap();
        // blinn fallback without a texture
        assert!(m.render_material_group().unwrap_err().is_invalid_state());
        m.add_texture(&texture("t.png"));
        assert!(m.render_material_group().is_ok());

        // prep resets the list
        m.prep_custom_shaders(VertexFormat::StaticMesh, ShadingType::Custom);
        assert!(m.custom_shaders().is_empty());
    }

    #[test]
    fn test_unresolved_resources_are_null_arguments() {
        let mgr = RecordingGroupManager::new();
        let mut m = material(&mgr);
        m.set_shading_type(ShadingType::Unlit);
        let pending = Texture::unloaded("streaming.png");
        m.add_texture(&pending);
        assert!(m.render_material_group().unwrap_err().is_null_argument());

        pending.reload(RenderTextureId::next());
        assert!(m.render_material_group().is_ok());

        let mut m = material(&mgr);
        m.prep_custom_shaders(VertexFormat::StaticMesh, ShadingType::Custom);
        m.add_custom_shader(&Shader::uncompiled("Late.csshader"), RenderPass::Base).unwrap();
        assert!(m.render_material_group().unwrap_err().is_null_argument());
    }

    #[test]
    fn test_index_out_of_bounds() {
        let mgr = RecordingGroupManager::new();
        let mut m = material(&mgr);
        let t = texture("t.png");
        assert!(m.set_texture(&t, 0).unwrap_err().is_out_of_bounds());
        assert!(m.texture(0).unwrap_err().is_out_of_bounds());
        assert!(m.cubemap(0).unwrap_err().is_out_of_bounds());
        m.add_texture(&t);
        assert!(Arc::ptr_eq(m.texture(0).unwrap(), &t));
        assert!(m.set_cubemap(&cubemap("c.csimage"), 1).unwrap_err().is_out_of_bounds());
    }

    #[test]
    fn test_end_to_end_same_texture_still_rebuilds() {
        let mgr = RecordingGroupManager::new();
        let t1 = texture("t1.png");
        let mut m = material(&mgr);
        m.set_shading_type(ShadingType::Unlit);
        m.add_texture(&t1);

        let g1 = m.render_material_group().unwrap();
        assert_eq!(mgr.counts().created(), 1);

        m.set_texture(&t1, 0).unwrap();
        let g2 = m.render_material_group().unwrap();
        assert_ne!(g1, g2);
        assert_eq!(mgr.counts().created(), 2);
        assert_eq!(mgr.counts().destroyed, 1);
    }

    #[test]
    fn test_off_thread_access_is_rejected() {
        let mgr = RecordingGroupManager::new();
        let mut m = unlit(&mgr);
        let err = thread::spawn(move || m.render_material_group().unwrap_err())
            .join()
            .unwrap();
        assert!(err.is_concurrency_violation());
        assert_eq!(mgr.counts().created(), 0);
    }

    #[test]
    fn test_drop_destroys_group() {
        let mgr = RecordingGroupManager::new();
        {
            let mut m = unlit(&mgr);
            m.render_material_group().unwrap();
            assert_eq!(mgr.live(), 1);
        }
        assert_eq!(mgr.counts().destroyed, 1);
        assert_eq!(mgr.live(), 0);
    }
}
