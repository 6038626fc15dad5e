// src/shader.rs
//! Shader resources referenced by custom materials.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use xxhash_rust::xxh3::xxh3_64;

/// Identity of a compiled shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderShaderId(u64);

impl RenderShaderId {
    /// Stable identity derived from a shader path. Built-in shaders use this so
    /// the same path always maps to the same program.
    pub fn from_name(name: &str) -> Self {
        RenderShaderId(xxh3_64(name.as_bytes()))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Shared shader handle. The compiled program may be absent (not compiled yet)
/// or replaced by a hot reload.
pub struct Shader {
    name: String,
    render_shader: RwLock<Option<RenderShaderId>>,
}

impl Shader {
    /// Shader compiled from `name`, identity derived from the path.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let name = name.into();
        let id = RenderShaderId::from_name(&name);
        Arc::new(Self {
            name,
            render_shader: RwLock::new(Some(id)),
        })
    }

    /// Shader whose program has not been compiled yet.
    pub fn uncompiled(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            render_shader: RwLock::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render_shader(&self) -> Option<RenderShaderId> {
        *self.render_shader.read()
    }

    /// Replace the compiled program, returns the previous one.
    pub fn set_render_shader(&self, id: Option<RenderShaderId>) -> Option<RenderShaderId> {
        std::mem::replace(&mut *self.render_shader.write(), id)
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .field("render_shader", &self.render_shader())
            .finish()
    }
}
