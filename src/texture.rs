// src/texture.rs
//! Texture and cubemap resources as seen by materials.
//!
//! A `Texture` is a stable, shared handle (`Arc<Texture>`) owned jointly by the
//! resource cache that loaded it and every material that references it. The GPU
//! side lives behind a `RenderTextureId` which may be swapped in place when the
//! texture is reloaded, so materials compare identities rather than handles.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Global monotonic counter for render-texture identities.
static NEXT_RENDER_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an uploaded GPU texture. Two resolutions compare equal only if
/// they refer to the same upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTextureId(u64);

impl RenderTextureId {
    /// Allocate a fresh, never-before-seen identity.
    pub fn next() -> Self {
        RenderTextureId(NEXT_RENDER_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

// ---------- Shared slot ----------

/// Name plus the current render identity, shared by textures and cubemaps.
struct RenderTextureSlot {
    name: String,
    render_texture: RwLock<Option<RenderTextureId>>,
}

impl RenderTextureSlot {
    fn new(name: String, render_texture: Option<RenderTextureId>) -> Self {
        Self {
            name,
            render_texture: RwLock::new(render_texture),
        }
    }

    fn swap(&self, id: Option<RenderTextureId>) -> Option<RenderTextureId> {
        std::mem::replace(&mut *self.render_texture.write(), id)
    }
}

// ---------- Texture ----------

/// 2D texture resource.
pub struct Texture {
    slot: RenderTextureSlot,
}

impl Texture {
    /// Texture already resident on the GPU.
    pub fn new(name: impl Into<String>, render_texture: RenderTextureId) -> Arc<Self> {
        Arc::new(Self {
            slot: RenderTextureSlot::new(name.into(), Some(render_texture)),
        })
    }

    /// Texture whose upload has not happened yet.
    pub fn unloaded(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            slot: RenderTextureSlot::new(name.into(), None),
        })
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    /// Current render identity, `None` while unloaded.
    pub fn render_texture(&self) -> Option<RenderTextureId> {
        *self.slot.render_texture.read()
    }

    /// Swap in a new upload behind the same handle. Returns the previous identity.
    pub fn reload(&self, render_texture: RenderTextureId) -> Option<RenderTextureId> {
        log::debug!("texture '{}' reloaded as {:?}", self.slot.name, render_texture);
        self.slot.swap(Some(render_texture))
    }

    /// Drop the GPU side, keeping the handle alive.
    pub fn unload(&self) -> Option<RenderTextureId> {
        self.slot.swap(None)
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("name", &self.slot.name)
            .field("render_texture", &self.render_texture())
            .finish()
    }
}

// ---------- Cubemap ----------

/// Six-faced cube texture resource.
pub struct Cubemap {
    slot: RenderTextureSlot,
}

impl Cubemap {
    pub fn new(name: impl Into<String>, render_texture: RenderTextureId) -> Arc<Self> {
        Arc::new(Self {
            slot: RenderTextureSlot::new(name.into(), Some(render_texture)),
        })
    }

    pub fn unloaded(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            slot: RenderTextureSlot::new(name.into(), None),
        })
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn render_texture(&self) -> Option<RenderTextureId> {
        *self.slot.render_texture.read()
    }

    pub fn reload(&self, render_texture: RenderTextureId) -> Option<RenderTextureId> {
        log::debug!("cubemap '{}' reloaded as {:?}", self.slot.name, render_texture);
        self.slot.swap(Some(render_texture))
    }

    pub fn unload(&self) -> Option<RenderTextureId> {
        self.slot.swap(None)
    }
}

impl fmt::Debug for Cubemap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cubemap")
            .field("name", &self.slot.name)
            .field("render_texture", &self.render_texture())
            .finish()
    }
}
