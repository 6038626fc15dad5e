// src/shader_vars.rs
//! Named shader variables bound by custom materials.
//!
//! Values are kept in one map per value type so the bundle can be handed to
//! the group manager without any type erasure. Keys are unique per map,
//! insertion order is irrelevant.

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3, Vec4};
use xxhash_rust::xxh3::Xxh3;

use crate::colour::Colour;

/// Value type of a shader variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ShaderVarType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    Colour,
}

impl ShaderVarType {
    /// GLSL spelling of the type.
    pub fn glsl_type(&self) -> &'static str {
        match self {
            ShaderVarType::Float => "float",
            ShaderVarType::Vec2 => "vec2",
            ShaderVarType::Vec3 => "vec3",
            ShaderVarType::Vec4 | ShaderVarType::Colour => "vec4",
            ShaderVarType::Mat4 => "mat4",
        }
    }
}

/// The six typed variable maps of a material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderVariables {
    pub floats: HashMap<String, f32>,
    pub vec2s: HashMap<String, Vec2>,
    pub vec3s: HashMap<String, Vec3>,
    pub vec4s: HashMap<String, Vec4>,
    pub mat4s: HashMap<String, Mat4>,
    pub colours: HashMap<String, Colour>,
}

impl ShaderVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name` in the map matching the value's type.
    pub fn set<V: ShaderVarValue>(&mut self, name: impl Into<String>, value: V) {
        V::map_mut(self).insert(name.into(), value);
    }

    pub fn get<V: ShaderVarValue>(&self, name: &str) -> Option<&V> {
        V::map(self).get(name)
    }

    pub fn len(&self) -> usize {
        self.floats.len()
            + self.vec2s.len()
            + self.vec3s.len()
            + self.vec4s.len()
            + self.mat4s.len()
            + self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.floats.clear();
        self.vec2s.clear();
        self.vec3s.clear();
        self.vec4s.clear();
        self.mat4s.clear();
        self.colours.clear();
    }

    /// Feed every entry into `hasher` in a map-order independent way.
    pub(crate) fn hash_into(&self, hasher: &mut Xxh3) {
        hash_map(hasher, ShaderVarType::Float, &self.floats);
        hash_map(hasher, ShaderVarType::Vec2, &self.vec2s);
        hash_map(hasher, ShaderVarType::Vec3, &self.vec3s);
        hash_map(hasher, ShaderVarType::Vec4, &self.vec4s);
        hash_map(hasher, ShaderVarType::Mat4, &self.mat4s);
        hash_map(hasher, ShaderVarType::Colour, &self.colours);
    }
}

fn hash_map<V: ShaderVarValue>(hasher: &mut Xxh3, ty: ShaderVarType, map: &HashMap<String, V>) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_unstable();
    hasher.update(&[ty as u8]);
    hasher.update(&(keys.len() as u64).to_le_bytes());
    for key in keys {
        hasher.update(key.as_bytes());
        hasher.update(&[0]);
        map[key].hash_value(hasher);
    }
}

// ---------- Typed access ----------

/// A value type that can be stored as a shader variable. Implemented for the
/// six supported types; each maps to its own table in `ShaderVariables`.
pub trait ShaderVarValue: Copy + PartialEq + Sized {
    const TYPE: ShaderVarType;

    fn map(vars: &ShaderVariables) -> &HashMap<String, Self>;
    fn map_mut(vars: &mut ShaderVariables) -> &mut HashMap<String, Self>;
    fn hash_value(&self, hasher: &mut Xxh3);
}

macro_rules! impl_shader_var {
    ($ty:ty, $variant:ident, $field:ident) => {
        impl ShaderVarValue for $ty {
            const TYPE: ShaderVarType = ShaderVarType::$variant;

            #[inline]
            fn map(vars: &ShaderVariables) -> &HashMap<String, Self> {
                &vars.$field
            }

            #[inline]
            fn map_mut(vars: &mut ShaderVariables) -> &mut HashMap<String, Self> {
                &mut vars.$field
            }

            #[inline]
            fn hash_value(&self, hasher: &mut Xxh3) {
                hasher.update(bytemuck::bytes_of(self));
            }
        }
    };
}

impl_shader_var!(f32, Float, floats);
impl_shader_var!(Vec2, Vec2, vec2s);
impl_shader_var!(Vec3, Vec3, vec3s);
impl_shader_var!(Vec4, Vec4, vec4s);
impl_shader_var!(Mat4, Mat4, mat4s);
impl_shader_var!(Colour, Colour, colours);
