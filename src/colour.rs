// src/colour.rs
//! RGBA colour used for material lighting terms and colour shader variables.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

/// Linear RGBA colour, components in `[0, 1]` by convention (not clamped).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Colour {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    #[inline]
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r, self.g, self.b, self.a)
    }
}

impl Default for Colour {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<Vec4> for Colour {
    fn from(v: Vec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

impl From<[f32; 4]> for Colour {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb8_and_vec4() {
        let c = Colour::from_rgb8(255, 0, 51);
        assert_eq!(c.to_vec4(), Vec4::new(1.0, 0.0, 0.2, 1.0));
        assert_eq!(Colour::from(Vec4::ONE), Colour::WHITE);
    }

    #[test]
    fn test_pod_layout() {
        assert_eq!(bytemuck::bytes_of(&Colour::BLACK).len(), 16);
    }
}
