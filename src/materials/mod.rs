// src/materials/mod.rs
pub mod description;
pub mod factory;
pub mod material;

pub use description::{
    BlinnGroupDesc, CustomGroupDesc, RenderMaterialGroupDesc, SkyboxGroupDesc, UnlitGroupDesc,
};
pub use factory::MaterialFactory;
pub use material::Material;
