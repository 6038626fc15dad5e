// src/gpu/mod.rs
pub mod forward_group_manager;
pub mod group_manager;
pub mod render_material_group;
pub mod resource_pool;

pub use forward_group_manager::{
    BuiltinShaders, ForwardRenderMaterialGroupManager, GroupManagerStats, RenderSnapshot,
};
pub use group_manager::RenderMaterialGroupManager;
pub use render_material_group::{
    Collection, RenderMaterial, RenderMaterialGroup, RenderMaterialGroupHandle,
};
pub use resource_pool::{HandlePool, PoolHandle};
