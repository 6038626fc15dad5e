// src/main.rs
//! Drives a few materials through the forward group manager and prints what
//! the renderer would see.

use std::sync::Arc;

use anyhow::Context;
use log::{info, LevelFilter};

use slop_material::{
    Colour, Cubemap, ForwardRenderMaterialGroupManager, GroupManagerConfig, MaterialFactory,
    RenderMaterialGroupManager, RenderPass, RenderTextureId, Shader, ShadingType, Texture,
    VertexFormat,
};

fn main() -> anyhow::Result<()> {
    setup_diagnostics();

    let cfg = match std::env::args().nth(1) {
        Some(json) => GroupManagerConfig::from_json_str(&json).context("parsing config argument")?,
        None => GroupManagerConfig::default().with_shadows(true),
    };
    info!("group manager config: {:?}", cfg);

    let manager = Arc::new(ForwardRenderMaterialGroupManager::new(cfg));
    let factory = MaterialFactory::new(manager.clone());

    let bricks = Texture::new("Textures/Bricks.png", RenderTextureId::next());
    let glass = Texture::new("Textures/Glass.png", RenderTextureId::next());
    let sky = Cubemap::new("Textures/Sky.csimage", RenderTextureId::next());

    let mut wall = factory.create_blinn("wall", &bricks);
    let mut window = factory.create_unlit("window", &glass, true);
    let mut skybox = factory.create_skybox("sky", &sky);
    // same content as `wall`, ends up sharing its group
    let mut wall_copy = factory.create_blinn("wall_copy", &bricks);

    let mut water = factory.create_custom("water");
    water.add_texture(&bricks);
    water.prep_custom_shaders(VertexFormat::StaticMesh, ShadingType::Blinn);
    water.add_custom_shader(&Shader::new("Shaders/Water.csshader"), RenderPass::Base)?;
    water.set_shader_var("u_time", 0.0f32);
    water.set_shader_var("u_tint", Colour::from_rgb8(40, 90, 160));

    for material in [&mut wall, &mut window, &mut skybox, &mut wall_copy, &mut water] {
        let handle = material.render_material_group()?;
        let group = manager
            .render_material_group(handle)
            .with_context(|| format!("group for '{}' vanished", material.name()))?;
        let passes: Vec<_> = group
            .collection(VertexFormat::StaticMesh)
            .map(|c| c.passes().collect())
            .unwrap_or_default();
        info!(
            "{:<10} {:<7} {:?} materials={} static passes={:?}",
            material.name(),
            material.shading_type().as_str(),
            handle,
            group.materials().len(),
            passes
        );
    }

    let snapshot = manager.take_render_snapshot();
    info!("frame 0: {} group(s) to load", snapshot.loaded.len());

    // Simulated frames: animate the water, hot-reload the bricks once.
    for frame in 1..=3u32 {
        water.set_shader_var("u_time", frame as f32 / 60.0);
        if frame == 2 {
            bricks.reload(RenderTextureId::next());
        }
        for material in [&mut wall, &mut window, &mut skybox, &mut wall_copy, &mut water] {
            material.render_material_group()?;
        }
        let snapshot = manager.take_render_snapshot();
        info!(
            "frame {}: load {} unload {}",
            frame,
            snapshot.loaded.len(),
            snapshot.unloaded.len()
        );
    }

    let stats = manager.stats();
    info!(
        "created={} deduplicated={} recycled={} destroyed={} live={} render_materials={}",
        stats.created, stats.deduplicated, stats.recycled, stats.destroyed, stats.live, stats.render_materials
    );
    Ok(())
}

fn setup_diagnostics() {
    env_logger::Builder::new()
        .filter_level(if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format_timestamp_millis()
        .format_target(false)
        .parse_default_env()
        .init();
}
