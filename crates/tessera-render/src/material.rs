//! Material registry mapping [`MaterialKind`] to compiled pipelines.

use ahash::{HashMap, HashMapExt};

use crate::{
    batch::{
        pipeline::{self, DEBUG_SHADER, OUTLINE_SHADER, SPRITE_SHADER},
        MaterialKind,
    },
    error::{RenderError, RenderResult},
};

/// All pipelines the frame can draw with, compiled once at startup.
///
/// A lookup miss is a startup configuration error and fails the frame loudly
/// rather than drawing a partial scene.
pub struct Materials {
    pipelines: HashMap<MaterialKind, wgpu::RenderPipeline>,
    screen_pipeline: wgpu::RenderPipeline,
}

impl Materials {
    pub fn new(
        device: &wgpu::Device,
        globals_layout: &wgpu::BindGroupLayout,
        atlas_layout: &wgpu::BindGroupLayout,
        screen_layout: &wgpu::BindGroupLayout,
        scene_format: wgpu::TextureFormat,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let mut pipelines = HashMap::new();
        for (kind, label, source) in [
            (MaterialKind::Instanced, "Instanced Pipeline", SPRITE_SHADER),
            (
                MaterialKind::InstancedOutline,
                "Instanced Outline Pipeline",
                OUTLINE_SHADER,
            ),
            (
                MaterialKind::InstancedDebug,
                "Instanced Debug Pipeline",
                DEBUG_SHADER,
            ),
        ] {
            pipelines.insert(
                kind,
                pipeline::create_batch_pipeline(
                    device,
                    label,
                    source,
                    globals_layout,
                    atlas_layout,
                    scene_format,
                ),
            );
        }

        let screen_pipeline =
            pipeline::create_screen_pipeline(device, screen_layout, surface_format);

        Self {
            pipelines,
            screen_pipeline,
        }
    }

    pub fn get(&self, kind: MaterialKind) -> RenderResult<&wgpu::RenderPipeline> {
        self.pipelines
            .get(&kind)
            .ok_or(RenderError::MaterialMissing { kind })
    }

    pub fn screen(&self) -> &wgpu::RenderPipeline {
        &self.screen_pipeline
    }
}
