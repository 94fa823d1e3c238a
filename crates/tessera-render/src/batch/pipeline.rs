//! GPU pipeline plumbing shared by the batch materials.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Per-pass uniform data.
///
/// The layout must match the `Globals` struct in the WGSL sources below.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Globals {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub atlas_size: [f32; 2],
    pub time: f32,
    pub _pad: f32,
}

/// Unit quad, instanced for every drawn quad. Vertex position doubles as the
/// region-local UV.
const QUAD_VERTICES: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

pub fn create_quad_vertex_buffer(device: &wgpu::Device) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Batch Quad Vertex Buffer"),
        contents: bytemuck::cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

pub fn quad_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
    wgpu::VertexBufferLayout {
        array_stride: 8,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRS,
    }
}

/// One vec4 per instance: `(x, y, width, height)` in atlas pixels.
pub fn region_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x4];
    wgpu::VertexBufferLayout {
        array_stride: 16,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &ATTRS,
    }
}

/// One mat4 per instance, fed as four column vectors.
pub fn model_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
    ];
    wgpu::VertexBufferLayout {
        array_stride: 64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &ATTRS,
    }
}

pub fn create_globals_buffer(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<Globals>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

pub fn create_globals_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Batch Globals Layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Texture + sampler layout, used for both the atlas and the screen texture.
pub fn create_texture_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub fn create_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Nearest-neighbor sampler; pixel art smears under linear filtering.
pub fn create_pixel_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Batch Pixel Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

pub fn create_instance_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Build one of the instanced batch pipelines.
pub fn create_batch_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader_source: &str,
    globals_layout: &wgpu::BindGroupLayout,
    atlas_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[globals_layout, atlas_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[
                quad_vertex_layout(),
                region_instance_layout(),
                model_instance_layout(),
            ],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Build the fullscreen present pipeline.
pub fn create_screen_pipeline(
    device: &wgpu::Device,
    screen_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Screen Pipeline"),
        source: wgpu::ShaderSource::Wgsl(SCREEN_SHADER.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Screen Pipeline"),
        bind_group_layouts: &[screen_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Screen Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[quad_vertex_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// WGSL for the standard atlas-sampled instanced quad.
pub const SPRITE_SHADER: &str = r#"
struct Globals {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    atlas_size: vec2<f32>,
    time: f32,
}

@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var atlas_texture: texture_2d<f32>;
@group(1) @binding(1) var atlas_sampler: sampler;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) region: vec4<f32>,
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let model = mat4x4<f32>(input.model_0, input.model_1, input.model_2, input.model_3);
    var out: VertexOutput;
    out.position = globals.projection * globals.view * model * vec4<f32>(input.position, 0.0, 1.0);
    out.uv = (input.region.xy + input.position * input.region.zw) / globals.atlas_size;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(atlas_texture, atlas_sampler, input.uv);
    if color.a == 0.0 {
        discard;
    }
    return color;
}
"#;

/// WGSL for the silhouette outline: transparent pixels adjacent to opaque
/// ones light up, everything else is discarded.
pub const OUTLINE_SHADER: &str = r#"
struct Globals {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    atlas_size: vec2<f32>,
    time: f32,
}

@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var atlas_texture: texture_2d<f32>;
@group(1) @binding(1) var atlas_sampler: sampler;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) region: vec4<f32>,
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let model = mat4x4<f32>(input.model_0, input.model_1, input.model_2, input.model_3);
    var out: VertexOutput;
    out.position = globals.projection * globals.view * model * vec4<f32>(input.position, 0.0, 1.0);
    out.uv = (input.region.xy + input.position * input.region.zw) / globals.atlas_size;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let center = textureSample(atlas_texture, atlas_sampler, input.uv);
    let texel = vec2<f32>(1.0, 1.0) / globals.atlas_size;

    var neighbor_alpha = 0.0;
    neighbor_alpha = max(neighbor_alpha, textureSample(atlas_texture, atlas_sampler, input.uv + vec2<f32>(texel.x, 0.0)).a);
    neighbor_alpha = max(neighbor_alpha, textureSample(atlas_texture, atlas_sampler, input.uv - vec2<f32>(texel.x, 0.0)).a);
    neighbor_alpha = max(neighbor_alpha, textureSample(atlas_texture, atlas_sampler, input.uv + vec2<f32>(0.0, texel.y)).a);
    neighbor_alpha = max(neighbor_alpha, textureSample(atlas_texture, atlas_sampler, input.uv - vec2<f32>(0.0, texel.y)).a);

    if center.a == 0.0 && neighbor_alpha > 0.0 {
        return vec4<f32>(1.0, 1.0, 1.0, 1.0);
    }
    discard;
    return vec4<f32>(0.0);
}
"#;

/// WGSL for the debug collision overlay: a one-pixel border with a faint
/// fill. The region's size field carries the box dimensions in pixels.
pub const DEBUG_SHADER: &str = r#"
struct Globals {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    atlas_size: vec2<f32>,
    time: f32,
}

@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var atlas_texture: texture_2d<f32>;
@group(1) @binding(1) var atlas_sampler: sampler;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) region: vec4<f32>,
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) box_size: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let model = mat4x4<f32>(input.model_0, input.model_1, input.model_2, input.model_3);
    var out: VertexOutput;
    out.position = globals.projection * globals.view * model * vec4<f32>(input.position, 0.0, 1.0);
    out.local = input.position;
    out.box_size = input.region.zw;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let px = input.local * input.box_size;
    let edge = min(min(px.x, input.box_size.x - px.x), min(px.y, input.box_size.y - px.y));
    if edge < 1.0 {
        return vec4<f32>(1.0, 0.1, 0.1, 0.9);
    }
    return vec4<f32>(1.0, 0.1, 0.1, 0.15);
}
"#;

/// WGSL for the post-process present pass.
const SCREEN_SHADER: &str = r#"
@group(0) @binding(0) var screen_texture: texture_2d<f32>;
@group(0) @binding(1) var screen_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position.x * 2.0 - 1.0, 1.0 - position.y * 2.0, 0.0, 1.0);
    out.uv = position;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(screen_texture, screen_sampler, input.uv);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_matches_wgsl_layout() {
        // mat4 + mat4 + vec2 + f32, rounded up to 16-byte alignment.
        assert_eq!(std::mem::size_of::<Globals>(), 144);
    }

    #[test]
    fn test_instance_strides_match_layouts() {
        assert_eq!(
            std::mem::size_of::<crate::batch::RegionData>() as u64,
            region_instance_layout().array_stride
        );
        assert_eq!(
            std::mem::size_of::<[[f32; 4]; 4]>() as u64,
            model_instance_layout().array_stride
        );
    }
}
