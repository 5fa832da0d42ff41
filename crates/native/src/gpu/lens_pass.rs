//! Lensing compositor: a full-screen warp over the captures, with the
//! unlensed overlay drawn into the same pass.

use gargantua_core::lensing::LensUniforms;

use super::arena::UniformArena;
use super::helpers::{self, HDR_FORMAT};

pub struct LensPipelines {
    layout: wgpu::BindGroupLayout,
    with_depth: wgpu::RenderPipeline,
    without_depth: wgpu::RenderPipeline,
    sampler: wgpu::Sampler,
    // bound as t_scene when only the star capture exists
    blank: (wgpu::Texture, wgpu::TextureView),
}

impl LensPipelines {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, shader: &wgpu::ShaderModule) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lens_bgl"),
            entries: &[
                helpers::dynamic_uniform_entry::<LensUniforms>(0, wgpu::ShaderStages::FRAGMENT),
                helpers::texture_entry(1),
                helpers::texture_entry(2),
                helpers::sampler_entry(3),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lens_pl"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let with_depth = helpers::make_post_pipeline(
            device,
            "lens_depth",
            &pipeline_layout,
            shader,
            "fs_lens",
            HDR_FORMAT,
            Some(wgpu::BlendState::REPLACE),
            true,
        );
        let without_depth = helpers::make_post_pipeline(
            device,
            "lens",
            &pipeline_layout,
            shader,
            "fs_lens",
            HDR_FORMAT,
            Some(wgpu::BlendState::REPLACE),
            false,
        );

        let blank = helpers::create_color_texture(
            device,
            "lens_blank",
            1,
            1,
            HDR_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        // transparent black, four f16 zeros
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &blank.0,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[0u8; 8],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(8),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        Self {
            layout,
            with_depth,
            without_depth,
            sampler: helpers::create_sampler(device, "lens_sampler", wgpu::FilterMode::Linear),
            blank,
        }
    }

    pub fn bind(
        &self,
        device: &wgpu::Device,
        arena: &UniformArena,
        stars: &wgpu::TextureView,
        scene: Option<&wgpu::TextureView>,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lens_bg"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: helpers::arena_binding::<LensUniforms>(arena.buffer()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(stars),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(scene.unwrap_or(&self.blank.1)),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    pub fn pipeline(&self, depth: bool) -> &wgpu::RenderPipeline {
        if depth {
            &self.with_depth
        } else {
            &self.without_depth
        }
    }
}
