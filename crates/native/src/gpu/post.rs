//! Bloom mip chain and the final tonemapped composite onto the surface.

use gargantua_core::bloom::PostUniforms;

use super::arena::UniformArena;
use super::helpers::{self, HDR_FORMAT};

pub struct PostResources {
    bgl0: wgpu::BindGroupLayout, // tex+sampler+uniform
    bgl1: wgpu::BindGroupLayout, // tex+sampler
    sampler: wgpu::Sampler,
    bright: wgpu::RenderPipeline,
    down: wgpu::RenderPipeline,
    up: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
}

impl PostResources {
    pub fn new(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        swap_format: wgpu::TextureFormat,
    ) -> Self {
        let bgl0 = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_bgl0"),
            entries: &[
                helpers::texture_entry(0),
                helpers::sampler_entry(1),
                helpers::dynamic_uniform_entry::<PostUniforms>(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let bgl1 = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_bgl1"),
            entries: &[helpers::texture_entry(0), helpers::sampler_entry(1)],
        });
        let pl_chain = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl_post_chain"),
            bind_group_layouts: &[&bgl0],
            push_constant_ranges: &[],
        });
        let pl_composite = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl_post_comp"),
            bind_group_layouts: &[&bgl0, &bgl1],
            push_constant_ranges: &[],
        });

        let chain = |label: &str, entry: &str, blend: Option<wgpu::BlendState>| {
            helpers::make_post_pipeline(
                device, label, &pl_chain, shader, entry, HDR_FORMAT, blend, false,
            )
        };
        let bright = chain("bloom_bright", "fs_bright", None);
        let down = chain("bloom_down", "fs_down", None);
        let up = chain("bloom_up", "fs_up", Some(helpers::ADDITIVE));
        let composite = helpers::make_post_pipeline(
            device,
            "bloom_composite",
            &pl_composite,
            shader,
            "fs_composite",
            swap_format,
            Some(wgpu::BlendState::REPLACE),
            false,
        );

        Self {
            bgl0,
            bgl1,
            sampler: helpers::create_sampler(device, "post_sampler", wgpu::FilterMode::Linear),
            bright,
            down,
            up,
            composite,
        }
    }

    pub fn bind_with_uniforms(
        &self,
        device: &wgpu::Device,
        arena: &UniformArena,
        source: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post_bg0"),
            layout: &self.bgl0,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: helpers::arena_binding::<PostUniforms>(arena.buffer()),
                },
            ],
        })
    }

    pub fn bind_texture(&self, device: &wgpu::Device, source: &wgpu::TextureView) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post_bg1"),
            layout: &self.bgl1,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Run the whole chain: threshold into mip 0, downsample through the
    /// mips, add each mip back onto the next larger one, then combine
    /// `source + mip0 * strength` onto `output`.
    ///
    /// `mips` pairs each mip view with the uniforms for that level, largest first.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        arena: &mut UniformArena,
        source: (&wgpu::TextureView, PostUniforms),
        mips: &[(&wgpu::TextureView, PostUniforms)],
        output: &wgpu::TextureView,
    ) -> Result<(), String> {
        let Some(&(mip0, _)) = mips.first() else {
            return Err("bloom chain has no mips".into());
        };
        // stage every block before binding; the arena buffer is fixed for the frame
        let bright_offset = stage(arena, &source.1)?;
        let down_offsets = mips
            .windows(2)
            .map(|pair| stage(arena, &pair[0].1))
            .collect::<Result<Vec<_>, _>>()?;
        let up_offsets = mips
            .windows(2)
            .map(|pair| stage(arena, &pair[1].1))
            .collect::<Result<Vec<_>, _>>()?;
        let composite_offset = stage(arena, &source.1)?;
        let arena = &*arena;

        let bg = self.bind_with_uniforms(device, arena, source.0);
        blit(encoder, "bloom_bright", mip0, clear(), &self.bright, (&bg, bright_offset), None);

        for (pair, &offset) in mips.windows(2).zip(&down_offsets) {
            let bg = self.bind_with_uniforms(device, arena, pair[0].0);
            blit(encoder, "bloom_down", pair[1].0, clear(), &self.down, (&bg, offset), None);
        }

        for (pair, &offset) in mips.windows(2).zip(&up_offsets).rev() {
            let bg = self.bind_with_uniforms(device, arena, pair[1].0);
            blit(encoder, "bloom_up", pair[0].0, wgpu::LoadOp::Load, &self.up, (&bg, offset), None);
        }

        let bg0 = self.bind_with_uniforms(device, arena, source.0);
        let bg1 = self.bind_texture(device, mip0);
        blit(
            encoder,
            "bloom_composite",
            output,
            clear(),
            &self.composite,
            (&bg0, composite_offset),
            Some(&bg1),
        );
        Ok(())
    }
}

fn stage(arena: &mut UniformArena, u: &PostUniforms) -> Result<u32, String> {
    arena.push(u).ok_or_else(|| "uniform arena exhausted".to_string())
}

fn clear() -> wgpu::LoadOp<wgpu::Color> {
    wgpu::LoadOp::Clear(wgpu::Color::BLACK)
}

pub(crate) fn blit(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
    pipeline: &wgpu::RenderPipeline,
    bg0: (&wgpu::BindGroup, u32),
    bg1: Option<&wgpu::BindGroup>,
) {
    let mut r = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(helpers::color_attachment(target, load))],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    r.set_pipeline(pipeline);
    r.set_bind_group(0, bg0.0, &[bg0.1]);
    if let Some(g1) = bg1 {
        r.set_bind_group(1, g1, &[]);
    }
    r.draw(0..3, 0..1);
}
