use fnv::FnvHashMap;
use gargantua_core::error::ResourceError;
use gargantua_core::targets::{TargetDesc, TargetId};

use super::helpers;

/// One offscreen color target with its optional depth attachment.
pub struct GpuTarget {
    pub desc: TargetDesc,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth: Option<(wgpu::Texture, wgpu::TextureView)>,
}

/// Id → texture table backing the orchestrator's target pool.
#[derive(Default)]
pub struct GpuTargets {
    next_id: u64,
    live: FnvHashMap<TargetId, GpuTarget>,
}

impl GpuTargets {
    pub fn create(
        &mut self,
        device: &wgpu::Device,
        desc: &TargetDesc,
    ) -> Result<TargetId, ResourceError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(ResourceError::ZeroSized(desc.label.clone()));
        }
        let limit = device.limits().max_texture_dimension_2d;
        if desc.width > limit || desc.height > limit {
            return Err(ResourceError::TooLarge {
                label: desc.label.clone(),
                width: desc.width,
                height: desc.height,
                limit,
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let (texture, view) = helpers::create_color_texture(
            device,
            &desc.label,
            desc.width,
            desc.height,
            helpers::HDR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let depth = desc.depth.then(|| {
            helpers::create_depth_texture(
                device,
                &format!("{}_depth", desc.label),
                desc.width,
                desc.height,
            )
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            log::error!("[gpu] {} allocation failed: {}", desc.label, err);
            return Err(ResourceError::OutOfMemory(desc.label.clone()));
        }

        self.next_id += 1;
        let id = TargetId(self.next_id);
        self.live.insert(
            id,
            GpuTarget {
                desc: desc.clone(),
                texture,
                view,
                depth,
            },
        );
        Ok(id)
    }

    pub fn release(&mut self, id: TargetId) {
        match self.live.remove(&id) {
            Some(t) => {
                t.texture.destroy();
                if let Some((depth, _)) = t.depth {
                    depth.destroy();
                }
            }
            None => log::warn!("[gpu] release of unknown target {}", id.0),
        }
    }

    pub fn get(&self, id: TargetId) -> Option<&GpuTarget> {
        self.live.get(&id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }
}
