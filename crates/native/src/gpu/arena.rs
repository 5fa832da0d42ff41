//! Per-frame uniform arena.
//!
//! Every draw and post step appends its uniform block at a fresh 256-byte
//! aligned slot and binds it with a dynamic offset. Blocks are staged on the
//! CPU and uploaded in one write before submit, so no pass can observe a
//! block written for a later pass.

/// Covers the default `min_uniform_buffer_offset_alignment` on every backend.
pub const SLOT_ALIGN: u64 = 256;
const INITIAL_SLOTS: u64 = 256;

pub struct UniformArena {
    buffer: wgpu::Buffer,
    staging: Vec<u8>,
    capacity: u64,
    grow_to: Option<u64>,
}

impl UniformArena {
    pub fn new(device: &wgpu::Device) -> Self {
        let capacity = INITIAL_SLOTS * SLOT_ALIGN;
        Self {
            buffer: create_buffer(device, capacity),
            staging: Vec::with_capacity(capacity as usize),
            capacity,
            grow_to: None,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Start a frame. Returns true when the buffer was reallocated and bind
    /// groups referencing it must be rebuilt.
    pub fn reset(&mut self, device: &wgpu::Device) -> bool {
        self.staging.clear();
        match self.grow_to.take() {
            Some(capacity) => {
                log::info!("[arena] growing uniform arena to {} bytes", capacity);
                self.buffer = create_buffer(device, capacity);
                self.capacity = capacity;
                true
            }
            None => false,
        }
    }

    /// Stage `value` and return its dynamic offset, or `None` when the arena is
    /// full for this frame (it grows at the next reset).
    pub fn push<T: bytemuck::Pod>(&mut self, value: &T) -> Option<u32> {
        debug_assert!(std::mem::size_of::<T>() as u64 <= SLOT_ALIGN);
        let offset = self.staging.len() as u64;
        let end = offset + SLOT_ALIGN;
        if end > self.capacity {
            self.grow_to = Some(self.capacity * 2);
            return None;
        }
        self.staging.extend_from_slice(bytemuck::bytes_of(value));
        self.staging.resize(end as usize, 0);
        Some(offset as u32)
    }

    pub fn flush(&self, queue: &wgpu::Queue) {
        if !self.staging.is_empty() {
            queue.write_buffer(&self.buffer, 0, &self.staging);
        }
    }
}

fn create_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("uniform_arena"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
