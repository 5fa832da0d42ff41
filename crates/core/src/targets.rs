use fnv::FnvHashMap;

use crate::backend::RenderBackend;
use crate::constants::MIN_SAFE_TARGET_SIZE;

/// Offscreen color targets owned by the orchestrator.
///
/// - `Stars` holds the background capture at the profile's capture resolution.
/// - `Foreground` holds the black hole geometry capture (dual-capture profiles only).
/// - `Composite` is the lensing compositor output, window sized.
/// - `BloomMip(n)` is the bloom chain at `window / 2^(n+1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetSlot {
    Stars,
    Foreground,
    Composite,
    BloomMip(u8),
}

impl TargetSlot {
    pub fn label(&self) -> String {
        match self {
            TargetSlot::Stars => "stars_capture".into(),
            TargetSlot::Foreground => "foreground_capture".into(),
            TargetSlot::Composite => "lens_composite".into(),
            TargetSlot::BloomMip(n) => format!("bloom_mip_{n}"),
        }
    }
}

/// Opaque backend handle for an allocated target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Linear,
    Nearest,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TargetDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub filter: FilterMode,
    /// Allocate a matching depth attachment.
    pub depth: bool,
}

/// Presentation surface size in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

/// How a slot derives its pixel size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetSize {
    /// Square edge fixed by the active profile.
    Fixed(u32),
    /// Window size divided by `divisor`.
    Window { divisor: u32 },
}

impl TargetSize {
    pub fn resolve(&self, viewport: Viewport) -> (u32, u32) {
        match *self {
            TargetSize::Fixed(edge) => (edge.max(1), edge.max(1)),
            TargetSize::Window { divisor } => {
                let d = divisor.max(1);
                ((viewport.width / d).max(1), (viewport.height / d).max(1))
            }
        }
    }

    pub fn tracks_window(&self) -> bool {
        matches!(self, TargetSize::Window { .. })
    }
}

#[derive(Clone, Debug)]
pub struct LiveTarget {
    pub id: TargetId,
    pub desc: TargetDesc,
    pub size: TargetSize,
}

/// Slot → live target table. Every replacement releases the old handle
/// before allocating the new one, so the pool never holds a stale id.
#[derive(Default)]
pub struct TargetPool {
    live: FnvHashMap<TargetSlot, LiveTarget>,
}

impl TargetPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: TargetSlot) -> Option<&LiveTarget> {
        self.live.get(&slot)
    }

    pub fn id(&self, slot: TargetSlot) -> Option<TargetId> {
        self.live.get(&slot).map(|t| t.id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = TargetSlot> + '_ {
        self.live.keys().copied()
    }

    /// Make `slot` live at the size `size` resolves to.
    ///
    /// Falls back to the previous resolution, then to [`MIN_SAFE_TARGET_SIZE`].
    /// Returns `None` (slot vacant) only when every attempt fails.
    pub fn ensure<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        slot: TargetSlot,
        size: TargetSize,
        viewport: Viewport,
        depth: bool,
    ) -> Option<TargetId> {
        let (width, height) = size.resolve(viewport);
        if let Some(t) = self.live.get_mut(&slot) {
            if t.desc.width == width && t.desc.height == height && t.desc.depth == depth {
                t.size = size;
                return Some(t.id);
            }
        }
        let previous = self.live.remove(&slot).map(|old| {
            backend.release_target(old.id);
            (old.desc.width, old.desc.height)
        });

        let mut attempts = vec![(width, height)];
        if let Some(prev) = previous {
            attempts.push(prev);
        }
        attempts.push((
            MIN_SAFE_TARGET_SIZE.min(width),
            MIN_SAFE_TARGET_SIZE.min(height),
        ));
        attempts.dedup();

        for (w, h) in attempts {
            let desc = TargetDesc {
                label: slot.label(),
                width: w,
                height: h,
                filter: FilterMode::Linear,
                depth,
            };
            match backend.create_target(&desc) {
                Ok(id) => {
                    if (w, h) != (width, height) {
                        log::warn!(
                            "[targets] {:?} fell back to {}x{} (requested {}x{})",
                            slot,
                            w,
                            h,
                            width,
                            height
                        );
                    } else {
                        log::debug!("[targets] {:?} allocated {}x{}", slot, w, h);
                    }
                    self.live.insert(slot, LiveTarget { id, desc, size });
                    return Some(id);
                }
                Err(e) => log::warn!("[targets] {:?} allocation failed: {}", slot, e),
            }
        }
        log::error!("[targets] {:?} left unallocated; dependent passes are disabled", slot);
        None
    }

    pub fn release<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, slot: TargetSlot) {
        if let Some(old) = self.live.remove(&slot) {
            backend.release_target(old.id);
        }
    }

    /// Release every slot for which `keep` returns false.
    pub fn retain<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        keep: impl Fn(TargetSlot) -> bool,
    ) {
        let doomed: Vec<TargetSlot> = self.live.keys().copied().filter(|s| !keep(*s)).collect();
        for slot in doomed {
            self.release(backend, slot);
        }
    }

    /// Reallocate every window-sized slot for a new viewport.
    pub fn resize_window_targets<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        viewport: Viewport,
    ) {
        let window_slots: Vec<(TargetSlot, TargetSize, bool)> = self
            .live
            .iter()
            .filter(|(_, t)| t.size.tracks_window())
            .map(|(s, t)| (*s, t.size, t.desc.depth))
            .collect();
        for (slot, size, depth) in window_slots {
            self.ensure(backend, slot, size, viewport, depth);
        }
    }

    pub fn release_all<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        for (_, t) in self.live.drain() {
            backend.release_target(t.id);
        }
    }
}
