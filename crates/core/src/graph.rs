//! Pass DAG. Nodes declare the targets they read and the single output they
//! write; execution order is the topological order, so "capture before
//! composite before bloom" follows from the bindings rather than call order.

use std::collections::BTreeSet;

use fnv::FnvHashMap;
use smallvec::{smallvec, SmallVec};

use crate::error::GraphError;
use crate::profile::ModeProfile;
use crate::targets::TargetSlot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassId {
    StarCapture,
    ForegroundCapture,
    Lensing,
    Bloom,
}

/// Named texture input of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    pub name: &'static str,
    pub slot: TargetSlot,
}

/// Numeric inputs resolved from frame state when the pass runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformSlot {
    Time,
    LensStrength,
    Camera,
    Bloom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputBinding {
    Target(TargetSlot),
    Surface,
}

#[derive(Clone, Debug)]
pub struct PassNode {
    pub id: PassId,
    pub inputs: SmallVec<[TextureBinding; 2]>,
    pub uniforms: SmallVec<[UniformSlot; 3]>,
    pub output: OutputBinding,
}

#[derive(Clone, Debug)]
pub struct PassGraph {
    order: Vec<PassNode>,
}

impl PassGraph {
    /// Validate the bindings and sort the nodes.
    ///
    /// Ties keep declaration order.
    pub fn new(nodes: Vec<PassNode>) -> Result<Self, GraphError> {
        let mut writers: FnvHashMap<TargetSlot, usize> = FnvHashMap::default();
        let mut presenters = 0;
        for (i, node) in nodes.iter().enumerate() {
            match node.output {
                OutputBinding::Target(slot) => {
                    if let Some(&first) = writers.get(&slot) {
                        return Err(GraphError::MultipleWriters {
                            slot,
                            first: nodes[first].id,
                            second: node.id,
                        });
                    }
                    writers.insert(slot, i);
                }
                OutputBinding::Surface => presenters += 1,
            }
        }
        if presenters == 0 {
            return Err(GraphError::NoPresenter);
        }

        let mut indegree = vec![0usize; nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for input in &node.inputs {
                let Some(&w) = writers.get(&input.slot) else {
                    return Err(GraphError::UnboundInput {
                        pass: node.id,
                        slot: input.slot,
                    });
                };
                indegree[i] += 1;
                dependents[w].push(i);
            }
        }

        let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|&i| indegree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(nodes.len());
        while let Some(i) = ready.pop_first() {
            sorted.push(i);
            for &d in &dependents[i] {
                indegree[d] -= 1;
                if indegree[d] == 0 {
                    ready.insert(d);
                }
            }
        }
        if sorted.len() != nodes.len() {
            let stuck = (0..nodes.len())
                .find(|i| !sorted.contains(i))
                .map(|i| nodes[i].id)
                .unwrap_or(PassId::StarCapture);
            return Err(GraphError::Cycle(stuck));
        }

        let mut slots: Vec<Option<PassNode>> = nodes.into_iter().map(Some).collect();
        let order = sorted.into_iter().filter_map(|i| slots[i].take()).collect();
        Ok(Self { order })
    }

    /// Standard pipeline for a profile: star capture, optional foreground
    /// capture, lensing compositor, bloom to the surface.
    pub fn for_profile(profile: &ModeProfile) -> Result<Self, GraphError> {
        let mut nodes = vec![
            PassNode {
                id: PassId::Bloom,
                inputs: smallvec![TextureBinding {
                    name: "scene",
                    slot: TargetSlot::Composite,
                }],
                uniforms: smallvec![UniformSlot::Time, UniformSlot::Bloom],
                output: OutputBinding::Surface,
            },
            PassNode {
                id: PassId::StarCapture,
                inputs: SmallVec::new(),
                uniforms: smallvec![UniformSlot::Time, UniformSlot::Camera],
                output: OutputBinding::Target(TargetSlot::Stars),
            },
        ];
        let mut lens_inputs: SmallVec<[TextureBinding; 2]> = smallvec![TextureBinding {
            name: "t_stars",
            slot: TargetSlot::Stars,
        }];
        if profile.dual_capture {
            nodes.push(PassNode {
                id: PassId::ForegroundCapture,
                inputs: SmallVec::new(),
                uniforms: smallvec![UniformSlot::Time, UniformSlot::Camera],
                output: OutputBinding::Target(TargetSlot::Foreground),
            });
            lens_inputs.push(TextureBinding {
                name: "t_scene",
                slot: TargetSlot::Foreground,
            });
        }
        nodes.push(PassNode {
            id: PassId::Lensing,
            inputs: lens_inputs,
            uniforms: smallvec![
                UniformSlot::Time,
                UniformSlot::LensStrength,
                UniformSlot::Camera
            ],
            output: OutputBinding::Target(TargetSlot::Composite),
        });
        Self::new(nodes)
    }

    pub fn passes(&self) -> &[PassNode] {
        &self.order
    }

    pub fn contains(&self, id: PassId) -> bool {
        self.order.iter().any(|n| n.id == id)
    }

    /// Target slots written by some pass.
    pub fn written_slots(&self) -> impl Iterator<Item = TargetSlot> + '_ {
        self.order.iter().filter_map(|n| match n.output {
            OutputBinding::Target(slot) => Some(slot),
            OutputBinding::Surface => None,
        })
    }
}
