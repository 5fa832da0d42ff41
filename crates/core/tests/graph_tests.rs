// Tests for pass graph validation and ordering.

use gargantua_core::error::GraphError;
use gargantua_core::graph::*;
use gargantua_core::profile::ModeProfile;
use gargantua_core::targets::TargetSlot;
use smallvec::smallvec;

fn node(id: PassId, reads: &[TargetSlot], output: OutputBinding) -> PassNode {
    PassNode {
        id,
        inputs: reads
            .iter()
            .map(|&slot| TextureBinding { name: "t", slot })
            .collect(),
        uniforms: smallvec![UniformSlot::Time],
        output,
    }
}

fn ids(graph: &PassGraph) -> Vec<PassId> {
    graph.passes().iter().map(|n| n.id).collect()
}

#[test]
fn profile_graphs_sort_captures_first() {
    let reduced = PassGraph::for_profile(&ModeProfile::mobile()).unwrap();
    assert_eq!(
        ids(&reduced),
        vec![PassId::StarCapture, PassId::Lensing, PassId::Bloom]
    );
    let full = PassGraph::for_profile(&ModeProfile::max()).unwrap();
    assert_eq!(
        ids(&full),
        vec![
            PassId::StarCapture,
            PassId::ForegroundCapture,
            PassId::Lensing,
            PassId::Bloom
        ]
    );
    assert!(full.contains(PassId::ForegroundCapture));
    assert!(!reduced.contains(PassId::ForegroundCapture));
}

#[test]
fn declaration_order_does_not_matter() {
    let graph = PassGraph::new(vec![
        node(PassId::Bloom, &[TargetSlot::Composite], OutputBinding::Surface),
        node(
            PassId::Lensing,
            &[TargetSlot::Stars],
            OutputBinding::Target(TargetSlot::Composite),
        ),
        node(PassId::StarCapture, &[], OutputBinding::Target(TargetSlot::Stars)),
    ])
    .unwrap();
    assert_eq!(
        ids(&graph),
        vec![PassId::StarCapture, PassId::Lensing, PassId::Bloom]
    );
    let written: Vec<_> = graph.written_slots().collect();
    assert_eq!(written, vec![TargetSlot::Stars, TargetSlot::Composite]);
}

#[test]
fn two_writers_of_one_slot_are_rejected() {
    let err = PassGraph::new(vec![
        node(PassId::StarCapture, &[], OutputBinding::Target(TargetSlot::Stars)),
        node(
            PassId::ForegroundCapture,
            &[],
            OutputBinding::Target(TargetSlot::Stars),
        ),
        node(PassId::Bloom, &[TargetSlot::Stars], OutputBinding::Surface),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        GraphError::MultipleWriters {
            slot: TargetSlot::Stars,
            first: PassId::StarCapture,
            second: PassId::ForegroundCapture,
        }
    );
}

#[test]
fn reading_an_unwritten_slot_is_rejected() {
    let err = PassGraph::new(vec![
        node(
            PassId::Lensing,
            &[TargetSlot::Foreground],
            OutputBinding::Target(TargetSlot::Composite),
        ),
        node(PassId::Bloom, &[TargetSlot::Composite], OutputBinding::Surface),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        GraphError::UnboundInput {
            pass: PassId::Lensing,
            slot: TargetSlot::Foreground,
        }
    );
}

#[test]
fn cycles_are_rejected() {
    let err = PassGraph::new(vec![
        node(
            PassId::StarCapture,
            &[TargetSlot::Composite],
            OutputBinding::Target(TargetSlot::Stars),
        ),
        node(
            PassId::Lensing,
            &[TargetSlot::Stars],
            OutputBinding::Target(TargetSlot::Composite),
        ),
        node(PassId::Bloom, &[TargetSlot::Composite], OutputBinding::Surface),
    ])
    .unwrap_err();
    assert!(matches!(err, GraphError::Cycle(_)));
}

#[test]
fn a_graph_must_present() {
    let err = PassGraph::new(vec![node(
        PassId::StarCapture,
        &[],
        OutputBinding::Target(TargetSlot::Stars),
    )])
    .unwrap_err();
    assert_eq!(err, GraphError::NoPresenter);
}
