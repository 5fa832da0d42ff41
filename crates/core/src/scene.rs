//! Scene graph: the black hole layers under one gesture-driven root, plus the
//! starfield which lives outside the root and never follows the hand.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::backend::{DrawItem, MeshId, RenderBackend};
use crate::constants::*;
use crate::controls::UiControls;
use crate::gesture::GestureSignal;
use crate::lensing::HorizonPolicy;
use crate::mesh::{Geometry, Topology};
use crate::profile::ModeProfile;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Horizon,
    PhotonRing,
    Disk,
    JetNorth,
    JetSouth,
    Halo,
    Starfield,
}

impl EntityKind {
    pub fn material(self) -> Material {
        match self {
            EntityKind::Horizon => Material::Horizon,
            EntityKind::PhotonRing => Material::PhotonRing,
            EntityKind::Disk => Material::Disk,
            EntityKind::JetNorth | EntityKind::JetSouth => Material::Jet,
            EntityKind::Halo => Material::Halo,
            EntityKind::Starfield => Material::Stars,
        }
    }

    fn label(self) -> &'static str {
        match self {
            EntityKind::Horizon => "horizon",
            EntityKind::PhotonRing => "photon_ring",
            EntityKind::Disk => "disk",
            EntityKind::JetNorth => "jet_north",
            EntityKind::JetSouth => "jet_south",
            EntityKind::Halo => "halo",
            EntityKind::Starfield => "starfield",
        }
    }
}

/// Shading function selector. The native scene shader branches on `shader_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Material {
    Horizon,
    PhotonRing,
    Disk,
    Jet,
    Halo,
    Stars,
    /// Horizon depth without colour. Keeps the foreground occluded while the
    /// visible horizon is drawn lensed with the stars.
    Occluder,
}

impl Material {
    pub fn shader_id(self) -> u32 {
        match self {
            Material::Horizon => 0,
            Material::PhotonRing => 1,
            Material::Disk => 2,
            Material::Jet => 3,
            Material::Halo => 4,
            Material::Stars => 5,
            Material::Occluder => 6,
        }
    }

    /// Opaque materials write depth; the rest are additive glows.
    pub fn is_opaque(self) -> bool {
        matches!(self, Material::Horizon | Material::Occluder)
    }

    pub fn writes_color(self) -> bool {
        self != Material::Occluder
    }
}

/// Per-entity numeric shader inputs.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ShaderParams {
    /// Seconds since the scene was built. Monotonic.
    pub age: f32,
    pub intensity: f32,
    pub spin: f32,
    pub pulse: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles, applied X then Y then Z.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        let r = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_scale_rotation_translation(self.scale, r, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Clone, Debug)]
pub struct SceneEntity {
    pub kind: EntityKind,
    pub transform: Transform,
    pub geometry: Geometry,
    /// `None` when mesh creation failed; the entity is then not drawn.
    pub mesh: Option<MeshId>,
    pub params: ShaderParams,
}

/// Which capture a draw list is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubScene {
    /// Stars, plus the horizon when it is lensed.
    Background,
    /// The glowing layers behind the horizon: drawn in colour when exempt,
    /// as a depth-only occluder when lensed.
    Foreground,
}

pub struct SceneGraph {
    root: Transform,
    /// Children of the root, in draw order.
    entities: Vec<SceneEntity>,
    starfield: Option<SceneEntity>,
    age: f32,
}

impl SceneGraph {
    /// Build every entity the profile enables.
    pub fn build<B: RenderBackend + ?Sized>(backend: &mut B, profile: &ModeProfile) -> Self {
        let mut scene = Self {
            root: Transform::IDENTITY,
            entities: Vec::new(),
            starfield: None,
            age: 0.0,
        };
        scene.add(backend, EntityKind::Horizon, horizon_geometry(), Transform::IDENTITY);
        scene.add(backend, EntityKind::PhotonRing, photon_ring_geometry(), flat());
        scene.add(backend, EntityKind::Disk, disk_geometry(profile.disk_segments), flat());
        scene.set_halo(backend, profile.fog_enabled);
        scene.set_jets(backend, profile.jets_enabled);
        scene.regenerate_starfield(backend, profile.star_count);
        log::info!(
            "[scene] built {} entities ({} stars, {} disk segments)",
            scene.entities.len() + scene.starfield.iter().count(),
            profile.star_count,
            profile.disk_segments
        );
        scene
    }

    /// Bring profile-scoped geometry in line with `profile`. Unchanged
    /// entities keep their meshes.
    pub fn apply_profile<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, profile: &ModeProfile) {
        let disk_segments = self
            .entity(EntityKind::Disk)
            .and_then(|e| e.geometry.angular_segments());
        if disk_segments != Some(profile.disk_segments) {
            self.regenerate_disk(backend, profile.disk_segments);
        }
        let stars = self.starfield.as_ref().and_then(|e| match e.geometry {
            Geometry::Points { count, .. } => Some(count),
            _ => None,
        });
        if stars != Some(profile.star_count) {
            self.regenerate_starfield(backend, profile.star_count);
        }
        self.set_jets(backend, profile.jets_enabled);
        self.set_halo(backend, profile.fog_enabled);
    }

    /// Replace the disk mesh. The old mesh is released before the new one is created.
    pub fn regenerate_disk<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, segments: u32) {
        let geometry = disk_geometry(segments);
        let Some(i) = self.entities.iter().position(|e| e.kind == EntityKind::Disk) else {
            self.add(backend, EntityKind::Disk, geometry, flat());
            return;
        };
        let disk = &mut self.entities[i];
        if let Some(old) = disk.mesh.take() {
            backend.release_mesh(old);
        }
        disk.geometry = geometry;
        disk.mesh = create_mesh(backend, EntityKind::Disk, &geometry);
        log::debug!("[scene] disk regenerated with {} segments", segments);
    }

    pub fn regenerate_starfield<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, count: u32) {
        let geometry = Geometry::Points {
            count,
            seed: STARFIELD_SEED,
        };
        let params = match self.starfield.take() {
            Some(old) => {
                if let Some(mesh) = old.mesh {
                    backend.release_mesh(mesh);
                }
                old.params
            }
            None => self.fresh_params(),
        };
        self.starfield = Some(SceneEntity {
            kind: EntityKind::Starfield,
            transform: Transform::IDENTITY,
            geometry,
            mesh: create_mesh(backend, EntityKind::Starfield, &geometry),
            params,
        });
    }

    /// Create or remove both jets.
    pub fn set_jets<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, enabled: bool) {
        let present = self.entity(EntityKind::JetNorth).is_some();
        if enabled == present {
            return;
        }
        if enabled {
            let north = Transform {
                position: Vec3::new(0.0, JET_OFFSET, 0.0),
                rotation: Vec3::new(PI, 0.0, 0.0),
                ..Transform::IDENTITY
            };
            let south = Transform {
                position: Vec3::new(0.0, -JET_OFFSET, 0.0),
                ..Transform::IDENTITY
            };
            self.add(backend, EntityKind::JetNorth, jet_geometry(), north);
            self.add(backend, EntityKind::JetSouth, jet_geometry(), south);
        } else {
            self.remove(backend, EntityKind::JetNorth);
            self.remove(backend, EntityKind::JetSouth);
        }
    }

    /// The halo is the soft fog ring around the disk.
    pub fn set_halo<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, enabled: bool) {
        match (enabled, self.entity(EntityKind::Halo).is_some()) {
            (true, false) => self.add(backend, EntityKind::Halo, halo_geometry(), flat()),
            (false, true) => self.remove(backend, EntityKind::Halo),
            _ => {}
        }
    }

    /// Per-frame transform and uniform update.
    pub fn update(&mut self, dt: f32, gesture: &GestureSignal, controls: &UiControls) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.age += dt;

        self.root.scale = Vec3::splat(gesture.scale);
        self.root.rotation.x += (gesture.rot_x - self.root.rotation.x) * ROOT_FOLLOW_RATE;
        self.root.rotation.y += (gesture.rot_y - self.root.rotation.y) * ROOT_FOLLOW_RATE;

        let spin = if controls.disk_spin.is_finite() {
            controls.disk_spin
        } else {
            0.0
        };
        let base_intensity = if controls.disk_intensity.is_finite() {
            controls.disk_intensity
        } else {
            DEFAULT_DISK_INTENSITY
        };
        for e in self.entities.iter_mut().chain(self.starfield.as_mut()) {
            e.params.age += dt;
            e.params.pulse = gesture.pulse;
            if e.kind == EntityKind::Disk {
                e.transform.rotation.z += spin * dt;
                e.params.spin = spin;
                e.params.intensity = base_intensity + gesture.pulse * PULSE_INTENSITY_GAIN;
            }
        }
    }

    /// Draw items for one capture, opaque first.
    pub fn draw_list(&self, sub: SubScene, policy: HorizonPolicy) -> Vec<DrawItem> {
        let root = self.root.matrix();
        let horizon_in_background = policy == HorizonPolicy::Lensed;
        let mut items = Vec::with_capacity(self.entities.len() + 1);

        if sub == SubScene::Background {
            if let Some(item) = self.starfield.as_ref().and_then(|s| draw_item(s, Mat4::IDENTITY)) {
                items.push(item);
            }
        }
        for e in &self.entities {
            let material = match (sub, e.kind) {
                (SubScene::Background, EntityKind::Horizon) if horizon_in_background => {
                    Material::Horizon
                }
                (SubScene::Foreground, EntityKind::Horizon) if horizon_in_background => {
                    Material::Occluder
                }
                (SubScene::Background, _) => continue,
                (SubScene::Foreground, kind) => kind.material(),
            };
            items.extend(draw_item(e, root).map(|d| DrawItem { material, ..d }));
        }
        items.sort_by_key(|d| !d.material.is_opaque());
        items
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&SceneEntity> {
        if kind == EntityKind::Starfield {
            return self.starfield.as_ref();
        }
        self.entities.iter().find(|e| e.kind == kind)
    }

    pub fn params_mut(&mut self, kind: EntityKind) -> Option<&mut ShaderParams> {
        if kind == EntityKind::Starfield {
            return self.starfield.as_mut().map(|e| &mut e.params);
        }
        self.entities
            .iter_mut()
            .find(|e| e.kind == kind)
            .map(|e| &mut e.params)
    }

    pub fn root(&self) -> &Transform {
        &self.root
    }

    pub fn age(&self) -> f32 {
        self.age
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len() + self.starfield.iter().count()
    }

    /// Release every mesh. The graph is empty afterwards.
    pub fn release_all<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        for e in self.entities.drain(..).chain(self.starfield.take()) {
            if let Some(mesh) = e.mesh {
                backend.release_mesh(mesh);
            }
        }
    }

    fn fresh_params(&self) -> ShaderParams {
        ShaderParams {
            age: self.age,
            intensity: 1.0,
            spin: 0.0,
            pulse: 0.0,
        }
    }

    fn add<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        kind: EntityKind,
        geometry: Geometry,
        transform: Transform,
    ) {
        let params = self.fresh_params();
        self.entities.push(SceneEntity {
            kind,
            transform,
            geometry,
            mesh: create_mesh(backend, kind, &geometry),
            params,
        });
    }

    fn remove<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, kind: EntityKind) {
        if let Some(i) = self.entities.iter().position(|e| e.kind == kind) {
            let e = self.entities.remove(i);
            if let Some(mesh) = e.mesh {
                backend.release_mesh(mesh);
            }
        }
    }
}

fn create_mesh<B: RenderBackend + ?Sized>(
    backend: &mut B,
    kind: EntityKind,
    geometry: &Geometry,
) -> Option<MeshId> {
    match backend.create_mesh(kind.label(), &geometry.build()) {
        Ok(id) => Some(id),
        Err(e) => {
            log::error!("[scene] {} mesh creation failed: {}", kind.label(), e);
            None
        }
    }
}

fn draw_item(e: &SceneEntity, parent: Mat4) -> Option<DrawItem> {
    let mesh = e.mesh?;
    Some(DrawItem {
        mesh,
        topology: match e.geometry {
            Geometry::Points { .. } => Topology::Points,
            _ => Topology::Triangles,
        },
        material: e.kind.material(),
        model: parent * e.transform.matrix(),
        params: e.params,
    })
}

/// Rings are built in the XY plane; lay them flat in the equatorial plane.
fn flat() -> Transform {
    Transform {
        rotation: Vec3::new(FRAC_PI_2, 0.0, 0.0),
        ..Transform::IDENTITY
    }
}

fn horizon_geometry() -> Geometry {
    Geometry::Sphere {
        radius: HORIZON_RADIUS,
        width_segments: HORIZON_SEGMENTS,
        height_segments: HORIZON_SEGMENTS,
    }
}

fn photon_ring_geometry() -> Geometry {
    Geometry::Ring {
        inner: PHOTON_RING_INNER,
        outer: PHOTON_RING_OUTER,
        segments: PHOTON_RING_SEGMENTS,
    }
}

fn disk_geometry(segments: u32) -> Geometry {
    Geometry::Ring {
        inner: DISK_INNER,
        outer: DISK_OUTER,
        segments,
    }
}

fn halo_geometry() -> Geometry {
    Geometry::Ring {
        inner: HALO_INNER,
        outer: HALO_OUTER,
        segments: HALO_SEGMENTS,
    }
}

fn jet_geometry() -> Geometry {
    Geometry::Cone {
        radius: JET_RADIUS,
        length: JET_LENGTH,
        radial_segments: JET_RADIAL_SEGMENTS,
        height_segments: JET_HEIGHT_SEGMENTS,
    }
}
