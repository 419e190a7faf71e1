//! Explicit scene registry.
//!
//! Boxes and sources register themselves and receive a handle; the render
//! pipeline takes an ordered [`Collection`] of handles when it is enabled
//! and reads fresh values through [`SceneRegistry::snapshot`] every frame.
//!
//! Any register/unregister bumps the registry revision. A snapshot taken
//! with a collection from an older revision fails with
//! [`SceneError::StaleCollection`], which is how count drift between the
//! scene and already-allocated GPU buffers is detected.

use std::collections::BTreeMap;

use echo_math::{Aabb, Mat4, Mat4Ext, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::primitive::{BoxPrimitive, Material, SourcePrimitive};
use crate::spectrum::SourceSignal;

/// Handle to a registered box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxHandle(u64);

/// Handle to a registered sound source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceHandle(u64);

/// A static box entity.
///
/// Bounds are resolved to world space once, when the box is created.
/// Moving the owning entity afterwards does not update them.
#[derive(Clone, Debug)]
pub struct SceneBox {
    pub name: String,
    bounds: Aabb,
    pub material: Material,
}

impl SceneBox {
    /// Create a box from already world-space bounds.
    pub fn from_world_bounds(bounds: Aabb, material: Material) -> Self {
        Self {
            name: String::new(),
            bounds,
            material,
        }
    }

    /// Create a box from a renderable's local bounds and its world transform.
    pub fn from_local_bounds(local: Aabb, local_to_world: Mat4, material: Material) -> Self {
        Self::from_world_bounds(local_to_world.transform_aabb(&local), material)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn primitive(&self) -> BoxPrimitive {
        BoxPrimitive::new(self.bounds, self.material)
    }
}

/// A dynamic point emitter.
///
/// Position comes from the world transform; color and intensity are driven
/// by an external signal (see [`crate::spectrum`]).
#[derive(Clone, Debug)]
pub struct SceneSource {
    pub name: String,
    pub transform: Mat4,
    pub color: Vec3,
    pub intensity: f32,
}

impl SceneSource {
    /// Create a white source at `position` with the default intensity of 100.
    pub fn at(position: Vec3) -> Self {
        Self {
            name: String::new(),
            transform: Mat4::from_translation(position),
            color: Vec3::ONE,
            intensity: 100.0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn position(&self) -> Vec3 {
        self.transform.origin()
    }

    pub fn apply_signal(&mut self, signal: SourceSignal) {
        self.color = signal.color;
        self.intensity = signal.intensity;
    }

    pub fn primitive(&self) -> SourcePrimitive {
        SourcePrimitive {
            position: self.position(),
            color: self.color,
            intensity: self.intensity,
        }
    }
}

/// Ordered membership of the scene at a given registry revision.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collection {
    pub boxes: Vec<BoxHandle>,
    pub sources: Vec<SourceHandle>,
    pub revision: u64,
}

impl Collection {
    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.sources.is_empty()
    }
}

/// Current primitive values for one frame, in collection order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameSnapshot {
    pub boxes: Vec<BoxPrimitive>,
    pub sources: Vec<SourcePrimitive>,
}

/// Central registry of boxes and sources.
///
/// Handle ids are allocated monotonically, so iterating the maps yields
/// registration order.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    boxes: BTreeMap<u64, SceneBox>,
    sources: BTreeMap<u64, SceneSource>,
    next_id: u64,
    revision: u64,
}

impl SceneRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.revision += 1;
        id
    }

    /// Register a box and return its handle.
    pub fn register_box(&mut self, scene_box: SceneBox) -> BoxHandle {
        let id = self.allocate_id();
        log::debug!("Registered box {} '{}' {:?}", id, scene_box.name, scene_box.bounds);
        self.boxes.insert(id, scene_box);
        BoxHandle(id)
    }

    /// Remove a box. Returns `None` if the handle was not registered.
    pub fn unregister_box(&mut self, handle: BoxHandle) -> Option<SceneBox> {
        let removed = self.boxes.remove(&handle.0);
        if removed.is_some() {
            self.revision += 1;
            log::debug!("Unregistered box {}", handle.0);
        }
        removed
    }

    /// Register a source and return its handle.
    pub fn register_source(&mut self, source: SceneSource) -> SourceHandle {
        let id = self.allocate_id();
        log::debug!("Registered source {} '{}' at {:?}", id, source.name, source.position());
        self.sources.insert(id, source);
        SourceHandle(id)
    }

    /// Remove a source. Returns `None` if the handle was not registered.
    pub fn unregister_source(&mut self, handle: SourceHandle) -> Option<SceneSource> {
        let removed = self.sources.remove(&handle.0);
        if removed.is_some() {
            self.revision += 1;
            log::debug!("Unregistered source {}", handle.0);
        }
        removed
    }

    pub fn get_box(&self, handle: BoxHandle) -> Option<&SceneBox> {
        self.boxes.get(&handle.0)
    }

    pub fn get_source(&self, handle: SourceHandle) -> Option<&SceneSource> {
        self.sources.get(&handle.0)
    }

    /// Mutable access for per-frame updates (transform, signal).
    ///
    /// Value changes do not bump the revision.
    pub fn source_mut(&mut self, handle: SourceHandle) -> Option<&mut SceneSource> {
        self.sources.get_mut(&handle.0)
    }

    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Composition revision; changes on every register/unregister.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Enumerate every registered box and source in registration order.
    pub fn collect(&self) -> Collection {
        let collection = Collection {
            boxes: self.boxes.keys().map(|id| BoxHandle(*id)).collect(),
            sources: self.sources.keys().map(|id| SourceHandle(*id)).collect(),
            revision: self.revision,
        };
        log::debug!(
            "Collected {} boxes, {} sources at revision {}",
            collection.box_count(),
            collection.source_count(),
            collection.revision
        );
        collection
    }

    /// True when `collection` still matches the registry composition.
    pub fn is_current(&self, collection: &Collection) -> bool {
        collection.revision == self.revision
    }

    /// Read current primitive values for every handle in `collection`.
    pub fn snapshot(&self, collection: &Collection) -> SceneResult<FrameSnapshot> {
        if !self.is_current(collection) {
            return Err(SceneError::StaleCollection {
                collected: collection.revision,
                current: self.revision,
            });
        }

        let boxes = collection
            .boxes
            .iter()
            .map(|handle| {
                self.get_box(*handle)
                    .map(SceneBox::primitive)
                    .ok_or(SceneError::UnknownHandle { kind: "box", id: handle.0 })
            })
            .collect::<SceneResult<Vec<_>>>()?;

        let sources = collection
            .sources
            .iter()
            .map(|handle| {
                self.get_source(*handle)
                    .map(SceneSource::primitive)
                    .ok_or(SceneError::UnknownHandle { kind: "source", id: handle.0 })
            })
            .collect::<SceneResult<Vec<_>>>()?;

        Ok(FrameSnapshot { boxes, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(offset: f32) -> SceneBox {
        SceneBox::from_world_bounds(
            Aabb::new(Vec3::splat(offset), Vec3::splat(offset + 1.0)),
            Material::default(),
        )
    }

    #[test]
    fn test_empty_registry_collects_nothing() {
        let registry = SceneRegistry::new();
        let collection = registry.collect();

        assert!(collection.is_empty());
        let snapshot = registry.snapshot(&collection).unwrap();
        assert!(snapshot.boxes.is_empty());
        assert!(snapshot.sources.is_empty());
    }

    #[test]
    fn test_collect_preserves_registration_order() {
        let mut registry = SceneRegistry::new();
        let a = registry.register_box(unit_box(0.0));
        let s = registry.register_source(SceneSource::at(Vec3::ZERO));
        let b = registry.register_box(unit_box(5.0));

        let collection = registry.collect();
        assert_eq!(collection.boxes, vec![a, b]);
        assert_eq!(collection.sources, vec![s]);

        let snapshot = registry.snapshot(&collection).unwrap();
        assert_eq!(snapshot.boxes[0].min, Vec3::ZERO);
        assert_eq!(snapshot.boxes[1].min, Vec3::splat(5.0));
    }

    #[test]
    fn test_snapshot_reads_fresh_source_values() {
        let mut registry = SceneRegistry::new();
        let handle = registry.register_source(SceneSource::at(Vec3::ZERO));
        let collection = registry.collect();

        let source = registry.source_mut(handle).unwrap();
        source.transform = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        source.apply_signal(SourceSignal {
            color: Vec3::new(0.5, 0.0, 0.0),
            intensity: 7.0,
        });

        // Value updates keep the collection current
        let snapshot = registry.snapshot(&collection).unwrap();
        assert_eq!(snapshot.sources[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(snapshot.sources[0].color, Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(snapshot.sources[0].intensity, 7.0);
    }

    #[test]
    fn test_composition_change_makes_collection_stale() {
        let mut registry = SceneRegistry::new();
        registry.register_box(unit_box(0.0));
        let collection = registry.collect();

        registry.register_box(unit_box(2.0));
        assert!(!registry.is_current(&collection));

        match registry.snapshot(&collection) {
            Err(SceneError::StaleCollection { collected, current }) => {
                assert!(current > collected);
            }
            other => panic!("expected stale collection, got {:?}", other),
        }

        let recollected = registry.collect();
        assert_eq!(registry.snapshot(&recollected).unwrap().boxes.len(), 2);
    }

    #[test]
    fn test_unregister() {
        let mut registry = SceneRegistry::new();
        let handle = registry.register_source(SceneSource::at(Vec3::ZERO));
        let revision = registry.revision();

        assert!(registry.unregister_source(handle).is_some());
        assert!(registry.revision() > revision);

        // Second removal is a no-op and does not bump the revision
        let revision = registry.revision();
        assert!(registry.unregister_source(handle).is_none());
        assert_eq!(registry.revision(), revision);
        assert_eq!(registry.source_count(), 0);
    }

    #[test]
    fn test_box_bounds_fixed_at_creation() {
        let local = Aabb::from_center_size(Vec3::ZERO, Vec3::ONE);
        let transform = Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0));
        let scene_box = SceneBox::from_local_bounds(local, transform, Material::default());

        assert_eq!(scene_box.bounds().min, Vec3::new(-0.5, 9.5, -0.5));
        assert_eq!(scene_box.bounds().max, Vec3::new(0.5, 10.5, 0.5));
    }

    #[test]
    fn test_source_position_from_transform() {
        let mut source = SceneSource::at(Vec3::ZERO);
        source.transform = Mat4::from_translation(Vec3::new(4.0, 0.0, -1.0));
        assert_eq!(source.position(), Vec3::new(4.0, 0.0, -1.0));
    }
}
