//! GI world construction and per-step orchestration
//!
//! A [`GiWorld`] owns everything the solver needs: the shape registry, the
//! shared sample point and lit pixel buffers, the fan asset, the light
//! snapshot and the atlases. [`GiRuntime`] wraps an optional world behind
//! the lifecycle operations a host drives; using them without a world is an
//! error, not a no-op.

use std::ops::Range;
use std::sync::Arc;

use glam::Vec3;
use rayon::prelude::*;

use crate::error::GiError;
use crate::fan::FanAsset;
use crate::kernel::{self, ShadeContext, ShadeOutcome, ShapeState};
use crate::light::{LightCollector, LightProvider};
use crate::packer::{pack_lightmaps, LightmapSt, RectPacker, ShelfPacker};
use crate::raster::rasterize_region;
use crate::raycast::{PlanarRayCaster, RayCaster};
use crate::settings::GiSettings;
use crate::shape::{generate_sample_points, GiMaterial, PolygonRegion, SamplePoint, ShapeDesc, ShapeSetup};
use crate::texture::AtlasTexture;

/// Struct-of-arrays shape storage, indexed by shape handle.
///
/// Split fields keep the shading fan-out borrow-friendly: states are
/// mutated per shape while materials and regions stay shared.
#[derive(Default)]
struct ShapeRegistry {
    descs: Vec<ShapeDesc>,
    materials: Vec<GiMaterial>,
    states: Vec<ShapeState>,
    regions: Vec<Vec<PolygonRegion>>,
    /// Each shape's slice of the global sample/pixel buffers. Together the
    /// ranges exactly and disjointly cover the buffers.
    ranges: Vec<Range<usize>>,
    sts: Vec<LightmapSt>,
}

impl ShapeRegistry {
    fn len(&self) -> usize {
        self.descs.len()
    }
}

/// Everything a host supplies to build a GI world.
pub struct SceneInputs {
    pub shapes: Vec<ShapeSetup>,
    pub lights: Arc<dyn LightProvider>,
    pub caster: Arc<dyn RayCaster>,
}

impl SceneInputs {
    /// Use the built-in planar caster over the scene's own plane shapes.
    pub fn with_planar_caster(shapes: Vec<ShapeSetup>, lights: Arc<dyn LightProvider>) -> Self {
        let caster = PlanarRayCaster::from_shapes(shapes.iter().map(|s| &s.desc));
        Self { shapes, lights, caster: Arc::new(caster) }
    }
}

/// What one step did, for host-side observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub shapes_shaded: usize,
    pub shapes_frozen: usize,
    pub regions_rasterized: usize,
    pub lights_dirty: bool,
}

/// A built GI world: all solver state for one static scene.
pub struct GiWorld {
    settings: GiSettings,
    fans: FanAsset,
    registry: ShapeRegistry,
    sample_points: Vec<SamplePoint>,
    lit_pixels: Vec<Vec3>,
    collector: LightCollector,
    atlases: Vec<AtlasTexture>,
    lights: Arc<dyn LightProvider>,
    caster: Arc<dyn RayCaster>,
}

impl GiWorld {
    /// Generate sample grids, pack lightmaps and take the initial light
    /// snapshot.
    pub fn build(settings: GiSettings, scene: SceneInputs) -> Result<Self, GiError> {
        Self::build_with_packer(settings, scene, &ShelfPacker)
    }

    /// `build` with a caller-supplied rectangle packing primitive.
    pub fn build_with_packer(
        settings: GiSettings,
        scene: SceneInputs,
        packer: &dyn RectPacker,
    ) -> Result<Self, GiError> {
        let fans = FanAsset::build(&settings.fan);

        let mut registry = ShapeRegistry::default();
        let mut sample_points = Vec::new();

        for setup in &scene.shapes {
            let start = sample_points.len();
            let mut regions = Vec::new();
            generate_sample_points(
                &setup.desc,
                setup.material.resolution,
                setup.edge_margin,
                start,
                &mut sample_points,
                &mut regions,
            );

            registry.descs.push(setup.desc);
            registry.materials.push(setup.material);
            registry.states.push(ShapeState::default());
            registry.regions.push(regions);
            registry.ranges.push(start..sample_points.len());
        }

        let pack = pack_lightmaps(&mut registry.regions, &settings, packer)?;
        registry.sts = pack.sts;

        let mut collector = LightCollector::default();
        collector.collect(&scene.lights.lights());

        tracing::info!(
            shapes = registry.len(),
            points = sample_points.len(),
            atlases = pack.atlases.len(),
            rays_per_point = fans.high().len(),
            "GI world built"
        );

        Ok(Self {
            settings,
            fans,
            lit_pixels: vec![Vec3::ZERO; sample_points.len()],
            sample_points,
            registry,
            collector,
            atlases: pack.atlases,
            lights: scene.lights,
            caster: scene.caster,
        })
    }

    /// Advance the solve by one step: collect lights, shade every shape in
    /// parallel, then rasterize dirty shapes and apply touched atlases.
    pub fn step(&mut self) -> StepReport {
        let lights_dirty = self.collect_lights();
        let (shaded, frozen) = self.shade_pass();
        let rasterized = self.rasterize_dirty();

        StepReport {
            shapes_shaded: shaded,
            shapes_frozen: frozen,
            regions_rasterized: rasterized,
            lights_dirty,
        }
    }

    /// Lights-only refresh. Returns true when the snapshot changed (which
    /// also restarts convergence on every shape).
    pub fn refresh_lights(&mut self) -> bool {
        self.collect_lights()
    }

    /// Rasterize-only refresh of whatever is pending.
    pub fn refresh_lightmaps(&mut self) -> StepReport {
        StepReport {
            regions_rasterized: self.rasterize_dirty(),
            ..StepReport::default()
        }
    }

    fn collect_lights(&mut self) -> bool {
        let dirty = self.collector.collect(&self.lights.lights());
        if dirty {
            // Accumulated bounce light is stale against the new lights
            for state in &mut self.registry.states {
                state.fade_in = 0;
            }
        }
        dirty
    }

    fn shade_pass(&mut self) -> (usize, usize) {
        let states = &mut self.registry.states;
        let regions = &self.registry.regions;
        let materials = &self.registry.materials;
        let ranges = &self.registry.ranges;
        let ctx = ShadeContext {
            settings: &self.settings,
            fans: &self.fans,
            lights: self.collector.samples(),
            caster: self.caster.as_ref(),
            materials: materials.as_slice(),
        };
        let points = &self.sample_points;

        // Shapes own disjoint contiguous slices of the lit pixel buffer, so
        // the parallel fan-out needs no synchronization at all.
        let pixel_slices = split_by_ranges(&mut self.lit_pixels, ranges);

        let outcomes: Vec<ShadeOutcome> = states
            .par_iter_mut()
            .zip(pixel_slices)
            .enumerate()
            .map(|(i, (state, pixels))| {
                let range = ranges[i].clone();
                kernel::shade_shape(
                    &ctx,
                    &regions[i],
                    &materials[i],
                    state,
                    range.start,
                    &points[range],
                    pixels,
                )
            })
            .collect();

        let shaded = outcomes.iter().filter(|o| **o == ShadeOutcome::Shaded).count();
        let frozen = outcomes.iter().filter(|o| **o == ShadeOutcome::Frozen).count();
        (shaded, frozen)
    }

    fn rasterize_dirty(&mut self) -> usize {
        let mut rasterized = 0;
        let mut touched = vec![false; self.atlases.len()];

        for i in 0..self.registry.len() {
            if !self.registry.states[i].dirty {
                continue;
            }

            let atlas_index = self.registry.sts[i].atlas;
            for region in &self.registry.regions[i] {
                let slice = &self.lit_pixels[region.start..region.start + region.len];
                rasterize_region(region, slice, &mut self.atlases[atlas_index]);
                rasterized += 1;
            }

            if !self.registry.regions[i].is_empty() {
                touched[atlas_index] = true;
            }
            self.registry.states[i].dirty = false;
        }

        // One apply per touched atlas, after all writes of the pass
        for (atlas, touched) in self.atlases.iter_mut().zip(touched) {
            if touched {
                atlas.apply();
            }
        }

        rasterized
    }

    pub fn settings(&self) -> &GiSettings {
        &self.settings
    }

    pub fn shape_count(&self) -> usize {
        self.registry.len()
    }

    pub fn shape_state(&self, shape: usize) -> &ShapeState {
        &self.registry.states[shape]
    }

    pub fn lightmap_st(&self, shape: usize) -> &LightmapSt {
        &self.registry.sts[shape]
    }

    pub fn regions(&self, shape: usize) -> &[PolygonRegion] {
        &self.registry.regions[shape]
    }

    pub fn lit_pixels(&self) -> &[Vec3] {
        &self.lit_pixels
    }

    pub fn atlases(&self) -> &[AtlasTexture] {
        &self.atlases
    }
}

/// Split a buffer into the per-shape slices described by `ranges`.
///
/// Relies on the registry invariant that the ranges are ascending,
/// contiguous and exactly cover the buffer.
fn split_by_ranges<'a>(buffer: &'a mut [Vec3], ranges: &[Range<usize>]) -> Vec<&'a mut [Vec3]> {
    let mut slices = Vec::with_capacity(ranges.len());
    let mut rest = buffer;
    for range in ranges {
        let (head, tail) = rest.split_at_mut(range.len());
        slices.push(head);
        rest = tail;
    }
    debug_assert!(rest.is_empty(), "shape ranges must cover the whole buffer");
    slices
}

/// Host-facing lifecycle wrapper around an optional GI world.
#[derive(Default)]
pub struct GiRuntime {
    settings: GiSettings,
    world: Option<GiWorld>,
}

impl GiRuntime {
    pub fn new(settings: GiSettings) -> Self {
        Self { settings, world: None }
    }

    /// Build or rebuild the GI world. Any existing world is disposed first.
    pub fn build_world(&mut self, scene: SceneInputs) -> Result<(), GiError> {
        if self.world.take().is_some() {
            tracing::info!("disposing previous GI world before rebuild");
        }
        self.world = Some(GiWorld::build(self.settings.clone(), scene)?);
        Ok(())
    }

    pub fn has_world(&self) -> bool {
        self.world.is_some()
    }

    pub fn world(&self) -> Option<&GiWorld> {
        self.world.as_ref()
    }

    /// Advance the solve by one step.
    pub fn step_once(&mut self) -> Result<StepReport, GiError> {
        Ok(self.world.as_mut().ok_or(GiError::NoWorld)?.step())
    }

    /// Force a lights-only collection pass.
    pub fn refresh_lights(&mut self) -> Result<bool, GiError> {
        Ok(self.world.as_mut().ok_or(GiError::NoWorld)?.refresh_lights())
    }

    /// Force a rasterize-only pass over pending shaded data.
    pub fn refresh_lightmaps(&mut self) -> Result<StepReport, GiError> {
        Ok(self.world.as_mut().ok_or(GiError::NoWorld)?.refresh_lightmaps())
    }

    /// Dispose the current world, releasing all buffers and assets.
    pub fn dispose_world(&mut self) -> Result<(), GiError> {
        match self.world.take() {
            Some(_) => {
                tracing::info!("GI world disposed");
                Ok(())
            }
            None => Err(GiError::NoWorld),
        }
    }
}
