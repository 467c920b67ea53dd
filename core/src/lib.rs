//! Embergi core - incremental runtime GI lightmap solver
//!
//! Bakes one-bounce indirect lighting for static geometry into shared
//! texture atlases, refining the result a little on every step instead of
//! computing a final answer in one pass.

pub mod error;
pub mod fan;
pub mod kernel;
pub mod light;
pub mod math;
pub mod packer;
pub mod pbr;
pub mod raster;
pub mod raycast;
pub mod settings;
pub mod shape;
pub mod texture;
pub mod world;

// Re-export the types a host needs to drive the solver
pub use error::GiError;
pub use light::{LightDesc, LightProvider, SharedLights, StaticLights};
pub use raycast::{PlanarRayCaster, RayCaster, RayHit, ShapeHandle};
pub use settings::{FanSettings, GiSettings};
pub use shape::{GiMaterial, ShapeDesc, ShapeKind, ShapeSetup};
pub use world::{GiRuntime, GiWorld, SceneInputs, StepReport};
