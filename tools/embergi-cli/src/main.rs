//! Embergi demo driver
//!
//! Builds a small fixed scene (floor, wall, occluder, one warm spot light),
//! runs the solver for a number of steps and writes the finished atlases to
//! PNG files:
//!
//! ```bash
//! embergi --steps 500 --out lightmaps/
//! embergi --config settings.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use glam::{Quat, UVec2, Vec2, Vec3, Vec4};

use embergi_core::{
    GiMaterial, GiRuntime, GiSettings, LightDesc, SceneInputs, ShapeDesc, ShapeKind, ShapeSetup,
    StaticLights,
};

#[derive(Parser)]
#[command(name = "embergi")]
#[command(about = "Headless runtime GI lightmap baking demo")]
#[command(version)]
struct Cli {
    /// Solver steps to run
    #[arg(long, default_value_t = 500)]
    steps: u32,

    /// Optional TOML settings file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for atlas PNGs
    #[arg(long, default_value = "lightmaps")]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&text).context("failed to parse settings")?
        }
        None => GiSettings::default(),
    };

    let mut runtime = GiRuntime::new(settings);
    runtime
        .build_world(SceneInputs::with_planar_caster(demo_shapes(), demo_lights()))
        .context("failed to build GI world")?;

    tracing::info!(steps = cli.steps, "stepping solver");
    for step in 1..=cli.steps {
        let report = runtime.step_once()?;
        if step % 100 == 0 || step == cli.steps {
            tracing::info!(
                step,
                shaded = report.shapes_shaded,
                frozen = report.shapes_frozen,
                rasterized = report.regions_rasterized,
                "progress"
            );
        }
    }

    // Flush anything still pending before export
    runtime.refresh_lightmaps()?;

    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("failed to create {}", cli.out.display()))?;

    let world = runtime.world().expect("world was just built");
    for (index, atlas) in world.atlases().iter().enumerate() {
        let path = cli.out.join(format!("atlas_{index}.png"));
        write_atlas_png(atlas, &path)?;
        tracing::info!(path = %path.display(), "atlas written");
    }

    Ok(())
}

fn write_atlas_png(atlas: &embergi_core::texture::AtlasTexture, path: &std::path::Path) -> Result<()> {
    let mut img = image::RgbaImage::new(atlas.width(), atlas.height());
    for (y, row) in img.rows_mut().enumerate() {
        // Atlas rows are bottom-up; image rows are top-down
        let src_y = atlas.height() - 1 - y as u32;
        for (x, pixel) in row.enumerate() {
            *pixel = image::Rgba(atlas.pixel(x as u32, src_y));
        }
    }
    img.save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Floor and back wall catching light, plus a small floating occluder
/// casting indirect shadow.
fn demo_shapes() -> Vec<ShapeSetup> {
    let floor = ShapeDesc {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
        kind: ShapeKind::Plane { size: Vec2::new(10.0, 10.0) },
    };
    let wall = ShapeDesc {
        position: Vec3::new(0.0, 5.0, -5.0),
        rotation: Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
        scale: Vec3::ONE,
        kind: ShapeKind::Plane { size: Vec2::new(10.0, 10.0) },
    };
    let occluder = ShapeDesc {
        position: Vec3::new(1.5, 1.2, 0.5),
        rotation: Quat::from_rotation_z(std::f32::consts::PI),
        scale: Vec3::ONE,
        kind: ShapeKind::Plane { size: Vec2::new(2.0, 2.0) },
    };

    vec![
        ShapeSetup::new(floor, material(UVec2::new(64, 64), Vec4::new(0.85, 0.85, 0.85, 1.0))),
        ShapeSetup::new(wall, material(UVec2::new(64, 64), Vec4::new(0.75, 0.25, 0.2, 1.0))),
        ShapeSetup::new(occluder, material(UVec2::new(16, 16), Vec4::new(0.3, 0.3, 0.9, 1.0))),
    ]
}

fn material(resolution: UVec2, albedo: Vec4) -> GiMaterial {
    GiMaterial { resolution, albedo, smoothness: 0.3, metallic: 0.0 }
}

fn demo_lights() -> Arc<StaticLights> {
    Arc::new(StaticLights(vec![LightDesc {
        position: Vec3::new(-2.0, 4.0, 2.0),
        direction: Vec3::new(0.4, -1.0, -0.3).normalize(),
        spot_angle: 90.0,
        inner_percent: 70.0,
        color_temperature: 3200.0,
        intensity: 120.0,
        radius: 0.15,
    }]))
}
