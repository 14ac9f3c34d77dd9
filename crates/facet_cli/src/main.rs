//! Facet command line renderer.
//!
//! Loads a JSON scene (or the built-in demo), prepares the integrator and
//! writes a PNG.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use facet_core::{load_scene, SceneDescription};
use facet_math::Vec3;
use facet_renderer::{
    render, Camera, GiMode, Integrator, LightRig, OpticalMode, RenderConfig, RenderContext, Scene,
};

/// Render a scene with photon mapping or path tracing.
#[derive(Parser, Debug)]
#[command(name = "facet", version, about)]
struct Cli {
    /// Render configuration (JSON). Missing keys use defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scene description (JSON). Without it the built-in demo is rendered.
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Output image path
    #[arg(short, long, default_value = "facet.png")]
    output: PathBuf,

    /// Image width in pixels
    #[arg(short = 'W', long, default_value_t = 640)]
    width: u32,

    /// Image height in pixels
    #[arg(short = 'H', long, default_value_t = 360)]
    height: u32,

    /// Indirect lighting strategy (overrides the config file)
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Samples per pixel (overrides the config file)
    #[arg(long)]
    spp: Option<u32>,

    /// Photons to emit in photon mode (overrides the config file)
    #[arg(long)]
    photons: Option<usize>,

    /// Treat transparent surfaces as opaque for direct lighting
    #[arg(long)]
    legacy_optics: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Path,
    Photon,
}

impl From<Mode> for GiMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Path => GiMode::PathTracing,
            Mode::Photon => GiMode::PhotonMap,
        }
    }
}

impl Cli {
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RenderConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.gi_mode = mode.into();
        }
        if let Some(spp) = self.spp {
            config.samples_per_pixel = spp;
        }
        if let Some(photons) = self.photons {
            config.photon_count = photons;
        }
        if self.legacy_optics {
            config.optical_mode = OpticalMode::Legacy;
        }

        config.validate().context("Invalid render configuration")?;
        Ok(config)
    }

    fn scene_description(&self) -> Result<SceneDescription> {
        match &self.scene {
            Some(path) => load_scene(path)
                .with_context(|| format!("Failed to load scene {}", path.display())),
            None => {
                log::info!("No scene given, rendering the built-in demo");
                Ok(SceneDescription::jewelry_demo())
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let config = cli.render_config()?;
    let description = cli.scene_description()?;

    let scene = Scene::from_description(&description).context("Failed to build scene")?;
    let lights = LightRig::from_description(&description, &config);

    let integrator =
        Integrator::prepare(&scene, &lights, &config).context("Failed to prepare integrator")?;
    if let Some(stats) = integrator.emission_stats() {
        log::info!("Photon pass: {:?}", stats);
    }

    let camera = Camera::new()
        .with_resolution(cli.width, cli.height)
        .with_position(Vec3::new(0.0, 1.4, 4.5), Vec3::new(0.0, 0.4, 0.0), Vec3::Y)
        .with_fov(35.0);

    let ctx = RenderContext::new(&scene, &lights, &integrator);
    let frame = render(&camera, &ctx);

    let rgba = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_rgba())
        .context("Image buffer size does not match its dimensions")?;
    rgba.save(&cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    log::info!("Wrote {}", cli.output.display());
    Ok(())
}
