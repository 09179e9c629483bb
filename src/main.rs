use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pollster::FutureExt as _;
use tracing_subscriber::EnvFilter;

use glb_scene::gpu::headless_device;
use glb_scene::ResourceBundle;

#[derive(Parser)]
#[command(name = "glb-scene")]
#[command(about = "Inspect a binary glTF file", version)]
struct Cli {
    /// GLB file to load
    path: PathBuf,

    /// Print the model summary as JSON
    #[arg(long)]
    json: bool,

    /// Upload the geometry to a headless GPU device
    #[arg(long)]
    gpu: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let model = glb_scene::load(&cli.path).with_context(|| format!("failed to load {}", cli.path.display()))?;
    let summary = model.summary();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("version: {}, binary: {} bytes", summary.version, summary.binary_bytes);
        println!(
            "{} buffer views, {} accessors, {} primitives, {} animations",
            summary.buffer_views, summary.accessors, summary.primitives, summary.animations
        );
        println!("materials: {:?}", summary.materials);
        println!("meshes: {:?}", summary.meshes);
        for node in model.scene.flatten() {
            let mesh = node.mesh.and_then(|id| model.mesh(id)).map(|m| m.name.as_str());
            println!("node {} {:?} mesh={:?} t={:?}", node.index, node.name, mesh, node.translation);
        }
    }

    if cli.gpu {
        let (device, _queue) = headless_device().block_on().context("no GPU adapter available")?;
        let bundle = ResourceBundle::build(&device, &model)?;
        println!(
            "uploaded {} vertex and {} index buffers for {} draws",
            bundle.vertex_buffers.len(),
            bundle.index_buffers.len(),
            bundle.primitives.len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_and_path() {
        let cli = Cli::try_parse_from(["glb-scene", "scene.glb", "--gpu"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("scene.glb"));
        assert!(cli.gpu);
        assert!(!cli.json);

        assert!(Cli::try_parse_from(["glb-scene"]).is_err());
        assert!(Cli::try_parse_from(["glb-scene", "scene.glb", "--verbose"]).is_err());
    }
}
