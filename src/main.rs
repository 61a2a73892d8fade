use std::path::PathBuf;

use clap::Parser;
use ibl_ngin::Config;

/// Renders OBJ and glTF models lit by an HDR environment.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML file overriding the default scene.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory that model and HDR paths are relative to.
    #[arg(short, long)]
    assets: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(assets) = args.assets {
        config.assets.root = assets;
    }
    ibl_ngin::run(config)
}
