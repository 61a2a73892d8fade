use std::{env, path::PathBuf};

use anyhow::Result;
use fs_extra::dir::{CopyOptions, copy};

/// Mirrors `assets/` (models, HDR environments, the sample config) next to
/// the build output so a freshly built binary finds them.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    if !assets.is_dir() {
        println!("cargo:warning=no assets/ directory, pass --assets at run time");
        return Ok(());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let options = CopyOptions {
        overwrite: true,
        ..CopyOptions::new()
    };
    copy(&assets, &out_dir, &options)?;
    Ok(())
}
