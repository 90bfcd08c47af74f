use std::path::Path;

use switchyard_core::{io, paths, ToolRegistry};

pub fn run(home: &Path) -> anyhow::Result<()> {
    io::ensure_dir(home)?;
    let path = paths::registry_path(home);
    if path.exists() {
        println!("Registry already exists at {}", path.display());
        return Ok(());
    }
    ToolRegistry::default().save(home)?;
    println!("Wrote default registry to {}", path.display());
    Ok(())
}
