//! Shader source loading.

use std::path::{Path, PathBuf};

use anyhow::Context;

/// Loads WGSL shader sources by name from a directory on disk.
///
/// `load("write_depth")` reads `<root>/write_depth.wgsl`. A missing or
/// unreadable source is fatal: the renderer cannot substitute anything for
/// an absent shader.
pub struct ShaderLoader {
    root: PathBuf,
}

impl ShaderLoader {
    /// A loader rooted at the crate's `shaders/` directory.
    pub fn new() -> Self {
        Self::with_root(Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders"))
    }

    /// A loader rooted at an arbitrary directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Reads the named shader's WGSL source. Fatal on failure.
    pub fn load(&self, name: &str) -> String {
        match self.try_load(name) {
            Ok(source) => source,
            Err(err) => {
                log::error!("{err:#}");
                std::process::exit(1);
            }
        }
    }

    fn try_load(&self, name: &str) -> anyhow::Result<String> {
        let path = self.root.join(format!("{name}.wgsl"));
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read shader source {}", path.display()))
    }
}

impl Default for ShaderLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_reads_named_wgsl_file() {
        let root = std::env::temp_dir().join("relievo-loader-test");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("solid.wgsl"), "// wgsl source\n").unwrap();

        let loader = ShaderLoader::with_root(root);
        assert_eq!(loader.load("solid"), "// wgsl source\n");
    }

    #[test]
    fn missing_shader_is_an_error() {
        let loader = ShaderLoader::with_root(std::env::temp_dir().join("relievo-missing"));
        let err = loader.try_load("nope").unwrap_err();
        assert!(err.to_string().contains("nope.wgsl"));
    }
}
