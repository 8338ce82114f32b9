use std::path::PathBuf;

use anyhow::Context;
use ebeam_pdk::EbeamPdk;
use piclet::batch::{BatchOutput, BatchRunner};
use piclet::config::PicletConfig;
use piclet::identity::IdentityResolver;
use piclet::layout::layers::LayerRole;
use piclet::layout::routing::ManhattanRouter;
use piclet::pdk::ComponentLibrary;
use piclet::verification::PinConnectivityVerifier;

/// Command-line settings that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub submissions: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub tapeout: Option<PathBuf>,
    pub max: Option<usize>,
}

/// Reads the config file, if any, and applies `overrides` on top.
pub fn load_config(path: Option<&PathBuf>, overrides: Overrides) -> anyhow::Result<PicletConfig> {
    let mut config = match path {
        Some(path) => PicletConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {path:?}"))?,
        None => PicletConfig::default(),
    };
    if let Some(dir) = overrides.submissions {
        config.submissions_dir = dir;
    }
    if let Some(dir) = overrides.output {
        config.output_dir = dir;
    }
    if let Some(dir) = overrides.tapeout {
        config.tapeout_dir = Some(dir);
    }
    if let Some(max) = overrides.max {
        config.max_submissions = Some(max);
    }
    config.validate()?;
    Ok(config)
}

/// Runs a batch with the EBeam SiN library, the Manhattan router, and the
/// built-in pin connectivity check.
pub fn generate(config: PicletConfig, offline: bool) -> anyhow::Result<BatchOutput> {
    let pdk = EbeamPdk::new();
    let waveguide = pdk.layers().role(LayerRole::Waveguide)?;
    let router = ManhattanRouter::new(waveguide);
    let verifier = PinConnectivityVerifier::new(waveguide);
    let identity = IdentityResolver::from_config(&config, offline);
    let output = BatchRunner::new(config, &pdk, &router, &verifier, identity).run()?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_config_file() {
        let dir = tempdir::TempDir::new("piclet_gen_config").unwrap();
        let path = dir.path().join("piclet.toml");
        std::fs::write(&path, "output_dir = \"out\"\nmax_submissions = 8\n").unwrap();

        let config = load_config(
            Some(&path),
            Overrides {
                max: Some(2),
                tapeout: Some(PathBuf::from("/mnt/tapeout")),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.output_dir, dir.path().join("out"));
        assert_eq!(config.max_submissions, Some(2));
        assert_eq!(config.tapeout_dir, Some(PathBuf::from("/mnt/tapeout")));
    }

    #[test]
    fn zero_max_is_rejected() {
        let overrides = Overrides {
            max: Some(0),
            ..Default::default()
        };
        assert!(load_config(None, overrides).is_err());
    }
}
