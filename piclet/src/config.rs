//! Generator configuration, read from TOML.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorSource, Result};

/// Settings for one batch run. All lengths are in database units (1 nm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PicletConfig {
    /// Prefix of every output layout name.
    pub layout_prefix: String,
    pub die_width: i64,
    pub die_height: i64,
    pub keepout_width: i64,
    pub keepout_height: i64,
    pub ground_wire_width: i64,
    pub trench_bondpad_offset: i64,
    /// Laser origin height for the first circuit.
    pub laser_start_y: i64,
    /// Vertical distance between the two circuits of a PIClet.
    pub laser_circuit_spacing: i64,
    /// Horizontal offset of the laser contact pad from the laser origin.
    pub laser_contact_x: i64,
    /// Vertical offset of a submission from the splitter output it is fed by.
    pub submission_gc_dy: i64,
    /// Horizontal distance between splitter tree levels.
    pub tree_dx: i64,
    /// Vertical pitch between the outputs of the last splitter level.
    pub tree_dy: i64,
    /// Operating wavelength in nanometers.
    pub wavelength: u32,
    /// Substring identifying port-marker cells.
    pub port_marker_pattern: String,
    /// Substring identifying fiber-coupler cells replaced in reference copies.
    pub coupler_pattern: String,
    pub reference_component: String,
    /// Pin of the reference component aligned to each replaced coupler.
    pub reference_pin: String,
    /// Use at most this many submission files.
    pub max_submissions: Option<usize>,
    pub submissions_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Secondary directory receiving a copy of every artifact.
    pub tapeout_dir: Option<PathBuf>,
    /// Layout placed at the bottom-left die corner.
    pub logo: Option<PathBuf>,
    pub github: GithubConfig,
    /// Maps locally derived handles to the GitHub login to use.
    pub handle_aliases: HashMap<String, String>,
}

/// GitHub lookup settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub enabled: bool,
    pub api_url: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub retry_wait_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://api.github.com".to_string(),
            timeout_secs: 10,
            max_retries: 1,
            retry_wait_secs: 60,
        }
    }
}

impl Default for PicletConfig {
    fn default() -> Self {
        Self {
            layout_prefix: "PIClet-3x3".to_string(),
            die_width: 2_753_330,
            die_height: 2_753_340,
            keepout_width: 2_000_000,
            keepout_height: 200_000,
            ground_wire_width: 20_000,
            trench_bondpad_offset: 40_000,
            laser_start_y: 300_000,
            laser_circuit_spacing: 1_100_000,
            laser_contact_x: 200_000,
            submission_gc_dy: 500_000,
            tree_dx: 100_000,
            tree_dy: 60_000,
            wavelength: 1310,
            port_marker_pattern: "port_SiN".to_string(),
            coupler_pattern: "GC".to_string(),
            reference_component: "ebeam_dream_FaML_Shuksan_SiN_1310_BB".to_string(),
            reference_pin: "opt1".to_string(),
            max_submissions: None,
            submissions_dir: PathBuf::from("submissions"),
            output_dir: PathBuf::from("piclets"),
            tapeout_dir: None,
            logo: None,
            github: GithubConfig::default(),
            handle_aliases: HashMap::from([("lukasc".to_string(), "lukasc-ubc".to_string())]),
        }
    }
}

impl PicletConfig {
    pub fn from_toml(input: &str) -> Result<Self> {
        let value: Self = toml::from_str(input)?;
        value.validate()?;
        Ok(value)
    }

    /// Reads a configuration file. Relative paths in it are resolved against
    /// the file's directory.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = crate::io::read_to_string(path)?;
        let mut value = Self::from_toml(&input)?;
        if let Some(dir) = path.parent() {
            value.resolve_paths(dir);
        }
        Ok(value)
    }

    fn resolve_paths(&mut self, dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        resolve(&mut self.submissions_dir);
        resolve(&mut self.output_dir);
        if let Some(p) = self.tapeout_dir.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.logo.as_mut() {
            resolve(p);
        }
    }

    /// Rejects settings no layout can be generated with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("die_width", self.die_width),
            ("die_height", self.die_height),
            ("ground_wire_width", self.ground_wire_width),
            ("tree_dx", self.tree_dx),
            ("tree_dy", self.tree_dy),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(ErrorSource::Config(format!("{name} must be positive, got {value}")).into());
            }
        }
        if self.layout_prefix.is_empty() {
            return Err(ErrorSource::Config("layout_prefix must not be empty".to_string()).into());
        }
        if self.port_marker_pattern.is_empty() || self.coupler_pattern.is_empty() {
            return Err(ErrorSource::Config("name patterns must not be empty".to_string()).into());
        }
        if self.max_submissions == Some(0) {
            return Err(ErrorSource::Config("max_submissions must be at least 1".to_string()).into());
        }
        Ok(())
    }

    /// The artifact name for a PIClet carrying designs by `handles`.
    pub fn layout_name(&self, handles: &[&str]) -> String {
        let mut name = self.layout_prefix.clone();
        for handle in handles {
            name.push('-');
            name.push_str(handle);
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        assert_eq!(PicletConfig::from_toml("").unwrap(), PicletConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = PicletConfig::from_toml(
            r#"
            layout_prefix = "PIClet-test"
            max_submissions = 4
            tapeout_dir = "/tmp/tapeout"

            [github]
            enabled = false

            [handle_aliases]
            jdoe = "jane-doe"
            "#,
        )
        .unwrap();
        assert_eq!(config.layout_prefix, "PIClet-test");
        assert_eq!(config.max_submissions, Some(4));
        assert_eq!(config.tapeout_dir, Some(PathBuf::from("/tmp/tapeout")));
        assert!(!config.github.enabled);
        assert_eq!(config.github.timeout_secs, 10);
        assert_eq!(config.handle_aliases.get("jdoe").map(String::as_str), Some("jane-doe"));
        assert_eq!(config.die_width, 2_753_330);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let err = PicletConfig::from_toml("die_width = -5").unwrap_err();
        assert!(matches!(err.source(), ErrorSource::Config(_)));
        assert!(err.is_fatal());
        let err = PicletConfig::from_toml("die_width = \"wide\"").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn layout_names_join_handles() {
        let config = PicletConfig::default();
        assert_eq!(config.layout_name(&["alice", "bob"]), "PIClet-3x3-alice-bob");
        assert_eq!(config.layout_name(&["carol"]), "PIClet-3x3-carol");
    }
}
