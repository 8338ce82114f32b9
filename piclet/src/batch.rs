//! The batch pipeline: load, verify, identify, pair, compose, write.

use std::path::{Path, PathBuf};

use arcstr::ArcStr;

use crate::config::PicletConfig;
use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::identity::{HandleAllocator, IdentityResolver};
use crate::layout::cell::CellKey;
use crate::layout::layers::Layers;
use crate::layout::library::Library;
use crate::layout::routing::WaveguideRouter;
use crate::layout::LayoutFormat;
use crate::log::{debug, error, info, warn, Log};
use crate::pdk::{ComponentLibrary, ComponentParams};
use crate::piclet::{required_components, PicletComposer};
use crate::verification::{verify_submission, ErrorCounts, ErrorSummary, FileStatus, Verifier};

/// Name of the summary table written next to the artifacts.
pub const SUMMARY_FILE: &str = "error_summary.csv";

/// A verified student design and the handle of its author.
#[derive(Debug, Clone)]
pub struct Submission {
    pub path: PathBuf,
    pub lib: Library,
    pub top: CellKey,
    pub handle: String,
}

impl Submission {
    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// What a batch run produced.
#[derive(Debug, Default)]
pub struct BatchOutput {
    /// Written layout files, in the output directory.
    pub artifacts: Vec<PathBuf>,
    pub summary: ErrorSummary,
    /// Names of the PIClets that could not be built.
    pub failed: Vec<String>,
}

/// Runs the whole pipeline over the submissions directory.
pub struct BatchRunner<'a> {
    config: PicletConfig,
    pdk: &'a dyn ComponentLibrary,
    router: &'a dyn WaveguideRouter,
    verifier: &'a dyn Verifier,
    identity: IdentityResolver,
    layers: Layers,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        config: PicletConfig,
        pdk: &'a dyn ComponentLibrary,
        router: &'a dyn WaveguideRouter,
        verifier: &'a dyn Verifier,
        identity: IdentityResolver,
    ) -> Self {
        Self {
            config,
            pdk,
            router,
            verifier,
            identity,
            layers: pdk.layers(),
        }
    }

    pub fn config(&self) -> &PicletConfig {
        &self.config
    }

    /// Runs the batch.
    ///
    /// Only configuration problems (a missing submissions directory, a missing
    /// library component, an invalid setting) are returned as errors. A file
    /// that cannot be used is recorded in the summary, and a PIClet that
    /// cannot be built is logged and listed in [`BatchOutput::failed`].
    pub fn run(&mut self) -> Result<BatchOutput> {
        self.config.validate()?;
        let dir = self.config.submissions_dir.clone();
        if !dir.is_dir() {
            return Err(ErrorSource::MissingDirectory(dir).into());
        }
        self.check_components()?;
        crate::io::create_dir_all(&self.config.output_dir)?;

        let mut output = BatchOutput::default();
        let submissions = self.load_submissions(&dir, &mut output.summary)?;
        info!(
            "{} of {} file(s) accepted",
            submissions.len(),
            output.summary.rows().len()
        );

        for pair in submissions.chunks(2) {
            let handles: Vec<&str> = pair.iter().map(|s| s.handle.as_str()).collect();
            let name = self.config.layout_name(&handles);
            let members: Vec<&Submission> = pair.iter().collect();
            match self.build(&name, &members) {
                Ok(path) => {
                    info!("wrote {path:?}");
                    output.artifacts.push(path);
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    error!("failed to build {name}: {err}");
                    output.failed.push(name);
                }
            }
        }

        output
            .summary
            .write_csv(self.config.output_dir.join(SUMMARY_FILE))?;
        output.summary.log();
        Ok(output)
    }

    /// Instantiates every component once, so a library without them fails
    /// before any file is read.
    fn check_components(&self) -> Result<()> {
        let mut scratch = Library::new("component_check");
        let params = ComponentParams {
            wavelength: self.config.wavelength,
        };
        for name in required_components(&self.config) {
            with_err_context(self.pdk.component(&mut scratch, &name, &params), || {
                ErrorContext::Component(ArcStr::from(name.as_str()))
            })?;
        }
        debug!(
            "{} provides every required component",
            self.pdk.name()
        );
        Ok(())
    }

    fn load_submissions(&mut self, dir: &Path, summary: &mut ErrorSummary) -> Result<Vec<Submission>> {
        let mut files: Vec<PathBuf> = crate::io::sorted_files(dir)?
            .into_iter()
            .filter(|path| LayoutFormat::from_path(path).is_some())
            .collect();
        if let Some(max) = self.config.max_submissions {
            files.truncate(max);
        }
        info!("found {} submission file(s) in {dir:?}", files.len());

        let mut handles = HandleAllocator::new();
        let mut accepted = Vec::new();
        for path in files {
            let name = file_name(&path);
            let (lib, top) = match self.load(&path) {
                Ok(loaded) => loaded,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    let reason = match err.source() {
                        ErrorSource::UnsupportedFormat(_) => "unsupported format",
                        ErrorSource::NoTopCell => "no top cell",
                        _ => "unreadable",
                    };
                    warn!("skipping {name}: {err}");
                    summary.push(name, FileStatus::Skipped(reason.to_string()), ErrorCounts::default());
                    continue;
                }
            };

            let (status, counts) = verify_submission(self.verifier, &lib, top);
            info!("{name}: {status}");
            let accepted_file = status.is_accepted();
            summary.push(name, status, counts);
            if !accepted_file {
                continue;
            }

            let handle = handles.allocate(&self.identity.resolve(&path));
            debug!("{path:?} is by {handle}");
            accepted.push(Submission {
                path,
                lib,
                top,
                handle,
            });
        }
        Ok(accepted)
    }

    fn load(&self, path: &Path) -> Result<(Library, CellKey)> {
        let lib = with_err_context(Library::load(path, &self.layers), || {
            ErrorContext::LoadSubmission(path.to_path_buf())
        })?;
        let top = lib
            .main_top_cell()
            .ok_or_else(|| crate::error::PicletError::new(ErrorSource::NoTopCell))?;
        Ok((lib, top))
    }

    /// Composes and writes one PIClet. Returns the primary artifact path.
    fn build(&self, name: &str, members: &[&Submission]) -> Result<PathBuf> {
        let composer = PicletComposer::new(&self.config, self.pdk, self.router);
        let (lib, top) = composer.compose(name, members)?;
        let file = format!("{name}.gds");
        let path = self.config.output_dir.join(&file);
        write_atomic(&lib, top, &path, &self.layers)?;

        if let Some(tapeout) = self.config.tapeout_dir.as_ref() {
            if tapeout.is_dir() {
                if let Err(err) = copy_atomic(&path, &tapeout.join(&file)) {
                    warn!("could not copy {file} to {tapeout:?}: {err}");
                }
            } else {
                warn!("tapeout directory {tapeout:?} does not exist; wrote {file} to the output directory only");
            }
        }
        Ok(path)
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}

/// Writes `top` of `lib` to `path` through a `.part` file, so `path` is
/// either complete or absent.
pub fn write_atomic(lib: &Library, top: CellKey, path: &Path, layers: &Layers) -> Result<()> {
    let part = part_path(path);
    if let Err(err) = lib.save_gds_with_top(top, &part, layers) {
        crate::io::remove_if_exists(&part);
        return Err(err);
    }
    crate::io::rename(&part, path)
}

/// Copies `from` to `to` through a `.part` file, removing it on failure.
fn copy_atomic(from: &Path, to: &Path) -> Result<()> {
    let part = part_path(to);
    let copied = crate::io::copy_file(from, &part).and_then(|_| crate::io::rename(&part, to));
    if copied.is_err() {
        crate::io::remove_if_exists(&part);
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_files_extend_the_name() {
        assert_eq!(
            part_path(Path::new("out/PIClet-3x3-a-b.gds")),
            PathBuf::from("out/PIClet-3x3-a-b.gds.part")
        );
    }

    #[test]
    fn failed_copy_leaves_no_part_file() {
        let dir = tempdir::TempDir::new("piclet_copy").unwrap();
        let from = dir.path().join("a.gds");
        std::fs::write(&from, b"layout").unwrap();
        let to = dir.path().join("b.gds");
        std::fs::create_dir_all(to.join("occupied")).unwrap();

        assert!(copy_atomic(&from, &to).is_err());
        assert!(!part_path(&to).exists());

        let free = dir.path().join("c.gds");
        copy_atomic(&from, &free).unwrap();
        assert_eq!(std::fs::read(&free).unwrap(), b"layout");
        assert!(!part_path(&free).exists());
    }
}
