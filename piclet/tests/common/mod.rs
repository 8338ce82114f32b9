#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ebeam_pdk::{EbeamPdk, GRATING_COUPLER, PORT_MARKER};
use picgeom::orientation::Rotation;
use picgeom::{Path as WgPath, Point, Rect};
use piclet::batch::Submission;
use piclet::identity::CommitSource;
use piclet::layout::cell::{ArrayParams, CellKey, Instance};
use piclet::layout::layers::LayerRole;
use piclet::layout::library::Library;
use piclet::pdk::{ComponentLibrary, ComponentParams};

/// Pitch of the grating-coupler array in test designs.
pub const GC_PITCH: i64 = 127_000;
/// Where the coupler array starts, relative to the port marker.
pub const GC_X: i64 = 200_000;

/// Options for [`student_design`].
#[derive(Debug, Clone, Copy)]
pub struct DesignOpts {
    /// Place a port marker at the origin.
    pub marker: bool,
    /// Draw the waveguide feeding the second coupler.
    pub connected: bool,
}

impl Default for DesignOpts {
    fn default() -> Self {
        Self {
            marker: true,
            connected: true,
        }
    }
}

/// A small student design: a port marker at the origin feeding a 2x1 array of
/// grating couplers, plus a ring-shaped block nested one level down.
pub fn student_design(name: &str, opts: DesignOpts) -> (Library, CellKey) {
    let pdk = EbeamPdk::new();
    let layers = pdk.layers();
    let wg = layers.role(LayerRole::Waveguide).unwrap();
    let params = ComponentParams::default();

    let mut lib = Library::new(name);
    let top = lib.create_cell(name);
    let gc = pdk.component(&mut lib, GRATING_COUPLER, &params).unwrap();

    if opts.marker {
        let marker = pdk.component(&mut lib, PORT_MARKER, &params).unwrap();
        lib.place(top, marker, Point::zero(), Rotation::R0);
    }

    let couplers = Instance::builder()
        .name("couplers")
        .cell(gc)
        .loc(Point::new(GC_X, 0))
        .orientation(Rotation::R180)
        .array(ArrayParams {
            rows: 2,
            cols: 1,
            row_step: Point::new(0, GC_PITCH),
            col_step: Point::zero(),
        })
        .build()
        .unwrap();
    lib.add_inst(top, couplers);

    let ring = lib.create_cell(format!("{name}_ring"));
    lib.cell_mut(ring).draw(
        wg,
        Rect::new(Point::new(-10_000, -10_000), Point::new(10_000, 10_000)),
    );
    let block = lib.create_cell(format!("{name}_block"));
    lib.place(block, ring, Point::new(0, 40_000), Rotation::R0);
    lib.place(top, block, Point::new(100_000, 0), Rotation::R0);

    lib.cell_mut(top).draw(
        wg,
        WgPath::new(vec![Point::zero(), Point::new(GC_X, 0)], 800),
    );
    if opts.connected {
        lib.cell_mut(top).draw(
            wg,
            WgPath::new(
                vec![Point::new(100_000, GC_PITCH), Point::new(GC_X, GC_PITCH)],
                800,
            ),
        );
    }
    (lib, top)
}

/// Writes a [`student_design`] to `dir/file`.
pub fn write_design(dir: &Path, file: &str, opts: DesignOpts) -> PathBuf {
    let stem = file.split('.').next().unwrap();
    let (lib, _) = student_design(stem, opts);
    let path = dir.join(file);
    lib.save_gds(&path, &EbeamPdk::new().layers()).unwrap();
    path
}

pub fn submission(handle: &str, opts: DesignOpts) -> Submission {
    let (lib, top) = student_design(&format!("design_{handle}"), opts);
    Submission {
        path: PathBuf::from(format!("submissions/{handle}.gds")),
        lib,
        top,
        handle: handle.to_string(),
    }
}

/// Commit metadata keyed by file name.
#[derive(Debug, Default, Clone)]
pub struct FakeGit {
    pub authors: HashMap<String, (String, String)>,
    pub origin: Option<String>,
}

impl FakeGit {
    pub fn with(mut self, file: &str, email: &str, name: &str) -> Self {
        self.authors
            .insert(file.to_string(), (email.to_string(), name.to_string()));
        self
    }

    fn author(&self, path: &Path) -> Option<&(String, String)> {
        let file = path.file_name()?.to_str()?;
        self.authors.get(file)
    }
}

impl CommitSource for FakeGit {
    fn author_email(&self, path: &Path) -> Option<String> {
        self.author(path).map(|(email, _)| email.clone())
    }

    fn author_name(&self, path: &Path) -> Option<String> {
        self.author(path).map(|(_, name)| name.clone())
    }

    fn origin_url(&self) -> Option<String> {
        self.origin.clone()
    }
}
