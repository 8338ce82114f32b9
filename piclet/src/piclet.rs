//! PIClet composition: one die carrying a laser, a heater, bond pads, a
//! splitter tree, up to two student designs and their reference copies.

use arcstr::ArcStr;
use chrono::{Local, NaiveDateTime};
use picgeom::bbox::Bbox;
use picgeom::orientation::Rotation;
use picgeom::transform::Transform;
use picgeom::{Path, Point, Rect};

use crate::batch::Submission;
use crate::config::PicletConfig;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::layout::cell::{CellKey, InstRef, Pin, TextElement};
use crate::layout::error::{LayoutError, LayoutResult};
use crate::layout::hierarchy::{find_port_marker, flatten_arrays};
use crate::layout::layers::{LayerRole, LayerSpec, Layers};
use crate::layout::library::Library;
use crate::layout::reference::{align_to_boundary, substitute_couplers, Substitution};
use crate::layout::routing::{WaveguideRouter, WaveguideSpec};
use crate::log::{debug, info, warn};
use crate::pdk::{ComponentLibrary, ComponentParams};

pub const HEATER: &str = "wg_heater";
pub const BOND_PAD: &str = "ebeam_BondPad";
pub const Y_BRANCH: &str = "ebeam_YBranch_te1310";

/// Name of the pin injected into each student design.
pub const LASER_PIN: &str = "opt_laser";

const HEATER_SHIFT: i64 = 100_000;
const LASER_PAD_DISTANCE: i64 = 200_000;
const PAD_PITCH: i64 = 150_000;
const METAL_WIDTH: i64 = 20_000;
const LABEL_LOC: Point = Point {
    x: -200_000,
    y: -1_170_000,
};
const STAMP_LOC: Point = Point {
    x: -200_000,
    y: -1_200_000,
};
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The laser component for `wavelength` nanometers.
pub fn laser_name(wavelength: u32) -> String {
    format!("ebeam_dream_Laser_SiN_{wavelength}_Bond_BB")
}

/// Every component a PIClet needs from the component library.
pub fn required_components(config: &PicletConfig) -> Vec<String> {
    vec![
        laser_name(config.wavelength),
        HEATER.to_string(),
        BOND_PAD.to_string(),
        Y_BRANCH.to_string(),
        config.reference_component.clone(),
    ]
}

/// A binary tree of Y-branches inside its own cell.
#[derive(Debug, Clone)]
pub struct SplitterTree {
    pub cell: CellKey,
    /// The root branch; its `opt1` is the tree input.
    pub input: InstRef,
    /// The last-level branches, bottom to top.
    pub outputs: Vec<InstRef>,
}

/// Builds a splitter tree of `depth` levels in a new cell.
///
/// Level `l` holds `2^l` branches at `x = l * dx`, spaced `dy * 2^(depth - l - 1)`
/// apart and centred on `y = 0`. The lower output (`opt3`) of each branch feeds
/// the lower child, the upper output (`opt2`) the upper one.
pub fn y_splitter_tree(
    lib: &mut Library,
    branch: CellKey,
    depth: u32,
    dx: i64,
    dy: i64,
    router: &dyn WaveguideRouter,
    spec: &WaveguideSpec,
) -> LayoutResult<SplitterTree> {
    if depth == 0 {
        return LayoutError::fail("splitter tree depth must be at least 1");
    }
    let cell = lib.create_cell(format!("y_splitter_tree_d{depth}"));
    let mut levels: Vec<Vec<InstRef>> = Vec::with_capacity(depth as usize);
    for level in 0..depth {
        let count = 1i64 << level;
        let pitch = dy << (depth - level - 1);
        let x = level as i64 * dx;
        let row = (0..count)
            .map(|i| {
                let y = pitch * (2 * i - count + 1) / 2;
                lib.place(cell, branch, Point::new(x, y), Rotation::R0)
            })
            .collect();
        levels.push(row);
    }

    for pair in levels.windows(2) {
        let (parents, children) = (&pair[0], &pair[1]);
        for (i, parent) in parents.iter().enumerate() {
            for (out, child) in [("opt3", &children[2 * i]), ("opt2", &children[2 * i + 1])] {
                let from = lib.inst_pin(parent, out)?;
                let to = lib.inst_pin(child, "opt1")?;
                router.route(lib, cell, &from, &to, spec)?;
            }
        }
    }

    let input = levels[0][0];
    let outputs = levels.pop().unwrap_or_default();
    Ok(SplitterTree {
        cell,
        input,
        outputs,
    })
}

/// Composes PIClets from verified submissions.
pub struct PicletComposer<'a> {
    config: &'a PicletConfig,
    pdk: &'a dyn ComponentLibrary,
    router: &'a dyn WaveguideRouter,
    layers: Layers,
    stamp: Option<NaiveDateTime>,
}

/// Per-submission placement state shared by the composition steps.
struct Circuit<'c> {
    lib: &'c mut Library,
    cell: CellKey,
    spec: WaveguideSpec,
    laser: InstRef,
    heater: InstRef,
    center_y: i64,
}

impl<'a> PicletComposer<'a> {
    pub fn new(
        config: &'a PicletConfig,
        pdk: &'a dyn ComponentLibrary,
        router: &'a dyn WaveguideRouter,
    ) -> Self {
        Self {
            config,
            pdk,
            router,
            layers: pdk.layers(),
            stamp: None,
        }
    }

    /// Stamps PIClets with `stamp` instead of the current local time.
    pub fn with_timestamp(mut self, stamp: NaiveDateTime) -> Self {
        self.stamp = Some(stamp);
        self
    }

    fn params(&self) -> ComponentParams {
        ComponentParams {
            wavelength: self.config.wavelength,
        }
    }

    fn layer(&self, role: LayerRole) -> Result<LayerSpec> {
        self.layers.role(role)
    }

    fn component(&self, lib: &mut Library, name: &str) -> Result<CellKey> {
        with_err_context(self.pdk.component(lib, name, &self.params()), || {
            ErrorContext::Component(ArcStr::from(name))
        })
    }

    /// Builds the PIClet `name` around `submissions` (one or two).
    ///
    /// Returns the library and its top cell, which is named `name`.
    pub fn compose(&self, name: &str, submissions: &[&Submission]) -> Result<(Library, CellKey)> {
        with_err_context(self.compose_inner(name, submissions), || {
            ErrorContext::ComposePiclet(ArcStr::from(name))
        })
    }

    fn compose_inner(&self, name: &str, submissions: &[&Submission]) -> Result<(Library, CellKey)> {
        if submissions.is_empty() || submissions.len() > 2 {
            return Err(LayoutError::msg(format!(
                "a PIClet holds one or two designs, got {}",
                submissions.len()
            ))
            .into());
        }
        info!("composing {name}");
        let mut lib = Library::new(name);
        let top = lib.create_cell(name);
        // Library components claim their names before any design is copied in,
        // so same-named cells of a design get suffixed instead of reused.
        for component in required_components(self.config) {
            self.component(&mut lib, &component)?;
        }

        self.floorplan(&mut lib, top)?;
        self.place_logo(&mut lib, top);

        for (k, sub) in submissions.iter().enumerate() {
            let y_offset = -(k as i64) * self.config.laser_circuit_spacing;
            self.place_circuit(&mut lib, top, sub, y_offset)?;
        }

        self.ground_wire(&mut lib, top)?;
        lib.cell_mut(top).add_annotation(TextElement {
            string: ArcStr::from(name),
            loc: LABEL_LOC,
            layer: self.layer(LayerRole::Text)?,
        });
        let stamp = self.stamp.unwrap_or_else(|| Local::now().naive_local());
        lib.cell_mut(top).add_annotation(TextElement {
            string: ArcStr::from(stamp.format(STAMP_FORMAT).to_string()),
            loc: STAMP_LOC,
            layer: self.layer(LayerRole::Text)?,
        });

        let dropped = lib.retain_subtree(top);
        if dropped > 0 {
            debug!("dropped {dropped} unused cell(s) from {name}");
        }
        Ok((lib, top))
    }

    fn floorplan(&self, lib: &mut Library, top: CellKey) -> Result<()> {
        let c = self.config;
        let (w2, h2) = (c.die_width / 2, c.die_height / 2);
        let floorplan = self.layer(LayerRole::FloorPlan)?;
        let keepout = self.layer(LayerRole::KeepOut)?;
        let cell = lib.cell_mut(top);
        cell.draw(floorplan, Rect::new(Point::new(-w2, -h2), Point::new(w2, h2)));
        cell.draw(
            keepout,
            Rect::new(
                Point::new(-w2, -h2),
                Point::new(c.keepout_width - w2, c.keepout_height - h2),
            ),
        );
        cell.draw(
            keepout,
            Rect::new(
                Point::new(-w2, h2 - c.keepout_height),
                Point::new(c.keepout_width - w2, h2),
            ),
        );
        Ok(())
    }

    fn place_logo(&self, lib: &mut Library, top: CellKey) {
        let Some(path) = self.config.logo.as_ref() else {
            return;
        };
        let logo = match Library::load(path, &self.layers) {
            Ok(logo) => logo,
            Err(err) => {
                warn!("could not load logo {path:?}: {err}");
                return;
            }
        };
        let Some(logo_top) = logo.main_top_cell() else {
            warn!("logo {path:?} has no top cell");
            return;
        };
        let name = logo.cell(logo_top).name().clone();
        let copied = lib.copy_tree_from(&logo, logo_top, name);
        let corner = Point::new(-self.config.die_width / 2, -self.config.die_height / 2);
        lib.place(top, copied, corner, Rotation::R0);
        debug!("placed logo from {path:?}");
    }

    /// Lowest laser top to highest laser bottom along the left die edge.
    fn ground_wire(&self, lib: &mut Library, top: CellKey) -> Result<()> {
        let Some(laser) = lib.cell_by_name(&laser_name(self.config.wavelength)) else {
            return Ok(());
        };
        let outline = lib.bbox(laser);
        let boxes: Vec<Bbox> = crate::layout::reference::placements_of(lib, top, laser)
            .into_iter()
            .map(|t| outline.transform(t))
            .collect();
        let (Some(low_top), Some(high_bottom)) = (
            boxes.iter().map(|b| b.p1.y).min(),
            boxes.iter().map(|b| b.p0.y).max(),
        ) else {
            return Ok(());
        };
        let width = self.config.ground_wire_width;
        let x = -self.config.die_width / 2 + width / 2;
        let layer = self.layer(LayerRole::DeepTrench)?;
        lib.cell_mut(top).draw(
            layer,
            Path::new(vec![Point::new(x, low_top), Point::new(x, high_bottom)], width),
        );
        Ok(())
    }

    fn place_circuit(
        &self,
        lib: &mut Library,
        top: CellKey,
        sub: &Submission,
        y_offset: i64,
    ) -> Result<()> {
        let cfg = self.config;
        let cell = lib.create_cell(format!("piclet_{}_{}", sub.handle, cfg.wavelength));
        lib.place(top, cell, Point::zero(), Rotation::R0);
        let center_y = cfg.laser_start_y + y_offset;

        let (laser, heater) = self.laser_and_heater(lib, cell, center_y)?;
        let mut circuit = Circuit {
            lib,
            cell,
            spec: self.pdk.waveguide(cfg.wavelength),
            laser,
            heater,
            center_y,
        };
        self.bond_pads(&mut circuit)?;

        let design = circuit
            .lib
            .copy_tree_from(&sub.lib, sub.top, format!("submission_{}", sub.handle));
        match find_port_marker(circuit.lib, design, &cfg.port_marker_pattern) {
            Some(marker) => {
                debug!(
                    "port marker {} in {} at y = {}",
                    circuit.lib.cell(marker.cell).name(),
                    sub.file_name(),
                    marker.y
                );
                circuit.lib.cell_mut(marker.cell).add_pin(Pin::new(
                    LASER_PIN,
                    Point::zero(),
                    Rotation::R180,
                    circuit.spec.width,
                ));
                self.connect_with_reference(&mut circuit, sub, design)
            }
            None => {
                warn!(
                    "no {} port marker in {}; connecting at the design's horizontal midpoint",
                    cfg.port_marker_pattern,
                    sub.file_name()
                );
                self.connect_with_fallback(&mut circuit, design)
            }
        }
    }

    fn laser_and_heater(
        &self,
        lib: &mut Library,
        cell: CellKey,
        center_y: i64,
    ) -> Result<(InstRef, InstRef)> {
        let spec = self.pdk.waveguide(self.config.wavelength);
        let laser_cell = self.component(lib, &laser_name(self.config.wavelength))?;
        let left_edge = -self.config.die_width / 2;
        let laser_x = left_edge - lib.bbox(laser_cell).p0.x;
        let laser = lib.place(cell, laser_cell, Point::new(laser_x, center_y), Rotation::R0);

        let heater_cell = self.component(lib, HEATER)?;
        let heater = lib.connect_cell(&laser, "opt1", heater_cell, "opt1")?;
        let placed = lib.try_inst_mut(&heater)?;
        let loc = placed.loc();
        placed.set_loc(loc + Point::new(HEATER_SHIFT, 0));

        let from = lib.inst_pin(&laser, "opt1")?;
        let to = lib.inst_pin(&heater, "opt1")?;
        self.router.route(lib, cell, &from, &to, &spec)?;
        Ok((laser, heater))
    }

    /// Laser contact and ground pads, two heater pads above them, and the
    /// metal between them.
    fn bond_pads(&self, c: &mut Circuit) -> Result<()> {
        let pad = self.component(c.lib, BOND_PAD)?;
        let metal = self.layer(LayerRole::Metal)?;
        let pad_box = c.lib.bbox(pad);
        let laser_box = c.lib.inst_bbox(c.lib.try_inst(&c.laser)?);
        let laser_x = c.lib.try_inst(&c.laser)?.loc().x;

        let pads_x = laser_box.p0.x
            + pad_box.width() / 2
            + self.config.ground_wire_width
            + self.config.trench_bondpad_offset;
        let mut pads_y = laser_box.p1.y + LASER_PAD_DISTANCE + pad_box.height() / 2;

        let contact = c.lib.place(
            c.cell,
            pad,
            Point::new(laser_x + self.config.laser_contact_x, pads_y),
            Rotation::R0,
        );
        let ground = c.lib.place(c.cell, pad, Point::new(pads_x, pads_y), Rotation::R0);
        let from = c.lib.inst_pin(&contact, "m_pin_left")?.loc;
        let to = c.lib.inst_pin(&ground, "m_pin_right")?.loc;
        c.lib
            .cell_mut(c.cell)
            .draw(metal, Path::new(vec![from, to], METAL_WIDTH));

        for elec in ["elec1", "elec2"] {
            pads_y += PAD_PITCH;
            let pad_inst = c.lib.place(c.cell, pad, Point::new(pads_x, pads_y), Rotation::R0);
            let start = c.lib.inst_pin(&pad_inst, "m_pin_right")?.loc;
            let end = c.lib.inst_pin(&c.heater, elec)?.loc;
            c.lib.cell_mut(c.cell).draw(
                metal,
                Path::new(vec![start, Point::new(end.x, start.y), end], METAL_WIDTH),
            );
        }
        Ok(())
    }

    /// Builds a splitter tree after the heater and feeds it from the heater output.
    fn splitter_tree(&self, c: &mut Circuit, depth: u32) -> Result<(InstRef, SplitterTree)> {
        let branch = self.component(c.lib, Y_BRANCH)?;
        let tree = y_splitter_tree(
            c.lib,
            branch,
            depth,
            self.config.tree_dx,
            self.config.tree_dy,
            self.router,
            &c.spec,
        )?;
        let heater_right = c.lib.inst_bbox(c.lib.try_inst(&c.heater)?).p1.x;
        let heater_out = c.lib.inst_pin(&c.heater, "opt2")?;
        let placed = c.lib.place(
            c.cell,
            tree.cell,
            Point::new(heater_right, heater_out.loc.y),
            Rotation::R0,
        );
        let tree_in = c.lib.pin_through(&[placed, tree.input], "opt1")?;
        self.router
            .route(c.lib, c.cell, &heater_out, &tree_in, &c.spec)?;
        Ok((placed, tree))
    }

    /// Connects `design` to output `out` of the first last-level branch, lifts
    /// it into the circuit cell, shifts it by `shift` and routes the link.
    fn attach(
        &self,
        c: &mut Circuit,
        tree: (&InstRef, &SplitterTree),
        out: &str,
        design: CellKey,
        shift: Point,
    ) -> Result<InstRef> {
        let (placed, tree) = tree;
        let branch = tree
            .outputs
            .first()
            .ok_or_else(|| LayoutError::msg("splitter tree has no outputs"))?;
        let inst = c.lib.connect_cell(branch, out, design, LASER_PIN)?;
        let inst = c.lib.move_up(&inst, 1)?;
        let moved = c.lib.try_inst_mut(&inst)?;
        let loc = moved.loc();
        moved.set_loc(loc + shift);
        self.route_to(c, placed, branch, out, &inst)?;
        Ok(inst)
    }

    fn route_to(
        &self,
        c: &mut Circuit,
        placed: &InstRef,
        branch: &InstRef,
        out: &str,
        design: &InstRef,
    ) -> Result<()> {
        let from = c.lib.pin_through(&[*placed, *branch], out)?;
        let to = c.lib.inst_pin(design, LASER_PIN)?;
        self.router.route(c.lib, c.cell, &from, &to, &c.spec)?;
        Ok(())
    }

    /// The design and its reference copy on the two outputs of a one-level tree.
    fn connect_with_reference(
        &self,
        c: &mut Circuit,
        sub: &Submission,
        design: CellKey,
    ) -> Result<()> {
        let cfg = self.config;
        let radius = c.spec.radius;
        let (placed, tree) = self.splitter_tree(c, 1)?;
        self.attach(
            c,
            (&placed, &tree),
            "opt2",
            design,
            Point::new(2 * radius, cfg.submission_gc_dy),
        )?;

        let copy_name = format!("{}_copy", sub.lib.cell(sub.top).name());
        let copy = c.lib.copy_tree_from(&sub.lib, sub.top, copy_name);
        let flattened = flatten_arrays(c.lib, copy);
        if flattened > 0 {
            debug!("flattened {flattened} array(s) in the reference copy");
        }
        let reference = self.component(c.lib, &cfg.reference_component)?;
        let replaced = substitute_couplers(
            c.lib,
            copy,
            &Substitution {
                pattern: cfg.coupler_pattern.clone(),
                replacement: reference,
                align_pin: cfg.reference_pin.clone(),
            },
        );
        info!(
            "replaced {} coupler(s) in the reference copy of {}",
            replaced.len(),
            sub.file_name()
        );

        let marker = find_port_marker(c.lib, copy, &cfg.port_marker_pattern).ok_or_else(|| {
            LayoutError::msg(format!(
                "reference copy of {} lost its port marker",
                sub.file_name()
            ))
        })?;
        c.lib.cell_mut(marker.cell).add_pin(Pin::new(
            LASER_PIN,
            Point::zero(),
            Rotation::R180,
            c.spec.width,
        ));

        let height = sub.lib.bbox(sub.top).height();
        let branch = *tree
            .outputs
            .first()
            .ok_or_else(|| LayoutError::msg("splitter tree has no outputs"))?;
        let inst = c.lib.connect_cell(&branch, "opt3", copy, LASER_PIN)?;
        let inst = c.lib.move_up(&inst, 1)?;
        let moved = c.lib.try_inst_mut(&inst)?;
        let loc = moved.loc();
        moved.set_loc(loc + Point::new(2 * radius, cfg.submission_gc_dy - height));

        if replaced.is_empty() {
            warn!("no couplers to align in the reference copy of {}", sub.file_name());
        } else {
            let shift = align_to_boundary(c.lib, &inst, reference, cfg.die_width / 2)?;
            debug!("shifted reference copy by {shift} to the die edge");
        }
        self.route_to(c, &placed, &branch, "opt3", &inst)
    }

    /// No port marker: feed the design's midpoint and a standalone reference
    /// component at the right die edge from a two-level tree.
    fn connect_with_fallback(&self, c: &mut Circuit, design: CellKey) -> Result<()> {
        let cfg = self.config;
        let bbox = c.lib.bbox(design);
        c.lib.cell_mut(design).add_pin(Pin::new(
            LASER_PIN,
            Point::new(bbox.width() / 2, 0),
            Rotation::R0,
            c.spec.width,
        ));

        let (placed, tree) = self.splitter_tree(c, 2)?;
        let radius = c.spec.radius;
        self.attach(
            c,
            (&placed, &tree),
            "opt2",
            design,
            Point::new(2 * radius, cfg.submission_gc_dy),
        )?;

        let reference = self.component(c.lib, &cfg.reference_component)?;
        let faml = c.lib.place(
            c.cell,
            reference,
            Point::new(cfg.die_width / 2, c.center_y),
            Rotation::R180,
        );
        let branch = *tree
            .outputs
            .first()
            .ok_or_else(|| LayoutError::msg("splitter tree has no outputs"))?;
        let from = c.lib.pin_through(&[placed, branch], "opt3")?;
        let to = c.lib.inst_pin(&faml, &cfg.reference_pin)?;
        self.router.route(c.lib, c.cell, &from, &to, &c.spec)?;
        Ok(())
    }
}
