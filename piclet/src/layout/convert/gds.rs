//! Utilities for GDS conversion.
//!
//! Converts between the layout database and [`gds21`] structures.
//!
//! Pins are stored as a two-point path on the pin-recognition layer, spanning
//! the pin along its facing direction, plus a text label carrying the pin name
//! at the path midpoint.

use std::collections::{HashMap, HashSet};
use std::convert::{TryFrom, TryInto};

use arcstr::ArcStr;
use derivative::Derivative;
use picgeom::orientation::{Orientation, Rotation};
use picgeom::{Path, Point, Polygon, Rect, Shape};

use super::error::{ConvErrors, Frame};
use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::layout::cell::{ArrayParams, Cell, CellKey, Element, Instance, Pin, TextElement};
use crate::layout::error::{LayoutError, LayoutResult};
use crate::layout::layers::{LayerRole, LayerSpec, Layers};
use crate::layout::library::Library;
use crate::log::warn;

/// Length of the path used to mark a pin in GDS.
pub const PIN_MARKER_LENGTH: i64 = 20;

#[derive(Debug, Clone, Default)]
enum ExportSet {
    #[default]
    All,
    Set(HashSet<CellKey>),
}

impl ExportSet {
    #[inline]
    fn contains(&self, key: &CellKey) -> bool {
        match self {
            Self::All => true,
            Self::Set(s) => s.contains(key),
        }
    }

    fn for_top(lib: &Library, top: CellKey) -> Self {
        Self::Set(lib.subtree(top).into_iter().collect())
    }
}

/// A GDSII exporter.
///
/// Converts a [`Library`] to a GDSII library ([`gds21::GdsLibrary`]).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct GdsExporter<'a> {
    #[derivative(Debug = "ignore")]
    lib: &'a Library,
    pin_layer: Option<LayerSpec>,
    backtrace: Vec<Frame>,
    export_set: ExportSet,
}

/// A GDSII importer.
///
/// Imports cells from a [`gds21::GdsLibrary`] into a new [`Library`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct GdsImporter {
    #[derivative(Debug = "ignore")]
    lib: Library,
    pin_layer: Option<LayerSpec>,
    backtrace: Vec<Frame>,
    unsupported: Vec<gds21::GdsElement>,
    cell_map: HashMap<String, CellKey>,
}

/// Additional [`Library`] methods for GDSII conversion.
impl Library {
    /// Converts every cell of the library to a GDSII library.
    pub fn to_gds_lib(&self, layers: &Layers) -> Result<gds21::GdsLibrary> {
        let inner = || -> Result<gds21::GdsLibrary> {
            Ok(GdsExporter::new(self, layers, ExportSet::All)
                .export_lib()
                .map_err(ErrorSource::Layout)?)
        };
        with_err_context(inner(), || {
            ErrorContext::Task(arcstr::literal!("converting library to GDS"))
        })
    }

    /// Converts `top` and everything it instantiates to a GDSII library.
    pub fn to_gds_lib_with_top(&self, top: CellKey, layers: &Layers) -> Result<gds21::GdsLibrary> {
        let inner = || -> Result<gds21::GdsLibrary> {
            Ok(
                GdsExporter::new(self, layers, ExportSet::for_top(self, top))
                    .export_lib()
                    .map_err(ErrorSource::Layout)?,
            )
        };
        with_err_context(inner(), || {
            ErrorContext::Task(arcstr::literal!("converting top cell to GDS"))
        })
    }

    /// Saves the library to a GDS file.
    pub fn save_gds(&self, path: impl AsRef<std::path::Path>, layers: &Layers) -> Result<()> {
        let path = path.as_ref();
        let inner = || -> Result<()> {
            self.to_gds_lib(layers)?
                .save(path)
                .map_err(LayoutError::from)
                .map_err(ErrorSource::Layout)?;
            Ok(())
        };
        with_err_context(inner(), || ErrorContext::CreateFile(path.to_path_buf()))
    }

    /// Saves `top` and its dependencies to a GDS file.
    pub fn save_gds_with_top(
        &self,
        top: CellKey,
        path: impl AsRef<std::path::Path>,
        layers: &Layers,
    ) -> Result<()> {
        let path = path.as_ref();
        let inner = || -> Result<()> {
            self.to_gds_lib_with_top(top, layers)?
                .save(path)
                .map_err(LayoutError::from)
                .map_err(ErrorSource::Layout)?;
            Ok(())
        };
        with_err_context(inner(), || ErrorContext::CreateFile(path.to_path_buf()))
    }

    /// Creates a library from the structs of a GDSII library.
    pub fn from_gds_lib(gdslib: &gds21::GdsLibrary, layers: &Layers) -> Result<Library> {
        let mut importer = GdsImporter::new(&gdslib.name, layers);
        importer
            .import_all(gdslib)
            .map_err(ErrorSource::Layout)?;
        let GdsImporter {
            lib, unsupported, ..
        } = importer;
        if !unsupported.is_empty() {
            warn!(
                "skipped {} unsupported GDS element(s) in {}",
                unsupported.len(),
                gdslib.name
            );
        }
        Ok(lib)
    }

    /// Reads a library from a GDS file.
    pub fn from_gds(path: impl AsRef<std::path::Path>, layers: &Layers) -> Result<Library> {
        let path = path.as_ref();
        let inner = || -> Result<Library> {
            let gdslib = gds21::GdsLibrary::load(path)
                .map_err(LayoutError::from)
                .map_err(ErrorSource::Layout)?;
            Library::from_gds_lib(&gdslib, layers)
        };
        with_err_context(inner(), || ErrorContext::ReadFile(path.to_path_buf()))
    }
}

impl<'a> GdsExporter<'a> {
    fn new(lib: &'a Library, layers: &Layers, export_set: ExportSet) -> Self {
        Self {
            lib,
            pin_layer: layers.role(LayerRole::PinRec).ok(),
            backtrace: Vec::new(),
            export_set,
        }
    }

    /// Exports to a [`gds21::GdsLibrary`].
    fn export_lib(&mut self) -> LayoutResult<gds21::GdsLibrary> {
        self.backtrace.push(Frame::Library);
        let mut gdslib = gds21::GdsLibrary::new(self.lib.name().to_string());
        // 1 dbu = 1 nm, user unit = 1 um.
        gdslib.units = gds21::GdsUnits::new(1e-3, 1e-9);
        let lib = self.lib;
        for cell in lib.cells() {
            if !self.export_set.contains(&cell.id()) {
                continue;
            }
            let strukt = self.export_cell(cell)?;
            gdslib.structs.push(strukt);
        }
        self.backtrace.pop();
        Ok(gdslib)
    }

    /// Converts a [`Cell`] to a [`gds21::GdsStruct`] cell definition.
    fn export_cell(&mut self, cell: &Cell) -> LayoutResult<gds21::GdsStruct> {
        self.backtrace.push(Frame::Cell(cell.name().clone()));

        let mut elems = Vec::new();
        for inst in cell.insts() {
            elems.push(self.export_instance(inst)?);
        }

        self.backtrace.push(Frame::Geometry);
        for elem in cell.elems() {
            elems.push(self.export_element(elem)?);
        }
        self.backtrace.pop();

        self.backtrace.push(Frame::Annotations);
        for annotation in cell.annotations() {
            elems.push(self.export_annotation(annotation)?);
        }
        self.backtrace.pop();

        self.backtrace.push(Frame::Pins);
        for pin in cell.pins() {
            elems.extend(self.export_pin(pin)?);
        }
        self.backtrace.pop();

        let mut strukt = gds21::GdsStruct::new(cell.name().to_string());
        strukt.elems = elems;

        self.backtrace.pop();
        Ok(strukt)
    }

    /// Converts an [`Instance`] to a GDS struct or array reference.
    fn export_instance(&mut self, inst: &Instance) -> LayoutResult<gds21::GdsElement> {
        self.backtrace
            .push(Frame::Instance(inst.name().clone()));
        let name = self.lib.cell(inst.cell()).name().to_string();
        let strans = export_orientation(inst.orientation());
        let elem = match inst.array() {
            None => gds21::GdsStructRef {
                name,
                xy: self.export_point(&inst.loc())?,
                strans,
                ..Default::default()
            }
            .into(),
            Some(array) => {
                let origin = inst.loc();
                let cols = i16::try_from(array.cols)?;
                let rows = i16::try_from(array.rows)?;
                gds21::GdsArrayRef {
                    name,
                    xy: [
                        self.export_point(&origin)?,
                        self.export_point(&(origin + array.col_step.scaled(array.cols as i64)))?,
                        self.export_point(&(origin + array.row_step.scaled(array.rows as i64)))?,
                    ],
                    cols,
                    rows,
                    strans,
                    ..Default::default()
                }
                .into()
            }
        };
        self.backtrace.pop();
        Ok(elem)
    }

    /// Converts an [`Element`] into a [`gds21::GdsElement`].
    pub fn export_element(&mut self, elem: &Element) -> LayoutResult<gds21::GdsElement> {
        let layerspec: gds21::GdsLayerSpec = elem.layer.into();
        self.export_shape(&elem.inner, &layerspec)
    }

    /// Converts a [`Shape`] to a [`gds21::GdsElement`].
    ///
    /// GDS boundaries include an explicit repetition of their origin for closure,
    /// so an N-sided polygon is described by a (N+1)-point vector.
    pub fn export_shape(
        &mut self,
        shape: &Shape,
        layerspec: &gds21::GdsLayerSpec,
    ) -> LayoutResult<gds21::GdsElement> {
        let elem = match shape {
            Shape::Rect(r) => {
                let (p0, p1) = (&r.p0, &r.p1);
                let x0 = p0.x.try_into()?;
                let y0 = p0.y.try_into()?;
                let x1 = p1.x.try_into()?;
                let y1 = p1.y.try_into()?;
                let xy = gds21::GdsPoint::vec(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]);
                gds21::GdsBoundary {
                    layer: layerspec.layer,
                    datatype: layerspec.xtype,
                    xy,
                    ..Default::default()
                }
                .into()
            }
            Shape::Polygon(poly) => {
                let first = self.require(poly.points.first(), "empty polygon")?;
                let mut xy = poly
                    .points
                    .iter()
                    .map(|p| self.export_point(p))
                    .collect::<LayoutResult<Vec<_>>>()?;
                xy.push(self.export_point(first)?);
                gds21::GdsBoundary {
                    layer: layerspec.layer,
                    datatype: layerspec.xtype,
                    xy,
                    ..Default::default()
                }
                .into()
            }
            Shape::Path(path) => {
                let xy = path
                    .points
                    .iter()
                    .map(|p| self.export_point(p))
                    .collect::<LayoutResult<Vec<_>>>()?;
                gds21::GdsPath {
                    layer: layerspec.layer,
                    datatype: layerspec.xtype,
                    width: Some(i32::try_from(path.width)?),
                    xy,
                    ..Default::default()
                }
                .into()
            }
        };
        Ok(elem)
    }

    /// Converts a [`TextElement`] to a [`gds21::GdsElement`].
    pub fn export_annotation(
        &mut self,
        text_elem: &TextElement,
    ) -> LayoutResult<gds21::GdsElement> {
        Ok(gds21::GdsTextElem {
            string: text_elem.string.to_string(),
            layer: text_elem.layer.layer(),
            texttype: text_elem.layer.datatype(),
            xy: self.export_point(&text_elem.loc)?,
            strans: None,
            ..Default::default()
        }
        .into())
    }

    /// Converts a [`Pin`] to its marker path and label.
    fn export_pin(&mut self, pin: &Pin) -> LayoutResult<[gds21::GdsElement; 2]> {
        let spec: gds21::GdsLayerSpec = self
            .require(
                self.pin_layer,
                format!("no pin-recognition layer to export pin {}", pin.name),
            )?
            .into();
        let marker = self.export_shape(&Shape::Path(pin.marker(PIN_MARKER_LENGTH)), &spec)?;
        let label = gds21::GdsTextElem {
            string: pin.name.to_string(),
            layer: spec.layer,
            texttype: spec.xtype,
            xy: self.export_point(&pin.loc)?,
            strans: None,
            ..Default::default()
        }
        .into();
        Ok([marker, label])
    }

    /// Convert a [`Point`] to a GDS21 [`gds21::GdsPoint`].
    pub fn export_point(&mut self, pt: &Point) -> LayoutResult<gds21::GdsPoint> {
        let x = pt.x.try_into()?;
        let y = pt.y.try_into()?;
        Ok(gds21::GdsPoint::new(x, y))
    }
}

impl ConvErrors for GdsExporter<'_> {
    type Error = LayoutError;
    fn err(&self, msg: impl Into<String>) -> LayoutError {
        LayoutError::Export {
            message: msg.into(),
            stack: self.backtrace.clone(),
        }
    }
}

fn export_orientation(orientation: Orientation) -> Option<gds21::GdsStrans> {
    if orientation == Orientation::default() {
        return None;
    }
    let angle = orientation.rotation.degrees();
    Some(gds21::GdsStrans {
        reflected: orientation.reflect_vert,
        angle: if angle == 0. { None } else { Some(angle) },
        ..Default::default()
    })
}

/// A helper for retrieving GDS dependencies in reverse topological order.
///
/// Each item in the ordered return value is guaranteed *not* to instantiate
/// any item which comes later, unless the references form a cycle.
#[derive(Debug)]
pub struct GdsDepOrder<'a> {
    strukts: HashMap<&'a str, &'a gds21::GdsStruct>,
    stack: Vec<&'a gds21::GdsStruct>,
    seen: HashSet<&'a str>,
}

impl<'a> GdsDepOrder<'a> {
    /// Creates a new [`GdsDepOrder`] for a [`gds21::GdsLibrary`].
    fn new(gdslib: &'a gds21::GdsLibrary) -> Self {
        let strukts = gdslib
            .structs
            .iter()
            .map(|s| (s.name.as_str(), s))
            .collect();
        Self {
            strukts,
            stack: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Returns a reverse topological sort of all structs in `gdslib`.
    fn total_order(mut self, gdslib: &'a gds21::GdsLibrary) -> Vec<&'a gds21::GdsStruct> {
        for s in gdslib.structs.iter() {
            self.push(s)
        }
        self.stack
    }

    /// Adds all of `strukt`'s dependencies, and then `strukt` itself, to the stack.
    fn push(&mut self, strukt: &'a gds21::GdsStruct) {
        if !self.seen.insert(strukt.name.as_str()) {
            return;
        }
        for elem in &strukt.elems {
            use gds21::GdsElement::*;
            let dep = match elem {
                GdsStructRef(ref x) => self.strukts.get(x.name.as_str()).copied(),
                GdsArrayRef(ref x) => self.strukts.get(x.name.as_str()).copied(),
                _ => None,
            };
            if let Some(dep) = dep {
                self.push(dep);
            }
        }
        self.stack.push(strukt);
    }
}

impl GdsImporter {
    /// Creates a new [`GdsImporter`].
    fn new(name: &str, layers: &Layers) -> Self {
        GdsImporter {
            lib: Library::new(name),
            pin_layer: layers.role(LayerRole::PinRec).ok(),
            backtrace: Vec::new(),
            unsupported: Vec::new(),
            cell_map: HashMap::new(),
        }
    }

    /// Imports a [`gds21::GdsLibrary`].
    fn import_all(&mut self, gdslib: &gds21::GdsLibrary) -> LayoutResult<()> {
        self.backtrace.push(Frame::Library);
        self.check_units(&gdslib.units)?;
        for strukt in GdsDepOrder::new(gdslib).total_order(gdslib) {
            self.import_and_add(strukt)?;
        }
        self.backtrace.pop();
        Ok(())
    }

    /// Checks that the database unit is one nanometer.
    fn check_units(&mut self, units: &gds21::GdsUnits) -> LayoutResult<()> {
        self.backtrace.push(Frame::Units);
        let gdsunit = units.db_unit();
        if (gdsunit - 1e-9).abs() >= 1e-12 {
            return self.fail(format!("Unsupported GDSII Units {gdsunit:10.3e}"));
        }
        self.backtrace.pop();
        Ok(())
    }

    /// Imports and adds a cell if not already defined.
    fn import_and_add(&mut self, strukt: &gds21::GdsStruct) -> LayoutResult<()> {
        let name = &strukt.name;
        if self.cell_map.contains_key(name) {
            return self.fail(format!("Cell {name} defined multiple times in GDS file"));
        }
        let key = self.lib.create_cell(name.as_str());
        self.import_cell(strukt, key)?;
        self.cell_map.insert(name.clone(), key);
        Ok(())
    }

    /// Imports a GDS Cell ([`gds21::GdsStruct`]) into the cell at `key`.
    fn import_cell(&mut self, strukt: &gds21::GdsStruct, key: CellKey) -> LayoutResult<()> {
        self.backtrace
            .push(Frame::Cell(ArcStr::from(strukt.name.as_str())));
        // Pass one collects instances and geometry, setting aside texts
        // and candidate pin markers.
        let mut texts: Vec<&gds21::GdsTextElem> = Vec::new();
        let mut markers: Vec<Option<Element>> = Vec::new();
        let mut elems = Vec::new();
        let mut insts = Vec::new();
        for elem in &strukt.elems {
            use gds21::GdsElement::*;
            let e = match elem {
                GdsBoundary(ref x) => Some(self.import_boundary(x)?),
                GdsPath(ref x) => Some(self.import_path(x)?),
                GdsBox(ref x) => Some(self.import_box(x)?),
                GdsArrayRef(ref x) => {
                    insts.push(self.import_instance_array(x)?);
                    None
                }
                GdsStructRef(ref x) => {
                    insts.push(self.import_instance(x)?);
                    None
                }
                GdsTextElem(ref x) => {
                    texts.push(x);
                    None
                }
                GdsNode(ref x) => {
                    self.unsupported.push(x.clone().into());
                    None
                }
            };
            if let Some(e) = e {
                let is_marker = Some(e.layer) == self.pin_layer
                    && e.inner.as_path().map(|p| p.points.len() == 2).unwrap_or(false);
                if is_marker {
                    markers.push(Some(e));
                } else {
                    elems.push(e);
                }
            }
        }

        // Pass two pairs each pin-layer text with the marker centered on it.
        // Unclaimed texts become annotations and unclaimed markers plain geometry.
        self.backtrace.push(Frame::Pins);
        let mut pins = Vec::new();
        let mut annotations = Vec::new();
        for textelem in texts {
            let text = self.import_text_elem(textelem)?;
            let claimed = if Some(text.layer) == self.pin_layer {
                markers.iter_mut().find_map(|slot| {
                    let pin = slot
                        .as_ref()
                        .and_then(|e| e.inner.as_path())
                        .and_then(|p| Pin::from_marker(text.string.clone(), p))
                        .filter(|pin| pin.loc == text.loc)?;
                    *slot = None;
                    Some(pin)
                })
            } else {
                None
            };
            match claimed {
                Some(pin) => pins.push(pin),
                None => annotations.push(text),
            }
        }
        elems.extend(markers.into_iter().flatten());
        self.backtrace.pop();

        for inst in insts {
            self.lib.add_inst(key, inst);
        }
        let cell = self.lib.cell_mut(key);
        cell.add_elements(elems);
        for text in annotations {
            cell.add_annotation(text);
        }
        for pin in pins {
            cell.add_pin(pin);
        }
        self.backtrace.pop();
        Ok(())
    }

    /// Imports a [`gds21::GdsBoundary`] into an [`Element`].
    fn import_boundary(&mut self, x: &gds21::GdsBoundary) -> LayoutResult<Element> {
        self.backtrace.push(Frame::Geometry);
        let mut pts: Vec<Point> = self.import_point_vec(&x.xy)?;
        if pts.len() < 2 || pts.first() != pts.last() {
            return self.fail("GDS Boundary must start and end at the same point");
        }
        pts.pop();
        let inner = if pts.len() == 4
            && ((pts[0].x == pts[1].x // Clockwise
                && pts[1].y == pts[2].y
                && pts[2].x == pts[3].x
                && pts[3].y == pts[0].y)
                || (pts[0].y == pts[1].y // Counter-clockwise
                    && pts[1].x == pts[2].x
                    && pts[2].y == pts[3].y
                    && pts[3].x == pts[0].x))
        {
            Shape::Rect(Rect::new(pts[0], pts[2]))
        } else {
            Shape::Polygon(Polygon { points: pts })
        };
        let layer = LayerSpec(x.layer, x.datatype);
        self.backtrace.pop();
        Ok(Element::new(layer, inner))
    }

    /// Imports a [`gds21::GdsBox`] into an [`Element`].
    fn import_box(&mut self, x: &gds21::GdsBox) -> LayoutResult<Element> {
        self.backtrace.push(Frame::Geometry);
        // The first and third of the five box coordinates are opposite corners.
        let inner = Shape::Rect(Rect::new(
            self.import_point(&x.xy[0])?,
            self.import_point(&x.xy[2])?,
        ));
        let layer = LayerSpec(x.layer, x.boxtype);
        self.backtrace.pop();
        Ok(Element::new(layer, inner))
    }

    /// Imports a [`gds21::GdsPath`] into an [`Element`].
    fn import_path(&mut self, x: &gds21::GdsPath) -> LayoutResult<Element> {
        self.backtrace.push(Frame::Geometry);
        let points = self.import_point_vec(&x.xy)?;
        let width = match x.width {
            Some(w) => i64::from(w),
            None => return self.fail("Invalid nonspecifed GDS Path width "),
        };
        let layer = LayerSpec(x.layer, x.datatype);
        self.backtrace.pop();
        Ok(Element::new(layer, Path::new(points, width)))
    }

    /// Imports a [`gds21::GdsTextElem`] into a [`TextElement`].
    fn import_text_elem(&mut self, text: &gds21::GdsTextElem) -> LayoutResult<TextElement> {
        let string = ArcStr::from(text.string.as_str());
        let loc = self.import_point(&text.xy)?;
        Ok(TextElement {
            string,
            loc,
            layer: LayerSpec(text.layer, text.texttype),
        })
    }

    /// Imports a [`gds21::GdsStructRef`] into an [`Instance`].
    fn import_instance(&mut self, sref: &gds21::GdsStructRef) -> LayoutResult<Instance> {
        self.backtrace
            .push(Frame::Instance(ArcStr::from(sref.name.as_str())));
        let cell = *self.require(
            self.cell_map.get(&sref.name),
            format!("Instance of invalid cell {}", sref.name),
        )?;
        let mut inst = Instance::new(sref.name.as_str(), cell);
        inst.set_loc(self.import_point(&sref.xy)?);
        if let Some(strans) = &sref.strans {
            inst.set_orientation(self.import_orientation(strans)?);
        }
        self.backtrace.pop();
        Ok(inst)
    }

    /// Imports a [`gds21::GdsArrayRef`] as a single array [`Instance`].
    ///
    /// GDSII arrays are described by three points: the origin, the origin
    /// displaced by `cols` column steps, and the origin displaced by `rows`
    /// row steps, all in the parent frame.
    fn import_instance_array(&mut self, aref: &gds21::GdsArrayRef) -> LayoutResult<Instance> {
        self.backtrace
            .push(Frame::Array(ArcStr::from(aref.name.as_str())));
        let cell = *self.require(
            self.cell_map.get(&aref.name),
            format!("Instance Array of invalid cell {}", aref.name),
        )?;
        self.ensure(
            aref.cols > 0 && aref.rows > 0,
            "GDS Array must have at least one row and column",
        )?;

        let p0 = self.import_point(&aref.xy[0])?;
        let p1 = self.import_point(&aref.xy[1])?;
        let p2 = self.import_point(&aref.xy[2])?;
        let (cols, rows) = (i64::from(aref.cols), i64::from(aref.rows));
        let col_span = p1 - p0;
        let row_span = p2 - p0;
        let col_step = Point::new(col_span.x / cols, col_span.y / cols);
        let row_step = Point::new(row_span.x / rows, row_span.y / rows);

        let mut inst = Instance::new(aref.name.as_str(), cell);
        inst.set_loc(p0);
        if let Some(strans) = &aref.strans {
            inst.set_orientation(self.import_orientation(strans)?);
        }
        inst.array = Some(ArrayParams {
            rows: aref.rows as usize,
            cols: aref.cols as usize,
            row_step,
            col_step,
        });
        self.backtrace.pop();
        Ok(inst)
    }

    /// Imports a [`Point`].
    fn import_point(&self, pt: &gds21::GdsPoint) -> LayoutResult<Point> {
        Ok(Point::new(pt.x.into(), pt.y.into()))
    }

    /// Imports a vector of [`Point`]s.
    fn import_point_vec(&mut self, pts: &[gds21::GdsPoint]) -> LayoutResult<Vec<Point>> {
        pts.iter()
            .map(|p| self.import_point(p))
            .collect::<LayoutResult<Vec<_>>>()
    }

    /// Imports an orientation.
    fn import_orientation(&mut self, strans: &gds21::GdsStrans) -> LayoutResult<Orientation> {
        if strans.abs_mag || strans.abs_angle {
            return self.fail("Unsupported GDSII Instance Feature: Absolute Magnitude/ Angle");
        }
        if strans.mag.map(|m| (m - 1.).abs() > 1e-9).unwrap_or(false) {
            return self.fail("Unsupported GDSII Setting: Magnitude");
        }
        let rotation = self.require(
            Rotation::from_degrees(strans.angle.unwrap_or(0.)),
            "Unsupported non-Manhattan GDSII rotation",
        )?;
        Ok(Orientation::new(strans.reflected, rotation))
    }
}

impl ConvErrors for GdsImporter {
    type Error = LayoutError;
    fn err(&self, msg: impl Into<String>) -> LayoutError {
        LayoutError::Import {
            message: msg.into(),
            stack: self.backtrace.clone(),
        }
    }
}
