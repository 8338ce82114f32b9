//! Types related to the creation and instantiation of [`Cell`]s.

use arcstr::ArcStr;
use derive_builder::Builder;
use picgeom::bbox::{Bbox, BoundBox};
use picgeom::orientation::{Orientation, Rotation};
use picgeom::transform::{Transform, Transformation, Translate};
use picgeom::{Path, Point, Shape};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use super::layers::LayerSpec;

new_key_type! {
    /// A unique identifier for cells.
    ///
    /// Keys are never reused within a [`Library`](super::library::Library),
    /// so they serve as stable identities for visited-sets.
    pub struct CellKey;
}

/// A unique identifier for an instance within a library.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct InstId(pub(crate) u64);

/// Addresses an instance by its parent cell and identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct InstRef {
    pub parent: CellKey,
    pub id: InstId,
}

/// The layout view of a cell.
#[derive(Debug, Default, Clone)]
pub struct Cell {
    /// The cell's identifier.
    pub(crate) id: CellKey,
    /// The cell's name.
    pub(crate) name: ArcStr,
    /// The instances contained in the cell, in insertion order.
    pub(crate) insts: Vec<Instance>,
    /// A list of primitive/geometric elements.
    pub(crate) elems: Vec<Element>,
    /// A list of text annotations.
    pub(crate) annotations: Vec<TextElement>,
    /// Optical and electrical connection points.
    pub(crate) pins: Vec<Pin>,
}

impl Cell {
    pub(crate) fn new(id: CellKey, name: impl Into<ArcStr>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn id(&self) -> CellKey {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn insts(&self) -> impl Iterator<Item = &Instance> {
        self.insts.iter()
    }

    #[inline]
    pub fn elems(&self) -> impl Iterator<Item = &Element> {
        self.elems.iter()
    }

    #[inline]
    pub fn annotations(&self) -> impl Iterator<Item = &TextElement> {
        self.annotations.iter()
    }

    #[inline]
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter()
    }

    /// Returns the pin named `name` placed directly on this cell.
    pub fn pin(&self, name: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.name.as_str() == name)
    }

    pub fn inst(&self, id: InstId) -> Option<&Instance> {
        self.insts.iter().find(|i| i.id == id)
    }

    pub(crate) fn inst_mut(&mut self, id: InstId) -> Option<&mut Instance> {
        self.insts.iter_mut().find(|i| i.id == id)
    }

    pub(crate) fn remove_inst(&mut self, id: InstId) -> Option<Instance> {
        let idx = self.insts.iter().position(|i| i.id == id)?;
        Some(self.insts.remove(idx))
    }

    /// Adds a geometric element.
    pub fn add<T>(&mut self, elem: T)
    where
        T: Into<Element>,
    {
        self.elems.push(elem.into());
    }

    pub fn add_elements(&mut self, elems: impl IntoIterator<Item = Element>) {
        self.elems.extend(elems);
    }

    /// Draws a shape on `layer`.
    pub fn draw(&mut self, layer: LayerSpec, shape: impl Into<Shape>) {
        self.elems.push(Element::new(layer, shape));
    }

    pub fn add_annotation(&mut self, text_elem: impl Into<TextElement>) {
        self.annotations.push(text_elem.into());
    }

    /// Adds a pin, replacing any existing pin with the same name.
    pub fn add_pin(&mut self, pin: Pin) {
        self.pins.retain(|p| p.name != pin.name);
        self.pins.push(pin);
    }

    /// Returns `true` if the cell contains no geometry, annotations, or instances.
    pub fn is_empty(&self) -> bool {
        self.insts.is_empty() && self.elems.is_empty() && self.annotations.is_empty()
    }

    /// Computes the bounding box of this cell's own elements, excluding instances.
    pub fn local_bbox(&self) -> Bbox {
        self.elems
            .iter()
            .fold(Bbox::empty(), |acc, elem| acc.union(elem.inner.bbox()))
    }
}

impl Translate for Cell {
    fn translate(&mut self, p: Point) {
        for inst in self.insts.iter_mut() {
            inst.translate(p);
        }
        for elem in self.elems.iter_mut() {
            elem.translate(p);
        }
        for ann in self.annotations.iter_mut() {
            ann.translate(p);
        }
        for pin in self.pins.iter_mut() {
            pin.loc.translate(p);
        }
    }
}

/// Regular-array placement parameters.
///
/// Element `(r, c)` sits at the instance location plus `r * row_step + c * col_step`.
/// Steps are expressed in the parent cell's frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ArrayParams {
    pub rows: usize,
    pub cols: usize,
    pub row_step: Point,
    pub col_step: Point,
}

impl ArrayParams {
    /// Number of placements described by the array.
    #[inline]
    pub fn count(&self) -> usize {
        self.rows * self.cols
    }

    /// Offset of element `(r, c)` from the array origin.
    #[inline]
    pub fn offset(&self, r: usize, c: usize) -> Point {
        self.row_step.scaled(r as i64) + self.col_step.scaled(c as i64)
    }

    /// Offsets of all elements, row-major.
    pub fn offsets(&self) -> impl Iterator<Item = (usize, usize, Point)> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| (r, c, self.offset(r, c))))
    }
}

/// An instance of a cell in a layout.
#[derive(Debug, Clone, Builder)]
pub struct Instance {
    /// Assigned by the library on insertion.
    #[builder(setter(skip))]
    pub(crate) id: InstId,
    /// The instance name.
    #[builder(default, setter(into))]
    pub(crate) name: ArcStr,
    /// The referenced cell.
    pub(crate) cell: CellKey,
    /// The location of the cell.
    #[builder(default)]
    pub(crate) loc: Point,
    /// The orientation of the cell.
    #[builder(default, setter(into))]
    pub(crate) orientation: Orientation,
    /// Regular-array repetition, if any.
    #[builder(default, setter(strip_option))]
    pub(crate) array: Option<ArrayParams>,
}

impl Instance {
    #[inline]
    pub fn builder() -> InstanceBuilder {
        InstanceBuilder::default()
    }

    /// Creates a single placement of `cell`.
    pub fn new(name: impl Into<ArcStr>, cell: CellKey) -> Self {
        Self {
            id: InstId::default(),
            name: name.into(),
            cell,
            loc: Point::zero(),
            orientation: Orientation::default(),
            array: None,
        }
    }

    #[inline]
    pub fn id(&self) -> InstId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn cell(&self) -> CellKey {
        self.cell
    }

    #[inline]
    pub fn loc(&self) -> Point {
        self.loc
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[inline]
    pub fn array(&self) -> Option<&ArrayParams> {
        self.array.as_ref()
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }

    /// Number of placements this instance stands for.
    pub fn placements(&self) -> usize {
        self.array.map(|a| a.count()).unwrap_or(1)
    }

    /// The transformation of the instance's first (or only) placement.
    pub fn transformation(&self) -> Transformation {
        Transformation::with_loc_and_orientation(self.loc, self.orientation)
    }

    /// Transformations of every placement, row-major for arrays.
    pub fn transformations(&self) -> Vec<Transformation> {
        let base = self.transformation();
        match self.array {
            Some(array) => array
                .offsets()
                .map(|(_, _, off)| base.translated(off))
                .collect(),
            None => vec![base],
        }
    }

    /// Replaces the placement transformation, keeping array steps as they are.
    pub fn set_transformation(&mut self, trans: Transformation) {
        self.loc = trans.offset_point();
        self.orientation = trans.orientation();
    }

    pub fn set_loc(&mut self, loc: Point) {
        self.loc = loc;
    }

    pub fn set_orientation(&mut self, orientation: impl Into<Orientation>) {
        self.orientation = orientation.into();
    }

    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = name.into();
    }
}

impl Translate for Instance {
    fn translate(&mut self, p: Point) {
        self.loc.translate(p);
    }
}

/// A primitive geometric element.
///
/// Combines a geometric [`Shape`] with a [`LayerSpec`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Element {
    /// The layer where the element is located.
    pub layer: LayerSpec,
    /// The element's shape.
    pub inner: Shape,
}

impl Element {
    pub fn new(layer: LayerSpec, shape: impl Into<Shape>) -> Self {
        Self {
            layer,
            inner: shape.into(),
        }
    }
}

impl BoundBox for Element {
    fn bbox(&self) -> Bbox {
        self.inner.bbox()
    }
}

impl Transform for Element {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            layer: self.layer,
            inner: self.inner.transform(trans),
        }
    }
}

impl Translate for Element {
    fn translate(&mut self, p: Point) {
        self.inner.translate(p);
    }
}

/// A text annotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextElement {
    /// The string value of the annotation.
    pub string: ArcStr,
    /// The location of the annotation
    pub loc: Point,
    /// The layer on which the annotation resides.
    pub layer: LayerSpec,
}

impl Translate for TextElement {
    fn translate(&mut self, p: Point) {
        self.loc.translate(p);
    }
}

impl Transform for TextElement {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            string: self.string.clone(),
            loc: self.loc.transform(trans),
            layer: self.layer,
        }
    }
}

/// A named connection point on a cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pin {
    pub name: ArcStr,
    /// Location in the owning cell's frame.
    pub loc: Point,
    /// Outward-facing direction.
    pub dir: Rotation,
    /// Width of the attached waveguide or wire.
    pub width: i64,
}

impl Pin {
    pub fn new(name: impl Into<ArcStr>, loc: Point, dir: Rotation, width: i64) -> Self {
        Self {
            name: name.into(),
            loc,
            dir,
            width,
        }
    }

    /// The short marker path used to record this pin in GDS: it spans
    /// `length` along the facing direction, centered on the pin location.
    pub fn marker(&self, length: i64) -> Path {
        let half = self.dir.unit().scaled(length / 2);
        Path::new(vec![self.loc - half, self.loc + half], self.width)
    }

    /// Recovers a pin from a two-point marker path.
    pub fn from_marker(name: impl Into<ArcStr>, path: &Path) -> Option<Self> {
        let (p0, p1) = path.endpoints()?;
        let dir = Rotation::from_vector(p1 - p0)?;
        let loc = Point::new((p0.x + p1.x) / 2, (p0.y + p1.y) / 2);
        Some(Self::new(name, loc, dir, path.width))
    }
}

impl Transform for Pin {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            name: self.name.clone(),
            loc: self.loc.transform(trans),
            dir: trans.apply_dir(self.dir),
            width: self.width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_marker_round_trips_direction() {
        for dir in [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270] {
            let pin = Pin::new("opt1", Point::new(100, -40), dir, 800);
            let marker = pin.marker(20);
            assert_eq!(Pin::from_marker("opt1", &marker), Some(pin));
        }
    }

    #[test]
    fn array_offsets_are_row_major() {
        let array = ArrayParams {
            rows: 2,
            cols: 3,
            row_step: Point::new(0, 50),
            col_step: Point::new(10, 0),
        };
        let offsets: Vec<_> = array.offsets().collect();
        assert_eq!(offsets.len(), 6);
        assert_eq!(offsets[0], (0, 0, Point::new(0, 0)));
        assert_eq!(offsets[2], (0, 2, Point::new(20, 0)));
        assert_eq!(offsets[5], (1, 2, Point::new(20, 50)));
    }
}
