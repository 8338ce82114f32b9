//! The in-memory layout database.

use std::collections::{HashMap, HashSet};

use arcstr::ArcStr;
use picgeom::bbox::Bbox;
use picgeom::orientation::Orientation;
use picgeom::transform::{Transform, Transformation};
use picgeom::Point;
use slotmap::SlotMap;

use super::cell::{Cell, CellKey, InstId, InstRef, Instance, Pin};
use super::error::{LayoutError, LayoutResult};

/// A collection of cells referencing one another through [`Instance`]s.
///
/// Cell names are unique within a library.
#[derive(Debug, Clone, Default)]
pub struct Library {
    name: ArcStr,
    cells: SlotMap<CellKey, Cell>,
    names: HashMap<ArcStr, CellKey>,
    next_inst: u64,
}

impl Library {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Creates an empty cell. If `name` is taken, a numeric suffix is appended.
    pub fn create_cell(&mut self, name: impl Into<ArcStr>) -> CellKey {
        let name = self.alloc_name(&name.into());
        let key = self
            .cells
            .insert_with_key(|k| Cell::new(k, name.clone()));
        self.names.insert(name, key);
        key
    }

    /// Returns `base` if no cell uses it yet, otherwise the first free `{base}_{i}`.
    pub fn alloc_name(&self, base: &str) -> ArcStr {
        if !self.names.contains_key(base) {
            return ArcStr::from(base);
        }
        let mut i = 1;
        loop {
            let name = arcstr::format!("{}_{}", base, i);
            if !self.names.contains_key(&name) {
                break name;
            }
            i += 1;
        }
    }

    /// Returns the cell with key `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` does not belong to this library.
    #[inline]
    pub fn cell(&self, key: CellKey) -> &Cell {
        &self.cells[key]
    }

    /// Mutable counterpart of [`Library::cell`].
    #[inline]
    pub fn cell_mut(&mut self, key: CellKey) -> &mut Cell {
        &mut self.cells[key]
    }

    #[inline]
    pub fn get(&self, key: CellKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub fn cell_by_name(&self, name: &str) -> Option<CellKey> {
        self.names.get(name).copied()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.cells.keys()
    }

    pub(crate) fn next_id(&mut self) -> InstId {
        self.next_inst += 1;
        InstId(self.next_inst)
    }

    /// Adds `inst` to `parent`, assigning it a fresh identifier.
    pub fn add_inst(&mut self, parent: CellKey, mut inst: Instance) -> InstRef {
        let id = self.next_id();
        inst.id = id;
        self.cells[parent].insts.push(inst);
        InstRef { parent, id }
    }

    /// Places `cell` inside `parent` at `loc` with `orientation`.
    pub fn place(
        &mut self,
        parent: CellKey,
        cell: CellKey,
        loc: Point,
        orientation: impl Into<Orientation>,
    ) -> InstRef {
        let mut inst = Instance::new(self.cells[cell].name.clone(), cell);
        inst.loc = loc;
        inst.orientation = orientation.into();
        self.add_inst(parent, inst)
    }

    /// Re-inserts an instance that keeps its existing identifier.
    pub(crate) fn insert_inst(&mut self, parent: CellKey, inst: Instance) -> InstRef {
        let id = inst.id;
        self.cells[parent].insts.push(inst);
        InstRef { parent, id }
    }

    pub fn inst(&self, r: &InstRef) -> Option<&Instance> {
        self.cells.get(r.parent)?.inst(r.id)
    }

    pub fn inst_mut(&mut self, r: &InstRef) -> Option<&mut Instance> {
        self.cells.get_mut(r.parent)?.inst_mut(r.id)
    }

    /// Like [`Library::inst`], but reports a missing instance as an error.
    pub fn try_inst(&self, r: &InstRef) -> LayoutResult<&Instance> {
        self.inst(r).ok_or_else(|| self.missing_inst(r))
    }

    pub fn try_inst_mut(&mut self, r: &InstRef) -> LayoutResult<&mut Instance> {
        let err = self.missing_inst(r);
        self.inst_mut(r).ok_or(err)
    }

    fn missing_inst(&self, r: &InstRef) -> LayoutError {
        let cell = self
            .cells
            .get(r.parent)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        LayoutError::InstanceNotFound(cell)
    }

    pub fn remove_inst(&mut self, r: &InstRef) -> Option<Instance> {
        self.cells.get_mut(r.parent)?.remove_inst(r.id)
    }

    /// All instances, anywhere in the library, that place `key`.
    pub fn parents(&self, key: CellKey) -> Vec<InstRef> {
        self.cells
            .values()
            .flat_map(|cell| {
                cell.insts
                    .iter()
                    .filter(|inst| inst.cell == key)
                    .map(|inst| InstRef {
                        parent: cell.id,
                        id: inst.id,
                    })
            })
            .collect()
    }

    /// Total number of placements of `key`, counting every array element.
    pub fn placement_count(&self, key: CellKey) -> usize {
        self.cells
            .values()
            .flat_map(|cell| cell.insts.iter())
            .filter(|inst| inst.cell == key)
            .map(|inst| inst.placements())
            .sum()
    }

    /// Cells that are never instantiated, sorted by name.
    pub fn top_cells(&self) -> Vec<CellKey> {
        let placed: HashSet<CellKey> = self
            .cells
            .values()
            .flat_map(|cell| cell.insts.iter().map(|inst| inst.cell))
            .collect();
        let mut tops: Vec<CellKey> = self
            .cells
            .keys()
            .filter(|key| !placed.contains(key))
            .collect();
        tops.sort_by(|a, b| self.cells[*a].name.cmp(&self.cells[*b].name));
        tops
    }

    /// The top cell with the most instances plus shapes in its subtree.
    ///
    /// Ties go to the alphabetically first name.
    pub fn main_top_cell(&self) -> Option<CellKey> {
        let mut best: Option<(CellKey, usize)> = None;
        for key in self.top_cells() {
            let score: usize = self
                .subtree(key)
                .into_iter()
                .map(|k| self.cells[k].insts.len() + self.cells[k].elems.len())
                .sum();
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((key, score));
            }
        }
        best.map(|(key, _)| key)
    }

    /// Every cell reachable from `root` (including `root`), each listed once, in depth-first pre-order.
    pub fn subtree(&self, root: CellKey) -> Vec<CellKey> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            if !seen.insert(key) {
                continue;
            }
            order.push(key);
            for inst in self.cells[key].insts.iter().rev() {
                stack.push(inst.cell);
            }
        }
        order
    }

    /// Visits `root` and every placement below it with the accumulated
    /// transformation into `root`'s frame.
    ///
    /// Branches that would re-enter a cell already on the current path are skipped.
    pub fn walk<F>(&self, root: CellKey, mut f: F)
    where
        F: FnMut(&Cell, Transformation),
    {
        let mut path = HashSet::new();
        self.walk_recur(root, Transformation::identity(), &mut path, &mut f);
    }

    fn walk_recur<F>(
        &self,
        key: CellKey,
        trans: Transformation,
        path: &mut HashSet<CellKey>,
        f: &mut F,
    ) where
        F: FnMut(&Cell, Transformation),
    {
        if !path.insert(key) {
            return;
        }
        let cell = &self.cells[key];
        f(cell, trans);
        for inst in cell.insts.iter() {
            for t in inst.transformations() {
                self.walk_recur(inst.cell, Transformation::cascade(trans, t), path, f);
            }
        }
        path.remove(&key);
    }

    /// The bounding box of `key` including all of its instances.
    pub fn bbox(&self, key: CellKey) -> Bbox {
        let mut memo = HashMap::new();
        let mut path = HashSet::new();
        self.bbox_recur(key, &mut path, &mut memo)
    }

    fn bbox_recur(
        &self,
        key: CellKey,
        path: &mut HashSet<CellKey>,
        memo: &mut HashMap<CellKey, Bbox>,
    ) -> Bbox {
        if let Some(bbox) = memo.get(&key) {
            return *bbox;
        }
        if !path.insert(key) {
            return Bbox::empty();
        }
        let cell = &self.cells[key];
        let mut bbox = cell.local_bbox();
        for inst in cell.insts.iter() {
            let child = self.bbox_recur(inst.cell, path, memo);
            for t in inst.transformations() {
                bbox = bbox.union(child.transform(t));
            }
        }
        path.remove(&key);
        memo.insert(key, bbox);
        bbox
    }

    /// The bounding box of an instance, in its parent's frame.
    pub fn inst_bbox(&self, inst: &Instance) -> Bbox {
        let child = self.bbox(inst.cell);
        inst.transformations()
            .into_iter()
            .fold(Bbox::empty(), |acc, t| acc.union(child.transform(t)))
    }

    /// Deep-copies the subtree rooted at `root` in `src` into this library.
    ///
    /// Every cell of the subtree is duplicated exactly once, so the copy shares
    /// nothing with the original. The copied root is named `name`; other cells
    /// keep their names, suffixed if they collide.
    pub fn copy_tree_from(
        &mut self,
        src: &Library,
        root: CellKey,
        name: impl Into<ArcStr>,
    ) -> CellKey {
        let mut map = HashMap::new();
        self.copy_cell_recur(&|key: CellKey| src.cell(key), root, Some(name.into()), &mut map)
    }

    /// Deep-copies a subtree of this library. See [`Library::copy_tree_from`].
    pub fn copy_tree(&mut self, root: CellKey, name: impl Into<ArcStr>) -> CellKey {
        let snapshot: HashMap<CellKey, Cell> = self
            .subtree(root)
            .into_iter()
            .map(|key| (key, self.cells[key].clone()))
            .collect();
        let mut map = HashMap::new();
        self.copy_cell_recur(&|key: CellKey| &snapshot[&key], root, Some(name.into()), &mut map)
    }

    fn copy_cell_recur<'s>(
        &mut self,
        src: &dyn Fn(CellKey) -> &'s Cell,
        key: CellKey,
        name: Option<ArcStr>,
        map: &mut HashMap<CellKey, CellKey>,
    ) -> CellKey {
        if let Some(&copied) = map.get(&key) {
            return copied;
        }
        let src_cell = src(key);
        let dst = self.create_cell(name.unwrap_or_else(|| src_cell.name.clone()));
        map.insert(key, dst);

        let mut insts = Vec::with_capacity(src_cell.insts.len());
        for inst in src_cell.insts.iter() {
            let child = self.copy_cell_recur(src, inst.cell, None, map);
            let mut inst = inst.clone();
            inst.cell = child;
            insts.push(inst);
        }

        let cell = &mut self.cells[dst];
        cell.elems = src_cell.elems.clone();
        cell.annotations = src_cell.annotations.clone();
        cell.pins = src_cell.pins.clone();
        for inst in insts {
            self.add_inst(dst, inst);
        }
        dst
    }

    /// Finds the pin named `name` on `key` or, failing that, the first one found
    /// depth-first among its instances. The pin is returned in `key`'s frame.
    pub fn find_pin(&self, key: CellKey, name: &str) -> Option<Pin> {
        let mut visited = HashSet::new();
        self.find_pin_recur(key, name, &mut visited)
    }

    fn find_pin_recur(
        &self,
        key: CellKey,
        name: &str,
        visited: &mut HashSet<CellKey>,
    ) -> Option<Pin> {
        if !visited.insert(key) {
            return None;
        }
        let cell = &self.cells[key];
        if let Some(pin) = cell.pin(name) {
            return Some(pin.clone());
        }
        for inst in cell.insts.iter() {
            if let Some(pin) = self.find_pin_recur(inst.cell, name, visited) {
                return Some(pin.transform(inst.transformation()));
            }
        }
        None
    }

    /// Finds a pin of an instance, in the instance's parent frame.
    pub fn inst_pin(&self, r: &InstRef, name: &str) -> LayoutResult<Pin> {
        let inst = self.try_inst(r)?;
        self.find_pin(inst.cell, name)
            .map(|pin| pin.transform(inst.transformation()))
            .ok_or_else(|| LayoutError::PinNotFound {
                cell: self.cells[inst.cell].name.clone(),
                pin: ArcStr::from(name),
            })
    }

    /// Finds pin `name` of the innermost instance in `path`, expressed in the
    /// parent frame of the outermost one.
    ///
    /// `path` runs from the outermost instance inward; each entry must be placed
    /// in the cell of the entry before it.
    pub fn pin_through(&self, path: &[InstRef], name: &str) -> LayoutResult<Pin> {
        let (last, outer) = path
            .split_last()
            .ok_or_else(|| LayoutError::msg("empty instance path"))?;
        let mut pin = self.inst_pin(last, name)?;
        for r in outer.iter().rev() {
            pin = pin.transform(self.try_inst(r)?.transformation());
        }
        Ok(pin)
    }

    /// Removes every cell not reachable from `root`. Returns the number removed.
    pub fn retain_subtree(&mut self, root: CellKey) -> usize {
        let keep: HashSet<CellKey> = self.subtree(root).into_iter().collect();
        let before = self.cells.len();
        self.cells.retain(|key, _| keep.contains(&key));
        self.names.retain(|_, key| keep.contains(key));
        before - self.cells.len()
    }

    /// Places `cell` next to `inst` so that its pin `pin_b` meets `pin_a` of `inst`,
    /// facing the opposite way.
    ///
    /// The new instance is added to `inst`'s parent.
    pub fn connect_cell(
        &mut self,
        inst: &InstRef,
        pin_a: &str,
        cell: CellKey,
        pin_b: &str,
    ) -> LayoutResult<InstRef> {
        let a = self.inst_pin(inst, pin_a)?;
        let b = self
            .find_pin(cell, pin_b)
            .ok_or_else(|| LayoutError::PinNotFound {
                cell: self.cells[cell].name.clone(),
                pin: ArcStr::from(pin_b),
            })?;
        let rotation = a.dir.opposite() - b.dir;
        let rotated = b.loc.transform(Transformation::rotate(rotation));
        Ok(self.place(inst.parent, cell, a.loc - rotated, rotation))
    }
}

#[cfg(test)]
mod tests {
    use picgeom::orientation::Rotation;
    use picgeom::Rect;

    use super::*;
    use crate::layout::layers::LayerSpec;

    fn boxed_cell(lib: &mut Library, name: &str, w: i64, h: i64) -> CellKey {
        let key = lib.create_cell(name);
        lib.cell_mut(key)
            .draw(LayerSpec(1, 0), Rect::new(Point::zero(), Point::new(w, h)));
        key
    }

    #[test]
    fn names_are_deduplicated() {
        let mut lib = Library::new("test");
        let a = lib.create_cell("a");
        let b = lib.create_cell("a");
        assert_eq!(lib.cell(a).name().as_str(), "a");
        assert_eq!(lib.cell(b).name().as_str(), "a_1");
        assert_eq!(lib.cell_by_name("a_1"), Some(b));
    }

    #[test]
    fn bbox_includes_transformed_instances() {
        let mut lib = Library::new("test");
        let leaf = boxed_cell(&mut lib, "leaf", 10, 20);
        let top = lib.create_cell("top");
        lib.place(top, leaf, Point::new(100, 0), Rotation::R90);
        let bbox = lib.bbox(top);
        assert_eq!(bbox.p0, Point::new(80, 0));
        assert_eq!(bbox.p1, Point::new(100, 10));
    }

    #[test]
    fn copy_tree_duplicates_every_cell() {
        let mut lib = Library::new("test");
        let leaf = boxed_cell(&mut lib, "leaf", 10, 10);
        let mid = lib.create_cell("mid");
        lib.place(mid, leaf, Point::zero(), Rotation::R0);
        lib.place(mid, leaf, Point::new(20, 0), Rotation::R0);
        let top = lib.create_cell("top");
        lib.place(top, mid, Point::zero(), Rotation::R0);

        let copy = lib.copy_tree(top, "top_copy");
        let copied = lib.subtree(copy);
        assert_eq!(copied.len(), 3);
        let original = lib.subtree(top);
        assert!(copied.iter().all(|k| !original.contains(k)));
        assert_eq!(lib.bbox(copy), lib.bbox(top));
        assert_eq!(lib.top_cells(), vec![top, copy]);
    }

    #[test]
    fn copy_tree_of_a_branch_copies_only_that_branch() {
        let mut lib = Library::new("test");
        let leaf = boxed_cell(&mut lib, "leaf", 10, 10);
        let mid = lib.create_cell("mid");
        lib.place(mid, leaf, Point::zero(), Rotation::R0);
        let top = lib.create_cell("top");
        lib.place(top, mid, Point::zero(), Rotation::R0);
        boxed_cell(&mut lib, "unrelated", 5, 5);

        let before = lib.cells().count();
        let copy = lib.copy_tree(mid, "mid_copy");
        assert_eq!(lib.cells().count(), before + 2);
        assert_eq!(lib.cell(copy).name().as_str(), "mid_copy");
        assert_eq!(lib.cell_by_name("leaf_1").map(|k| lib.subtree(copy).contains(&k)), Some(true));
        assert_eq!(lib.bbox(copy), lib.bbox(mid));
    }

    #[test]
    fn connect_cell_aligns_opposing_pins() {
        let mut lib = Library::new("test");
        let a = boxed_cell(&mut lib, "a", 100, 10);
        lib.cell_mut(a)
            .add_pin(Pin::new("out", Point::new(100, 5), Rotation::R0, 10));
        let b = boxed_cell(&mut lib, "b", 50, 10);
        lib.cell_mut(b)
            .add_pin(Pin::new("in", Point::new(50, 5), Rotation::R0, 10));
        let top = lib.create_cell("top");
        let ia = lib.place(top, a, Point::new(0, 1000), Rotation::R0);

        let ib = lib.connect_cell(&ia, "out", b, "in").unwrap();
        let pa = lib.inst_pin(&ia, "out").unwrap();
        let pb = lib.inst_pin(&ib, "in").unwrap();
        assert_eq!(pa.loc, pb.loc);
        assert_eq!(pa.dir, pb.dir.opposite());
    }

    #[test]
    fn main_top_cell_prefers_largest_design() {
        let mut lib = Library::new("test");
        let small = boxed_cell(&mut lib, "a_small", 1, 1);
        let leaf = boxed_cell(&mut lib, "leaf", 1, 1);
        let big = lib.create_cell("z_big");
        lib.place(big, leaf, Point::zero(), Rotation::R0);
        lib.place(big, leaf, Point::new(5, 0), Rotation::R0);
        assert_eq!(lib.top_cells(), vec![small, big]);
        assert_eq!(lib.main_top_cell(), Some(big));
    }
}
