//! Hierarchy edits: re-parenting, port-marker discovery, and array flattening.

use std::collections::HashSet;

use picgeom::transform::{Transform, Transformation};
use picgeom::Point;

use super::cell::{CellKey, InstRef, Instance};
use super::error::{LayoutError, LayoutResult};
use super::library::Library;
use crate::log::{debug, info};

/// The chain of placements between a cell and one of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyPath {
    /// The placing instances, innermost first.
    Unique(Vec<InstRef>),
    /// `cell` is placed `placements` times, so its parent is not well defined.
    Ambiguous { cell: CellKey, placements: usize },
    /// `cell`, reached after `level` steps, has no parent.
    Exhausted { cell: CellKey, level: usize },
}

impl Library {
    /// Walks `levels` steps up from `cell`, requiring exactly one placement at each step.
    pub fn hierarchy_path(&self, cell: CellKey, levels: usize) -> HierarchyPath {
        let mut path = Vec::with_capacity(levels);
        let mut current = cell;
        for level in 0..levels {
            let parents = self.parents(current);
            let placements = self.placement_count(current);
            match (parents.first(), placements) {
                (None, _) | (_, 0) => return HierarchyPath::Exhausted { cell: current, level },
                (Some(parent), 1) => {
                    path.push(*parent);
                    current = parent.parent;
                }
                _ => {
                    return HierarchyPath::Ambiguous {
                        cell: current,
                        placements,
                    }
                }
            }
        }
        HierarchyPath::Unique(path)
    }

    /// Moves `inst` into the ancestor `levels` levels above its parent,
    /// preserving its absolute placement.
    ///
    /// Fails if any cell along the way is placed more or less than once.
    pub fn move_up(&mut self, inst: &InstRef, levels: usize) -> LayoutResult<InstRef> {
        self.try_inst(inst)?;
        if levels == 0 {
            return Ok(*inst);
        }
        let path = match self.hierarchy_path(inst.parent, levels) {
            HierarchyPath::Unique(path) => path,
            HierarchyPath::Ambiguous { cell, placements } => {
                return Err(LayoutError::AmbiguousHierarchy {
                    cell: self.cell(cell).name().clone(),
                    placements,
                })
            }
            HierarchyPath::Exhausted { cell, level } => {
                return Err(LayoutError::HierarchyExhausted {
                    cell: self.cell(cell).name().clone(),
                    level,
                })
            }
        };

        // T_k . ... . T_1, each parent applied after its child.
        let mut ancestors = Transformation::identity();
        for r in path.iter() {
            let t = self.try_inst(r)?.transformation();
            ancestors = Transformation::cascade(t, ancestors);
        }
        let target = path.last().map(|r| r.parent).unwrap_or(inst.parent);

        let mut moved = self.remove_inst(inst).ok_or_else(|| {
            LayoutError::InstanceNotFound(self.cell(inst.parent).name().clone())
        })?;
        let placed = Transformation::cascade(ancestors, moved.transformation());
        if let Some(array) = moved.array.as_mut() {
            array.row_step = apply_linear(ancestors, array.row_step);
            array.col_step = apply_linear(ancestors, array.col_step);
        }
        moved.set_transformation(placed);
        debug!(
            "moved instance {} up {} level(s) into {}",
            moved.name(),
            levels,
            self.cell(target).name()
        );
        Ok(self.insert_inst(target, moved))
    }
}

/// Applies only the matrix part of `trans` to a displacement.
fn apply_linear(trans: Transformation, v: Point) -> Point {
    v.transform(trans) - trans.offset_point()
}

/// A port marker found by [`find_port_marker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMarker {
    /// The marker's template cell.
    pub cell: CellKey,
    /// The instance placing the marker.
    pub inst: InstRef,
    /// Vertical center of the marker's bounding box, in the searched cell's frame.
    pub y: i64,
}

/// Searches depth-first for the first instance whose template name contains `pattern`.
///
/// Direct children are checked before descending. Each cell is searched at most
/// once, so cyclic or heavily shared hierarchies terminate.
pub fn find_port_marker(lib: &Library, root: CellKey, pattern: &str) -> Option<PortMarker> {
    let mut visited = HashSet::new();
    find_port_marker_recur(
        lib,
        root,
        Transformation::identity(),
        pattern,
        &mut visited,
    )
}

fn find_port_marker_recur(
    lib: &Library,
    key: CellKey,
    trans: Transformation,
    pattern: &str,
    visited: &mut HashSet<CellKey>,
) -> Option<PortMarker> {
    if !visited.insert(key) {
        return None;
    }
    let cell = lib.cell(key);
    debug!("searching {} for port markers", cell.name());

    for inst in cell.insts() {
        if lib.cell(inst.cell()).name().contains(pattern) {
            let bbox = lib.inst_bbox(inst).transform(trans);
            let y = if bbox.is_empty() {
                inst.loc().transform(trans).y
            } else {
                bbox.center().y
            };
            debug!(
                "found port marker {} at y={}",
                lib.cell(inst.cell()).name(),
                y
            );
            return Some(PortMarker {
                cell: inst.cell(),
                inst: InstRef {
                    parent: key,
                    id: inst.id(),
                },
                y,
            });
        }
    }

    for inst in cell.insts() {
        let child = Transformation::cascade(trans, inst.transformation());
        if let Some(marker) = find_port_marker_recur(lib, inst.cell(), child, pattern, visited) {
            return Some(marker);
        }
    }
    None
}

/// Expands every regular-array instance below `root` into individual placements.
///
/// Element `(r, c)` of an array becomes an instance named `{name}[{r}][{c}]`.
/// Returns the number of arrays expanded; a second call returns zero.
pub fn flatten_arrays(lib: &mut Library, root: CellKey) -> usize {
    let mut visited = HashSet::new();
    let count = flatten_arrays_recur(lib, root, &mut visited);
    if count > 0 {
        info!(
            "expanded {} array instance(s) under {}",
            count,
            lib.cell(root).name()
        );
    }
    count
}

fn flatten_arrays_recur(lib: &mut Library, key: CellKey, visited: &mut HashSet<CellKey>) -> usize {
    if !visited.insert(key) {
        return 0;
    }

    let insts = std::mem::take(&mut lib.cell_mut(key).insts);
    let mut expanded = Vec::with_capacity(insts.len());
    let mut count = 0;
    for inst in insts {
        let Some(array) = inst.array else {
            expanded.push(inst);
            continue;
        };
        for (r, c, offset) in array.offsets() {
            let mut single = Instance::new(arcstr::format!("{}[{}][{}]", inst.name, r, c), inst.cell);
            single.id = lib.next_id();
            single.loc = inst.loc + offset;
            single.orientation = inst.orientation;
            expanded.push(single);
        }
        count += 1;
    }
    lib.cell_mut(key).insts = expanded;

    let children: Vec<CellKey> = lib
        .cell(key)
        .insts()
        .filter(|inst| !inst.is_array())
        .map(|inst| inst.cell())
        .collect();
    for child in children {
        count += flatten_arrays_recur(lib, child, visited);
    }
    count
}

#[cfg(test)]
mod tests {
    use picgeom::orientation::{Named, Rotation};
    use picgeom::Rect;

    use super::*;
    use crate::layout::cell::ArrayParams;
    use crate::layout::layers::LayerSpec;

    fn leaf(lib: &mut Library, name: &str) -> CellKey {
        let key = lib.create_cell(name);
        lib.cell_mut(key)
            .draw(LayerSpec(1, 0), Rect::new(Point::new(-5, -5), Point::new(5, 5)));
        key
    }

    #[test]
    fn move_up_preserves_absolute_placement() {
        let mut lib = Library::new("test");
        let dev = leaf(&mut lib, "dev");
        let inner = lib.create_cell("inner");
        let mid = lib.create_cell("mid");
        let top = lib.create_cell("top");
        let d = lib.place(inner, dev, Point::new(10, 3), Named::M0);
        lib.place(mid, inner, Point::new(-200, 40), Rotation::R90);
        lib.place(top, mid, Point::new(5000, 0), Rotation::R180);

        let mut before = Vec::new();
        lib.walk(top, |cell, t| {
            if cell.id() == dev {
                before.push(t);
            }
        });

        let moved = lib.move_up(&d, 2).unwrap();
        assert_eq!(moved.parent, top);
        assert_eq!(moved.id, d.id);
        assert!(lib.cell(inner).insts().next().is_none());
        let absolute = lib.inst(&moved).unwrap().transformation();
        assert_eq!(before, vec![absolute]);
    }

    #[test]
    fn move_up_refuses_ambiguous_paths() {
        let mut lib = Library::new("test");
        let dev = leaf(&mut lib, "dev");
        let shared = lib.create_cell("shared");
        let top = lib.create_cell("top");
        let d = lib.place(shared, dev, Point::zero(), Rotation::R0);
        lib.place(top, shared, Point::zero(), Rotation::R0);
        lib.place(top, shared, Point::new(100, 0), Rotation::R0);

        assert_eq!(
            lib.hierarchy_path(shared, 1),
            HierarchyPath::Ambiguous {
                cell: shared,
                placements: 2
            }
        );
        assert!(matches!(
            lib.move_up(&d, 1),
            Err(LayoutError::AmbiguousHierarchy { placements: 2, .. })
        ));
        assert!(lib.inst(&d).is_some(), "failed move must leave the instance in place");
    }

    #[test]
    fn move_up_past_the_top_is_exhausted() {
        let mut lib = Library::new("test");
        let dev = leaf(&mut lib, "dev");
        let top = lib.create_cell("top");
        let d = lib.place(top, dev, Point::zero(), Rotation::R0);
        assert_eq!(
            lib.hierarchy_path(top, 1),
            HierarchyPath::Exhausted { cell: top, level: 0 }
        );
        assert!(matches!(
            lib.move_up(&d, 1),
            Err(LayoutError::HierarchyExhausted { level: 0, .. })
        ));
    }

    #[test]
    fn port_marker_found_in_nested_cell() {
        let mut lib = Library::new("test");
        let marker = leaf(&mut lib, "port_SiN_800");
        let wrapper = lib.create_cell("wrapper");
        let top = lib.create_cell("top");
        lib.place(wrapper, marker, Point::new(0, 70), Rotation::R0);
        lib.place(top, wrapper, Point::new(0, 1000), Rotation::R0);

        let found = find_port_marker(&lib, top, "port_SiN").unwrap();
        assert_eq!(found.cell, marker);
        assert_eq!(found.inst.parent, wrapper);
        assert_eq!(found.y, 1070);
    }

    #[test]
    fn port_marker_search_terminates_on_cycles() {
        let mut lib = Library::new("test");
        let a = lib.create_cell("a");
        let b = lib.create_cell("b");
        lib.place(a, b, Point::zero(), Rotation::R0);
        lib.place(b, a, Point::zero(), Rotation::R0);
        assert_eq!(find_port_marker(&lib, a, "port_SiN"), None);
    }

    #[test]
    fn flatten_arrays_is_count_exact_and_idempotent() {
        let mut lib = Library::new("test");
        let unit = leaf(&mut lib, "unit");
        let top = lib.create_cell("top");
        let mut inst = Instance::new("grid", unit);
        inst.loc = Point::new(7, 9);
        inst.array = Some(ArrayParams {
            rows: 3,
            cols: 4,
            row_step: Point::new(0, 100),
            col_step: Point::new(25, 0),
        });
        lib.add_inst(top, inst);

        assert_eq!(flatten_arrays(&mut lib, top), 1);
        let insts: Vec<_> = lib.cell(top).insts().collect();
        assert_eq!(insts.len(), 12);
        assert!(insts.iter().all(|i| !i.is_array()));
        let last = insts.iter().find(|i| i.name().as_str() == "grid[2][3]").unwrap();
        assert_eq!(last.loc(), Point::new(7 + 3 * 25, 9 + 2 * 100));

        assert_eq!(flatten_arrays(&mut lib, top), 0);
        assert_eq!(lib.cell(top).insts().count(), 12);
    }

    #[test]
    fn flatten_arrays_descends_into_children() {
        let mut lib = Library::new("test");
        let unit = leaf(&mut lib, "unit");
        let block = lib.create_cell("block");
        let top = lib.create_cell("top");
        let mut inst = Instance::new("pair", unit);
        inst.array = Some(ArrayParams {
            rows: 1,
            cols: 2,
            row_step: Point::zero(),
            col_step: Point::new(30, 0),
        });
        lib.add_inst(block, inst);
        lib.place(top, block, Point::zero(), Rotation::R0);
        lib.place(top, block, Point::new(0, 500), Rotation::R0);

        assert_eq!(flatten_arrays(&mut lib, top), 1);
        assert_eq!(lib.cell(block).insts().count(), 2);
    }
}
