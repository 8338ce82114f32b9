//! Reference copies: swapping fiber couplers for a fixed reference component
//! and aligning the result to a chip edge.

use std::collections::HashSet;

use picgeom::transform::Transformation;
use picgeom::Point;

use super::cell::{CellKey, InstRef, Pin};
use super::error::{LayoutError, LayoutResult};
use super::library::Library;
use crate::log::{debug, warn};

/// Describes which instances to replace, and with what.
#[derive(Debug, Clone)]
pub struct Substitution {
    /// Instances whose template name contains this substring are replaced.
    pub pattern: String,
    /// The replacement template.
    pub replacement: CellKey,
    /// Pin of the replacement that lands on the original instance's origin.
    ///
    /// Only pins of the replacement cell itself count; pins of its
    /// sub-cells are ignored.
    pub align_pin: String,
}

/// Replaces every instance below `root` whose template name contains
/// `sub.pattern` with an instance of `sub.replacement`.
///
/// Each cell is rewritten at most once. Returns the replaced instances.
pub fn substitute_couplers(lib: &mut Library, root: CellKey, sub: &Substitution) -> Vec<InstRef> {
    let align = lib.cell(sub.replacement).pin(&sub.align_pin).cloned();
    if align.is_none() {
        warn!(
            "reference component {} has no pin {}; keeping original placements",
            lib.cell(sub.replacement).name(),
            sub.align_pin
        );
    }
    let mut visited = HashSet::new();
    let mut replaced = Vec::new();
    substitute_recur(lib, root, sub, align.as_ref(), &mut visited, &mut replaced);
    debug!(
        "replaced {} coupler(s) under {}",
        replaced.len(),
        lib.cell(root).name()
    );
    replaced
}

fn substitute_recur(
    lib: &mut Library,
    key: CellKey,
    sub: &Substitution,
    align: Option<&Pin>,
    visited: &mut HashSet<CellKey>,
    replaced: &mut Vec<InstRef>,
) {
    if !visited.insert(key) || key == sub.replacement {
        return;
    }

    let (targets, children): (Vec<_>, Vec<_>) = lib
        .cell(key)
        .insts()
        .filter(|inst| inst.cell() != sub.replacement)
        .map(|inst| {
            let hit = lib.cell(inst.cell()).name().contains(sub.pattern.as_str());
            (hit, inst.id(), inst.cell())
        })
        .partition(|(hit, _, _)| *hit);

    let name = lib.cell(sub.replacement).name().clone();
    for (_, id, _) in targets {
        let r = InstRef { parent: key, id };
        if let Some(inst) = lib.inst_mut(&r) {
            let placed = match align {
                Some(pin) => Transformation::cascade(
                    inst.transformation(),
                    Transformation::translate(-pin.loc.x, -pin.loc.y),
                ),
                None => inst.transformation(),
            };
            inst.cell = sub.replacement;
            inst.set_name(name.clone());
            inst.set_transformation(placed);
            replaced.push(r);
        }
    }

    for (_, _, child) in children {
        substitute_recur(lib, child, sub, align, visited, replaced);
    }
}

/// Every placement of `target` below `root`, in `root`'s frame.
pub fn placements_of(lib: &Library, root: CellKey, target: CellKey) -> Vec<Transformation> {
    let mut found = Vec::new();
    lib.walk(root, |cell, trans| {
        if cell.id() == target {
            found.push(trans);
        }
    });
    found
}

/// Shifts `inst` horizontally so the rightmost placement of `target` beneath
/// it lands exactly on `boundary_x` in the parent frame.
///
/// Returns the applied shift.
pub fn align_to_boundary(
    lib: &mut Library,
    inst: &InstRef,
    target: CellKey,
    boundary_x: i64,
) -> LayoutResult<i64> {
    let placed = lib.try_inst(inst)?;
    let outer = placed.transformations();
    let inner = if placed.cell() == target {
        vec![Transformation::identity()]
    } else {
        placements_of(lib, placed.cell(), target)
    };
    let max_x = outer
        .iter()
        .flat_map(|o| {
            inner
                .iter()
                .map(move |i| Transformation::cascade(*o, *i).offset_point().x)
        })
        .max()
        .ok_or_else(|| {
            LayoutError::msg(format!(
                "no placements of {} to align",
                lib.cell(target).name()
            ))
        })?;

    let shift = boundary_x - max_x;
    let inst = lib.try_inst_mut(inst)?;
    let loc = inst.loc();
    inst.set_loc(loc + Point::new(shift, 0));
    Ok(shift)
}
