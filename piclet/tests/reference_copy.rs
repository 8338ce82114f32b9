use ebeam_pdk::{EbeamPdk, FAML, GRATING_COUPLER, PORT_MARKER};
use picgeom::orientation::Rotation;
use picgeom::Point;
use piclet::layout::cell::InstRef;
use piclet::layout::hierarchy::{find_port_marker, flatten_arrays};
use piclet::layout::library::Library;
use piclet::layout::reference::{align_to_boundary, placements_of, substitute_couplers, Substitution};
use piclet::pdk::{ComponentLibrary, ComponentParams};
use tempdir::TempDir;

mod common;
use common::{write_design, DesignOpts, GC_PITCH, GC_X};

fn load(dir: &TempDir) -> Library {
    let path = write_design(dir.path(), "design.gds", DesignOpts::default());
    Library::from_gds(&path, &EbeamPdk::new().layers()).unwrap()
}

#[test]
fn imported_arrays_survive_until_flattened() {
    let dir = TempDir::new("piclet_reference_arrays").unwrap();
    let design = load(&dir);
    let top = design.main_top_cell().unwrap();
    assert_eq!(design.cell(top).name(), "design");
    let couplers = design
        .cell(top)
        .insts()
        .find(|inst| design.cell(inst.cell()).name() == GRATING_COUPLER)
        .unwrap();
    let array = couplers.array().unwrap();
    assert_eq!((array.rows, array.cols), (2, 1));

    let mut lib = Library::new("die");
    let copy = lib.copy_tree_from(&design, top, "design_copy");
    assert_eq!(flatten_arrays(&mut lib, copy), 1);
    assert_eq!(flatten_arrays(&mut lib, copy), 0);
    let gc = lib.cell_by_name(GRATING_COUPLER).unwrap();
    let mut origins: Vec<Point> = placements_of(&lib, copy, gc)
        .into_iter()
        .map(|t| t.offset_point())
        .collect();
    origins.sort_by_key(|p| p.y);
    assert_eq!(origins, vec![Point::new(GC_X, 0), Point::new(GC_X, GC_PITCH)]);

    // The source library is untouched.
    assert!(design
        .cell(top)
        .insts()
        .any(|inst| inst.array().is_some()));
}

#[test]
fn couplers_become_aligned_references() {
    let dir = TempDir::new("piclet_reference_align").unwrap();
    let design = load(&dir);
    let pdk = EbeamPdk::new();

    let mut lib = Library::new("die");
    let faml = pdk
        .component(&mut lib, FAML, &ComponentParams::default())
        .unwrap();
    let copy = lib.copy_tree_from(&design, design.main_top_cell().unwrap(), "design_copy");
    flatten_arrays(&mut lib, copy);

    let replaced = substitute_couplers(
        &mut lib,
        copy,
        &Substitution {
            pattern: "GC".to_string(),
            replacement: faml,
            align_pin: "opt1".to_string(),
        },
    );
    assert_eq!(replaced.len(), 2);
    for r in replaced.iter() {
        assert_eq!(lib.inst(r).unwrap().name(), FAML);
    }

    // Each reference's optical pin sits where its coupler's origin was.
    let mut pins: Vec<Point> = replaced
        .iter()
        .map(|r| lib.inst_pin(r, "opt1").unwrap().loc)
        .collect();
    pins.sort_by_key(|p| p.y);
    assert_eq!(pins, vec![Point::new(GC_X, 0), Point::new(GC_X, GC_PITCH)]);

    let marker = find_port_marker(&lib, copy, PORT_MARKER).unwrap();
    assert_eq!(marker.inst.parent, copy);
    assert_eq!(lib.cell(marker.cell).name(), PORT_MARKER);

    let die = lib.create_cell("die");
    let placed = lib.place(die, copy, Point::new(-50_000, 0), Rotation::R0);
    let shift = align_to_boundary(&mut lib, &placed, faml, 1_000_000).unwrap();
    let max_x = placements_of(&lib, die, faml)
        .iter()
        .map(|t| t.offset_point().x)
        .max()
        .unwrap();
    assert_eq!(max_x, 1_000_000);
    assert_eq!(lib.inst(&placed).unwrap().loc(), Point::new(-50_000 + shift, 0));
}

#[test]
fn nested_instances_move_up_in_imported_designs() {
    let dir = TempDir::new("piclet_reference_move").unwrap();
    let mut lib = load(&dir);
    let top = lib.main_top_cell().unwrap();
    let block = lib.cell_by_name("design_block").unwrap();
    let ring = lib.cell(block).insts().next().unwrap().id();

    let moved = lib
        .move_up(&InstRef { parent: block, id: ring }, 1)
        .unwrap();
    assert_eq!(moved.parent, top);
    assert_eq!(lib.inst(&moved).unwrap().loc(), Point::new(100_000, 40_000));
    assert_eq!(lib.cell(block).insts().count(), 0);

    // The top cell has no parent to move into.
    assert!(lib.move_up(&moved, 1).is_err());
}
