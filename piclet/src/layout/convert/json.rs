//! The native JSON layout format.
//!
//! Instances refer to their template cell by name.

use std::collections::HashMap;

use arcstr::ArcStr;
use picgeom::orientation::Orientation;
use picgeom::Point;
use serde::{Deserialize, Serialize};

use crate::error::{with_err_context, ErrorContext, Result};
use crate::layout::cell::{ArrayParams, CellKey, Element, Instance, Pin, TextElement};
use crate::layout::error::LayoutError;
use crate::layout::library::Library;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LibraryDoc {
    name: ArcStr,
    cells: Vec<CellDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CellDoc {
    name: ArcStr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    insts: Vec<InstDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    elems: Vec<Element>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<TextElement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pins: Vec<Pin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstDoc {
    name: ArcStr,
    cell: ArcStr,
    #[serde(default)]
    loc: Point,
    #[serde(default)]
    orientation: Orientation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    array: Option<ArrayParams>,
}

impl Library {
    /// Serializes the library to JSON.
    pub fn to_json(&self) -> Result<String> {
        let cells = self
            .keys()
            .map(|key| {
                let cell = self.cell(key);
                CellDoc {
                    name: cell.name().clone(),
                    insts: cell
                        .insts()
                        .map(|inst| InstDoc {
                            name: inst.name().clone(),
                            cell: self.cell(inst.cell()).name().clone(),
                            loc: inst.loc(),
                            orientation: inst.orientation(),
                            array: inst.array().copied(),
                        })
                        .collect(),
                    elems: cell.elems().cloned().collect(),
                    annotations: cell.annotations().cloned().collect(),
                    pins: cell.pins().cloned().collect(),
                }
            })
            .collect();
        let doc = LibraryDoc {
            name: self.name().clone(),
            cells,
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Parses a library from JSON.
    ///
    /// Instances may refer to cells defined later in the document.
    pub fn from_json(json: &str) -> Result<Library> {
        let doc: LibraryDoc = serde_json::from_str(json)?;
        let mut lib = Library::new(doc.name);
        let mut keys: HashMap<ArcStr, CellKey> = HashMap::new();
        for cell in doc.cells.iter() {
            if keys.contains_key(&cell.name) {
                return Err(LayoutError::msg(format!(
                    "cell {} defined multiple times in JSON layout",
                    cell.name
                ))
                .into());
            }
            keys.insert(cell.name.clone(), lib.create_cell(cell.name.clone()));
        }
        for cell in doc.cells {
            let key = keys[&cell.name];
            for inst in cell.insts {
                let child = *keys.get(&inst.cell).ok_or_else(|| {
                    LayoutError::msg(format!(
                        "instance {} of undefined cell {}",
                        inst.name, inst.cell
                    ))
                })?;
                let mut placed = Instance::new(inst.name, child);
                placed.set_loc(inst.loc);
                placed.set_orientation(inst.orientation);
                placed.array = inst.array;
                lib.add_inst(key, placed);
            }
            let target = lib.cell_mut(key);
            target.add_elements(cell.elems);
            for ann in cell.annotations {
                target.add_annotation(ann);
            }
            for pin in cell.pins {
                target.add_pin(pin);
            }
        }
        Ok(lib)
    }

    /// Reads a library from a JSON file.
    pub fn load_json(path: impl AsRef<std::path::Path>) -> Result<Library> {
        let path = path.as_ref();
        let json = crate::io::read_to_string(path)?;
        with_err_context(Library::from_json(&json), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })
    }

    /// Writes the library to a JSON file.
    pub fn save_json(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        with_err_context(std::fs::write(path, json), || {
            ErrorContext::CreateFile(path.to_path_buf())
        })
    }
}

#[cfg(test)]
mod tests {
    use picgeom::orientation::{Named, Rotation};
    use picgeom::Rect;

    use super::*;
    use crate::layout::layers::LayerSpec;

    #[test]
    fn json_preserves_hierarchy() {
        let mut lib = Library::new("design");
        let gc = lib.create_cell("ebeam_GC_SiN_1310");
        lib.cell_mut(gc)
            .draw(LayerSpec(4, 0), Rect::new(Point::new(-10, -10), Point::new(10, 10)));
        lib.cell_mut(gc)
            .add_pin(Pin::new("opt1", Point::zero(), Rotation::R0, 800));
        let top = lib.create_cell("top");
        lib.place(top, gc, Point::new(40, -5), Named::M90);

        let json = lib.to_json().unwrap();
        let back = Library::from_json(&json).unwrap();
        let top2 = back.cell_by_name("top").unwrap();
        let gc2 = back.cell_by_name("ebeam_GC_SiN_1310").unwrap();
        assert_eq!(back.main_top_cell(), Some(top2));
        assert_eq!(back.bbox(top2), lib.bbox(top));
        assert_eq!(back.cell(gc2).pin("opt1"), lib.cell(gc).pin("opt1"));
        let inst = back.cell(top2).insts().next().unwrap();
        assert_eq!(inst.orientation(), Orientation::from(Named::M90));
    }

    #[test]
    fn json_rejects_dangling_references() {
        let json = r#"{"name":"x","cells":[{"name":"top","insts":[{"name":"i","cell":"nope"}]}]}"#;
        assert!(Library::from_json(json).is_err());
    }
}
