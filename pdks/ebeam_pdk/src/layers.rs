use piclet::layout::layers::Layers;

use crate::EbeamPdk;

impl EbeamPdk {
    pub fn layer_table() -> Layers {
        Layers::from_csv(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/data/layers.csv"
        )))
        .expect("bundled layer table is valid")
    }
}
