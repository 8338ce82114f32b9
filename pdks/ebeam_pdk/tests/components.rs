use ebeam_pdk::{EbeamPdk, FAML, GRATING_COUPLER, PORT_MARKER};
use picgeom::orientation::Rotation;
use picgeom::Point;
use piclet::error::ErrorSource;
use piclet::layout::layers::{LayerRole, LayerSpec};
use piclet::layout::library::Library;
use piclet::pdk::{ComponentLibrary, ComponentParams};
use piclet::piclet::{laser_name, required_components, BOND_PAD, HEATER, Y_BRANCH};
use piclet::config::PicletConfig;

#[test]
fn provides_every_required_component() {
    let pdk = EbeamPdk::new();
    let mut lib = Library::new("test");
    for name in required_components(&PicletConfig::default()) {
        let key = pdk
            .component(&mut lib, &name, &ComponentParams::default())
            .unwrap();
        assert_eq!(lib.cell(key).name().as_str(), name);
        assert!(!lib.bbox(key).is_empty(), "{name} has no outline");
    }
}

#[test]
fn components_are_cached_by_name() {
    let pdk = EbeamPdk::new();
    let mut lib = Library::new("test");
    let params = ComponentParams::default();
    let a = pdk.component(&mut lib, Y_BRANCH, &params).unwrap();
    let b = pdk.component(&mut lib, Y_BRANCH, &params).unwrap();
    assert_eq!(a, b);
    assert_eq!(lib.len(), 1);
}

#[test]
fn unknown_components_are_fatal() {
    let pdk = EbeamPdk::new();
    let mut lib = Library::new("test");
    let err = pdk
        .component(&mut lib, "ebeam_terminator_SiN", &ComponentParams::default())
        .unwrap_err();
    assert!(matches!(err.source(), ErrorSource::ComponentNotFound { .. }));
    assert!(err.is_fatal());

    let err = pdk
        .component(
            &mut lib,
            &laser_name(1550),
            &ComponentParams { wavelength: 1310 },
        )
        .unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn component_pins() {
    let pdk = EbeamPdk::new();
    let mut lib = Library::new("test");
    let params = ComponentParams::default();
    let mut pins = |name: &str| {
        let key = pdk.component(&mut lib, name, &params).unwrap();
        lib.cell(key)
            .pins()
            .map(|p| (p.name.to_string(), p.dir))
            .collect::<Vec<_>>()
    };

    assert_eq!(pins(&laser_name(1310)), vec![("opt1".to_string(), Rotation::R0)]);
    let heater = pins(HEATER);
    for name in ["opt1", "opt2", "elec1", "elec2"] {
        assert!(heater.iter().any(|(n, _)| n == name), "heater lacks {name}");
    }
    assert_eq!(pins(BOND_PAD).len(), 2);
    assert_eq!(
        pins(Y_BRANCH),
        vec![
            ("opt1".to_string(), Rotation::R180),
            ("opt2".to_string(), Rotation::R0),
            ("opt3".to_string(), Rotation::R0),
        ]
    );
    assert_eq!(pins(FAML).len(), 1);
    assert!(pins(PORT_MARKER).is_empty());

    let gc = pdk
        .component(&mut lib, GRATING_COUPLER, &params)
        .unwrap();
    assert_eq!(lib.cell(gc).pin("opt1").unwrap().loc, Point::zero());
}

#[test]
fn layer_roles() {
    let layers = EbeamPdk::new().layers();
    assert_eq!(layers.role(LayerRole::Waveguide).unwrap(), LayerSpec(4, 0));
    assert_eq!(layers.role(LayerRole::PinRec).unwrap(), LayerSpec(1, 10));
    assert_eq!(layers.role(LayerRole::KeepOut).unwrap(), LayerSpec(202, 0));
    assert_eq!(layers.get("Deep Trench"), Some(LayerSpec(201, 0)));
}

#[test]
fn waveguide_cross_section() {
    let spec = EbeamPdk::new().waveguide(1310);
    assert_eq!(spec.width, 800);
    assert_eq!(spec.radius, 60_000);
    assert_eq!(spec.name.as_str(), "SiN Strip TE 1310 nm, w=800 nm");
}
