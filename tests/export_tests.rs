//! Integration tests for exporting scenes and reading the output back.

use x3d_export::core::{CompressionMethod, Diagnostic, Encoding, ExportOptions, SpecVersion};
use x3d_export::export::sink::{InfosetEvent, InfosetReader, InfosetValue};
use x3d_export::export::{export_to_path, export_to_writer, ExportReport};
use x3d_export::scene::{Export, FieldDecl, Import, Route, Scene};
use x3d_export::util::{Access, FieldType, FieldValue, NodeId};
use x3d_export::Error;

use tempfile::TempDir;

/// Compact XML: no preamble, no whitespace.
fn compact() -> ExportOptions {
    ExportOptions::default()
        .with_strip_whitespace(true)
        .with_doctype(false)
        .with_xml_declaration(false)
}

fn export(scene: &Scene, encoding: Encoding, options: &ExportOptions) -> (Vec<u8>, ExportReport) {
    let mut out = Vec::new();
    let report = export_to_writer(scene, encoding, options, &mut out).expect("export failed");
    (out, report)
}

fn xml(scene: &Scene, options: &ExportOptions) -> (String, ExportReport) {
    let (bytes, report) = export(scene, Encoding::Xml, options);
    (String::from_utf8(bytes).expect("XML is not UTF-8"), report)
}

fn classic(scene: &Scene, options: &ExportOptions) -> (String, ExportReport) {
    let (bytes, report) = export(scene, Encoding::Classic, options);
    (String::from_utf8(bytes).expect("classic text is not UTF-8"), report)
}

/// Shape with a Box, registered under `label`.
fn labelled_box(scene: &mut Scene, label: &str) -> NodeId {
    let shape = scene.create_node("Shape").unwrap();
    let geometry = scene.create_node("Box").unwrap();
    scene.add_child(shape, "geometry", geometry).unwrap();
    scene.set_def(label, shape).unwrap();
    shape
}

fn attribute<'d>(attrs: &[(&str, &'d InfosetValue)], name: &str) -> &'d InfosetValue {
    attrs
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
        .unwrap_or_else(|| panic!("no attribute {name}"))
}

#[test]
fn test_strings_mode_writes_decimal_text() {
    let mut scene = Scene::new();
    let shape = scene.create_node("Shape").unwrap();
    let faces = scene.create_node("IndexedFaceSet").unwrap();
    let coord = scene.create_node("Coordinate").unwrap();
    scene.set_field(coord, "point", FieldValue::Floats(vec![0.0001, 1.0, -2.5])).unwrap();
    scene.add_child(faces, "coord", coord).unwrap();
    scene.add_child(shape, "geometry", faces).unwrap();
    scene.add_root_child(shape).unwrap();

    let options = ExportOptions::default().with_compression(CompressionMethod::Strings);
    let (bytes, _) = export(&scene, Encoding::Binary, &options);
    let doc = InfosetReader::read_document(&bytes).expect("failed to read back");

    let encoded = doc
        .events
        .iter()
        .filter(|e| matches!(e, InfosetEvent::Attribute { value: InfosetValue::Encoded { .. }, .. }))
        .count();
    assert_eq!(encoded, 0, "strings mode must not emit algorithm payloads");

    let coords = doc.elements("Coordinate");
    assert_eq!(coords.len(), 1);
    assert_eq!(attribute(&coords[0], "point").as_text(), Some("0.0001 1 -2.5"));
}

#[test]
fn test_shared_node_written_once() {
    let mut scene = Scene::new();
    let shared = labelled_box(&mut scene, "Box1");
    for _ in 0..2 {
        let t = scene.create_node("Transform").unwrap();
        scene.add_child(t, "children", shared).unwrap();
        scene.add_root_child(t).unwrap();
    }

    let (out, report) = xml(&scene, &compact());
    assert_eq!(out.matches("DEF='Box1'").count(), 1, "{out}");
    assert_eq!(out.matches("USE='Box1'").count(), 1, "{out}");
    assert_eq!(out.matches("<Box").count(), 1, "{out}");
    assert!(out.contains("<Transform><Shape USE='Box1'/></Transform>"), "{out}");
    assert_eq!(report.uses, 1);

    let (text, _) = classic(&scene, &ExportOptions::default());
    assert_eq!(text.matches("DEF Box1 Shape {").count(), 1, "{text}");
    assert_eq!(text.matches("USE Box1").count(), 1, "{text}");
}

#[test]
fn test_no_reexpansion_across_many_parents() {
    let mut scene = Scene::new();
    let shared = labelled_box(&mut scene, "S");
    let group = scene.create_node("Group").unwrap();
    for _ in 0..3 {
        scene.add_child(group, "children", shared).unwrap();
    }
    scene.add_root_child(group).unwrap();

    let (out, report) = xml(&scene, &compact());
    assert_eq!(out.matches("<Shape").count(), 3);
    assert_eq!(out.matches("DEF='S'").count(), 1);
    assert_eq!(out.matches("USE='S'").count(), 2);
    assert_eq!(report.uses, 2);
}

#[test]
fn test_lossy_floats_within_bound() {
    let values: Vec<f32> = (0..12).map(|i| i as f32 * 0.3137 - 1.5).collect();
    let mut scene = Scene::new();
    let interp = scene.create_node("ScalarInterpolator").unwrap();
    scene.set_field(interp, "key", FieldValue::Floats(values.clone())).unwrap();
    scene.add_root_child(interp).unwrap();

    let options = ExportOptions::default()
        .with_compression(CompressionMethod::SmallestLossy)
        .with_quantize_param(0.001);
    let (bytes, _) = export(&scene, Encoding::Binary, &options);
    let doc = InfosetReader::read_document(&bytes).expect("failed to read back");

    let interps = doc.elements("ScalarInterpolator");
    let decoded = attribute(&interps[0], "key")
        .decode()
        .expect("bad payload")
        .expect("lossy mode writes floats as payloads");
    let FieldValue::Floats(decoded) = decoded else {
        panic!("expected a float payload");
    };
    assert_eq!(decoded.len(), values.len());
    for (a, b) in values.iter().zip(&decoded) {
        assert!((a - b).abs() <= 0.001, "{a} decoded as {b}");
    }
}

#[test]
fn test_binary_roundtrip_exact() {
    let points: Vec<f32> = (0..60).map(|i| (i as f32 * 0.25).sin()).collect();
    let index: Vec<i32> = (0..100).flat_map(|i| [i, i + 1, i + 2, -1]).collect();

    let mut scene = Scene::new();
    let shape = scene.create_node("Shape").unwrap();
    let faces = scene.create_node("IndexedFaceSet").unwrap();
    let coord = scene.create_node("Coordinate").unwrap();
    scene.set_field(coord, "point", FieldValue::Floats(points.clone())).unwrap();
    scene.set_field(faces, "coordIndex", FieldValue::Int32s(index.clone())).unwrap();
    scene.set_field(faces, "solid", FieldValue::bool(false)).unwrap();
    scene.add_child(faces, "coord", coord).unwrap();
    scene.add_child(shape, "geometry", faces).unwrap();
    scene.add_root_child(shape).unwrap();

    let options = ExportOptions::default().with_compression(CompressionMethod::FastestParsing);
    let (bytes, _) = export(&scene, Encoding::Binary, &options);
    let doc = InfosetReader::read_document(&bytes).expect("failed to read back");

    let faces = doc.elements("IndexedFaceSet");
    let decoded = attribute(&faces[0], "coordIndex").decode().unwrap();
    assert_eq!(decoded, Some(FieldValue::Int32s(index)));
    let solid = attribute(&faces[0], "solid").decode().unwrap();
    assert_eq!(solid, Some(FieldValue::Bools(vec![false])));

    let coords = doc.elements("Coordinate");
    let decoded = attribute(&coords[0], "point").decode().unwrap();
    assert_eq!(decoded, Some(FieldValue::Floats(points.clone())));

    // The size-driven policy may pick text for some fields; payloads stay exact.
    let (bytes, _) = export(&scene, Encoding::Binary, &ExportOptions::default());
    let doc = InfosetReader::read_document(&bytes).expect("failed to read back");
    let coords = doc.elements("Coordinate");
    if let Some(decoded) = attribute(&coords[0], "point").decode().unwrap() {
        assert_eq!(decoded, FieldValue::Floats(points));
    }
}

#[test]
fn test_export_is_deterministic() {
    let mut scene = Scene::new();
    let shared = labelled_box(&mut scene, "B");
    let t = scene.create_node("Transform").unwrap();
    scene.set_field(t, "translation", FieldValue::vec3f(1.0, 2.0, 3.0)).unwrap();
    scene.add_child(t, "children", shared).unwrap();
    scene.add_root_child(t).unwrap();
    scene.add_root_child(shared).unwrap();

    for encoding in [Encoding::Xml, Encoding::Binary, Encoding::Classic] {
        let (first, _) = export(&scene, encoding, &ExportOptions::default());
        let (second, _) = export(&scene, encoding, &ExportOptions::default());
        assert_eq!(first, second, "{} output differs between runs", encoding.name());
    }
}

#[test]
fn test_default_elision() {
    let mut scene = Scene::new();
    let material = scene.create_node("Material").unwrap();
    scene.set_field(material, "diffuseColor", FieldValue::color(0.8, 0.8, 0.8)).unwrap();
    scene.set_field(material, "shininess", FieldValue::float(0.5)).unwrap();
    scene.add_root_child(material).unwrap();

    let (out, report) = xml(&scene, &compact());
    assert!(out.contains("<Material shininess='0.5'/>"), "{out}");
    assert!(!out.contains("diffuseColor"));
    assert!(report.elided >= 1);

    let (out, _) = xml(&scene, &compact().with_remove_defaults(false));
    assert!(out.contains("diffuseColor='0.8 0.8 0.8'"), "{out}");
    assert!(out.contains("transparency='0'"), "{out}");
}

fn ball_prototype(scene: &mut Scene) -> x3d_export::util::ProtoId {
    let proto = scene
        .add_prototype(
            "Ball",
            vec![
                FieldDecl::new("radius", FieldType::SFFloat, Access::InputOutput).with_default(FieldValue::float(1.0)),
                FieldDecl::new("color", FieldType::SFColor, Access::InputOutput)
                    .with_default(FieldValue::color(1.0, 0.0, 0.0)),
                FieldDecl::new("label", FieldType::SFString, Access::InitializeOnly)
                    .with_default(FieldValue::string("ball")),
            ],
        )
        .unwrap();
    let shape = scene.create_node("Shape").unwrap();
    let sphere = scene.create_node("Sphere").unwrap();
    scene.add_child(shape, "geometry", sphere).unwrap();
    scene.connect_is(proto, sphere, "radius", "radius").unwrap();
    scene.add_proto_body_node(proto, shape).unwrap();
    proto
}

#[test]
fn test_proto_instance_elides_interface_defaults() {
    let mut scene = Scene::new();
    let proto = ball_prototype(&mut scene);
    let instance = scene.create_proto_instance(proto).unwrap();
    scene.set_field(instance, "radius", FieldValue::float(1.0)).unwrap();
    scene.set_field(instance, "label", FieldValue::string("mine")).unwrap();
    scene.add_root_child(instance).unwrap();

    let (out, report) = xml(&scene, &compact());
    assert!(
        out.contains("<field name='radius' type='SFFloat' accessType='inputOutput' value='1'/>"),
        "{out}"
    );
    assert!(out.contains("<ProtoInstance name='Ball'><fieldValue name='label' value='mine'/></ProtoInstance>"), "{out}");
    assert!(!out.contains("<fieldValue name='radius'"), "{out}");
    assert!(out.contains("<Sphere><IS><connect nodeField='radius' protoField='radius'/></IS></Sphere>"), "{out}");
    assert_eq!(out.matches("<ProtoDeclare").count(), 1);

    let ball = report.default_instances.get("Ball").expect("no default instance");
    assert_eq!(ball.field_default(0), Some(&FieldValue::float(1.0)));
    assert_eq!(report.protos, 1);

    let (text, _) = classic(&scene, &ExportOptions::default());
    assert!(text.contains("PROTO Ball ["), "{text}");
    assert!(text.contains("inputOutput SFFloat radius 1"), "{text}");
    assert!(text.contains("Sphere {\n      radius IS radius"), "{text}");
    assert!(text.contains("Ball {\n  label \"mine\"\n}"), "{text}");
}

#[test]
fn test_prototypes_declared_before_use() {
    let mut scene = Scene::new();
    let outer = scene.add_prototype("Outer", Vec::new()).unwrap();
    let inner = scene.add_nested_prototype("Inner", Vec::new()).unwrap();
    let lonely = scene.add_nested_prototype("Lonely", Vec::new()).unwrap();

    let inner_body = scene.create_node("Group").unwrap();
    scene.add_proto_body_node(inner, inner_body).unwrap();
    let inner_instance = scene.create_proto_instance(inner).unwrap();
    scene.add_proto_body_node(outer, inner_instance).unwrap();

    let a = scene.create_proto_instance(outer).unwrap();
    let b = scene.create_proto_instance(lonely).unwrap();
    scene.add_root_child(a).unwrap();
    scene.add_root_child(b).unwrap();

    let (out, report) = xml(&scene, &compact());
    let pos = |needle: &str| out.find(needle).unwrap_or_else(|| panic!("{needle} missing from {out}"));
    assert!(pos("<ProtoDeclare name='Inner'") < pos("<ProtoDeclare name='Outer'"));
    assert!(pos("<ProtoDeclare name='Outer'") < pos("<ProtoDeclare name='Lonely'"));
    assert!(pos("<ProtoDeclare name='Lonely'") < pos("<ProtoInstance name='Outer'"));
    assert_eq!(out.matches("<ProtoDeclare").count(), 3);
    assert_eq!(report.protos, 3);
}

#[test]
fn test_recursive_prototype_reported() {
    let mut scene = Scene::new();
    let proto = scene.add_prototype("Loop", Vec::new()).unwrap();
    let instance = scene.create_proto_instance(proto).unwrap();
    scene.add_proto_body_node(proto, instance).unwrap();

    let (out, report) = xml(&scene, &compact());
    assert_eq!(out.matches("<ProtoDeclare").count(), 1);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::Unsupported { what } if what.contains("Loop"))));
}

#[test]
fn test_extern_proto_declaration() {
    let mut scene = Scene::new();
    scene
        .add_extern_prototype(
            "Widget",
            vec![FieldDecl::new("size", FieldType::SFFloat, Access::InitializeOnly)],
            vec!["widget.x3d#Widget".to_string()],
        )
        .unwrap();

    let (out, _) = xml(&scene, &compact());
    assert!(
        out.contains(
            "<ExternProtoDeclare name='Widget' url='\"widget.x3d#Widget\"'>\
             <field name='size' type='SFFloat' accessType='initializeOnly'/></ExternProtoDeclare>"
        ),
        "{out}"
    );
    assert!(!out.contains("ProtoInterface"));
}

#[test]
fn test_script_fields_echoed() {
    let mut scene = Scene::new();
    let script = scene.create_script().unwrap();
    scene
        .add_dynamic_field(script, "speed", FieldType::SFFloat, Access::InitializeOnly, Some(FieldValue::float(1.0)))
        .unwrap();
    scene
        .add_dynamic_field(script, "set_time", FieldType::SFTime, Access::InputOnly, None)
        .unwrap();
    scene.set_def("Logic", script).unwrap();
    scene.add_root_child(script).unwrap();

    let (out, _) = xml(&scene, &compact());
    assert!(out.contains("directOutput='false'"), "{out}");
    assert!(out.contains("<field name='speed' type='SFFloat' accessType='initializeOnly' value='1'/>"), "{out}");
    assert!(out.contains("<field name='set_time' type='SFTime' accessType='inputOnly'/>"), "{out}");
    assert!(!out.contains("metadata"), "{out}");
}

#[test]
fn test_routes_after_nodes() {
    let mut scene = Scene::new();
    let timer = scene.create_node("TimeSensor").unwrap();
    let interp = scene.create_node("ScalarInterpolator").unwrap();
    scene.set_def("Timer", timer).unwrap();
    scene.set_def("Fade", interp).unwrap();
    scene.add_root_child(timer).unwrap();
    scene.add_root_child(interp).unwrap();
    scene.add_route(timer, "fraction_changed", interp, "set_fraction").unwrap();

    let (out, report) = xml(&scene, &compact());
    assert!(out.ends_with(
        "<ROUTE fromNode='Timer' fromField='fraction_changed' toNode='Fade' toField='set_fraction'/></Scene></X3D>"
    ), "{out}");
    assert_eq!(report.routes, 1);

    let (text, _) = classic(&scene, &ExportOptions::default());
    assert!(text.contains("ROUTE Timer.fraction_changed TO Fade.set_fraction"), "{text}");
}

#[test]
fn test_route_with_unknown_field_skipped() {
    let mut scene = Scene::new();
    let timer = scene.create_node("TimeSensor").unwrap();
    scene.set_def("Timer", timer).unwrap();
    scene.add_root_child(timer).unwrap();
    scene.add_route_by_index(Route { from_node: timer, from_field: 999, to_node: timer, to_field: 1 });

    let (out, report) = xml(&scene, &compact());
    assert!(!out.contains("<ROUTE"));
    assert_eq!(report.routes, 0);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::UnknownField { index: 999, .. })));
}

#[test]
fn test_unlabeled_route_endpoint_fails() {
    let mut scene = Scene::new();
    let timer = scene.create_node("TimeSensor").unwrap();
    let interp = scene.create_node("ScalarInterpolator").unwrap();
    scene.add_root_child(timer).unwrap();
    scene.add_root_child(interp).unwrap();
    scene.add_route(timer, "fraction_changed", interp, "set_fraction").unwrap();

    let result = export_to_writer(&scene, Encoding::Xml, &compact(), Vec::new());
    assert!(matches!(result, Err(Error::MissingRouteLabel { .. })));
}

#[test]
fn test_unlabeled_shared_node_fails() {
    let mut scene = Scene::new();
    let shape = scene.create_node("Shape").unwrap();
    scene.add_root_child(shape).unwrap();
    scene.add_root_child(shape).unwrap();

    let result = export_to_writer(&scene, Encoding::Xml, &compact(), Vec::new());
    assert!(matches!(result, Err(Error::UnlabeledSharedNode { .. })));
}

#[test]
fn test_unsupported_version_writes_nothing() {
    let mut scene = Scene::new();
    labelled_box(&mut scene, "B");

    let options = ExportOptions::default().with_version(SpecVersion::VRML97);
    let mut out = Vec::new();
    let result = export_to_writer(&scene, Encoding::Xml, &options, &mut out);
    assert!(matches!(result, Err(Error::UnsupportedSpecVersion { major: 2, minor: 0, .. })));
    assert!(out.is_empty());

    let options = ExportOptions::default().with_version(SpecVersion::new(3, 7));
    let result = export_to_writer(&scene, Encoding::Binary, &options, &mut out);
    assert!(result.is_err());
    assert!(out.is_empty());
}

#[test]
fn test_container_field_only_when_not_default() {
    let mut scene = Scene::new();
    let set = scene.create_node("MetadataSet").unwrap();
    let entry = scene.create_node("MetadataString").unwrap();
    scene.set_field(entry, "name", FieldValue::string("author")).unwrap();
    scene.add_child(set, "value", entry).unwrap();
    let group = scene.create_node("Group").unwrap();
    scene.add_child(group, "metadata", set).unwrap();
    scene.add_root_child(group).unwrap();

    let (out, _) = xml(&scene, &compact());
    assert!(
        out.contains("<Group><MetadataSet><MetadataString containerField='value' name='author'/></MetadataSet></Group>"),
        "{out}"
    );

    // Binary element order already fixes the slot.
    let (bytes, _) = export(&scene, Encoding::Binary, &ExportOptions::default());
    let doc = InfosetReader::read_document(&bytes).unwrap();
    let entries = doc.elements("MetadataString");
    assert!(entries[0].iter().all(|(name, _)| *name != "containerField"));
}

#[test]
fn test_url_rewrite_leaves_scene_untouched() {
    let urls = ["http://host/models/tex.wrl#v", "http://host/models/a.png"];
    let mut scene = Scene::new();
    let texture = scene.create_node("ImageTexture").unwrap();
    scene.set_field(texture, "url", FieldValue::strings(urls)).unwrap();
    scene.add_root_child(texture).unwrap();

    let options = compact().with_base_url("http://host/models/").with_upgrade_legacy_urls(true);
    let (out, _) = xml(&scene, &options);
    assert!(out.contains("url='\"tex.x3d#v\" \"a.png\"'"), "{out}");

    let node = scene.node_ref(texture).unwrap();
    let index = node.field_index("url").unwrap();
    assert_eq!(node.field_value(index), Some(&FieldValue::strings(urls)));
}

#[test]
fn test_vrml97_classic_output() {
    let mut scene = Scene::new();
    scene.add_component("Geospatial", 1);
    scene.add_meta("title", "demo");
    let shape = labelled_box(&mut scene, "B");
    scene.add_root_child(shape).unwrap();
    scene.add_import(Import { inline_def: "I".into(), exported_name: "E".into(), local_name: None });
    scene.add_export(Export { node: shape, exported_name: Some("Thing".into()) }).unwrap();

    let options = ExportOptions::default().with_version(SpecVersion::VRML97);
    let (text, report) = classic(&scene, &options);
    assert!(text.starts_with("#VRML V2.0 utf8\n"), "{text}");
    assert!(text.contains("# title: demo"), "{text}");
    assert!(text.contains("DEF B Shape {\n  geometry Box { }\n}"), "{text}");
    assert!(!text.contains("COMPONENT"));
    assert!(!text.contains("PROFILE"));
    assert!(!text.contains("IMPORT"));
    assert!(!text.contains("EXPORT"));

    let unsupported = report
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::Unsupported { .. }))
        .count();
    assert_eq!(unsupported, 3);
}

#[test]
fn test_x3d_classic_header() {
    let mut scene = Scene::new();
    scene.set_profile("Interchange");
    scene.add_component("NURBS", 2);
    let shape = labelled_box(&mut scene, "B");
    scene.add_root_child(shape).unwrap();
    scene.add_export(Export { node: shape, exported_name: None }).unwrap();

    let options = ExportOptions::default().with_version(SpecVersion::X3D_3_3);
    let (text, report) = classic(&scene, &options);
    assert!(text.starts_with("#X3D V3.3 utf8\n\nPROFILE Interchange\nCOMPONENT NURBS:2\nMETA \"generator\""), "{text}");
    assert!(text.contains("\nEXPORT B"), "{text}");
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_export_to_path() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut scene = Scene::new();
    let shape = labelled_box(&mut scene, "B");
    scene.add_root_child(shape).unwrap();

    let xml_path = dir.path().join("scene.x3d");
    let report = export_to_path(&scene, &xml_path, &ExportOptions::default()).expect("export failed");
    assert_eq!(report.nodes, 2);
    let text = std::fs::read_to_string(&xml_path).unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE X3D"), "{text}");

    let bin_path = dir.path().join("scene.x3db");
    export_to_path(&scene, &bin_path, &ExportOptions::default()).expect("export failed");
    let bytes = std::fs::read(&bin_path).unwrap();
    let doc = InfosetReader::read_document(&bytes).expect("failed to read back");
    assert_eq!(doc.elements("Box").len(), 1);

    // Version errors surface before the file is created.
    let wrl = dir.path().join("scene.x3d.bad");
    assert!(export_to_path(&scene, &wrl, &ExportOptions::default()).is_err());
    let vrml_xml = dir.path().join("old.x3d");
    let options = ExportOptions::default().with_version(SpecVersion::VRML97);
    assert!(export_to_path(&scene, &vrml_xml, &options).is_err());
    assert!(!vrml_xml.exists());
}

/// Accepts `budget` bytes, then fails every write.
struct FailingWriter {
    budget: usize,
}

impl std::io::Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.budget == 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed"));
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_sink_failure_aborts_export() {
    let mut scene = Scene::new();
    for i in 0..8 {
        let shape = labelled_box(&mut scene, &format!("B{i}"));
        scene.add_root_child(shape).unwrap();
    }

    for encoding in [Encoding::Xml, Encoding::Binary, Encoding::Classic] {
        let result = export_to_writer(&scene, encoding, &compact(), FailingWriter { budget: 64 });
        match result {
            Err(err) => {
                assert!(matches!(err, Error::SinkWrite(_)), "{}: {err:?}", encoding.name());
                assert!(err.is_sink_failure());
            }
            Ok(_) => panic!("{} export succeeded on a failing sink", encoding.name()),
        }
    }
}

#[test]
fn test_stray_field_index_reported_and_skipped() {
    let mut scene = Scene::new();
    let geometry = scene.create_node("Box").unwrap();
    scene.set_field(geometry, "size", FieldValue::vec3f(1.0, 2.0, 3.0)).unwrap();
    scene.set_field_value(geometry, 40, FieldValue::int32(7)).unwrap();
    scene.add_root_child(geometry).unwrap();
    let sphere = scene.create_node("Sphere").unwrap();
    scene.add_root_child(sphere).unwrap();

    let (out, report) = xml(&scene, &compact());
    assert!(out.contains("<Box size='1 2 3'/><Sphere/>"), "{out}");
    assert!(!out.contains("'7'"), "{out}");
    assert_eq!(report.nodes, 2);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::UnknownField { kind, index: 40 } if kind == "Box")));
}

#[test]
fn test_fixed_digits_output_is_deterministic() {
    let mut scene = Scene::new();
    let t = scene.create_node("Transform").unwrap();
    scene.set_field(t, "translation", FieldValue::vec3f(1.23456, 2.0, -0.000123456)).unwrap();
    scene.add_root_child(t).unwrap();

    let options = compact()
        .with_compression(CompressionMethod::Strings)
        .with_significant_digits(Some(4));
    let (first, _) = xml(&scene, &options);
    let (second, _) = xml(&scene, &options);
    assert_eq!(first, second);
    assert!(first.contains("translation='1.235 2 -0.0001235'"), "{first}");

    let (first, _) = export(&scene, Encoding::Binary, &options);
    let (second, _) = export(&scene, Encoding::Binary, &options);
    assert_eq!(first, second);
}

#[test]
fn test_xml_whitespace_survives_attribute_normalization() {
    let mut scene = Scene::new();
    let info = scene.create_node("WorldInfo").unwrap();
    scene.set_field(info, "title", FieldValue::string("a\tb\rc\nd")).unwrap();
    scene.add_root_child(info).unwrap();

    let (out, report) = xml(&scene, &compact());
    assert!(out.contains("<WorldInfo title='a&#9;b&#13;c&#10;d'/>"), "{out}");
    assert!(!out.contains('\t') && !out.contains('\r'));
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_xml_rejects_control_characters() {
    let mut scene = Scene::new();
    let info = scene.create_node("WorldInfo").unwrap();
    scene.set_field(info, "title", FieldValue::string("x\u{1}y")).unwrap();
    scene.add_root_child(info).unwrap();

    let (out, report) = xml(&scene, &compact());
    assert!(out.contains("<WorldInfo/>"), "{out}");
    assert!(!out.contains('\u{1}'));
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::ValueMismatch { field, .. } if field == "title")));

    // Classic strings can carry it.
    let (text, report) = classic(&scene, &ExportOptions::default());
    assert!(text.contains("title \"x\u{1}y\""), "{text}");
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_vrml97_meta_comment_stays_on_one_line() {
    let mut scene = Scene::new();
    scene.set_profile("Immersive");
    scene.add_meta("note", "first\nDEF Evil Box { }\r\nlast");
    let shape = labelled_box(&mut scene, "B");
    scene.add_root_child(shape).unwrap();

    let options = ExportOptions::default().with_version(SpecVersion::VRML97);
    let (text, _) = classic(&scene, &options);
    assert!(text.contains("# note: first DEF Evil Box { }  last"), "{text}");
    assert!(!text.lines().any(|line| line.starts_with("DEF Evil")), "{text}");
}

#[test]
fn test_instance_is_block_precedes_values() {
    let mut scene = Scene::new();
    let ball = ball_prototype(&mut scene);
    let outer = scene
        .add_prototype(
            "Pair",
            vec![FieldDecl::new("size", FieldType::SFFloat, Access::InputOutput).with_default(FieldValue::float(2.0))],
        )
        .unwrap();
    let inner = scene.create_proto_instance(ball).unwrap();
    scene.set_field(inner, "label", FieldValue::string("x")).unwrap();
    scene.connect_is(outer, inner, "radius", "size").unwrap();
    scene.add_proto_body_node(outer, inner).unwrap();
    let instance = scene.create_proto_instance(outer).unwrap();
    scene.add_root_child(instance).unwrap();

    let (out, _) = xml(&scene, &compact());
    assert!(
        out.contains(
            "<ProtoInstance name='Ball'><IS><connect nodeField='radius' protoField='size'/></IS>\
             <fieldValue name='label' value='x'/></ProtoInstance>"
        ),
        "{out}"
    );

    let (bytes, _) = export(&scene, Encoding::Binary, &compact());
    let doc = InfosetReader::read_document(&bytes).unwrap();
    let starts: Vec<&str> = doc
        .events
        .iter()
        .filter_map(|e| match e {
            InfosetEvent::Start(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();
    let value = starts.iter().position(|n| *n == "fieldValue").expect("no fieldValue element");
    assert_eq!(starts[value - 3..=value], ["ProtoInstance", "IS", "connect", "fieldValue"], "{starts:?}");
}
