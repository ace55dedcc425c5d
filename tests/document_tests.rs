//! Scene documents loaded from disk and exported end to end.

use std::fs;

use x3d_export::core::{Diagnostic, ExportOptions};
use x3d_export::export::export_to_path;
use x3d_export::scene::load_scene;
use x3d_export::util::FieldValue;

use tempfile::TempDir;

const ANIMATED: &str = r#"{
    "profile": "Interactive",
    "meta": [{ "name": "title", "content": "Spinner" }],
    "protos": [{
        "name": "Spinner",
        "interface": [
            { "name": "speed", "type": "SFTime", "access": "inputOutput", "default": 4.0 },
            { "name": "label", "type": "SFString", "access": "initializeOnly", "default": "spin" }
        ],
        "body": [
            { "kind": "TimeSensor", "def": "Clock", "fields": { "loop": true }, "is": { "cycleInterval": "speed" } },
            { "kind": "OrientationInterpolator", "def": "Turn", "fields": {
                "key": [0, 0.5, 1],
                "keyValue": [[0, 1, 0, 0], [0, 1, 0, 3.14159], [0, 1, 0, 6.28318]]
            } },
            { "kind": "GeoOrigin" }
        ],
        "routes": [{ "from": "Clock", "from_field": "fraction_changed", "to": "Turn", "to_field": "set_fraction" }]
    }],
    "nodes": [
        { "kind": "Transform", "def": "Top", "fields": {
            "children": [
                { "kind": "Shape", "def": "Body", "fields": { "geometry": { "kind": "Cone" } } },
                { "kind": "Spinner", "fields": { "speed": 4.0, "label": "fast" } },
                { "use": "Body" }
            ]
        } }
    ],
    "exports": [{ "node": "Top", "as": "Root" }]
}"#;

fn write_scene(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("animated.json");
    fs::write(&path, ANIMATED).expect("Failed to write scene document");
    path
}

#[test]
fn test_document_to_xml() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let scene = load_scene(write_scene(&dir)).expect("Failed to load scene");
    assert_eq!(scene.profile(), "Interactive");

    let out = dir.path().join("animated.x3d");
    let options = ExportOptions::default().with_strip_whitespace(true);
    let report = export_to_path(&scene, &out, &options).expect("export failed");
    let text = fs::read_to_string(&out).unwrap();
    println!("{text}");

    assert!(text.contains("<meta name='title' content='Spinner'/>"));
    assert!(text.contains("<meta name='generator' content='x3d-export "));
    assert!(text.contains("<ProtoDeclare name='Spinner'>"));
    assert!(text.contains("<TimeSensor DEF='Clock' loop='true'><IS><connect nodeField='cycleInterval' protoField='speed'/></IS></TimeSensor>"));
    assert!(text.contains("<ROUTE fromNode='Clock' fromField='fraction_changed' toNode='Turn' toField='set_fraction'/></ProtoBody>"));
    assert!(text.contains("<ProtoInstance name='Spinner'><fieldValue name='label' value='fast'/></ProtoInstance>"));
    assert!(text.contains("<Shape USE='Body'/>"));
    assert!(text.contains("<EXPORT localDEF='Top' AS='Root'/>"));

    assert_eq!(report.uses, 1);
    assert_eq!(report.routes, 1);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::UnsupportedNodeKind { kind, proto } if kind == "GeoOrigin" && proto == "Spinner")));
    let spinner = &report.default_instances["Spinner"];
    assert_eq!(spinner.field_defaults.len(), 2);
    assert_eq!(spinner.field_default(1), Some(&FieldValue::string("spin")));
}

#[test]
fn test_document_to_classic() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let scene = load_scene(write_scene(&dir)).expect("Failed to load scene");

    let out = dir.path().join("animated.x3dv");
    export_to_path(&scene, &out, &ExportOptions::default()).expect("export failed");
    let text = fs::read_to_string(&out).unwrap();
    println!("{text}");

    assert!(text.starts_with("#X3D V3.2 utf8\n\nPROFILE Interactive\nMETA \"title\" \"Spinner\""));
    assert!(text.contains("PROTO Spinner [\n  inputOutput SFTime speed 4\n  initializeOnly SFString label \"spin\"\n]\n{"));
    assert!(text.contains("ROUTE Clock.fraction_changed TO Turn.set_fraction"));
    assert!(text.contains("DEF Body Shape {\n      geometry Cone { }\n    }"));
    assert!(text.contains("Spinner {\n      label \"fast\"\n    }"));
    assert!(text.contains("\nEXPORT Top AS Root"));
}
