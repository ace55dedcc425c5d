//! Built-in node schemas.
//!
//! Field order follows the published interface definitions, with `metadata`
//! first. Only kinds the exporter is routinely fed are listed; anything else
//! can be registered by the caller or arrives as an opaque node.

use crate::util::FieldType::*;
use crate::util::FieldValue;

use super::catalog::{Catalog, SchemaBuilder};

/// Kind of the implicit root that holds a scene's top-level nodes.
pub const WORLD_ROOT: &str = "WorldRoot";

fn b(v: bool) -> FieldValue {
    FieldValue::bool(v)
}

fn i(v: i32) -> FieldValue {
    FieldValue::int32(v)
}

fn f(v: f32) -> FieldValue {
    FieldValue::float(v)
}

fn t(v: f64) -> FieldValue {
    FieldValue::double(v)
}

fn s(v: &str) -> FieldValue {
    FieldValue::string(v)
}

fn v2(x: f32, y: f32) -> FieldValue {
    FieldValue::vec2f(x, y)
}

fn v3(x: f32, y: f32, z: f32) -> FieldValue {
    FieldValue::vec3f(x, y, z)
}

fn rot0() -> FieldValue {
    FieldValue::rotation(0.0, 0.0, 1.0, 0.0)
}

fn floats() -> FieldValue {
    FieldValue::Floats(Vec::new())
}

fn ints() -> FieldValue {
    FieldValue::Int32s(Vec::new())
}

fn strs(values: &[&str]) -> FieldValue {
    FieldValue::strings(values.iter().copied())
}

fn null() -> FieldValue {
    FieldValue::Node(None)
}

fn nodes() -> FieldValue {
    FieldValue::Nodes(Vec::new())
}

fn grouping(name: &str) -> SchemaBuilder {
    SchemaBuilder::new(name, "children")
        .input("addChildren", MFNode)
        .input("removeChildren", MFNode)
        .io("children", MFNode, nodes())
}

fn with_bbox(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .init("bboxCenter", SFVec3f, v3(0.0, 0.0, 0.0))
        .init("bboxSize", SFVec3f, v3(-1.0, -1.0, -1.0))
}

fn interpolator(name: &str, key_value: crate::util::FieldType, value: crate::util::FieldType) -> SchemaBuilder {
    SchemaBuilder::new(name, "children")
        .input("set_fraction", SFFloat)
        .io("key", MFFloat, floats())
        .io("keyValue", key_value, key_value.zero_value())
        .output("value_changed", value)
}

/// Register every built-in schema.
pub(crate) fn register_all(catalog: &mut Catalog) {
    let schemas = [
        SchemaBuilder::new(WORLD_ROOT, "children")
            .io("children", MFNode, nodes()),

        // Grouping
        with_bbox(grouping("Group")),
        with_bbox(
            grouping("Transform")
                .io("center", SFVec3f, v3(0.0, 0.0, 0.0))
                .io("rotation", SFRotation, rot0())
                .io("scale", SFVec3f, v3(1.0, 1.0, 1.0))
                .io("scaleOrientation", SFRotation, rot0())
                .io("translation", SFVec3f, v3(0.0, 0.0, 0.0)),
        ),
        with_bbox(grouping("Switch").io("whichChoice", SFInt32, i(-1))),
        with_bbox(
            grouping("Anchor")
                .io("description", SFString, s(""))
                .io("parameter", MFString, strs(&[]))
                .io("url", MFString, strs(&[])),
        ),
        with_bbox(grouping("Billboard").io("axisOfRotation", SFVec3f, v3(0.0, 1.0, 0.0))),
        with_bbox(
            grouping("LOD")
                .init("center", SFVec3f, v3(0.0, 0.0, 0.0))
                .init("range", MFFloat, floats()),
        ),
        with_bbox(
            SchemaBuilder::new("Inline", "children")
                .io("load", SFBool, b(true))
                .io("url", MFString, strs(&[])),
        ),
        with_bbox(
            SchemaBuilder::new("StaticGroup", "children").init("children", MFNode, nodes()),
        ),

        // Shape
        with_bbox(
            SchemaBuilder::new("Shape", "children")
                .io("appearance", SFNode, null())
                .io("geometry", SFNode, null()),
        ),
        SchemaBuilder::new("Appearance", "appearance")
            .io("fillProperties", SFNode, null())
            .io("lineProperties", SFNode, null())
            .io("material", SFNode, null())
            .io("texture", SFNode, null())
            .io("textureTransform", SFNode, null()),
        SchemaBuilder::new("Material", "material")
            .io("ambientIntensity", SFFloat, f(0.2))
            .io("diffuseColor", SFColor, v3(0.8, 0.8, 0.8))
            .io("emissiveColor", SFColor, v3(0.0, 0.0, 0.0))
            .io("shininess", SFFloat, f(0.2))
            .io("specularColor", SFColor, v3(0.0, 0.0, 0.0))
            .io("transparency", SFFloat, f(0.0)),
        SchemaBuilder::new("LineProperties", "lineProperties")
            .io("applied", SFBool, b(true))
            .io("linetype", SFInt32, i(1))
            .io("linewidthScaleFactor", SFFloat, f(0.0)),
        SchemaBuilder::new("ImageTexture", "texture")
            .io("url", MFString, strs(&[]))
            .init("repeatS", SFBool, b(true))
            .init("repeatT", SFBool, b(true)),
        SchemaBuilder::new("PixelTexture", "texture")
            .io("image", SFImage, FieldValue::Int32s(vec![0, 0, 0]))
            .init("repeatS", SFBool, b(true))
            .init("repeatT", SFBool, b(true)),
        SchemaBuilder::new("TextureTransform", "textureTransform")
            .io("center", SFVec2f, v2(0.0, 0.0))
            .io("rotation", SFFloat, f(0.0))
            .io("scale", SFVec2f, v2(1.0, 1.0))
            .io("translation", SFVec2f, v2(0.0, 0.0)),
        SchemaBuilder::new("TextureTransformMatrix3D", "textureTransform")
            .io("matrix", SFMatrix4f, glam::Mat4::IDENTITY.into()),

        // Geometry
        SchemaBuilder::new("Box", "geometry")
            .init("size", SFVec3f, v3(2.0, 2.0, 2.0))
            .init("solid", SFBool, b(true)),
        SchemaBuilder::new("Sphere", "geometry")
            .init("radius", SFFloat, f(1.0))
            .init("solid", SFBool, b(true)),
        SchemaBuilder::new("Cone", "geometry")
            .init("bottom", SFBool, b(true))
            .init("bottomRadius", SFFloat, f(1.0))
            .init("height", SFFloat, f(2.0))
            .init("side", SFBool, b(true))
            .init("solid", SFBool, b(true)),
        SchemaBuilder::new("Cylinder", "geometry")
            .init("bottom", SFBool, b(true))
            .init("height", SFFloat, f(2.0))
            .init("radius", SFFloat, f(1.0))
            .init("side", SFBool, b(true))
            .init("solid", SFBool, b(true))
            .init("top", SFBool, b(true)),
        SchemaBuilder::new("IndexedFaceSet", "geometry")
            .input("set_colorIndex", MFInt32)
            .input("set_coordIndex", MFInt32)
            .input("set_normalIndex", MFInt32)
            .input("set_texCoordIndex", MFInt32)
            .io("color", SFNode, null())
            .io("coord", SFNode, null())
            .io("normal", SFNode, null())
            .io("texCoord", SFNode, null())
            .init("ccw", SFBool, b(true))
            .init("colorIndex", MFInt32, ints())
            .init("colorPerVertex", SFBool, b(true))
            .init("convex", SFBool, b(true))
            .init("coordIndex", MFInt32, ints())
            .init("creaseAngle", SFFloat, f(0.0))
            .init("normalIndex", MFInt32, ints())
            .init("normalPerVertex", SFBool, b(true))
            .init("solid", SFBool, b(true))
            .init("texCoordIndex", MFInt32, ints()),
        SchemaBuilder::new("IndexedLineSet", "geometry")
            .input("set_colorIndex", MFInt32)
            .input("set_coordIndex", MFInt32)
            .io("color", SFNode, null())
            .io("coord", SFNode, null())
            .init("colorIndex", MFInt32, ints())
            .init("colorPerVertex", SFBool, b(true))
            .init("coordIndex", MFInt32, ints()),
        SchemaBuilder::new("IndexedTriangleSet", "geometry")
            .input("set_index", MFInt32)
            .io("color", SFNode, null())
            .io("coord", SFNode, null())
            .io("normal", SFNode, null())
            .io("texCoord", SFNode, null())
            .init("ccw", SFBool, b(true))
            .init("colorPerVertex", SFBool, b(true))
            .init("normalPerVertex", SFBool, b(true))
            .init("solid", SFBool, b(true))
            .init("index", MFInt32, ints()),
        SchemaBuilder::new("PointSet", "geometry")
            .io("color", SFNode, null())
            .io("coord", SFNode, null()),
        SchemaBuilder::new("Text", "geometry")
            .io("fontStyle", SFNode, null())
            .io("length", MFFloat, floats())
            .io("maxExtent", SFFloat, f(0.0))
            .io("string", MFString, strs(&[]))
            .init("solid", SFBool, b(false)),
        SchemaBuilder::new("FontStyle", "fontStyle")
            .init("family", MFString, strs(&["SERIF"]))
            .init("horizontal", SFBool, b(true))
            .init("justify", MFString, strs(&["BEGIN"]))
            .init("language", SFString, s(""))
            .init("leftToRight", SFBool, b(true))
            .init("size", SFFloat, f(1.0))
            .init("spacing", SFFloat, f(1.0))
            .init("style", SFString, s("PLAIN"))
            .init("topToBottom", SFBool, b(true)),

        // Geometry properties
        SchemaBuilder::new("Coordinate", "coord").io("point", MFVec3f, floats()),
        SchemaBuilder::new("CoordinateDouble", "coord")
            .io("point", MFVec3d, FieldValue::Doubles(Vec::new())),
        SchemaBuilder::new("Normal", "normal").io("vector", MFVec3f, floats()),
        SchemaBuilder::new("Color", "color").io("color", MFColor, floats()),
        SchemaBuilder::new("ColorRGBA", "color").io("color", MFColorRGBA, floats()),
        SchemaBuilder::new("TextureCoordinate", "texCoord").io("point", MFVec2f, floats()),

        // Environment, lights, viewpoints
        SchemaBuilder::new("Background", "children")
            .input("set_bind", SFBool)
            .io("groundAngle", MFFloat, floats())
            .io("groundColor", MFColor, floats())
            .io("skyAngle", MFFloat, floats())
            .io("skyColor", MFColor, FieldValue::Floats(vec![0.0, 0.0, 0.0]))
            .io("transparency", SFFloat, f(0.0))
            .output("bindTime", SFTime)
            .output("isBound", SFBool),
        SchemaBuilder::new("DirectionalLight", "children")
            .io("ambientIntensity", SFFloat, f(0.0))
            .io("color", SFColor, v3(1.0, 1.0, 1.0))
            .io("direction", SFVec3f, v3(0.0, 0.0, -1.0))
            .io("global", SFBool, b(false))
            .io("intensity", SFFloat, f(1.0))
            .io("on", SFBool, b(true)),
        SchemaBuilder::new("PointLight", "children")
            .io("ambientIntensity", SFFloat, f(0.0))
            .io("attenuation", SFVec3f, v3(1.0, 0.0, 0.0))
            .io("color", SFColor, v3(1.0, 1.0, 1.0))
            .io("global", SFBool, b(true))
            .io("intensity", SFFloat, f(1.0))
            .io("location", SFVec3f, v3(0.0, 0.0, 0.0))
            .io("on", SFBool, b(true))
            .io("radius", SFFloat, f(100.0)),
        SchemaBuilder::new("Viewpoint", "children")
            .input("set_bind", SFBool)
            .io("centerOfRotation", SFVec3f, v3(0.0, 0.0, 0.0))
            .io("description", SFString, s(""))
            .io("fieldOfView", SFFloat, f(0.785_398))
            .io("jump", SFBool, b(true))
            .io("orientation", SFRotation, rot0())
            .io("position", SFVec3f, v3(0.0, 0.0, 10.0))
            .output("bindTime", SFTime)
            .output("isBound", SFBool),
        SchemaBuilder::new("NavigationInfo", "children")
            .input("set_bind", SFBool)
            .io("avatarSize", MFFloat, FieldValue::Floats(vec![0.25, 1.6, 0.75]))
            .io("headlight", SFBool, b(true))
            .io("speed", SFFloat, f(1.0))
            .io("type", MFString, strs(&["EXAMINE", "ANY"]))
            .io("visibilityLimit", SFFloat, f(0.0))
            .output("isBound", SFBool),
        SchemaBuilder::new("WorldInfo", "children")
            .init("info", MFString, strs(&[]))
            .init("title", SFString, s("")),

        // Time, sensors, interpolators
        SchemaBuilder::new("TimeSensor", "children")
            .io("cycleInterval", SFTime, t(1.0))
            .io("enabled", SFBool, b(true))
            .io("loop", SFBool, b(false))
            .io("pauseTime", SFTime, t(0.0))
            .io("resumeTime", SFTime, t(0.0))
            .io("startTime", SFTime, t(0.0))
            .io("stopTime", SFTime, t(0.0))
            .output("cycleTime", SFTime)
            .output("elapsedTime", SFTime)
            .output("fraction_changed", SFFloat)
            .output("isActive", SFBool)
            .output("isPaused", SFBool)
            .output("time", SFTime),
        SchemaBuilder::new("TouchSensor", "children")
            .io("description", SFString, s(""))
            .io("enabled", SFBool, b(true))
            .output("hitNormal_changed", SFVec3f)
            .output("hitPoint_changed", SFVec3f)
            .output("hitTexCoord_changed", SFVec2f)
            .output("isActive", SFBool)
            .output("isOver", SFBool)
            .output("touchTime", SFTime),
        interpolator("PositionInterpolator", MFVec3f, SFVec3f),
        interpolator("OrientationInterpolator", MFRotation, SFRotation),
        interpolator("ScalarInterpolator", MFFloat, SFFloat),
        interpolator("ColorInterpolator", MFColor, SFColor),
        interpolator("CoordinateInterpolator", MFVec3f, MFVec3f),
        interpolator("NormalInterpolator", MFVec3f, MFVec3f),

        // Sound
        SchemaBuilder::new("AudioClip", "source")
            .io("description", SFString, s(""))
            .io("loop", SFBool, b(false))
            .io("pauseTime", SFTime, t(0.0))
            .io("pitch", SFFloat, f(1.0))
            .io("resumeTime", SFTime, t(0.0))
            .io("startTime", SFTime, t(0.0))
            .io("stopTime", SFTime, t(0.0))
            .io("url", MFString, strs(&[]))
            .output("duration_changed", SFTime)
            .output("isActive", SFBool),
        SchemaBuilder::new("Sound", "children")
            .io("direction", SFVec3f, v3(0.0, 0.0, 1.0))
            .io("intensity", SFFloat, f(1.0))
            .io("location", SFVec3f, v3(0.0, 0.0, 0.0))
            .io("maxBack", SFFloat, f(10.0))
            .io("maxFront", SFFloat, f(10.0))
            .io("minBack", SFFloat, f(1.0))
            .io("minFront", SFFloat, f(1.0))
            .io("priority", SFFloat, f(0.0))
            .io("source", SFNode, null())
            .init("spatialize", SFBool, b(true)),

        // Metadata
        SchemaBuilder::new("MetadataString", "metadata")
            .io("name", SFString, s(""))
            .io("reference", SFString, s(""))
            .io("value", MFString, strs(&[])),
        SchemaBuilder::new("MetadataFloat", "metadata")
            .io("name", SFString, s(""))
            .io("reference", SFString, s(""))
            .io("value", MFFloat, floats()),
        SchemaBuilder::new("MetadataDouble", "metadata")
            .io("name", SFString, s(""))
            .io("reference", SFString, s(""))
            .io("value", MFDouble, FieldValue::Doubles(Vec::new())),
        SchemaBuilder::new("MetadataInteger", "metadata")
            .io("name", SFString, s(""))
            .io("reference", SFString, s(""))
            .io("value", MFInt32, ints()),
        SchemaBuilder::new("MetadataSet", "metadata")
            .io("name", SFString, s(""))
            .io("reference", SFString, s(""))
            .io("value", MFNode, nodes()),

        // Scripting
        SchemaBuilder::new("Script", "children")
            .dynamic()
            .io("url", MFString, strs(&[]))
            .init("directOutput", SFBool, b(false))
            .init("mustEvaluate", SFBool, b(false)),
    ];

    for builder in schemas {
        catalog.register(builder.build());
    }
}
