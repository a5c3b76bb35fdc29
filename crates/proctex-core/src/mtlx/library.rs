//! Built-in node definitions
//!
//! A subset of the MaterialX standard library large enough to describe the
//! procedural texture graphs glTF can carry, plus the glTF PBR and unlit
//! shading models and the surface material. Definitions from other
//! libraries can be loaded with [`crate::mtlx::xml::load_library_file`].

use super::{NodeDef, Port};

const VALUE_TYPES: &[&str] = &["float", "color3", "color4", "vector2", "vector3", "vector4"];
const NON_FLOAT_TYPES: &[&str] = &["color3", "color4", "vector2", "vector3", "vector4"];

/// (name, type, default value); an empty default means none
type InputSpec<'a> = (&'a str, &'a str, &'a str);

fn def(name: &str, node: &str, inputs: &[InputSpec<'_>], outputs: &[(&str, &str)]) -> NodeDef {
    let mut def = NodeDef {
        name: name.to_string(),
        node: node.to_string(),
        ..NodeDef::default()
    };
    for (input_name, input_type, default) in inputs {
        let mut port = Port::new(*input_name, *input_type);
        if !default.is_empty() {
            port.value = Some((*default).to_string());
        }
        def.inputs.insert((*input_name).to_string(), port);
    }
    for (output_name, output_type) in outputs {
        def.outputs.insert(
            (*output_name).to_string(),
            Port::new(*output_name, *output_type),
        );
    }
    def
}

/// Zero value string for a type
fn zero(value_type: &str) -> &'static str {
    match value_type {
        "color3" | "vector3" => "0, 0, 0",
        "color4" | "vector4" => "0, 0, 0, 0",
        "vector2" => "0, 0",
        _ => "0",
    }
}

/// One value string for a type
fn one(value_type: &str) -> &'static str {
    match value_type {
        "color3" | "vector3" => "1, 1, 1",
        "color4" | "vector4" => "1, 1, 1, 1",
        "vector2" => "1, 1",
        _ => "1",
    }
}

fn math_defs(defs: &mut Vec<NodeDef>) {
    let binary = [
        ("add", false),
        ("subtract", false),
        ("multiply", true),
        ("divide", true),
        ("max", false),
        ("min", false),
        ("power", true),
        ("modulo", true),
    ];
    for (op, identity_one) in binary {
        for &ty in VALUE_TYPES {
            let in2 = if identity_one { one(ty) } else { zero(ty) };
            defs.push(def(
                &format!("ND_{op}_{ty}"),
                op,
                &[("in1", ty, zero(ty)), ("in2", ty, in2)],
                &[("out", ty)],
            ));
        }
        for &ty in NON_FLOAT_TYPES {
            let in2 = if identity_one { "1" } else { "0" };
            defs.push(def(
                &format!("ND_{op}_{ty}FA"),
                op,
                &[("in1", ty, zero(ty)), ("in2", "float", in2)],
                &[("out", ty)],
            ));
        }
    }

    for op in ["absval", "floor", "ceil", "sin", "cos", "sqrt", "sign"] {
        for &ty in VALUE_TYPES {
            defs.push(def(
                &format!("ND_{op}_{ty}"),
                op,
                &[("in", ty, zero(ty))],
                &[("out", ty)],
            ));
        }
    }

    for &ty in VALUE_TYPES {
        defs.push(def(
            &format!("ND_clamp_{ty}"),
            "clamp",
            &[("in", ty, zero(ty)), ("low", ty, zero(ty)), ("high", ty, one(ty))],
            &[("out", ty)],
        ));
        defs.push(def(
            &format!("ND_mix_{ty}"),
            "mix",
            &[("fg", ty, zero(ty)), ("bg", ty, zero(ty)), ("mix", "float", "0")],
            &[("out", ty)],
        ));
        defs.push(def(
            &format!("ND_remap_{ty}"),
            "remap",
            &[
                ("in", ty, zero(ty)),
                ("inlow", ty, zero(ty)),
                ("inhigh", ty, one(ty)),
                ("outlow", ty, zero(ty)),
                ("outhigh", ty, one(ty)),
            ],
            &[("out", ty)],
        ));
        defs.push(def(
            &format!("ND_smoothstep_{ty}"),
            "smoothstep",
            &[("in", ty, zero(ty)), ("low", ty, zero(ty)), ("high", ty, one(ty))],
            &[("out", ty)],
        ));
        defs.push(def(
            &format!("ND_ifgreater_{ty}"),
            "ifgreater",
            &[
                ("value1", "float", "1"),
                ("value2", "float", "0"),
                ("in1", ty, zero(ty)),
                ("in2", ty, zero(ty)),
            ],
            &[("out", ty)],
        ));
    }

    defs.push(def(
        "ND_dotproduct_vector3",
        "dotproduct",
        &[("in1", "vector3", "0, 0, 0"), ("in2", "vector3", "0, 0, 0")],
        &[("out", "float")],
    ));
    defs.push(def(
        "ND_crossproduct_vector3",
        "crossproduct",
        &[("in1", "vector3", "0, 0, 0"), ("in2", "vector3", "0, 0, 0")],
        &[("out", "vector3")],
    ));
    defs.push(def(
        "ND_normalize_vector3",
        "normalize",
        &[("in", "vector3", "0, 0, 0")],
        &[("out", "vector3")],
    ));
    defs.push(def(
        "ND_magnitude_vector3",
        "magnitude",
        &[("in", "vector3", "0, 0, 0")],
        &[("out", "float")],
    ));
}

fn channel_defs(defs: &mut Vec<NodeDef>) {
    defs.push(def(
        "ND_separate2_vector2",
        "separate2",
        &[("in", "vector2", "0, 0")],
        &[("outx", "float"), ("outy", "float")],
    ));
    defs.push(def(
        "ND_separate3_color3",
        "separate3",
        &[("in", "color3", "0, 0, 0")],
        &[("outr", "float"), ("outg", "float"), ("outb", "float")],
    ));
    defs.push(def(
        "ND_separate3_vector3",
        "separate3",
        &[("in", "vector3", "0, 0, 0")],
        &[("outx", "float"), ("outy", "float"), ("outz", "float")],
    ));
    defs.push(def(
        "ND_separate4_color4",
        "separate4",
        &[("in", "color4", "0, 0, 0, 0")],
        &[
            ("outr", "float"),
            ("outg", "float"),
            ("outb", "float"),
            ("outa", "float"),
        ],
    ));
    defs.push(def(
        "ND_separate4_vector4",
        "separate4",
        &[("in", "vector4", "0, 0, 0, 0")],
        &[
            ("outx", "float"),
            ("outy", "float"),
            ("outz", "float"),
            ("outw", "float"),
        ],
    ));

    defs.push(def(
        "ND_combine2_vector2",
        "combine2",
        &[("in1", "float", "0"), ("in2", "float", "0")],
        &[("out", "vector2")],
    ));
    for ty in ["color3", "vector3"] {
        defs.push(def(
            &format!("ND_combine3_{ty}"),
            "combine3",
            &[("in1", "float", "0"), ("in2", "float", "0"), ("in3", "float", "0")],
            &[("out", ty)],
        ));
    }
    for ty in ["color4", "vector4"] {
        defs.push(def(
            &format!("ND_combine4_{ty}"),
            "combine4",
            &[
                ("in1", "float", "0"),
                ("in2", "float", "0"),
                ("in3", "float", "0"),
                ("in4", "float", "0"),
            ],
            &[("out", ty)],
        ));
    }

    for (from, to) in [
        ("float", "color3"),
        ("float", "vector3"),
        ("color3", "vector3"),
        ("vector3", "color3"),
        ("color3", "color4"),
        ("color4", "color3"),
        ("vector2", "vector3"),
    ] {
        defs.push(def(
            &format!("ND_convert_{from}_{to}"),
            "convert",
            &[("in", from, zero(from))],
            &[("out", to)],
        ));
    }
}

fn source_defs(defs: &mut Vec<NodeDef>) {
    for ty in ["float", "color3", "color4", "vector2", "vector3", "vector4", "integer", "boolean", "string", "filename"] {
        let default = match ty {
            "boolean" => "false",
            "string" | "filename" => "",
            other => zero(other),
        };
        defs.push(def(
            &format!("ND_constant_{ty}"),
            "constant",
            &[("value", ty, default)],
            &[("out", ty)],
        ));
    }

    defs.push(def(
        "ND_texcoord_vector2",
        "texcoord",
        &[("index", "integer", "0")],
        &[("out", "vector2")],
    ));
    defs.push(def(
        "ND_texcoord_vector3",
        "texcoord",
        &[("index", "integer", "0")],
        &[("out", "vector3")],
    ));
    for node in ["position", "normal"] {
        defs.push(def(
            &format!("ND_{node}_vector3"),
            node,
            &[("space", "string", "object")],
            &[("out", "vector3")],
        ));
    }

    defs.push(def(
        "ND_place2d_vector2",
        "place2d",
        &[
            ("texcoord", "vector2", "0, 0"),
            ("pivot", "vector2", "0, 0"),
            ("scale", "vector2", "1, 1"),
            ("rotate", "float", "0"),
            ("offset", "vector2", "0, 0"),
            ("operationorder", "integer", "0"),
        ],
        &[("out", "vector2")],
    ));
}

fn texture_defs(defs: &mut Vec<NodeDef>) {
    for &ty in VALUE_TYPES {
        defs.push(def(
            &format!("ND_image_{ty}"),
            "image",
            &[
                ("file", "filename", ""),
                ("layer", "string", ""),
                ("default", ty, zero(ty)),
                ("texcoord", "vector2", ""),
                ("uaddressmode", "string", "periodic"),
                ("vaddressmode", "string", "periodic"),
                ("filtertype", "string", "linear"),
            ],
            &[("out", ty)],
        ));
        defs.push(def(
            &format!("ND_tiledimage_{ty}"),
            "tiledimage",
            &[
                ("file", "filename", ""),
                ("default", ty, zero(ty)),
                ("texcoord", "vector2", ""),
                ("uvtiling", "vector2", "1, 1"),
                ("uvoffset", "vector2", "0, 0"),
            ],
            &[("out", ty)],
        ));
    }
    for ty in ["float", "color3", "color4", "vector3"] {
        defs.push(def(
            &format!("ND_gltf_image_{ty}"),
            "gltf_image",
            &[
                ("file", "filename", ""),
                ("default", ty, zero(ty)),
                ("uv_index", "integer", "0"),
                ("offset", "vector2", "0, 0"),
                ("rotate", "float", "0"),
                ("scale", "vector2", "1, 1"),
            ],
            &[("out", ty)],
        ));
    }

    for ty in ["float", "color3", "vector2", "vector3"] {
        defs.push(def(
            &format!("ND_noise2d_{ty}"),
            "noise2d",
            &[
                ("amplitude", ty, one(ty)),
                ("pivot", "float", "0"),
                ("texcoord", "vector2", ""),
            ],
            &[("out", ty)],
        ));
        defs.push(def(
            &format!("ND_noise3d_{ty}"),
            "noise3d",
            &[
                ("amplitude", ty, one(ty)),
                ("pivot", "float", "0"),
                ("position", "vector3", ""),
            ],
            &[("out", ty)],
        ));
        defs.push(def(
            &format!("ND_fractal3d_{ty}"),
            "fractal3d",
            &[
                ("amplitude", ty, one(ty)),
                ("octaves", "integer", "3"),
                ("lacunarity", "float", "2"),
                ("diminish", "float", "0.5"),
                ("position", "vector3", ""),
            ],
            &[("out", ty)],
        ));
    }
    defs.push(def(
        "ND_checkerboard_color3",
        "checkerboard",
        &[
            ("color1", "color3", "1, 1, 1"),
            ("color2", "color3", "0, 0, 0"),
            ("uvtiling", "vector2", "8, 8"),
            ("uvoffset", "vector2", "0, 0"),
            ("texcoord", "vector2", ""),
        ],
        &[("out", "color3")],
    ));
    defs.push(def(
        "ND_normalmap_float",
        "normalmap",
        &[("in", "vector3", "0.5, 0.5, 1"), ("scale", "float", "1")],
        &[("out", "vector3")],
    ));
}

fn shading_defs(defs: &mut Vec<NodeDef>) {
    defs.push(def(
        "ND_gltf_pbr_surfaceshader",
        "gltf_pbr",
        &[
            ("base_color", "color3", "1, 1, 1"),
            ("alpha", "float", "1"),
            ("metallic", "float", "1"),
            ("roughness", "float", "1"),
            ("normal", "vector3", ""),
            ("tangent", "vector3", ""),
            ("occlusion", "float", "1"),
            ("transmission", "float", "0"),
            ("specular", "float", "1"),
            ("specular_color", "color3", "1, 1, 1"),
            ("ior", "float", "1.5"),
            ("alpha_mode", "integer", "0"),
            ("alpha_cutoff", "float", "0.5"),
            ("emissive", "color3", "0, 0, 0"),
            ("emissive_strength", "float", "1"),
        ],
        &[("out", "surfaceshader")],
    ));
    defs.push(def(
        "ND_surface_unlit",
        "surface_unlit",
        &[
            ("emission", "float", "1"),
            ("emission_color", "color3", "1, 1, 1"),
            ("transmission", "float", "0"),
            ("transmission_color", "color3", "1, 1, 1"),
            ("opacity", "float", "1"),
        ],
        &[("out", "surfaceshader")],
    ));
    defs.push(def(
        "ND_surfacematerial",
        "surfacematerial",
        &[
            ("surfaceshader", "surfaceshader", ""),
            ("backsurfaceshader", "surfaceshader", ""),
            ("displacementshader", "displacementshader", ""),
        ],
        &[("out", "material")],
    ));
}

/// The built-in definition library
pub fn standard_library() -> Vec<NodeDef> {
    let mut defs = Vec::new();
    math_defs(&mut defs);
    channel_defs(&mut defs);
    source_defs(&mut defs);
    texture_defs(&mut defs);
    shading_defs(&mut defs);
    defs
}
