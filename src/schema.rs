//! The cylinder parameter schema.
//!
//! Every successful extraction carries exactly these fields, in this order.
//! Values are always human-readable strings ("160 mm", "DOUBLE ACTING",
//! "0.05 mm TIR"), never numbers or booleans, so the schema declares every
//! property as `"type": "string"`.
//!
//! The schema is the contractual boundary with the model: it is embedded in
//! the instructions sent with each drawing (see [`crate::prompts`]) and is the
//! authority the validator checks replies against.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

/// One named parameter in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub description: &'static str,
}

impl FieldDef {
    /// Every field is mandatory in a successful result.
    pub const fn required(&self) -> bool {
        true
    }
}

const CYLINDER_FIELDS: &[FieldDef] = &[
    FieldDef {
        name: "bore_diameter",
        description: "The bore diameter of the cylinder, including units (e.g., '160 mm').",
    },
    FieldDef {
        name: "mounting",
        description: "The mounting type of the cylinder (e.g., 'Clevis', 'Flange', 'Trunnion').",
    },
    FieldDef {
        name: "operating_temperature",
        description: "The operating temperature, including units (e.g., '80°C').",
    },
    FieldDef {
        name: "operating_pressure",
        description: "The operating pressure, including units (e.g., '21 MPa', '140 Kg/cm²').",
    },
    FieldDef {
        name: "close_length",
        description: "The fully retracted length of the cylinder, including units (e.g., '1140 mm').",
    },
    FieldDef {
        name: "drawing_number",
        description: "The drawing or part number.",
    },
    FieldDef {
        name: "fluid",
        description: "The type of hydraulic or pneumatic fluid (e.g., 'HYD. OIL MINERAL', 'AIR').",
    },
    FieldDef {
        name: "rod_end",
        description: "The type of rod end (e.g., 'Thread', 'Clevis', 'Rod Eye').",
    },
    FieldDef {
        name: "cylinder_action",
        description: "Whether the cylinder is single or double acting (e.g., 'DOUBLE ACTING').",
    },
    FieldDef {
        name: "stroke_length",
        description: "The stroke length of the cylinder, including units (e.g., '2600 mm').",
    },
    FieldDef {
        name: "rod_diameter",
        description: "The rod diameter, including units (e.g., '110 mm').",
    },
    FieldDef {
        name: "outside_diameter",
        description: "The outside diameter of the cylinder barrel, including units (e.g., '190 mm').",
    },
    FieldDef {
        name: "body_material",
        description: "The material of the cylinder body (e.g., 'SS400', 'Carbon Steel').",
    },
    FieldDef {
        name: "open_length",
        description: "The fully extended length of the cylinder, including units (e.g., '3740 mm').",
    },
    FieldDef {
        name: "rated_load",
        description: "The maximum pulling or pushing force, including units (e.g., '311 kN').",
    },
    FieldDef {
        name: "piston_material",
        description: "The material of the piston (e.g., 'S45C', 'Cast Iron').",
    },
    FieldDef {
        name: "standard",
        description: "Any applicable industry standard (e.g., 'ISO 6020/6022').",
    },
    FieldDef {
        name: "surface_finish",
        description: "The surface finish specification (e.g., 'HONED', 'Ra 0.4').",
    },
    FieldDef {
        name: "coating_thickness",
        description: "The coating or plating thickness, including units (e.g., '20 M', '25 micron Chrome').",
    },
    FieldDef {
        name: "special_features",
        description: "Any unique design elements or notes (e.g., 'Cushioned', 'Air Bleeders').",
    },
    FieldDef {
        name: "cylinder_configuration",
        description: "The overall configuration (e.g., 'Standard', 'Telescopic').",
    },
    FieldDef {
        name: "cylinder_style",
        description: "The style of the cylinder (e.g., 'Tie Rod', 'Welded').",
    },
    FieldDef {
        name: "concentricity_of_rod_and_tube",
        description: "The concentricity tolerance, including units (e.g., '0.05 mm TIR').",
    },
];

/// Ordered, immutable set of parameter definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSchema {
    fields: &'static [FieldDef],
}

impl ParameterSchema {
    /// The hydraulic/pneumatic cylinder schema.
    pub const fn cylinder() -> Self {
        Self {
            fields: CYLINDER_FIELDS,
        }
    }

    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Render as a JSON Schema object: every property is a described string
    /// and every property is listed under `required`.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            properties.insert(
                field.name.to_string(),
                json!({ "type": "string", "description": field.description }),
            );
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required())
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::cylinder()
    }
}

static RE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\-\s]+").unwrap());

/// Human-readable label for a field name: separators become single spaces
/// and each word is capitalised (`rod_end` → `Rod End`).
pub fn field_label(name: &str) -> String {
    RE_SEPARATORS
        .split(name.trim())
        .filter(|w| !w.is_empty())
        .map(capitalise)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}
