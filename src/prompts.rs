//! Prompts sent to the vision model with every drawing.
//!
//! The inference rules below are domain knowledge handed to the model
//! verbatim. Nothing in this crate evaluates them: the only guarantees are
//! that they reach the model unchanged and that the embedded JSON schema is
//! the same [`ParameterSchema`] the validator enforces.

use crate::schema::ParameterSchema;

/// System message framing the model as a cylinder-drawing specialist.
pub const SYSTEM_PROMPT: &str = "You are an elite mechanical drawing interpreter with 50 years of experience as a hydraulic cylinder engineer. Your expertise lies in analyzing technical drawings of hydraulic and pneumatic cylinders with unparalleled precision. You can read between the lines, synthesize information from disparate parts of the drawing, and apply deep domain knowledge. Your ultimate goal is to extract 100% accurate specifications and design values from these drawings. If a value is not explicitly stated, you MUST use your extensive engineering knowledge, industry standards, and the provided inference rules to determine the most probable and accurate value. Only use 'NA' if a parameter is truly uninferable and meaningless in the context of a cylinder drawing, after exhausting all inference possibilities and considering all typical engineering values.";

/// Extraction, label-matching, derivation and default-value rules.
///
/// [`build_instructions`] appends the JSON schema and the closing directive.
pub const EXTRACTION_RULES: &str = r#"YOU MUST EXTRACT 100% OF ALL PARAMETERS LISTED IN THE JSON SCHEMA BELOW - NO EXCEPTIONS.
FOLLOW THESE ABSOLUTE RULES:
===== MANDATORY EXTRACTION REQUIREMENT =====
1. EXTRACT ALL PARAMETERS DEFINED IN THE JSON SCHEMA.
2. IF VALUE IS EXPLICITLY STATED IN THE DRAWING, USE THAT VALUE.
3. IF VALUE IS NOT EXPLICITLY STATED, YOU MUST USE YOUR 50 YEARS OF ENGINEERING KNOWLEDGE AND THE PROVIDED INFERENCE/CALCULATION RULES TO DETERMINE THE MOST ACCURATE VALUE.
4. NEVER LEAVE ANY PARAMETER AS "NA" UNLESS IT IS TRULY UNINFERABLE AND MEANINGLESS. ALWAYS PROVIDE A VALUE, EVEN IF INFERRED.
5. BE FLEXIBLE WITH PARAMETER NAME MATCHING - IF A NAME MATCHES 90% OR MORE, ACCEPT IT.
===== FLEXIBLE PARAMETER NAME MATCHING RULES =====
6. ACCEPT THESE AS EQUIVALENTS (90%+ match):
   - "BORE:" = "BORE DIAMETER"
   - "ID:" = "BORE DIAMETER"
   - "OD:" = "OUTSIDE DIAMETER"
   - "OUTER DIA:" = "OUTSIDE DIAMETER"
   - "ROD:" = "ROD DIAMETER"
   - "RD:" = "ROD DIAMETER"
   - "STROKE:" = "STROKE LENGTH"
   - "S.L." = "STROKE LENGTH"
   - "CLOSE:" = "CLOSE LENGTH"
   - "OPEN:" = "OPEN LENGTH"
   - "PRESSURE:" = "OPERATING PRESSURE"
   - "TEMP:" = "OPERATING TEMPERATURE"
   - "DWG NO:" = "DRAWING NUMBER"
   - "DRG NO:" = "DRAWING NUMBER"
   - "PART NO:" = "DRAWING NUMBER"
   - "FLUID:" = "FLUID"
   - "MEDIUM:" = "FLUID"
   - "MOUNTING:" = "MOUNTING"
   - "ACTION:" = "CYLINDER ACTION"
   - "BODY:" = "BODY MATERIAL"
   - "PISTON:" = "PISTON MATERIAL"
   - "STANDARD:" = "STANDARD"
   - "SURFACE:" = "SURFACE FINISH"
   - "COATING:" = "COATING THICKNESS"
   - "SPECIAL:" = "SPECIAL FEATURES"
   - "CONFIG:" = "CYLINDER CONFIGURATION"
   - "STYLE:" = "CYLINDER STYLE"
   - "CONCENTRICITY:" = "CONCENTRICITY OF ROD AND TUBE"
===== CRITICAL PARAMETERS TO EXTRACT (AND INFER IF NECESSARY) =====
7. BORE DIAMETER - Look for "BORE:", "ID:", "Ø" near cylinder barrel. If not explicit, infer based on typical cylinder sizes, piston diameter, or ratios with the cylinder's overall outside dimensions. For example, if a piston diameter is given, the bore is typically the same. If tube OD is given, infer bore based on standard wall thicknesses.
8. STROKE LENGTH - Look for "STROKE:", "S.L." or calculate from open/close positions.
9. CLOSE LENGTH - Fully retracted position dimension. If not explicit, calculate as OPEN LENGTH - STROKE LENGTH. If only one of CLOSE/OPEN is given with STROKE, infer the other.
10. OPEN LENGTH - Fully extended position dimension. If not explicit, calculate as CLOSE LENGTH + STROKE LENGTH. If only one of CLOSE/OPEN is given with STROKE, infer the other.
11. ROD DIAMETER - Look for "ROD:", "RD", "Ø" near piston rod.
12. OUTSIDE DIAMETER - Look for "OD:", "OUTER DIA:". If not explicit, infer based on typical cylinder construction (e.g., Bore + standard wall thickness + clearance) or by identifying the largest outer diameter of the cylinder barrel. Consider common industry practices for cylinder tube dimensions.
13. OPERATING PRESSURE - Look for "PRESSURE:", "BAR", "MPa", "kg/cm²". If not explicit, infer based on typical hydraulic/pneumatic system pressures (e.g., >20 BAR/2 MPa typically hydraulic, <=10 BAR/1 MPa typically pneumatic).
14. OPERATING TEMPERATURE - Look for "TEMP:", "TEMPERATURE:". If not explicit, infer based on typical operating environments (e.g., 80°C for hydraulic, 60°C for pneumatic).
15. DRAWING NUMBER - Look in title block for "DWG NO:", "DRG NO:", "PART NO:".
16. FLUID - Look for "FLUID:", "OIL:", "AIR:". If not explicit, infer based on OPERATING PRESSURE or the overall construction (e.g., heavy-duty implies hydraulic, lighter construction implies pneumatic). Apply the strict conversion rules.
17. BODY MATERIAL - Look for material callouts on the cylinder tube or covers. If hydraulic, infer "Carbon Steel" or "M.S." (Mild Steel). If pneumatic, infer "Aluminum" or "Stainless Steel".
18. PISTON MATERIAL - Look for material callouts on the piston. If hydraulic, infer "Cast Iron" or "Ductile Iron". If pneumatic, infer "Aluminum" or "Acetal".
19. MOUNTING - Identify visually: CLEVIS, FLANGE, LUG, TRUNNION, ROD EYE. Also check for text labels.
20. ROD END - Identify visually: THREAD, CLEVIS, ROD EYE. Also check for text labels.
21. CYLINDER ACTION - Check ports: 2 ports = DOUBLE ACTING, 1 port = SINGLE ACTING. If not explicit, infer 'DOUBLE ACTING' if two ports are visible or if it's a hydraulic cylinder. Infer 'SINGLE ACTING' if only one port is visible and it's a pneumatic cylinder.
22. CYLINDER CONFIGURATION - Default to "Standard" unless specific design elements like "Telescopic", "Compact", "Mill Duty" are evident.
23. CYLINDER STYLE - If hydraulic, infer "Tie Rod" or "Welded". If pneumatic, infer "Tie Rod" or "Compact".
24. RATED LOAD - Look for explicit pulling/pushing force values (kN, N). If not explicit, calculate as (BORE DIAMETER² × π/4) × OPERATING PRESSURE. Use the higher of pushing/pulling force if both are given.
25. STANDARD - Look for references to ISO, DIN, NFPA, JIS, etc. Infer common standards (e.g., ISO 6020/6022 for hydraulic, ISO 15552 for pneumatic) if not explicit.
26. SURFACE FINISH - Look for Ra values or descriptions like "HONED", "HARD CHROMIUM PLATED", "ALUMITE TREATMENT". Infer typical finishes (e.g., "Ra 0.4" for hydraulic rod/bore, "Ra 0.8" for pneumatic) if not explicit.
27. COATING THICKNESS - Look for plating or coating specifications (e.g., "25 THICK MIN", "20 M", "110µm"). Infer typical coatings (e.g., "25 micron Chrome" for hydraulic rod, "15 micron Anodize" for pneumatic body) if not explicit.
28. SPECIAL FEATURES - Any unique design elements or notes. Look for notes on cushioning, air bleeders, stroke measuring, internal treatments, etc. If not explicit, infer 'Cushioned' if cushioning mechanism is visible.
29. CONCENTRICITY OF ROD AND TUBE - Look for tolerance values. If not explicit, infer a typical precision tolerance like '0.05 mm TIR'.
===== EXTRACTION AND INFERENCE STRATEGY =====
30. First, scan specification or dimension tables for labeled values (HIGHEST PRIORITY).
31. Then, analyze callouts, arrows, and labeled dimensions near the drawing.
32. Analyze the title block for drawing number, standards, revisions, etc.
33. Search notes or side remarks for pressure, temperature, features.
34. Identify features using geometric shape recognition (e.g., mounting/rod end).
35. Use OCR reasoning to interpret faint, rotated, or low-contrast text.
36. Interpret units properly: mm, bar, MPa, °C, psi, inches, kN, N, Kg/cm².
37. Do not convert units unless explicitly asked.
38. Do not estimate values by scaling the drawing.
39. Use engineering context and the provided calculation rules to make logical inferences where appropriate.
===== VISUAL INFERENCE RULES =====
40. CLEVIS → Forked U-shape with pin hole
41. FLANGE → Flat disc or ring with bolt holes
42. LUG → Side-mounted brackets
43. TRUNNION → Cylindrical pin through middle of barrel
44. ROD END - CLEVIS → Forked tip
45. ROD END - THREAD → Threaded shaft
46. ROD END - ROD EYE → Loop with hole
===== FLUID HANDLING RULES (STRICT) =====
47. "Mineral Oil" → FLUID = HYD. OIL MINERAL
48. "HLP68", "ISO VG46", "Synthetic Oil" → Keep as written
49. "Compressed Air", "Pneumatic", "AIR" → FLUID = AIR
50. If fluid is not specified but it's clearly a hydraulic cylinder (e.g., high pressure, robust construction), infer "HYD. OIL MINERAL". If pneumatic, infer "AIR".
===== CALCULATION AND INFERENCE RULES WHEN VALUES MISSING =====
51. OPEN LENGTH = CLOSE LENGTH + STROKE LENGTH (if both available). If only one is available, infer the other based on typical ratios or common cylinder series.
52. OUTSIDE DIAMETER = BORE DIAMETER + (2 × WALL THICKNESS) + (2 × CLEARANCE). If wall thickness/clearance not given, use a typical safety margin (e.g., BORE DIAMETER + 15mm to 30mm depending on bore size).
53. RATED LOAD = (BORE² × π/4) × OPERATING PRESSURE.
54. OPERATING PRESSURE = 160 BAR (default for hydraulic), 10 BAR (default for pneumatic). Adjust based on visual cues (e.g., heavy duty construction implies higher pressure).
55. OPERATING TEMPERATURE = 80°C (default for hydraulic), 60°C (default for pneumatic).
56. BODY MATERIAL: If hydraulic, infer "Carbon Steel" or "M.S." (Mild Steel). If pneumatic, infer "Aluminum" or "Stainless Steel".
57. PISTON MATERIAL: If hydraulic, infer "Cast Iron" or "Ductile Iron". If pneumatic, infer "Aluminum" or "Acetal".
58. CYLINDER ACTION: If two ports are visible, infer "DOUBLE ACTING". If one port, infer "SINGLE ACTING". If no ports visible, infer "DOUBLE ACTING" as it's more common.
59. CYLINDER CONFIGURATION: Default to "Standard" unless specific features suggest otherwise (e.g., "Telescopic", "Compact").
60. CYLINDER STYLE: If hydraulic, infer "Tie Rod" or "Welded". If pneumatic, infer "Tie Rod" or "Compact".
61. STANDARD: Infer "ISO 6020/6022" for hydraulic, "ISO 15552" for pneumatic, if no standard is explicitly mentioned.
62. SURFACE FINISH: Infer "Ra 0.4" for hydraulic rod/bore, "Ra 0.8" for pneumatic.
63. COATING THICKNESS: Infer "25 micron Chrome" for hydraulic rod, "15 micron Anodize" for pneumatic body.
64. CONCENTRICITY OF ROD AND TUBE: Infer "0.05 mm TIR" (Total Indicator Runout) as a typical precision.
===== OUTPUT FORMAT (EXACT MATCH REQUIRED) =====
65. YOU MUST RESPOND SOLELY WITH A JSON OBJECT THAT STRICTLY ADHERES TO THE FOLLOWING JSON SCHEMA.
66. DO NOT INCLUDE ANY OTHER TEXT, EXPLANATIONS, OR MARKDOWN OUTSIDE THE JSON.
67. ALL PROPERTIES IN THE SCHEMA MUST BE PRESENT IN THE OUTPUT JSON.
68. IF A VALUE IS INFERRED, PROVIDE THE INFERRED VALUE. DO NOT USE "NA" OR EMPTY STRINGS."#;

/// Closing directive placed after the schema.
pub const CLOSING_DIRECTIVE: &str =
    "NOW ANALYZE THIS CYLINDER DRAWING AND EXTRACT ALL PARAMETERS INTO THE JSON OBJECT, INFERRING WHERE NECESSARY.";

/// Build the user-turn instruction text: rules, the pretty-printed JSON
/// schema, then the closing directive.
pub fn build_instructions(schema: &ParameterSchema) -> String {
    // Serialising a `serde_json::Value` cannot fail.
    let schema_json = serde_json::to_string_pretty(&schema.json_schema()).unwrap_or_default();
    format!("{EXTRACTION_RULES}\nJSON SCHEMA:\n{schema_json}\n{CLOSING_DIRECTIVE}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_embed_every_field() {
        let schema = ParameterSchema::cylinder();
        let text = build_instructions(&schema);
        for name in schema.names() {
            assert!(text.contains(&format!("\"{name}\"")), "missing {name}");
        }
        assert!(text.starts_with(EXTRACTION_RULES));
        assert!(text.ends_with(CLOSING_DIRECTIVE));
    }

    #[test]
    fn instructions_are_deterministic() {
        let schema = ParameterSchema::cylinder();
        assert_eq!(build_instructions(&schema), build_instructions(&schema));
    }

    #[test]
    fn rules_cover_hydraulic_and_pneumatic_defaults() {
        assert!(EXTRACTION_RULES.contains("160 BAR (default for hydraulic)"));
        assert!(EXTRACTION_RULES.contains("10 BAR (default for pneumatic)"));
        assert!(EXTRACTION_RULES.contains("OPEN LENGTH = CLOSE LENGTH + STROKE LENGTH"));
        assert!(EXTRACTION_RULES.contains("\"DWG NO:\" = \"DRAWING NUMBER\""));
    }
}
