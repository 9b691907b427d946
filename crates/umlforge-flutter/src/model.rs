//! `lib/models/{snake}_model.dart`

use std::fmt::Write as _;

use crate::naming::{dart_string, DartType, EntityPlan, Field};
use crate::template::render;

const MODEL: &str = r#"class {{Class}} {
{{fields}}
  const {{Class}}({
{{params}}
  });

  factory {{Class}}.fromJson(Map<String, dynamic> json) {
    return {{Class}}(
{{from_json}}
    );
  }

  Map<String, dynamic> toJson() {
    return {
{{to_json}}
    };
  }
}
"#;

pub fn model_dart(plan: &EntityPlan) -> String {
    let mut fields = String::new();
    let mut params = String::new();
    let mut from_json = String::new();
    let mut to_json = String::new();

    for f in &plan.fields {
        let nullable = if f.is_id { "?" } else { "" };
        let _ = writeln!(fields, "  final {}{} {};", f.dart.name(), nullable, f.field);
        if f.is_id {
            let _ = writeln!(params, "    this.{},", f.field);
        } else {
            let _ = writeln!(params, "    required this.{},", f.field);
        }
        let _ = writeln!(from_json, "      {}: {},", f.field, decode_expr(f));
        let _ = writeln!(to_json, "      '{}': {},", dart_string(&f.wire), encode_expr(f));
    }

    render(
        MODEL,
        &[
            ("Class", plan.class.as_str()),
            ("fields", fields.trim_end()),
            ("params", params.trim_end()),
            ("from_json", from_json.trim_end()),
            ("to_json", to_json.trim_end()),
        ],
    )
}

/// Read one field from `json`. Missing values fall back to a zero value,
/// or to `null` for the identifier.
fn decode_expr(f: &Field) -> String {
    let key = format!("json['{}']", dart_string(&f.wire));
    match (f.dart, f.is_id) {
        (DartType::Int, true) => format!("({key} as num?)?.toInt()"),
        (DartType::Int, false) => format!("({key} as num?)?.toInt() ?? 0"),
        (DartType::Double, true) => format!("({key} as num?)?.toDouble()"),
        (DartType::Double, false) => format!("({key} as num?)?.toDouble() ?? 0.0"),
        (DartType::Bool, true) => format!("{key} as bool?"),
        (DartType::Bool, false) => format!("{key} as bool? ?? false"),
        (DartType::DateTime, true) => {
            format!("{key} != null ? DateTime.parse({key} as String) : null")
        }
        (DartType::DateTime, false) => {
            format!("{key} != null ? DateTime.parse({key} as String) : DateTime.now()")
        }
        (DartType::String, true) => format!("{key}?.toString()"),
        (DartType::String, false) => format!("{key}?.toString() ?? ''"),
    }
}

fn encode_expr(f: &Field) -> String {
    match (f.dart, f.is_id) {
        (DartType::DateTime, true) => format!("{}?.toIso8601String()", f.field),
        (DartType::DateTime, false) => format!("{}.toIso8601String()", f.field),
        _ => f.field.clone(),
    }
}
