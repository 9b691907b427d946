//! `lib/screens/{snake}/{snake}_form_screen.dart`: create and edit form.

use std::fmt::Write as _;

use crate::naming::{dart_string, DartType, EntityPlan, Field};
use crate::template::render;

const FORM_SCREEN: &str = r#"import 'package:flutter/material.dart';
import '../../models/{{snake}}_model.dart';

class {{Class}}FormScreen extends StatefulWidget {
  final {{Class}}? initialItem;
  final Future<bool> Function({{Class}}) onSaved;

  const {{Class}}FormScreen({
    super.key,
    this.initialItem,
    required this.onSaved,
  });

  @override
  State<{{Class}}FormScreen> createState() => _{{Class}}FormScreenState();
}

class _{{Class}}FormScreenState extends State<{{Class}}FormScreen> {
  final _formKey = GlobalKey<FormState>();
  bool _isLoading = false;
{{state}}

  @override
  void initState() {
    super.initState();
    final initial = widget.initialItem;
    if (initial != null) {
{{init}}
    }
  }

  @override
  void dispose() {
{{dispose}}
    super.dispose();
  }

  @override
  Widget build(BuildContext context) {
    return Scaffold(
      appBar: AppBar(
        title: Text(widget.initialItem == null ? 'Crear {{Class}}' : 'Editar {{Class}}'),
        backgroundColor: Theme.of(context).colorScheme.inversePrimary,
      ),
      body: _isLoading
          ? Center(child: CircularProgressIndicator())
          : SingleChildScrollView(
              padding: EdgeInsets.all(16.0),
              child: Form(
                key: _formKey,
                child: Column(
                  children: [
{{inputs}}
                    SizedBox(height: 32),
                    Row(
                      children: [
                        Expanded(
                          child: ElevatedButton(
                            onPressed: _saveItem,
                            style: ElevatedButton.styleFrom(
                              padding: EdgeInsets.symmetric(vertical: 16),
                            ),
                            child: Text(
                              widget.initialItem == null ? 'Crear' : 'Actualizar',
                              style: TextStyle(fontSize: 16),
                            ),
                          ),
                        ),
                        SizedBox(width: 16),
                        Expanded(
                          child: OutlinedButton(
                            onPressed: () => Navigator.pop(context),
                            style: OutlinedButton.styleFrom(
                              padding: EdgeInsets.symmetric(vertical: 16),
                            ),
                            child: Text(
                              'Cancelar',
                              style: TextStyle(fontSize: 16),
                            ),
                          ),
                        ),
                      ],
                    ),
                  ],
                ),
              ),
            ),
    );
  }

  Future<void> _saveItem() async {
    if (!_formKey.currentState!.validate()) {
      return;
    }

    setState(() {
      _isLoading = true;
    });

    try {
      final item = {{Class}}(
{{build}}
      );

      final success = await widget.onSaved(item);

      if (mounted && success) {
        Navigator.pop(context);
        ScaffoldMessenger.of(context).showSnackBar(
          SnackBar(
            content: Text(widget.initialItem == null
              ? '{{Class}} creado exitosamente'
              : '{{Class}} actualizado exitosamente'),
            backgroundColor: Colors.green,
          ),
        );
      }
    } catch (e) {
      if (mounted) {
        ScaffoldMessenger.of(context).showSnackBar(
          SnackBar(
            content: Text('Error al guardar: $e'),
            backgroundColor: Colors.red,
          ),
        );
      }
    } finally {
      if (mounted) {
        setState(() {
          _isLoading = false;
        });
      }
    }
  }
}
"#;

pub fn form_screen_dart(plan: &EntityPlan) -> String {
    let mut state = String::new();
    let mut init = String::new();
    let mut dispose = String::new();
    let mut inputs = Vec::new();

    for f in plan.editable() {
        let name = &f.field;
        if f.dart == DartType::Bool {
            let _ = write!(state, "\n  bool {name}Value = false;");
            let _ = writeln!(init, "      {name}Value = initial.{name};");
        } else {
            let _ = write!(state, "\n  final {name}Controller = TextEditingController();");
            let text = if f.dart == DartType::DateTime {
                format!("initial.{name}.toIso8601String()")
            } else {
                format!("initial.{name}.toString()")
            };
            let _ = writeln!(init, "      {name}Controller.text = {text};");
            let _ = writeln!(dispose, "    {name}Controller.dispose();");
        }
        inputs.push(input(f));
    }

    let mut build = String::new();
    for f in &plan.fields {
        let _ = writeln!(build, "        {}: {},", f.field, rebuild_expr(f));
    }

    let inputs = inputs.join("\n                    SizedBox(height: 16),\n");
    render(
        FORM_SCREEN,
        &[
            ("Class", plan.class.as_str()),
            ("snake", plan.snake.as_str()),
            ("state", state.as_str()),
            ("init", init.trim_end()),
            ("dispose", dispose.trim_end()),
            ("inputs", inputs.as_str()),
            ("build", build.trim_end()),
        ],
    )
}

fn input(f: &Field) -> String {
    let name = &f.field;
    let label = dart_string(&f.wire);
    match f.dart {
        DartType::Bool => format!(
            r#"                    Row(
                      children: [
                        Text('{label}:'),
                        SizedBox(width: 16),
                        Switch(
                          value: {name}Value,
                          onChanged: (value) {{
                            setState(() {{
                              {name}Value = value;
                            }});
                          }},
                        ),
                      ],
                    ),"#
        ),
        DartType::DateTime => format!(
            r#"                    TextFormField(
                      controller: {name}Controller,
                      decoration: InputDecoration(
                        labelText: '{label} (YYYY-MM-DD)',
                        border: OutlineInputBorder(),
                        hintText: '2025-01-01',
                      ),
                      keyboardType: TextInputType.datetime,
                      validator: (value) {{
                        if (value == null || value.isEmpty) {{
                          return 'Por favor ingrese {label}';
                        }}
                        if (DateTime.tryParse(value) == null) {{
                          return 'Formato de fecha inválido (YYYY-MM-DD)';
                        }}
                        return null;
                      }},
                    ),"#
        ),
        _ => {
            let keyboard = if f.dart.is_numeric() {
                "TextInputType.number"
            } else {
                "TextInputType.text"
            };
            format!(
                r#"                    TextFormField(
                      controller: {name}Controller,
                      decoration: InputDecoration(
                        labelText: '{label}',
                        border: OutlineInputBorder(),
                      ),
                      keyboardType: {keyboard},
                      validator: (value) {{
                        if (value == null || value.isEmpty) {{
                          return 'Por favor ingrese {label}';
                        }}
                        return null;
                      }},
                    ),"#
            )
        }
    }
}

/// Turn the control's raw value back into the field type. Unparseable
/// numbers become zero and unparseable dates become now.
fn rebuild_expr(f: &Field) -> String {
    let name = &f.field;
    if f.is_id {
        return "widget.initialItem?.id".to_string();
    }
    match f.dart {
        DartType::Bool => format!("{name}Value"),
        DartType::Int => format!("int.tryParse({name}Controller.text) ?? 0"),
        DartType::Double => format!("double.tryParse({name}Controller.text) ?? 0.0"),
        DartType::DateTime => format!("DateTime.tryParse({name}Controller.text) ?? DateTime.now()"),
        DartType::String => format!("{name}Controller.text"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::plan_entities;
    use serde_json::json;
    use umlforge_core::sanitize;

    fn screen(entity: serde_json::Value) -> String {
        form_screen_dart(&plan_entities(&sanitize(&json!({ "entities": [entity] })))[0])
    }

    #[test]
    fn controls_follow_attribute_types() {
        let dart = screen(json!({
            "name": "Empleado",
            "attributes": [
                {"name": "id", "type": "Long"},
                {"name": "nombre", "type": "String"},
                {"name": "activo", "type": "Boolean"},
                {"name": "ingreso", "type": "Date"},
                {"name": "salario", "type": "Double"}
            ]
        }));
        assert!(!dart.contains("idController"));
        assert!(dart.contains("  bool activoValue = false;"));
        assert!(!dart.contains("activoController"));
        assert!(dart.contains("Switch(\n                          value: activoValue,"));
        assert!(dart.contains("labelText: 'ingreso (YYYY-MM-DD)',"));
        assert!(dart.contains("if (DateTime.tryParse(value) == null) {"));
        assert!(dart.contains("keyboardType: TextInputType.number,"));
        assert!(dart.contains("ingresoController.text = initial.ingreso.toIso8601String();"));
        assert!(!dart.contains("{{"));
    }

    #[test]
    fn submit_rebuilds_every_field() {
        let dart = screen(json!({
            "name": "Producto",
            "attributes": [
                {"name": "stock", "type": "Integer"},
                {"name": "precio", "type": "Double"},
                {"name": "vence", "type": "DateTime"},
                {"name": "nombre"}
            ]
        }));
        assert!(dart.contains("        id: widget.initialItem?.id,"));
        assert!(dart.contains("        stock: int.tryParse(stockController.text) ?? 0,"));
        assert!(dart.contains("        precio: double.tryParse(precioController.text) ?? 0.0,"));
        assert!(dart.contains("        vence: DateTime.tryParse(venceController.text) ?? DateTime.now(),"));
        assert!(dart.contains("        nombre: nombreController.text,"));
    }
}
