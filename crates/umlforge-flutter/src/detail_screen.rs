//! `lib/screens/{snake}/{snake}_detail_screen.dart`

use std::fmt::Write as _;

use crate::naming::{dart_string, DartType, EntityPlan, Field};
use crate::template::render;

const DETAIL_SCREEN: &str = r#"import 'package:flutter/material.dart';
import '../../models/{{snake}}_model.dart';
import '{{snake}}_form_screen.dart';

class {{Class}}DetailScreen extends StatelessWidget {
  final {{Class}} item;

  const {{Class}}DetailScreen({
    super.key,
    required this.item,
  });

  @override
  Widget build(BuildContext context) {
    return Scaffold(
      appBar: AppBar(
        title: Text('Detalle de {{Class}}'),
        backgroundColor: Theme.of(context).colorScheme.inversePrimary,
        actions: [
          IconButton(
            icon: Icon(Icons.edit),
            onPressed: () => _editItem(context),
            tooltip: 'Editar',
          ),
        ],
      ),
      body: SingleChildScrollView(
        padding: EdgeInsets.all(16.0),
        child: Card(
          elevation: 4,
          child: Padding(
            padding: EdgeInsets.all(16.0),
            child: Column(
              crossAxisAlignment: CrossAxisAlignment.start,
              children: [
                Text(
                  'Información de {{Class}}',
                  style: Theme.of(context).textTheme.headlineSmall?.copyWith(
                    fontWeight: FontWeight.bold,
                    color: Theme.of(context).primaryColor,
                  ),
                ),
                SizedBox(height: 20),
{{rows}}
              ],
            ),
          ),
        ),
      ),
    );
  }

  Widget _buildDetailRow(String label, String value) {
    return Padding(
      padding: EdgeInsets.symmetric(vertical: 8.0),
      child: Row(
        crossAxisAlignment: CrossAxisAlignment.start,
        children: [
          Expanded(
            flex: 2,
            child: Text(
              '$label:',
              style: TextStyle(
                fontWeight: FontWeight.w600,
                color: Colors.grey[700],
              ),
            ),
          ),
          Expanded(
            flex: 3,
            child: Text(
              value,
              style: TextStyle(
                fontSize: 16,
              ),
            ),
          ),
        ],
      ),
    );
  }

  void _editItem(BuildContext context) {
    Navigator.push(
      context,
      MaterialPageRoute(
        builder: (context) => {{Class}}FormScreen(
          initialItem: item,
          onSaved: (updatedItem) async {
            Navigator.popUntil(context, (route) => route.isFirst);
            return true;
          },
        ),
      ),
    );
  }
}
"#;

/// Only declared attributes are shown; a synthesized `id` stays hidden.
pub fn detail_screen_dart(plan: &EntityPlan) -> String {
    let mut rows = String::new();
    for f in plan.declared() {
        let _ = writeln!(
            rows,
            "                _buildDetailRow('{}', {}),",
            dart_string(&f.wire),
            display_expr(f)
        );
    }
    render(
        DETAIL_SCREEN,
        &[
            ("Class", plan.class.as_str()),
            ("snake", plan.snake.as_str()),
            ("rows", rows.trim_end()),
        ],
    )
}

/// Booleans read as Sí/No, dates keep only the day, missing identifiers show N/A.
fn display_expr(f: &Field) -> String {
    let value = if f.is_id {
        format!("item.{}!", f.field)
    } else {
        format!("item.{}", f.field)
    };
    let shown = match f.dart {
        DartType::Bool => format!("({value} ? 'Sí' : 'No')"),
        DartType::DateTime => format!("{value}.toIso8601String().split('T')[0]"),
        _ => format!("{value}.toString()"),
    };
    if f.is_id {
        format!("item.{} == null ? 'N/A' : {shown}", f.field)
    } else {
        shown
    }
}
