//! Files generated once per project: pubspec, app shell and HTTP helpers.

use std::fmt::Write as _;

use crate::naming::EntityPlan;
use crate::template::render;

const PUBSPEC: &str = r#"name: {{name}}
description: UI generada automáticamente desde un diagrama UML (CRUD conectado a API)
publish_to: "none"
version: 0.1.0

environment:
  sdk: ">=3.0.0 <4.0.0"

dependencies:
  flutter:
    sdk: flutter
  http: ^1.1.0
  provider: ^6.1.1

dev_dependencies:
  flutter_test:
    sdk: flutter

flutter:
  uses-material-design: true
"#;

const MAIN: &str = r#"import 'package:flutter/material.dart';
{{imports}}

void main() {
  runApp(const GeneratedApp());
}

class GeneratedApp extends StatelessWidget {
  const GeneratedApp({super.key});

  @override
  Widget build(BuildContext context) {
    return MaterialApp(
      title: 'UI Generada',
      theme: ThemeData(useMaterial3: true, colorSchemeSeed: Colors.blue),
      home: const _HomeGenerated(),
      debugShowCheckedModeBanner: false,
    );
  }
}

class _HomeGenerated extends StatelessWidget {
  const _HomeGenerated();

  @override
  Widget build(BuildContext context) {
    return Scaffold(
      appBar: AppBar(title: Text('Proyecto Flutter generado')),
      drawer: Drawer(
        child: ListView(
          padding: EdgeInsets.zero,
          children: <Widget>[
            DrawerHeader(
              decoration: BoxDecoration(color: Colors.blue),
              child: Text('Tablas UML', style: TextStyle(color: Colors.white, fontSize: 24)),
            ),
{{tiles}}
          ],
        ),
      ),
      body: Center(
        child: Text(
          'Selecciona una tabla en el menú lateral para ver su CRUD.',
          textAlign: TextAlign.center,
        ),
      ),
    );
  }
}
"#;

const TILE: &str = r#"            ListTile(
              leading: Icon(Icons.table_chart),
              title: Text('{{Class}}'),
              onTap: () {
                Navigator.push(
                  context,
                  MaterialPageRoute(builder: (context) => {{Class}}ListScreen()),
                );
              },
            ),"#;

pub const API_CONFIG: &str = r#"import 'package:flutter/foundation.dart' show kIsWeb;
import 'dart:io' show Platform;

class ApiConfig {
  static String get baseUrl {
    if (kIsWeb) {
      return 'http://localhost:8080/api';
    } else if (Platform.isAndroid) {
      // The Android emulator reaches the host through 10.0.2.2.
      return 'http://10.0.2.2:8080/api';
    } else {
      return 'http://localhost:8080/api';
    }
  }

  // Set to the host's LAN address when running on a physical device.
  static const String physicalDeviceIP = '192.168.1.100';

  static String get baseUrlForPhysicalDevice {
    return 'http://$physicalDeviceIP:8080/api';
  }
}
"#;

const API_REQUEST: &str = r#"  static Future<http.Response> {{verb}}({{params}}) async {
    final url = Uri.parse('${ApiConfig.baseUrl}/$endpoint');
    try {
      return await {{call}};
    } catch (e) {
      if (e is SocketException) {
        throw Exception('Error de conexión: Verifica que el backend esté ejecutándose en ${ApiConfig.baseUrl}');
      }
      throw Exception('Error de red: $e');
    }
  }
"#;

const API_SERVICE: &str = r#"import 'dart:convert';
import 'dart:io';
import 'package:http/http.dart' as http;
import 'api_config.dart';

class ApiService {
  static const Map<String, String> _headers = {
    'Content-Type': 'application/json',
    'Accept': 'application/json',
  };

{{requests}}
  static Map<String, dynamic> parseResponse(http.Response response) {
    if (response.statusCode >= 200 && response.statusCode < 300) {
      if (response.body.isEmpty) return {};
      return json.decode(response.body);
    } else {
      throw Exception('Error HTTP ${response.statusCode}: ${response.body}');
    }
  }

  static List<Map<String, dynamic>> parseListResponse(http.Response response) {
    if (response.statusCode >= 200 && response.statusCode < 300) {
      if (response.body.isEmpty) return [];
      final List<dynamic> data = json.decode(response.body);
      return data.cast<Map<String, dynamic>>();
    } else {
      throw Exception('Error HTTP ${response.statusCode}: ${response.body}');
    }
  }
}
"#;

pub fn pubspec_yaml(project_name: &str) -> String {
    render(PUBSPEC, &[("name", project_name)])
}

pub fn main_dart(plans: &[EntityPlan]) -> String {
    let mut imports = String::new();
    let mut tiles = Vec::with_capacity(plans.len());
    for plan in plans {
        let _ = writeln!(
            imports,
            "import 'screens/{0}/{0}_list_screen.dart';",
            plan.snake
        );
        tiles.push(render(TILE, &[("Class", plan.class.as_str())]));
    }
    render(
        MAIN,
        &[
            ("imports", imports.trim_end()),
            ("tiles", tiles.join("\n").as_str()),
        ],
    )
}

pub fn api_service_dart() -> String {
    let requests = [
        ("get", "String endpoint", "http.get(url, headers: _headers)"),
        (
            "post",
            "String endpoint, Map<String, dynamic> data",
            "http.post(url, headers: _headers, body: json.encode(data))",
        ),
        (
            "put",
            "String endpoint, Map<String, dynamic> data",
            "http.put(url, headers: _headers, body: json.encode(data))",
        ),
        ("delete", "String endpoint", "http.delete(url, headers: _headers)"),
    ]
    .into_iter()
    .map(|(verb, params, call)| {
        render(API_REQUEST, &[("verb", verb), ("params", params), ("call", call)])
    })
    .collect::<Vec<_>>()
    .join("\n");

    render(API_SERVICE, &[("requests", requests.as_str())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::plan_entities;
    use serde_json::json;
    use umlforge_core::sanitize;

    #[test]
    fn drawer_lists_every_entity() {
        let diagram = sanitize(&json!({"entities": [{"name": "Cliente"}, {"name": "Orden Compra"}]}));
        let main = main_dart(&plan_entities(&diagram));
        assert!(main.contains("import 'screens/cliente/cliente_list_screen.dart';"));
        assert!(main.contains("import 'screens/orden_compra/orden_compra_list_screen.dart';"));
        assert!(main.contains("MaterialPageRoute(builder: (context) => OrdenCompraListScreen()),"));
        assert!(main.contains("Text('Tablas UML'"));
    }

    #[test]
    fn api_service_has_every_verb() {
        let dart = api_service_dart();
        for verb in ["get(String endpoint)", "post(String endpoint, Map", "put(String endpoint, Map", "delete(String endpoint)"] {
            assert!(dart.contains(&format!("static Future<http.Response> {verb}")), "{verb}");
        }
        assert!(dart.contains("final url = Uri.parse('${ApiConfig.baseUrl}/$endpoint');"));
        assert!(!dart.contains("{{"));
    }

    #[test]
    fn pubspec_uses_project_name() {
        assert!(pubspec_yaml("tienda_app").starts_with("name: tienda_app\n"));
    }
}
