//! `lib/services/{snake}_service.dart`: REST calls for one entity.

use crate::naming::{dart_string, EntityPlan};
use crate::template::render;

const SERVICE: &str = r#"import 'api_service.dart';
import '../models/{{snake}}_model.dart';

class {{Class}}Service {
  static const String endpoint = '{{endpoint}}';

  static Future<List<{{Class}}>> getAll() async {
    try {
      final response = await ApiService.get(endpoint);
      final List<Map<String, dynamic>> data = ApiService.parseListResponse(response);
      return data.map((json) => {{Class}}.fromJson(json)).toList();
    } catch (e) {
      print('Error al obtener {{endpoint}}: $e');
      rethrow;
    }
  }

  static Future<{{Class}}?> getById({{IdType}} id) async {
    try {
      final response = await ApiService.get('$endpoint/$id');
      final Map<String, dynamic> data = ApiService.parseResponse(response);
      return {{Class}}.fromJson(data);
    } catch (e) {
      print('Error al obtener {{label}} $id: $e');
      return null;
    }
  }

  static Future<{{Class}}> create({{Class}} item) async {
    try {
      final response = await ApiService.post(endpoint, item.toJson());
      final Map<String, dynamic> data = ApiService.parseResponse(response);
      return {{Class}}.fromJson(data);
    } catch (e) {
      print('Error al crear {{label}}: $e');
      rethrow;
    }
  }

  static Future<{{Class}}> update({{IdType}} id, {{Class}} item) async {
    try {
      final response = await ApiService.put('$endpoint/$id', item.toJson());
      final Map<String, dynamic> data = ApiService.parseResponse(response);
      return {{Class}}.fromJson(data);
    } catch (e) {
      print('Error al actualizar {{label}}: $e');
      rethrow;
    }
  }

  static Future<bool> delete({{IdType}} id) async {
    try {
      await ApiService.delete('$endpoint/$id');
      return true;
    } catch (e) {
      print('Error al eliminar {{label}}: $e');
      return false;
    }
  }
}
"#;

pub fn service_dart(plan: &EntityPlan) -> String {
    let label = dart_string(&plan.lower_label());
    render(
        SERVICE,
        &[
            ("Class", plan.class.as_str()),
            ("snake", plan.snake.as_str()),
            ("endpoint", plan.endpoint.as_str()),
            ("IdType", plan.id_field().dart.name()),
            ("label", label.as_str()),
        ],
    )
}
