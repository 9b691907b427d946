//! `lib/screens/{snake}/{snake}_list_screen.dart`

use crate::naming::{dart_string, EntityPlan};
use crate::template::render;

const LIST_SCREEN: &str = r#"import 'package:flutter/material.dart';
import '../../models/{{snake}}_model.dart';
import '../../services/{{snake}}_service.dart';
import '{{snake}}_detail_screen.dart';
import '{{snake}}_form_screen.dart';

class {{Class}}ListScreen extends StatefulWidget {
  const {{Class}}ListScreen({super.key});

  @override
  State<{{Class}}ListScreen> createState() => _{{Class}}ListScreenState();
}

class _{{Class}}ListScreenState extends State<{{Class}}ListScreen> {
  List<{{Class}}> items = [];
  bool isLoading = true;
  String? errorMessage;

  @override
  void initState() {
    super.initState();
    _loadItems();
  }

  Future<void> _loadItems() async {
    try {
      setState(() {
        isLoading = true;
        errorMessage = null;
      });

      final data = await {{Class}}Service.getAll();
      setState(() {
        items = data;
        isLoading = false;
      });
    } catch (e) {
      setState(() {
        errorMessage = e.toString();
        isLoading = false;
      });
    }
  }

  @override
  Widget build(BuildContext context) {
    return Scaffold(
      appBar: AppBar(
        title: Text('Listado de {{Class}}s'),
        backgroundColor: Theme.of(context).colorScheme.inversePrimary,
        actions: [
          IconButton(
            icon: Icon(Icons.refresh),
            onPressed: _loadItems,
            tooltip: 'Recargar',
          ),
        ],
      ),
      body: _buildBody(),
      floatingActionButton: FloatingActionButton(
        onPressed: _createItem,
        tooltip: 'Crear {{Class}}',
        child: Icon(Icons.add),
      ),
    );
  }

  Widget _buildBody() {
    if (isLoading) {
      return Center(
        child: Column(
          mainAxisAlignment: MainAxisAlignment.center,
          children: [
            CircularProgressIndicator(),
            SizedBox(height: 16),
            Text('Cargando {{label}}s...'),
          ],
        ),
      );
    }

    if (errorMessage != null) {
      return Center(
        child: Column(
          mainAxisAlignment: MainAxisAlignment.center,
          children: [
            Icon(Icons.error_outline, size: 64, color: Colors.red),
            SizedBox(height: 16),
            Text(
              'Error al cargar datos',
              style: TextStyle(fontSize: 18, fontWeight: FontWeight.bold),
            ),
            SizedBox(height: 8),
            Padding(
              padding: EdgeInsets.symmetric(horizontal: 32),
              child: Text(
                errorMessage!,
                textAlign: TextAlign.center,
                style: TextStyle(color: Colors.red),
              ),
            ),
            SizedBox(height: 16),
            ElevatedButton(
              onPressed: _loadItems,
              child: Text('Reintentar'),
            ),
          ],
        ),
      );
    }

    if (items.isEmpty) {
      return Center(
        child: Column(
          mainAxisAlignment: MainAxisAlignment.center,
          children: [
            Icon(Icons.inbox, size: 64, color: Colors.grey),
            SizedBox(height: 16),
            Text('No hay {{label}}s registrados',
                style: TextStyle(fontSize: 18, color: Colors.grey)),
            SizedBox(height: 16),
            ElevatedButton(
              onPressed: _createItem,
              child: Text('Crear el primero'),
            ),
          ],
        ),
      );
    }

    return ListView.builder(
      padding: EdgeInsets.all(8.0),
      itemCount: items.length,
      itemBuilder: (context, index) {
        final item = items[index];
        return Card(
          margin: EdgeInsets.symmetric(vertical: 4.0),
          child: ListTile(
            leading: CircleAvatar(
              child: Text('${index + 1}'),
            ),
            title: Text('{{title_label}}: ${item.{{title_field}}}'),
            subtitle: Text('{{subtitle_label}}: ${item.{{subtitle_field}}}'),
            trailing: Row(
              mainAxisSize: MainAxisSize.min,
              children: [
                IconButton(
                  icon: Icon(Icons.edit, color: Colors.blue),
                  onPressed: () => _editItem(item),
                ),
                IconButton(
                  icon: Icon(Icons.delete, color: Colors.red),
                  onPressed: () => _deleteItem(item),
                ),
              ],
            ),
            onTap: () => _viewDetail(item),
          ),
        );
      },
    );
  }

  void _showMessage(String message) {
    ScaffoldMessenger.of(context).showSnackBar(
      SnackBar(content: Text(message)),
    );
  }

  void _viewDetail({{Class}} item) {
    Navigator.push(
      context,
      MaterialPageRoute(
        builder: (context) => {{Class}}DetailScreen(item: item),
      ),
    );
  }

  void _createItem() {
    Navigator.push(
      context,
      MaterialPageRoute(
        builder: (context) => {{Class}}FormScreen(
          onSaved: (newItem) async {
            try {
              await {{Class}}Service.create(newItem);
              _loadItems();
              return true;
            } catch (e) {
              _showMessage('Error al crear: $e');
              return false;
            }
          },
        ),
      ),
    );
  }

  void _editItem({{Class}} item) {
    Navigator.push(
      context,
      MaterialPageRoute(
        builder: (context) => {{Class}}FormScreen(
          initialItem: item,
          onSaved: (updatedItem) async {
            final id = item.id;
            if (id == null) {
              _showMessage('{{Class}} sin identificador');
              return false;
            }
            try {
              await {{Class}}Service.update(id, updatedItem);
              _loadItems();
              return true;
            } catch (e) {
              _showMessage('Error al actualizar: $e');
              return false;
            }
          },
        ),
      ),
    );
  }

  void _deleteItem({{Class}} item) {
    showDialog(
      context: context,
      builder: (BuildContext dialogContext) {
        return AlertDialog(
          title: Text('Confirmar eliminación'),
          content: Text('¿Está seguro de que desea eliminar este {{label}}?'),
          actions: [
            TextButton(
              child: Text('Cancelar'),
              onPressed: () => Navigator.of(dialogContext).pop(),
            ),
            TextButton(
              child: Text('Eliminar'),
              onPressed: () async {
                Navigator.of(dialogContext).pop();
                final id = item.id;
                if (id == null) {
                  _showMessage('{{Class}} sin identificador');
                  return;
                }
                final success = await {{Class}}Service.delete(id);
                if (success) {
                  _showMessage('{{Class}} eliminado correctamente');
                  _loadItems();
                } else {
                  _showMessage('Error al eliminar {{label}}');
                }
              },
            ),
          ],
        );
      },
    );
  }
}
"#;

pub fn list_screen_dart(plan: &EntityPlan) -> String {
    let declared = plan.declared();
    let (title_label, title_field) = match declared.first() {
        Some(f) => (dart_string(&f.wire), f.field.as_str()),
        None => ("Item".to_string(), "id"),
    };
    let (subtitle_label, subtitle_field) = match declared.get(1) {
        Some(f) => (dart_string(&f.wire), f.field.as_str()),
        None => ("Info".to_string(), title_field),
    };
    let label = dart_string(&plan.lower_label());

    render(
        LIST_SCREEN,
        &[
            ("Class", plan.class.as_str()),
            ("snake", plan.snake.as_str()),
            ("label", label.as_str()),
            ("title_label", title_label.as_str()),
            ("title_field", title_field),
            ("subtitle_label", subtitle_label.as_str()),
            ("subtitle_field", subtitle_field),
        ],
    )
}
