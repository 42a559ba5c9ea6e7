//! Mapbox GL style-layer JSON for the custom layer stack.
//!
//! A browser front end can feed these objects straight to
//! `map.addLayer`, so the GL engine and the software surface draw the
//! same plan. Filters use the legacy array syntax
//! (`["==", "class", "path"]`), which every GL version accepts.

use serde_json::{Value, json};

use playmat_core::{Filter, LayerKind, LayerSpec};

/// Serialize a filter in legacy GL syntax.
#[must_use]
pub fn filter_to_json(filter: &Filter) -> Value {
    match filter {
        Filter::All(parts) => combinator("all", parts),
        Filter::Any(parts) => combinator("any", parts),
        Filter::GeometryIs(ty) => json!(["==", "$type", ty.as_str()]),
        Filter::Eq(key, value) => json!(["==", key, value]),
        Filter::Ne(key, value) => json!(["!=", key, value]),
        Filter::In(key, values) => membership(key, values),
    }
}

fn combinator(op: &str, parts: &[Filter]) -> Value {
    let mut items = vec![json!(op)];
    items.extend(parts.iter().map(filter_to_json));
    Value::Array(items)
}

fn membership(key: &str, values: &[String]) -> Value {
    let mut items = vec![json!("in"), json!(key)];
    items.extend(values.iter().map(|v| json!(v)));
    Value::Array(items)
}

/// Serialize one layer as a GL style layer object.
#[must_use]
pub fn layer_to_json(layer: &LayerSpec) -> Value {
    match &layer.kind {
        LayerKind::Background { color } => json!({
            "id": layer.id,
            "type": "background",
            "paint": { "background-color": color.to_hex() },
        }),
        LayerKind::Line {
            source,
            source_layer,
            filter,
            style,
        } => {
            let mut paint = json!({
                "line-color": style.color.to_hex(),
                "line-width": style.width,
            });
            if let Some(dash) = &style.dash_array {
                paint["line-dasharray"] = json!(dash);
            }
            if style.opacity < 1.0 {
                paint["line-opacity"] = json!(style.opacity);
            }
            json!({
                "id": layer.id,
                "type": "line",
                "source": source,
                "source-layer": source_layer,
                "filter": filter_to_json(filter),
                "layout": {
                    "line-join": style.join,
                    "line-cap": style.cap,
                },
                "paint": paint,
            })
        }
    }
}

/// Serialize a layer stack, bottom layer first.
#[must_use]
pub fn layers_to_json(layers: &[LayerSpec]) -> Value {
    Value::Array(layers.iter().map(layer_to_json).collect())
}
