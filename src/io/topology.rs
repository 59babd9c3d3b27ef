/// TopoJSON encoding of a record's version features
///
/// Every version feature becomes one named object of a single topology.
/// Each line and ring gets its own arc; arcs are not shared and
/// coordinates are not quantized.

use crate::{Result, WaybackError};
use serde_json::Value;
use topojson::{ArcIndexes, Geometry, NamedGeometry, Position, Topology, Value as TopoValue};

/// Encode GeoJSON features into one topology. Objects are named by their
/// index in `features`.
pub fn encode_topology(features: &[Value]) -> Result<Topology> {
    let mut arcs = Vec::new();
    let mut objects = Vec::with_capacity(features.len());

    for (idx, feature) in features.iter().enumerate() {
        let value = topo_value(&feature["geometry"], &mut arcs)
            .map_err(|e| encoding_error(format!("feature {}: {}", idx, e)))?;
        let mut geometry = Geometry::new(value);
        geometry.properties = feature.get("properties").and_then(Value::as_object).cloned();
        objects.push(NamedGeometry {
            name: idx.to_string(),
            geometry,
        });
    }

    Ok(Topology {
        bbox: None,
        objects,
        transform: None,
        arcs,
        foreign_members: None,
    })
}

fn encoding_error(message: impl Into<String>) -> WaybackError {
    WaybackError::Serialization(message.into())
}

fn topo_value(geometry: &Value, arcs: &mut Vec<Vec<Position>>) -> Result<TopoValue> {
    let kind = geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| encoding_error("geometry without a type"))?;

    if kind == "GeometryCollection" {
        let members = geometry
            .get("geometries")
            .and_then(Value::as_array)
            .ok_or_else(|| encoding_error("GeometryCollection without geometries"))?;
        let members = members
            .iter()
            .map(|member| topo_value(member, arcs).map(Geometry::new))
            .collect::<Result<Vec<_>>>()?;
        return Ok(TopoValue::GeometryCollection(members));
    }

    let coordinates = geometry
        .get("coordinates")
        .ok_or_else(|| encoding_error(format!("{} without coordinates", kind)))?;

    let value = match kind {
        "Point" => TopoValue::Point(position(coordinates)?),
        "MultiPoint" => TopoValue::MultiPoint(
            nested(coordinates)?
                .iter()
                .map(position)
                .collect::<Result<_>>()?,
        ),
        "LineString" => TopoValue::LineString(push_arc(coordinates, arcs)?),
        "MultiLineString" => TopoValue::MultiLineString(
            nested(coordinates)?
                .iter()
                .map(|line| push_arc(line, arcs))
                .collect::<Result<_>>()?,
        ),
        "Polygon" => TopoValue::Polygon(rings(coordinates, arcs)?),
        "MultiPolygon" => TopoValue::MultiPolygon(
            nested(coordinates)?
                .iter()
                .map(|polygon| rings(polygon, arcs))
                .collect::<Result<_>>()?,
        ),
        other => return Err(encoding_error(format!("unsupported geometry type {}", other))),
    };
    Ok(value)
}

fn nested(coordinates: &Value) -> Result<&Vec<Value>> {
    coordinates
        .as_array()
        .ok_or_else(|| encoding_error(format!("expected a coordinate array, got {}", coordinates)))
}

/// A position of at least two finite numbers.
fn position(coordinates: &Value) -> Result<Position> {
    let values = nested(coordinates)?;
    if values.len() < 2 {
        return Err(encoding_error(format!("position needs two numbers, got {}", coordinates)));
    }
    values
        .iter()
        .map(|v| {
            v.as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| encoding_error(format!("non-numeric coordinate {}", v)))
        })
        .collect()
}

fn push_arc(line: &Value, arcs: &mut Vec<Vec<Position>>) -> Result<ArcIndexes> {
    let arc = nested(line)?
        .iter()
        .map(position)
        .collect::<Result<Vec<_>>>()?;
    let index = i32::try_from(arcs.len()).map_err(|_| encoding_error("too many arcs"))?;
    arcs.push(arc);
    Ok(vec![index])
}

fn rings(polygon: &Value, arcs: &mut Vec<Vec<Position>>) -> Result<Vec<ArcIndexes>> {
    nested(polygon)?
        .iter()
        .map(|ring| push_arc(ring, arcs))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn feature(geometry: Value) -> Value {
        json!({"type": "Feature", "geometry": geometry, "properties": {"@validSince": 1}})
    }

    #[test]
    fn test_lines_and_rings_become_arcs() {
        let features = vec![
            feature(json!({"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]})),
            feature(json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]})),
            feature(json!({"type": "Point", "coordinates": [2.5, 3.5]})),
        ];
        let topology = encode_topology(&features).unwrap();

        assert_eq!(topology.arcs.len(), 2);
        assert_eq!(topology.arcs[1].len(), 4);
        let names: Vec<_> = topology.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["0", "1", "2"]);
        assert_eq!(topology.objects[0].geometry.value, TopoValue::LineString(vec![0]));
        assert_eq!(topology.objects[1].geometry.value, TopoValue::Polygon(vec![vec![1]]));
        assert_eq!(topology.objects[2].geometry.value, TopoValue::Point(vec![2.5, 3.5]));
        assert_eq!(
            topology.objects[0].geometry.properties,
            Some(json!({"@validSince": 1}).as_object().cloned().unwrap())
        );
    }

    #[test]
    fn test_collections_and_multi_geometries() {
        let features = vec![feature(json!({
            "type": "GeometryCollection",
            "geometries": [
                {"type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]], [[2, 2], [3, 3]]]},
                {"type": "MultiPolygon", "coordinates": []}
            ]
        }))];
        let topology = encode_topology(&features).unwrap();

        assert_eq!(topology.arcs.len(), 2);
        match &topology.objects[0].geometry.value {
            TopoValue::GeometryCollection(members) => assert_eq!(members.len(), 2),
            other => panic!("expected a collection, got {:?}", other),
        }
    }

    #[test]
    fn test_unencodable_geometries() {
        let cases = vec![
            Value::Null,
            json!({"type": "Curve", "coordinates": []}),
            json!({"type": "Point", "coordinates": [1.0]}),
            json!({"type": "Point", "coordinates": [null, 1.0]}),
            json!({"type": "LineString", "coordinates": "0,0 1,1"}),
            json!({"type": "Polygon"}),
        ];
        for geometry in cases {
            let result = encode_topology(&[feature(geometry.clone())]);
            assert!(
                matches!(result, Err(WaybackError::Serialization(_))),
                "geometry {}",
                geometry
            );
        }
    }
}
