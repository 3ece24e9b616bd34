//! GeoJSON export for stream networks

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{StreamNetwork, StreamSegment};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use std::path::Path;

fn number_or_null(value: Option<f64>) -> JsonValue {
    value
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn segment_properties(segment: &StreamSegment) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("order".to_string(), JsonValue::from(segment.order));
    props.insert(
        "length_m".to_string(),
        number_or_null(Some(segment.length_m)),
    );
    props.insert(
        "length_km".to_string(),
        number_or_null(Some(segment.length_km)),
    );
    props.insert(
        "drainage_area_sqkm".to_string(),
        number_or_null(segment.drainage_area_sqkm),
    );
    props.insert(
        "flow_accum_threshold".to_string(),
        JsonValue::from(segment.flow_accum_threshold),
    );
    props.insert(
        "sinuosity".to_string(),
        number_or_null(segment.sinuosity),
    );
    props.insert(
        "stream_type".to_string(),
        segment
            .stream_type
            .map(|t| JsonValue::String(t.as_str().to_string()))
            .unwrap_or(JsonValue::Null),
    );
    props.insert(
        "confidence_score".to_string(),
        number_or_null(segment.confidence_score),
    );
    props.insert(
        "source_type".to_string(),
        JsonValue::String("dem".to_string()),
    );
    props
}

/// Convert a stream network to a GeoJSON feature collection.
///
/// One LineString feature per segment, with the attribute schema used
/// by downstream mapping tools. Unpopulated attributes serialize as
/// JSON null. When the CRS carries an EPSG code it is recorded as a
/// `crs` foreign member in the legacy named-CRS form.
pub fn network_to_feature_collection(
    network: &StreamNetwork,
    crs: Option<&CRS>,
) -> FeatureCollection {
    let features = network
        .segments
        .iter()
        .map(|segment| {
            let coords: Vec<Vec<f64>> = segment
                .geometry
                .0
                .iter()
                .map(|c| vec![c.x, c.y])
                .collect();

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::LineString(coords))),
                id: None,
                properties: Some(segment_properties(segment)),
                foreign_members: None,
            }
        })
        .collect();

    let foreign_members = crs.and_then(CRS::epsg).map(|code| {
        let mut crs_props = JsonObject::new();
        crs_props.insert(
            "name".to_string(),
            JsonValue::String(format!("urn:ogc:def:crs:EPSG::{}", code)),
        );
        let mut crs_obj = JsonObject::new();
        crs_obj.insert("type".to_string(), JsonValue::String("name".to_string()));
        crs_obj.insert("properties".to_string(), JsonValue::Object(crs_props));

        let mut members = JsonObject::new();
        members.insert("crs".to_string(), JsonValue::Object(crs_obj));
        members
    });

    FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

/// Write a stream network to a GeoJSON file
pub fn write_network_geojson<P: AsRef<Path>>(
    network: &StreamNetwork,
    crs: Option<&CRS>,
    path: P,
) -> Result<()> {
    let collection = network_to_feature_collection(network, crs);
    let json = serde_json::to_string_pretty(&collection)
        .map_err(|e| Error::Other(format!("GeoJSON serialization error: {}", e)))?;
    std::fs::write(path.as_ref(), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::StreamType;
    use geo_types::line_string;

    fn attributed_segment() -> StreamSegment {
        StreamSegment {
            geometry: line_string![(x: 0.0, y: 0.0), (x: 30.0, y: 0.0), (x: 60.0, y: 0.0)],
            order: 2,
            flow_accum_threshold: 250,
            length_m: 60.0,
            length_km: 0.06,
            drainage_area_sqkm: Some(1.5),
            sinuosity: Some(1.0),
            stream_type: Some(StreamType::Intermittent),
            confidence_score: Some(0.42),
            boundary_artifact: false,
        }
    }

    fn raw_segment() -> StreamSegment {
        StreamSegment {
            geometry: line_string![(x: 0.0, y: 0.0), (x: 30.0, y: 30.0)],
            order: 1,
            flow_accum_threshold: 250,
            length_m: 42.4,
            length_km: 0.0424,
            drainage_area_sqkm: None,
            sinuosity: None,
            stream_type: None,
            confidence_score: None,
            boundary_artifact: false,
        }
    }

    #[test]
    fn test_feature_collection_schema() {
        let network =
            StreamNetwork::with_segments(250, vec![attributed_segment(), raw_segment()]);
        let fc = network_to_feature_collection(&network, Some(&CRS::from_epsg(32633)));

        assert_eq!(fc.features.len(), 2);

        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["order"], JsonValue::from(2u32));
        assert_eq!(props["flow_accum_threshold"], JsonValue::from(250u32));
        assert_eq!(props["stream_type"], JsonValue::String("intermittent".into()));
        assert_eq!(props["source_type"], JsonValue::String("dem".into()));

        // Missing attributes serialize as null, not as absent keys
        let raw_props = fc.features[1].properties.as_ref().unwrap();
        assert_eq!(raw_props["drainage_area_sqkm"], JsonValue::Null);
        assert_eq!(raw_props["sinuosity"], JsonValue::Null);
        assert_eq!(raw_props["stream_type"], JsonValue::Null);
        assert_eq!(raw_props["confidence_score"], JsonValue::Null);

        let members = fc.foreign_members.as_ref().unwrap();
        let crs = members["crs"].as_object().unwrap();
        assert_eq!(crs["type"], JsonValue::String("name".into()));
    }

    #[test]
    fn test_write_network_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streams.geojson");

        let network = StreamNetwork::with_segments(100, vec![attributed_segment()]);
        write_network_geojson(&network, None, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["type"], "FeatureCollection");
        assert_eq!(parsed["features"].as_array().unwrap().len(), 1);
        assert_eq!(
            parsed["features"][0]["geometry"]["type"],
            "LineString"
        );
    }
}
