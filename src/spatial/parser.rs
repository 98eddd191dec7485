//! WFS/GML feature parsing
//!
//! Walks the payload once with a streaming reader. Every element whose local
//! name matches the configured feature tag becomes a [`Feature`]; the
//! trimmed text of each leaf element below it is stored under the leaf's
//! local name. Namespace prefixes are ignored, so `sop:bsnm_cmpnm` and
//! `bsnm_cmpnm` are the same field.

use crate::domain::feature::Feature;
use crate::domain::geo::Coordinate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;

/// GML2 coordinate tuple element, `x,y`
const GML_COORDINATES: &str = "coordinates";

/// GML3 position element, `x y`
const GML_POS: &str = "pos";

const SRS_NAME_ATTR: &[u8] = b"srsName";

/// The payload could not be read as a well-formed document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed payload at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("Payload has no root element")]
    NoRootElement,

    #[error("Payload ended with {open} unclosed element(s)")]
    Unclosed { open: usize },
}

/// Extracts features of one type from a WFS response
#[derive(Debug, Clone)]
pub struct FeatureParser {
    feature_tag: String,
    x_field: String,
    y_field: String,
}

/// An element currently open below a feature
struct Frame {
    name: String,
    text: String,
    has_children: bool,
}

/// Feature being assembled
struct Pending {
    depth: usize,
    attributes: BTreeMap<String, String>,
    srs_name: Option<String>,
    frames: Vec<Frame>,
}

impl FeatureParser {
    pub fn new(
        feature_tag: impl Into<String>,
        x_field: impl Into<String>,
        y_field: impl Into<String>,
    ) -> Self {
        Self {
            feature_tag: feature_tag.into(),
            x_field: x_field.into(),
            y_field: y_field.into(),
        }
    }

    pub fn feature_tag(&self) -> &str {
        &self.feature_tag
    }

    /// Parse every matching feature, in document order.
    ///
    /// A well-formed document without matching elements yields an empty list.
    pub fn parse(&self, payload: &str) -> Result<Vec<Feature>, ParseError> {
        let mut reader = Reader::from_str(payload);
        reader.config_mut().trim_text(true);

        let mut features = Vec::new();
        let mut depth = 0usize;
        let mut saw_root = false;
        let mut document_srs: Option<String> = None;
        let mut pending: Option<Pending> = None;

        loop {
            let event = reader.read_event().map_err(|e| ParseError::Malformed {
                position: reader.buffer_position(),
                message: e.to_string(),
            })?;

            match event {
                Event::Start(start) => {
                    saw_root = true;
                    depth += 1;
                    let name = local_name(&start);
                    let srs = srs_name(&start, &reader)?;

                    match pending.as_mut() {
                        Some(feature) => {
                            if let Some(parent) = feature.frames.last_mut() {
                                parent.has_children = true;
                            }
                            if srs.is_some() {
                                feature.srs_name = srs;
                            }
                            feature.frames.push(Frame {
                                name,
                                text: String::new(),
                                has_children: false,
                            });
                        }
                        None if name == self.feature_tag => {
                            pending = Some(Pending {
                                depth,
                                attributes: BTreeMap::new(),
                                srs_name: srs,
                                frames: Vec::new(),
                            });
                        }
                        None => {
                            if document_srs.is_none() {
                                document_srs = srs;
                            }
                        }
                    }
                }
                Event::Empty(start) => {
                    saw_root = true;
                    let name = local_name(&start);
                    let srs = srs_name(&start, &reader)?;

                    match pending.as_mut() {
                        Some(feature) => {
                            if let Some(parent) = feature.frames.last_mut() {
                                parent.has_children = true;
                            }
                            if srs.is_some() {
                                feature.srs_name = srs;
                            }
                            feature.attributes.entry(name).or_default();
                        }
                        None if name == self.feature_tag => {
                            let srs = srs.or_else(|| document_srs.clone());
                            features.push(self.build(BTreeMap::new(), srs.as_deref()));
                        }
                        None => {
                            if document_srs.is_none() {
                                document_srs = srs;
                            }
                        }
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| ParseError::Malformed {
                        position: reader.buffer_position(),
                        message: e.to_string(),
                    })?;
                    push_text(depth, &mut pending, &text, &reader)?;
                }
                Event::CData(data) => {
                    let bytes = data.into_inner();
                    let text = String::from_utf8_lossy(&bytes);
                    push_text(depth, &mut pending, &text, &reader)?;
                }
                Event::End(_) => {
                    if depth == 0 {
                        return Err(ParseError::Malformed {
                            position: reader.buffer_position(),
                            message: "closing tag without opening tag".to_string(),
                        });
                    }

                    if let Some(feature) = pending.as_mut() {
                        if let Some(frame) = feature.frames.pop() {
                            if !frame.has_children {
                                feature
                                    .attributes
                                    .entry(frame.name)
                                    .or_insert_with(|| frame.text.trim().to_string());
                            }
                        } else if feature.depth == depth {
                            if let Some(done) = pending.take() {
                                let srs = done.srs_name.or_else(|| document_srs.clone());
                                features.push(self.build(done.attributes, srs.as_deref()));
                            }
                        }
                    }

                    depth -= 1;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(ParseError::NoRootElement);
        }
        if depth > 0 {
            return Err(ParseError::Unclosed { open: depth });
        }

        Ok(features)
    }

    fn build(&self, attributes: BTreeMap<String, String>, srs: Option<&str>) -> Feature {
        let coordinate = self
            .field_point(&attributes)
            .or_else(|| gml_point(&attributes))
            .map(|(x, y)| Coordinate::classify(x, y, srs));

        Feature::new(attributes, coordinate)
    }

    fn field_point(&self, attributes: &BTreeMap<String, String>) -> Option<(f64, f64)> {
        let x = parse_finite(attributes.get(&self.x_field)?)?;
        let y = parse_finite(attributes.get(&self.y_field)?)?;
        Some((x, y))
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn srs_name(start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Option<String>, ParseError> {
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| ParseError::Malformed {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;

        if attribute.key.local_name().as_ref() == SRS_NAME_ATTR {
            let value = attribute
                .unescape_value()
                .map_err(|e| ParseError::Malformed {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                })?;
            return Ok(Some(value.trim().to_string()));
        }
    }

    Ok(None)
}

fn push_text(
    depth: usize,
    pending: &mut Option<Pending>,
    text: &Cow<'_, str>,
    reader: &Reader<&[u8]>,
) -> Result<(), ParseError> {
    if depth == 0 {
        if text.trim().is_empty() {
            return Ok(());
        }
        // e.g. a JSON or plain-text error body from the provider
        return Err(ParseError::Malformed {
            position: reader.buffer_position(),
            message: "text outside of the root element".to_string(),
        });
    }

    if let Some(frame) = pending.as_mut().and_then(|f| f.frames.last_mut()) {
        frame.text.push_str(text);
    }

    Ok(())
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// First point of a GML `<coordinates>` or `<pos>` element
fn gml_point(attributes: &BTreeMap<String, String>) -> Option<(f64, f64)> {
    if let Some(raw) = attributes.get(GML_COORDINATES) {
        let first_tuple = raw.split_whitespace().next()?;
        let mut parts = first_tuple.split(',');
        let x = parse_finite(parts.next()?)?;
        let y = parse_finite(parts.next()?)?;
        return Some((x, y));
    }

    let raw = attributes.get(GML_POS)?;
    let mut parts = raw.split_whitespace();
    let x = parse_finite(parts.next()?)?;
    let y = parse_finite(parts.next()?)?;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feature::MISSING_FIELD;
    use rstest::rstest;

    fn parser() -> FeatureParser {
        FeatureParser::new("dt_d170", "x_crdnt", "y_crdnt")
    }

    const BROKERS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml" xmlns:sop="https://www.vworld.kr">
  <gml:boundedBy>
    <gml:Box srsName="EPSG:4326">
      <gml:coordinates>126.98,37.49 127.01,37.50</gml:coordinates>
    </gml:Box>
  </gml:boundedBy>
  <gml:featureMember>
    <sop:dt_d170 fid="dt_d170.1">
      <sop:bsnm_cmpnm>Hanbit Realty</sop:bsnm_cmpnm>
      <sop:brkr_nm> Kim </sop:brkr_nm>
      <sop:jurirno>11680-2019-00123</sop:jurirno>
      <sop:x_crdnt>127.0012</sop:x_crdnt>
      <sop:y_crdnt>37.5004</sop:y_crdnt>
    </sop:dt_d170>
  </gml:featureMember>
  <gml:featureMember>
    <sop:dt_d170 fid="dt_d170.2">
      <sop:bsnm_cmpnm>Namsan &amp; Sons</sop:bsnm_cmpnm>
      <sop:jurirno/>
      <sop:ag_geom>
        <gml:Point srsName="EPSG:5186">
          <gml:coordinates>200100.5,551200.25</gml:coordinates>
        </gml:Point>
      </sop:ag_geom>
    </sop:dt_d170>
  </gml:featureMember>
</wfs:FeatureCollection>"#;

    #[test]
    fn test_parses_features_in_document_order() {
        let features = parser().parse(BROKERS).unwrap();
        assert_eq!(features.len(), 2);

        let first = &features[0];
        assert_eq!(first.field("bsnm_cmpnm"), "Hanbit Realty");
        assert_eq!(first.field("brkr_nm"), "Kim");
        assert_eq!(first.field("ldcode"), MISSING_FIELD);
        assert_eq!(
            first.coordinate,
            Some(Coordinate::Geographic {
                lon: 127.0012,
                lat: 37.5004
            })
        );

        let second = &features[1];
        assert_eq!(second.field("bsnm_cmpnm"), "Namsan & Sons");
        assert_eq!(second.field_opt("jurirno"), None);
    }

    #[test]
    fn test_gml_geometry_fallback_with_declared_crs() {
        let features = parser().parse(BROKERS).unwrap();
        assert_eq!(
            features[1].coordinate,
            Some(Coordinate::Projected {
                x: 200_100.5,
                y: 551_200.25
            })
        );
    }

    #[test]
    fn test_zero_matching_features_is_empty_not_error() {
        let payload = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs">
            <gml:boundedBy xmlns:gml="http://www.opengis.net/gml"><gml:null>unknown</gml:null></gml:boundedBy>
        </wfs:FeatureCollection>"#;
        assert_eq!(parser().parse(payload).unwrap(), Vec::new());
    }

    #[test]
    fn test_other_feature_types_are_ignored() {
        let payload = "<root><lp_pa_cbnd><pnu>1111010100100010000</pnu></lp_pa_cbnd></root>";
        assert!(parser().parse(payload).unwrap().is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(r#"{"response":{"status":"ERROR"}}"#)]
    #[case("<root><dt_d170><a>1</b></dt_d170></root>")]
    #[case("<root><dt_d170><a>1</a>")]
    #[case("</root>")]
    fn test_malformed_payloads_are_errors(#[case] payload: &str) {
        assert!(parser().parse(payload).is_err(), "accepted {payload:?}");
    }

    #[test]
    fn test_unclosed_document_reports_depth() {
        let result = parser().parse("<root><dt_d170><a>1</a>");
        assert!(matches!(
            result,
            Err(ParseError::Unclosed { .. }) | Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn test_non_finite_coordinates_are_absent() {
        let payload = "<r><dt_d170><x_crdnt>NaN</x_crdnt><y_crdnt>37.5</y_crdnt></dt_d170>\
                       <dt_d170><x_crdnt>inf</x_crdnt><y_crdnt>37.5</y_crdnt></dt_d170>\
                       <dt_d170><x_crdnt></x_crdnt></dt_d170></r>";
        let features = parser().parse(payload).unwrap();
        assert_eq!(features.len(), 3);
        assert!(features.iter().all(|f| f.coordinate.is_none()));
    }

    #[test]
    fn test_undeclared_projected_values_use_magnitude() {
        let payload =
            "<r><dt_d170><x_crdnt>200000</x_crdnt><y_crdnt>550000</y_crdnt></dt_d170></r>";
        let features = parser().parse(payload).unwrap();
        assert!(matches!(
            features[0].coordinate,
            Some(Coordinate::Projected { .. })
        ));
    }

    #[test]
    fn test_document_srs_applies_when_feature_declares_none() {
        let payload = r#"<r><Box srsName="EPSG:5186"/><dt_d170><x_crdnt>127.0</x_crdnt><y_crdnt>37.5</y_crdnt></dt_d170></r>"#;
        let features = parser().parse(payload).unwrap();
        assert!(matches!(
            features[0].coordinate,
            Some(Coordinate::Projected { .. })
        ));
    }

    #[test]
    fn test_gml3_pos_fallback() {
        let payload = "<r><dt_d170><geom><Point><pos>127.0 37.5</pos></Point></geom></dt_d170></r>";
        let features = parser().parse(payload).unwrap();
        assert_eq!(
            features[0].coordinate,
            Some(Coordinate::Geographic {
                lon: 127.0,
                lat: 37.5
            })
        );
    }

    #[test]
    fn test_cdata_text_is_kept() {
        let payload = "<r><dt_d170><bsnm_cmpnm><![CDATA[ A&B Realty ]]></bsnm_cmpnm></dt_d170></r>";
        let features = parser().parse(payload).unwrap();
        assert_eq!(features[0].field("bsnm_cmpnm"), "A&B Realty");
    }
}
