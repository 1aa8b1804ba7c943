//! OME-NGFF 0.5 attributes for a single field-of-view image.

use serde::Serialize;

pub const NGFF_VERSION: &str = "0.5";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmeAttributes {
    pub ome: Ome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ome {
    pub version: &'static str,
    pub multiscales: Vec<Multiscale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omero: Option<Omero>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Multiscale {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub axes: Vec<Axis>,
    // ordered from highest to lowest resolution
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub axis_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub path: String,
    #[serde(rename = "coordinateTransformations")]
    pub coordinate_transformations: Vec<CoordinateTransformation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CoordinateTransformation {
    Scale { scale: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Omero {
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub label: String,
    pub color: &'static str,
    pub active: bool,
    pub window: Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Window {
    pub start: f64,
    pub end: f64,
    pub min: f64,
    pub max: f64,
}

impl Window {
    pub fn full_range((min, max): (f64, f64)) -> Self {
        Self {
            start: min,
            end: max,
            min,
            max,
        }
    }
}

/// The fixed T-C-Z-Y-X axis list.
pub fn tczyx_axes() -> Vec<Axis> {
    vec![
        Axis {
            name: "t",
            axis_type: "time",
            unit: Some("second"),
        },
        Axis {
            name: "c",
            axis_type: "channel",
            unit: None,
        },
        Axis {
            name: "z",
            axis_type: "space",
            unit: Some("micrometer"),
        },
        Axis {
            name: "y",
            axis_type: "space",
            unit: Some("micrometer"),
        },
        Axis {
            name: "x",
            axis_type: "space",
            unit: Some("micrometer"),
        },
    ]
}

/// Scale of a level relative to the full-resolution shape, per axis.
pub fn relative_scale(base: &[u64], level: &[u64]) -> Vec<f64> {
    base.iter()
        .zip(level)
        .map(|(&b, &l)| b as f64 / l.max(1) as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_ngff_layout() {
        let attrs = OmeAttributes {
            ome: Ome {
                version: NGFF_VERSION,
                multiscales: vec![Multiscale {
                    name: Some("stack".into()),
                    axes: tczyx_axes(),
                    datasets: vec![Dataset {
                        path: "1".into(),
                        coordinate_transformations: vec![CoordinateTransformation::Scale {
                            scale: relative_scale(&[1, 1, 64, 512, 512], &[1, 1, 32, 256, 256]),
                        }],
                    }],
                }],
                omero: Some(Omero {
                    channels: vec![Channel {
                        label: "ch1".into(),
                        color: "FFFFFF",
                        active: true,
                        window: Window::full_range((0.0, 255.0)),
                    }],
                }),
            },
        };
        let value = serde_json::to_value(&attrs).unwrap();
        assert_eq!(value["ome"]["version"], "0.5");
        assert_eq!(
            value["ome"]["multiscales"][0]["axes"][1],
            json!({"name": "c", "type": "channel"})
        );
        assert_eq!(
            value["ome"]["multiscales"][0]["datasets"][0],
            json!({
                "path": "1",
                "coordinateTransformations": [{"type": "scale", "scale": [1.0, 1.0, 2.0, 2.0, 2.0]}]
            })
        );
        assert_eq!(value["ome"]["omero"]["channels"][0]["window"]["end"], 255.0);
    }
}
