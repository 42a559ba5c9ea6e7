//! Declarative style-layer descriptions.
//!
//! A [`LayerSpec`] is what the style planner emits and what a render
//! surface adapter turns into engine calls. It mirrors the subset of
//! the GL style layer model the thematic style needs.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::filter::Filter;

/// Vector source the road layers read from.
pub const ROAD_SOURCE: &str = "composite";

/// Source layer holding classified road lines.
pub const ROAD_SOURCE_LAYER: &str = "road";

/// How consecutive line segments are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    /// Rounded joins.
    Round,
    /// Sharp mitered joins.
    Miter,
    /// Flattened joins.
    Bevel,
}

/// How line ends are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    /// Rounded ends.
    Round,
    /// Ends cut off exactly at the endpoint.
    Butt,
    /// Square ends extending half a width past the endpoint.
    Square,
}

/// Paint and layout of a line layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    /// Stroke color.
    pub color: Rgb,
    /// Stroke width in CSS pixels.
    pub width: f64,
    /// Dash pattern in multiples of the line width, if dashed.
    pub dash_array: Option<Vec<f64>>,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Join style.
    pub join: LineJoin,
    /// Cap style.
    pub cap: LineCap,
}

impl LineStyle {
    /// A solid, opaque line with round joins and caps.
    #[must_use]
    pub const fn solid_round(color: Rgb, width: f64) -> Self {
        Self {
            color,
            width,
            dash_array: None,
            opacity: 1.0,
            join: LineJoin::Round,
            cap: LineCap::Round,
        }
    }

    /// A dashed, opaque line with miter joins and butt caps.
    #[must_use]
    pub fn dashed_square(color: Rgb, width: f64, dash_array: Vec<f64>) -> Self {
        Self {
            color,
            width,
            dash_array: Some(dash_array),
            opacity: 1.0,
            join: LineJoin::Miter,
            cap: LineCap::Butt,
        }
    }
}

/// What a layer draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerKind {
    /// Flat fill covering the whole surface.
    Background {
        /// Fill color.
        color: Rgb,
    },
    /// Stroked line features selected by a filter.
    Line {
        /// Vector source id.
        source: String,
        /// Layer inside the vector source.
        source_layer: String,
        /// Feature selection.
        filter: Filter,
        /// Paint and layout.
        style: LineStyle,
    },
}

/// One style layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Unique layer id.
    pub id: String,
    /// Contents.
    pub kind: LayerKind,
}

impl LayerSpec {
    /// A full-bleed background layer.
    #[must_use]
    pub fn background(id: &str, color: Rgb) -> Self {
        Self {
            id: id.to_string(),
            kind: LayerKind::Background { color },
        }
    }

    /// A line layer over the road source layer.
    #[must_use]
    pub fn road_line(id: &str, filter: Filter, style: LineStyle) -> Self {
        Self {
            id: id.to_string(),
            kind: LayerKind::Line {
                source: ROAD_SOURCE.to_string(),
                source_layer: ROAD_SOURCE_LAYER.to_string(),
                filter,
                style,
            },
        }
    }

    /// Line style, if this is a line layer.
    #[must_use]
    pub const fn line_style(&self) -> Option<&LineStyle> {
        match &self.kind {
            LayerKind::Line { style, .. } => Some(style),
            LayerKind::Background { .. } => None,
        }
    }

    /// Feature filter, if this is a line layer.
    #[must_use]
    pub const fn filter(&self) -> Option<&Filter> {
        match &self.kind {
            LayerKind::Line { filter, .. } => Some(filter),
            LayerKind::Background { .. } => None,
        }
    }
}
