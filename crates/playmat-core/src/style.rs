//! Thematic "play mat" map style.
//!
//! The base cartographic style is hidden entirely and replaced by a
//! fixed stack of custom layers, bottom to top:
//!
//! 1. background (lawn green ground)
//! 2. sidewalks (light gray, round joins)
//! 3. road casing (white, wider than the road)
//! 4. road base (black road surface)
//! 5. centerline (white dashes, miter/butt)
//! 6. crosswalks (white stripes, miter/butt)
//!
//! Intersections are never clipped geometrically. The casing sits under
//! the base fill, so wherever two roads overlap the black fill paints
//! over the other road's white edge. Connector and service roads are
//! excluded from casing and centerline but kept in the base fill, which
//! keeps the surface continuous without extra edge lines.
//!
//! The planner functions are pure. [`StyleSynthesizer`] tracks the
//! per-surface lifecycle and applies plans through the
//! [`RenderSurface`] port.

use crate::color::Rgb;
use crate::filter::{Filter, GeometryType};
use crate::layer::{LayerSpec, LineStyle};
use crate::overlay::RoadWidthPolicy;
use crate::surface::{RenderSurface, SurfaceError, Visibility};

/// Background layer id.
pub const BACKGROUND_LAYER_ID: &str = "mat-background";
/// Sidewalk layer id.
pub const SIDEWALK_LAYER_ID: &str = "mat-sidewalks";
/// Road casing layer id.
pub const CASING_LAYER_ID: &str = "mat-roads-casing";
/// Road base layer id.
pub const ROAD_BASE_LAYER_ID: &str = "mat-roads-base";
/// Centerline layer id.
pub const CENTERLINE_LAYER_ID: &str = "mat-roads-centerline";
/// Crosswalk layer id.
pub const CROSSWALK_LAYER_ID: &str = "mat-crosswalks";

/// Every layer the synthesizer owns, in draw order.
pub const CUSTOM_LAYER_IDS: [&str; 6] = [
    BACKGROUND_LAYER_ID,
    SIDEWALK_LAYER_ID,
    CASING_LAYER_ID,
    ROAD_BASE_LAYER_ID,
    CENTERLINE_LAYER_ID,
    CROSSWALK_LAYER_ID,
];

/// Ground color.
pub const GROUND_COLOR: Rgb = Rgb::new(0x7C, 0xFC, 0x00);
/// Sidewalk concrete color.
pub const SIDEWALK_COLOR: Rgb = Rgb::new(0xC0, 0xC0, 0xC0);
/// Road edge (casing) color.
pub const CASING_COLOR: Rgb = Rgb::WHITE;
/// Road surface color.
pub const ROAD_COLOR: Rgb = Rgb::BLACK;
/// Centerline and crosswalk paint color.
pub const MARKING_COLOR: Rgb = Rgb::WHITE;

/// Centerline dash pattern, in line widths.
pub const CENTERLINE_DASH: [f64; 2] = [3.0, 2.0];
/// Crosswalk stripe pattern, in line widths.
pub const CROSSWALK_DASH: [f64; 2] = [0.3, 0.3];
/// Crosswalk opacity.
pub const CROSSWALK_OPACITY: f64 = 0.9;

/// Road classes that get edge lines and a centerline.
pub const MAIN_ROAD_CLASSES: [&str; 7] = [
    "motorway",
    "trunk",
    "primary",
    "secondary",
    "tertiary",
    "street",
    "street_limited",
];

/// Road types treated as connectors: no edges, no centerline.
pub const CONNECTOR_TYPES: [&str; 4] = ["service", "link", "turning_loop", "turning_circle"];

/// Pedestrian ways drawn as sidewalks.
#[must_use]
pub fn sidewalk_filter() -> Filter {
    Filter::Any(vec![
        Filter::eq("type", "sidewalk"),
        Filter::eq("type", "footway"),
        Filter::All(vec![Filter::eq("class", "path"), Filter::ne("type", "crossing")]),
        Filter::All(vec![
            Filter::eq("class", "pedestrian"),
            Filter::ne("type", "crossing"),
        ]),
    ])
}

/// Main drivable roads, connectors excluded. Shared by casing and
/// centerline so both always cover the same features.
#[must_use]
pub fn main_road_filter() -> Filter {
    let mut parts = vec![
        Filter::GeometryIs(GeometryType::LineString),
        Filter::one_of("class", &MAIN_ROAD_CLASSES),
    ];
    parts.extend(CONNECTOR_TYPES.iter().map(|t| Filter::ne("type", t)));
    Filter::All(parts)
}

/// Every non-pedestrian line, connectors included.
#[must_use]
pub fn road_surface_filter() -> Filter {
    Filter::All(vec![
        Filter::GeometryIs(GeometryType::LineString),
        Filter::ne("class", "path"),
        Filter::ne("class", "pedestrian"),
        Filter::ne("type", "sidewalk"),
    ])
}

/// Marked pedestrian crossings.
#[must_use]
pub fn crosswalk_filter() -> Filter {
    Filter::All(vec![
        Filter::eq("class", "pedestrian"),
        Filter::eq("type", "crossing"),
    ])
}

/// Build the custom layer stack for a width policy, bottom layer first.
#[must_use]
pub fn plan_layers(widths: &RoadWidthPolicy) -> Vec<LayerSpec> {
    let mut crosswalk =
        LineStyle::dashed_square(MARKING_COLOR, widths.crosswalk, CROSSWALK_DASH.to_vec());
    crosswalk.opacity = CROSSWALK_OPACITY;

    vec![
        LayerSpec::background(BACKGROUND_LAYER_ID, GROUND_COLOR),
        LayerSpec::road_line(
            SIDEWALK_LAYER_ID,
            sidewalk_filter(),
            LineStyle::solid_round(SIDEWALK_COLOR, widths.sidewalk),
        ),
        LayerSpec::road_line(
            CASING_LAYER_ID,
            main_road_filter(),
            LineStyle::solid_round(CASING_COLOR, widths.casing()),
        ),
        LayerSpec::road_line(
            ROAD_BASE_LAYER_ID,
            road_surface_filter(),
            LineStyle::solid_round(ROAD_COLOR, widths.street),
        ),
        LayerSpec::road_line(
            CENTERLINE_LAYER_ID,
            main_road_filter(),
            LineStyle::dashed_square(MARKING_COLOR, widths.centerline, CENTERLINE_DASH.to_vec()),
        ),
        LayerSpec::road_line(CROSSWALK_LAYER_ID, crosswalk_filter(), crosswalk),
    ]
}

/// One mutation of a surface's layer stack.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerOp {
    /// Remove a previously added custom layer.
    Remove(String),
    /// Hide a base-style layer.
    Hide(String),
    /// Append a custom layer.
    Add(LayerSpec),
}

/// Whether `id` belongs to the synthesizer rather than the base style.
#[must_use]
pub fn is_custom_layer(id: &str) -> bool {
    CUSTOM_LAYER_IDS.contains(&id)
}

/// Plan a full (re)build against a surface whose style currently holds
/// `existing_layer_ids`.
///
/// Stale custom layers are removed first, then every base layer is
/// hidden, then the custom stack is appended. Applying the result to a
/// surface that is already styled leaves it in the same state.
#[must_use]
pub fn plan_build(existing_layer_ids: &[String], widths: &RoadWidthPolicy) -> Vec<LayerOp> {
    let (custom, base): (Vec<&String>, Vec<&String>) = existing_layer_ids
        .iter()
        .partition(|id| is_custom_layer(id));

    custom
        .into_iter()
        .map(|id| LayerOp::Remove(id.clone()))
        .chain(base.into_iter().map(|id| LayerOp::Hide(id.clone())))
        .chain(plan_layers(widths).into_iter().map(LayerOp::Add))
        .collect()
}

/// Apply planned operations in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the first [`SurfaceError`] the surface reports.
pub fn apply_ops<S: RenderSurface + ?Sized>(
    surface: &mut S,
    ops: &[LayerOp],
) -> Result<(), SurfaceError> {
    for op in ops {
        match op {
            LayerOp::Remove(id) => surface.remove_layer(id)?,
            LayerOp::Hide(id) => surface.set_layer_visibility(id, Visibility::None)?,
            LayerOp::Add(layer) => surface.add_layer(layer)?,
        }
    }
    Ok(())
}

/// Lifecycle of the thematic style on one surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynthesizerState {
    /// The surface has not reported a loaded style yet.
    Uninitialized,
    /// The style is loaded but the custom layers are not (or no longer)
    /// in place.
    Loaded,
    /// Custom layers are applied with these widths.
    Styled(RoadWidthPolicy),
}

/// Why a build did not happen. Not user-facing; the next lifecycle
/// event retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The surface has not signalled a loaded style.
    NotInitialized,
    /// The surface says its style is not loaded.
    StyleNotLoaded,
    /// The surface refused one of the layer operations.
    SurfaceRejected(SurfaceError),
}

/// Result of a synthesis attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    /// Custom layers are in place.
    Styled {
        /// Number of layer operations applied.
        operations: usize,
    },
    /// Nothing was (fully) applied.
    Skipped(SkipReason),
}

impl SynthesisOutcome {
    /// Whether the custom layers are now in place.
    #[must_use]
    pub const fn is_styled(&self) -> bool {
        matches!(self, Self::Styled { .. })
    }
}

/// Drives the thematic style on one render surface.
///
/// Builds are synchronous with the event that triggers them, so at most
/// one build is ever in flight per surface.
#[derive(Debug, Clone)]
pub struct StyleSynthesizer {
    state: SynthesizerState,
}

impl Default for StyleSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleSynthesizer {
    /// A synthesizer waiting for its surface's style.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SynthesizerState::Uninitialized,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SynthesizerState {
        self.state
    }

    /// Handle the surface's "style loaded" signal.
    pub fn on_style_loaded<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        widths: &RoadWidthPolicy,
    ) -> SynthesisOutcome {
        if !surface.is_style_loaded() {
            log::debug!("style loaded signal received but surface reports no style; skipping");
            return SynthesisOutcome::Skipped(SkipReason::StyleNotLoaded);
        }
        self.state = SynthesizerState::Loaded;
        self.build(surface, widths)
    }

    /// Handle a mat-size change: tear down and rebuild with new widths.
    pub fn on_mat_size_changed<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        widths: &RoadWidthPolicy,
    ) -> SynthesisOutcome {
        match self.state {
            SynthesizerState::Uninitialized => {
                log::debug!("mat size changed before style load; style will be built on load");
                SynthesisOutcome::Skipped(SkipReason::NotInitialized)
            }
            SynthesizerState::Loaded | SynthesizerState::Styled(_) => {
                if !surface.is_style_loaded() {
                    log::debug!("surface style not loaded; deferring rebuild");
                    self.state = SynthesizerState::Loaded;
                    return SynthesisOutcome::Skipped(SkipReason::StyleNotLoaded);
                }
                self.build(surface, widths)
            }
        }
    }

    fn build<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        widths: &RoadWidthPolicy,
    ) -> SynthesisOutcome {
        let ops = plan_build(&surface.style_layer_ids(), widths);
        match apply_ops(surface, &ops) {
            Ok(()) => {
                log::debug!(
                    "applied thematic style ({} ops, street {:.2}px)",
                    ops.len(),
                    widths.street
                );
                self.state = SynthesizerState::Styled(*widths);
                SynthesisOutcome::Styled {
                    operations: ops.len(),
                }
            }
            Err(e) => {
                log::warn!("thematic style skipped: {e}");
                self.state = SynthesizerState::Loaded;
                SynthesisOutcome::Skipped(SkipReason::SurfaceRejected(e))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::filter::FeatureTags;
    use crate::layer::{LayerKind, LineCap, LineJoin};
    use crate::overlay::{compute_overlay_geometry, compute_road_width_policy};
    use crate::testing::MockSurface;

    fn small_widths() -> RoadWidthPolicy {
        let catalog = Catalog::default();
        let spec = catalog.mat_size("small").unwrap();
        compute_road_width_policy(spec, &compute_overlay_geometry(spec))
    }

    fn large_widths() -> RoadWidthPolicy {
        let catalog = Catalog::default();
        let spec = catalog.mat_size("large").unwrap();
        compute_road_width_policy(spec, &compute_overlay_geometry(spec))
    }

    #[test]
    fn plan_order_is_fixed() {
        let ids: Vec<String> = plan_layers(&small_widths())
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, CUSTOM_LAYER_IDS);
    }

    #[test]
    fn casing_is_below_base() {
        let ids = CUSTOM_LAYER_IDS;
        let casing = ids.iter().position(|id| *id == CASING_LAYER_ID).unwrap();
        let base = ids.iter().position(|id| *id == ROAD_BASE_LAYER_ID).unwrap();
        assert!(casing < base);
    }

    #[test]
    fn plan_widths_follow_policy() {
        let w = small_widths();
        let layers = plan_layers(&w);
        let width_of = |id: &str| {
            layers
                .iter()
                .find(|l| l.id == id)
                .and_then(LayerSpec::line_style)
                .map(|s| s.width)
                .unwrap()
        };
        assert!((width_of(SIDEWALK_LAYER_ID) - w.sidewalk).abs() < 1e-12);
        assert!((width_of(CASING_LAYER_ID) - w.casing()).abs() < 1e-12);
        assert!((width_of(ROAD_BASE_LAYER_ID) - w.street).abs() < 1e-12);
        assert!((width_of(CENTERLINE_LAYER_ID) - w.centerline).abs() < 1e-12);
        assert!((width_of(CROSSWALK_LAYER_ID) - w.crosswalk).abs() < 1e-12);
    }

    #[test]
    fn markings_use_miter_and_butt() {
        let layers = plan_layers(&small_widths());
        for id in [CENTERLINE_LAYER_ID, CROSSWALK_LAYER_ID] {
            let style = layers
                .iter()
                .find(|l| l.id == id)
                .and_then(LayerSpec::line_style)
                .unwrap();
            assert_eq!(style.join, LineJoin::Miter, "{id}");
            assert_eq!(style.cap, LineCap::Butt, "{id}");
        }
        let crosswalk = layers.last().and_then(LayerSpec::line_style).unwrap();
        assert_eq!(crosswalk.dash_array.as_deref(), Some(&[0.3, 0.3][..]));
        assert!((crosswalk.opacity - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn background_is_lawn_green() {
        let layers = plan_layers(&small_widths());
        assert_eq!(
            layers[0].kind,
            LayerKind::Background {
                color: Rgb::new(0x7C, 0xFC, 0x00)
            }
        );
    }

    #[test]
    fn main_road_filter_excludes_connectors() {
        let f = main_road_filter();
        assert!(f.matches(&FeatureTags::line("primary", None)));
        assert!(f.matches(&FeatureTags::line("street_limited", None)));
        assert!(!f.matches(&FeatureTags::line("primary", Some("link"))));
        assert!(!f.matches(&FeatureTags::line("street", Some("turning_circle"))));
        assert!(!f.matches(&FeatureTags::line("service", None)));
    }

    #[test]
    fn road_surface_filter_keeps_connectors() {
        let f = road_surface_filter();
        assert!(f.matches(&FeatureTags::line("service", None)));
        assert!(f.matches(&FeatureTags::line("primary", Some("link"))));
        assert!(!f.matches(&FeatureTags::line("path", None)));
        assert!(!f.matches(&FeatureTags::line("pedestrian", None)));
        assert!(!f.matches(&FeatureTags::line("street", Some("sidewalk"))));
    }

    #[test]
    fn sidewalks_and_crosswalks_are_disjoint() {
        let crossing = FeatureTags::line("pedestrian", Some("crossing"));
        assert!(crosswalk_filter().matches(&crossing));
        assert!(!sidewalk_filter().matches(&crossing));

        let footway = FeatureTags::line("path", Some("footway"));
        assert!(sidewalk_filter().matches(&footway));
        assert!(!crosswalk_filter().matches(&footway));
    }

    #[test]
    fn plan_build_removes_hides_then_adds() {
        let existing = vec![
            "land".to_string(),
            "road-label".to_string(),
            CASING_LAYER_ID.to_string(),
        ];
        let ops = plan_build(&existing, &small_widths());
        assert_eq!(ops[0], LayerOp::Remove(CASING_LAYER_ID.to_string()));
        assert_eq!(ops[1], LayerOp::Hide("land".to_string()));
        assert_eq!(ops[2], LayerOp::Hide("road-label".to_string()));
        assert!(matches!(&ops[3], LayerOp::Add(l) if l.id == BACKGROUND_LAYER_ID));
        assert_eq!(ops.len(), 3 + CUSTOM_LAYER_IDS.len());
    }

    #[test]
    fn style_loaded_builds_and_hides_base() {
        let mut surface = MockSurface::with_base_layers(&["land", "water", "road-primary"]);
        let mut synth = StyleSynthesizer::new();
        let outcome = synth.on_style_loaded(&mut surface, &small_widths());
        assert!(outcome.is_styled());
        assert_eq!(synth.state(), SynthesizerState::Styled(small_widths()));
        assert!(surface.base_layers_hidden());
        assert_eq!(surface.custom_layer_ids(), CUSTOM_LAYER_IDS);
    }

    #[test]
    fn build_is_idempotent() {
        let mut surface = MockSurface::with_base_layers(&["land"]);
        let mut synth = StyleSynthesizer::new();
        synth.on_style_loaded(&mut surface, &small_widths());
        let first = surface.layers.clone();
        synth.on_style_loaded(&mut surface, &small_widths());
        assert_eq!(surface.layers, first);
    }

    #[test]
    fn size_change_rebuilds_with_new_widths() {
        let mut surface = MockSurface::with_base_layers(&["land"]);
        let mut synth = StyleSynthesizer::new();
        synth.on_style_loaded(&mut surface, &small_widths());
        let outcome = synth.on_mat_size_changed(&mut surface, &large_widths());
        assert!(outcome.is_styled());
        assert_eq!(synth.state(), SynthesizerState::Styled(large_widths()));
        let base = surface.custom_layer(ROAD_BASE_LAYER_ID).unwrap();
        let width = base.line_style().unwrap().width;
        assert!((width - large_widths().street).abs() < 1e-12);
        assert_eq!(surface.custom_layer_ids(), CUSTOM_LAYER_IDS);
    }

    #[test]
    fn size_change_before_load_is_skipped() {
        let mut surface = MockSurface::with_base_layers(&["land"]);
        let mut synth = StyleSynthesizer::new();
        let outcome = synth.on_mat_size_changed(&mut surface, &small_widths());
        assert_eq!(outcome, SynthesisOutcome::Skipped(SkipReason::NotInitialized));
        assert!(surface.custom_layer_ids().is_empty());
    }

    #[test]
    fn unloaded_style_is_skipped_not_fatal() {
        let mut surface = MockSurface::with_base_layers(&["land"]);
        surface.style_loaded = false;
        let mut synth = StyleSynthesizer::new();
        let outcome = synth.on_style_loaded(&mut surface, &small_widths());
        assert_eq!(outcome, SynthesisOutcome::Skipped(SkipReason::StyleNotLoaded));
        assert_eq!(synth.state(), SynthesizerState::Uninitialized);
    }

    #[test]
    fn rejected_layer_leaves_loaded_and_retries() {
        let mut surface = MockSurface::with_base_layers(&["land"]);
        surface.reject_layer = Some(CENTERLINE_LAYER_ID.to_string());
        let mut synth = StyleSynthesizer::new();
        let outcome = synth.on_style_loaded(&mut surface, &small_widths());
        assert!(matches!(
            outcome,
            SynthesisOutcome::Skipped(SkipReason::SurfaceRejected(_))
        ));
        assert_eq!(synth.state(), SynthesizerState::Loaded);

        // Next lifecycle event succeeds and cleans up the partial stack.
        surface.reject_layer = None;
        let outcome = synth.on_mat_size_changed(&mut surface, &small_widths());
        assert!(outcome.is_styled());
        assert_eq!(surface.custom_layer_ids(), CUSTOM_LAYER_IDS);
    }
}
