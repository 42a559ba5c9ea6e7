//! playmat: render, capture and export a play-mat road map.
//!
//! Reads road lines from a GeoJSON file, styles them for the chosen mat
//! size, and writes the print-area image together with its configuration
//! document. Useful for:
//!
//! - Producing print-ready captures without a browser
//! - Inspecting the generated road layers for a mat size
//! - Checking address search against the geocoding service
//!
//! # Usage
//!
//! ```text
//! playmat capture --features roads.geojson --size medium --out-dir out/
//! playmat capture --features roads.geojson --search "Times Square" --rotate-steps -2
//! playmat plan --size large
//! playmat search "Times Square"
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use playmat_core::catalog::{DEFAULT_COLOR_SCHEME_KEY, DEFAULT_MAT_SIZE_KEY};
use playmat_core::{
    CaptureOutput, Catalog, OverlayMode, RenderSurface, RgbaImage, Session, SessionDefaults,
    SessionEvent, ViewportState, compute_overlay_geometry, compute_road_width_policy, plan_layers,
};
use playmat_export::{ExportBundle, layers_to_json};
use playmat_geocode::{GeocodeError, GeocodeResult, Geocoder, GeocoderConfig, MapboxGeocoder};
use playmat_render::{FeatureCollection, SoftwareSurface, SurfaceConfig};

/// Play-mat map designer.
///
/// Styles a road map for a physical mat size and captures exactly the
/// area that will be printed.
#[derive(Parser)]
#[command(name = "playmat", version)]
struct Cli {
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the map and write the print-area PNG and config JSON.
    Capture(CaptureArgs),
    /// Print the road layers for a mat size as style JSON.
    Plan(PlanArgs),
    /// Look up an address and print the matches.
    Search(SearchArgs),
}

/// Catalog selection shared by `capture` and `plan`.
#[derive(Args)]
struct CatalogArgs {
    /// Catalog JSON replacing the built-in mat sizes and color schemes.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Mat size key.
    #[arg(long, default_value = DEFAULT_MAT_SIZE_KEY)]
    size: String,
}

#[derive(Args)]
struct CaptureArgs {
    /// GeoJSON `FeatureCollection` of road lines.
    #[arg(long)]
    features: PathBuf,

    #[command(flatten)]
    catalog: CatalogArgs,

    /// Color scheme key.
    #[arg(long, default_value = DEFAULT_COLOR_SCHEME_KEY)]
    color: String,

    /// Map center longitude.
    #[arg(long, default_value_t = ViewportState::DEFAULT_CENTER_LNG, allow_negative_numbers = true)]
    lng: f64,

    /// Map center latitude.
    #[arg(long, default_value_t = ViewportState::DEFAULT_CENTER_LAT, allow_negative_numbers = true)]
    lat: f64,

    /// Map zoom level.
    #[arg(long, default_value_t = ViewportState::DEFAULT_ZOOM)]
    zoom: f64,

    /// Map bearing in degrees.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    rotation: f64,

    /// Additional 15 degree rotation steps; negative turns left.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    rotate_steps: i32,

    /// Draw the preview selection at the mat's ground footprint for the
    /// current zoom. The capture still covers the fixed print area.
    #[arg(long)]
    track_zoom: bool,

    /// Device pixels per CSS pixel.
    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f64,

    /// Viewport width in CSS pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Viewport height in CSS pixels.
    #[arg(long, default_value_t = 800)]
    height: u32,

    /// Address to center the map on. Needs `MAPBOX_TOKEN`; skipped
    /// without it. A failed or empty search aborts the capture.
    #[arg(long)]
    search: Option<String>,

    /// Address recorded in the config document. Defaults to the search
    /// match.
    #[arg(long)]
    address: Option<String>,

    /// Directory for the exported files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write the whole viewport with the selection box drawn on it.
    #[arg(long)]
    preview: Option<PathBuf>,
}

#[derive(Args)]
struct PlanArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
}

#[derive(Args)]
struct SearchArgs {
    /// Free-text address or place name.
    query: String,

    /// Print matches as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .format_timestamp_secs()
        .init();

    let result = match cli.command {
        Command::Capture(args) => run_capture(&args).await,
        Command::Plan(args) => run_plan(&args),
        Command::Search(args) => run_search(&args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// CAPTURE
// =============================================================================

async fn run_capture(args: &CaptureArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(args.catalog.catalog.as_deref())?;
    let geojson = std::fs::read_to_string(&args.features)
        .with_context(|| format!("reading {}", args.features.display()))?;
    let features = FeatureCollection::from_geojson_str(&geojson)
        .with_context(|| format!("parsing {}", args.features.display()))?;
    eprintln!(
        "Features: {} ({} road lines)",
        args.features.display(),
        features.features.len(),
    );

    let location = match args.search.as_deref() {
        Some(query) => locate(query).await?,
        None => None,
    };
    let address = args
        .address
        .clone()
        .or_else(|| location.as_ref().map(|r| r.label.clone()));

    let rendered = render_capture(args, catalog, features, location.as_ref())?;
    let capture = &rendered.capture;
    eprintln!(
        "Captured {}x{} px at ({}, {}), bearing {:.0}°",
        capture.region.device_pixel_width,
        capture.region.device_pixel_height,
        capture.region.device_pixel_x,
        capture.region.device_pixel_y,
        capture.snapshot.rotation_degrees,
    );

    let bundle = ExportBundle::new(capture, address.as_deref(), chrono::Utc::now())
        .context("building export document")?;
    write_bundle(&args.out_dir, &bundle)?;

    if let Some(ref path) = args.preview {
        let png = playmat_core::capture::encode_png(&rendered.preview)
            .context("encoding preview")?;
        std::fs::write(path, &png).with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Preview written to {} ({} bytes)", path.display(), png.len());
    }

    Ok(())
}

/// Result of driving a session through one capture.
struct Rendered {
    capture: CaptureOutput,
    preview: RgbaImage,
}

/// Load the style, move the camera, render, and capture the print area.
fn render_capture(
    args: &CaptureArgs,
    catalog: Catalog,
    features: FeatureCollection,
    location: Option<&GeocodeResult>,
) -> anyhow::Result<Rendered> {
    let defaults = SessionDefaults {
        mat_size: args.catalog.size.clone(),
        color_scheme: args.color.clone(),
        overlay_mode: if args.track_zoom {
            OverlayMode::TrackZoom
        } else {
            OverlayMode::FixedPhysical
        },
        ..SessionDefaults::default()
    };
    let mut session = Session::new(catalog, &defaults)?;

    let config = SurfaceConfig {
        css_width: args.width,
        css_height: args.height,
        device_pixel_ratio: args.pixel_ratio,
        ..SurfaceConfig::default()
    };
    let mut surface = SoftwareSurface::new(config, features)?;
    surface.finish_loading();

    let outcome = session.on_event(&mut surface, SessionEvent::StyleLoaded)?;
    if let Some(outcome) = outcome {
        log::info!("style synthesis: {outcome:?}");
    }

    let mut camera_events = vec![SessionEvent::SetCenterZoom {
        lng: args.lng,
        lat: args.lat,
        zoom: args.zoom,
    }];
    if let Some(found) = location {
        camera_events.push(found.location_event());
    }
    camera_events.push(SessionEvent::RotateTo(args.rotation));
    let step = if args.rotate_steps < 0 {
        SessionEvent::RotateLeft
    } else {
        SessionEvent::RotateRight
    };
    for _ in 0..args.rotate_steps.unsigned_abs() {
        camera_events.push(step.clone());
    }

    for event in camera_events {
        session.on_event(&mut surface, event)?;
        surface.settle();
        session.on_event(&mut surface, SessionEvent::SurfaceMoved)?;
    }

    surface.render()?;
    let capture = session.capture(&surface)?;
    let preview = surface.preview(&session.selection_box())?;
    log::debug!("camera after capture: {:?}", surface.camera());
    Ok(Rendered { capture, preview })
}

/// Best match for `query`, or `None` when no access token is
/// configured. Any other search failure aborts the capture instead of
/// falling back to the explicit center.
async fn locate(query: &str) -> anyhow::Result<Option<GeocodeResult>> {
    let config = match GeocoderConfig::from_env() {
        Ok(config) => config,
        Err(e @ GeocodeError::MissingToken { .. }) => {
            eprintln!("Search disabled: {e}");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let geocoder = MapboxGeocoder::new(config)?;
    best_match(&geocoder, query).await.map(Some)
}

/// First result for `query`. An empty result list is a
/// [`GeocodeError::NoResult`].
async fn best_match<G: Geocoder + ?Sized>(
    geocoder: &G,
    query: &str,
) -> anyhow::Result<GeocodeResult> {
    let results = geocoder.forward(query).await.map_err(search_failure)?;
    let best = results
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NoResult {
            query: query.to_string(),
        })?;
    eprintln!(
        "Search: {query:?} -> {} ({:.5}, {:.5})",
        best.label, best.longitude, best.latitude,
    );
    Ok(best)
}

/// Attach a retry hint to failures that may clear up on their own.
fn search_failure(e: GeocodeError) -> anyhow::Error {
    if e.is_retryable() {
        anyhow!(e).context("temporary failure, try again")
    } else {
        e.into()
    }
}

fn write_bundle(out_dir: &Path, bundle: &ExportBundle) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let map_path = out_dir.join(&bundle.map_file_name);
    std::fs::write(&map_path, &bundle.png)
        .with_context(|| format!("writing {}", map_path.display()))?;
    eprintln!("Map written to {} ({} bytes)", map_path.display(), bundle.png.len());

    let config_path = out_dir.join(&bundle.config_file_name);
    std::fs::write(&config_path, &bundle.config_json)
        .with_context(|| format!("writing {}", config_path.display()))?;
    eprintln!("Config written to {}", config_path.display());
    Ok(())
}

// =============================================================================
// PLAN
// =============================================================================

fn run_plan(args: &PlanArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(args.catalog.catalog.as_deref())?;
    println!("{}", plan_json(&catalog, &args.catalog.size)?);
    Ok(())
}

/// Pretty style JSON for the road layers of mat size `size`.
fn plan_json(catalog: &Catalog, size: &str) -> anyhow::Result<String> {
    let spec = catalog.require_mat_size(size)?;
    let geometry = compute_overlay_geometry(spec);
    let widths = compute_road_width_policy(spec, &geometry);
    eprintln!(
        "Mat: {} ({}), selection {:.1}x{:.1} px",
        spec.display_name, spec.display_dimensions, geometry.css_width_px, geometry.css_height_px,
    );
    eprintln!(
        "Widths: street={:.2} highway={:.2} sidewalk={:.2} centerline={:.2} casing={:.2}",
        widths.street,
        widths.highway,
        widths.sidewalk,
        widths.centerline,
        widths.casing(),
    );
    Ok(serde_json::to_string_pretty(&layers_to_json(&plan_layers(
        &widths,
    )))?)
}

// =============================================================================
// SEARCH
// =============================================================================

async fn run_search(args: &SearchArgs) -> anyhow::Result<()> {
    let geocoder = MapboxGeocoder::new(GeocoderConfig::from_env()?)?;
    let results = match geocoder.forward(&args.query).await {
        Ok(results) => results,
        Err(GeocodeError::NoResult { .. }) => Vec::new(),
        Err(e) => return Err(search_failure(e)),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        eprintln!("No matches for {:?}", args.query);
    }
    for r in &results {
        let relevance = r.relevance.map_or_else(String::new, |v| format!("  [{v:.2}]"));
        println!("{:>11.5} {:>10.5}  {}{relevance}", r.longitude, r.latitude, r.label);
    }
    Ok(())
}

// =============================================================================
// SHARED
// =============================================================================

fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::default());
    };
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let catalog =
        Catalog::from_json(&json).with_context(|| format!("loading catalog {}", path.display()))?;
    eprintln!(
        "Catalog: {} ({} sizes, {} color schemes)",
        path.display(),
        catalog.mat_sizes.len(),
        catalog.color_schemes.len(),
    );
    Ok(catalog)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;
    use playmat_render::RoadFeature;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn capture_args(extra: &[&str]) -> CaptureArgs {
        let mut argv = vec!["playmat", "capture", "--features", "roads.geojson"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Capture(args) => args,
            _ => unreachable!("parsed a capture command"),
        }
    }

    fn roads() -> FeatureCollection {
        FeatureCollection {
            features: vec![
                RoadFeature::line(&[(-79.81, 43.3255), (-79.79, 43.3255)], "service", None),
                RoadFeature::line(
                    &[(-79.81, 43.3265), (-79.79, 43.3265)],
                    "path",
                    Some("footway"),
                ),
            ],
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn capture_defaults() {
        let args = capture_args(&[]);
        assert_eq!(args.catalog.size, "small");
        assert_eq!(args.color, "classic");
        assert!((args.lng - ViewportState::DEFAULT_CENTER_LNG).abs() < 1e-12);
        assert!((args.zoom - ViewportState::DEFAULT_ZOOM).abs() < 1e-12);
        assert_eq!(args.rotate_steps, 0);
        assert_eq!((args.width, args.height), (1280, 800));
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert!(args.search.is_none());
    }

    #[test]
    fn negative_coordinates_and_steps() {
        let args = capture_args(&["--lng", "-73.9855", "--rotate-steps", "-2"]);
        assert!((args.lng - -73.9855).abs() < 1e-12);
        assert_eq!(args.rotate_steps, -2);
    }

    #[test]
    fn search_requires_query() {
        assert!(Cli::try_parse_from(["playmat", "search"]).is_err());
        let cli = Cli::try_parse_from(["playmat", "search", "Times Square", "--json"]).unwrap();
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "Times Square");
                assert!(args.json);
            }
            _ => unreachable!("parsed a search command"),
        }
    }

    #[test]
    fn plan_lists_custom_layers() {
        let json = plan_json(&Catalog::default(), "medium").unwrap();
        let layers: serde_json::Value = serde_json::from_str(&json).unwrap();
        let ids: Vec<&str> = layers
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, playmat_core::style::CUSTOM_LAYER_IDS);
    }

    #[test]
    fn plan_unknown_size() {
        assert!(plan_json(&Catalog::default(), "huge").is_err());
    }

    #[test]
    fn capture_with_rotation_steps() {
        let args = capture_args(&[
            "--lng",
            "-79.8",
            "--lat",
            "43.3255",
            "--zoom",
            "17",
            "--rotation",
            "45",
            "--rotate-steps",
            "-3",
            "--width",
            "800",
            "--height",
            "600",
        ]);
        let rendered = render_capture(&args, Catalog::default(), roads(), None).unwrap();
        assert_eq!(rendered.capture.image.dimensions(), (384, 192));
        assert!(rendered.capture.snapshot.rotation_degrees.abs() < 1e-9);
        assert_eq!(rendered.preview.dimensions(), (800, 600));
    }

    #[test]
    fn capture_flies_to_search_match() {
        let args = capture_args(&["--pixel-ratio", "2", "--size", "large"]);
        let found = GeocodeResult {
            label: "Spencer Smith Park".into(),
            longitude: -79.795,
            latitude: 43.326,
            relevance: Some(0.9),
        };
        let rendered = render_capture(&args, Catalog::default(), roads(), Some(&found)).unwrap();
        let snapshot = &rendered.capture.snapshot;
        assert!((snapshot.viewport.center_lng - -79.795).abs() < 1e-9);
        assert!((snapshot.viewport.center_lat - 43.326).abs() < 1e-9);
        assert!((snapshot.viewport.zoom - 17.0).abs() < 1e-9);
        assert_eq!(rendered.capture.image.dimensions(), (1152, 768));
    }

    /// Serve one HTTP response on a local port and return its base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    fn geocoder(base_url: String) -> MapboxGeocoder {
        let mut config = GeocoderConfig::new("pk.test");
        config.base_url = base_url;
        MapboxGeocoder::new(config).unwrap()
    }

    #[tokio::test]
    async fn search_match_is_first_result() {
        let body = r#"{"features":[
            {"place_name":"Spencer Smith Park","relevance":0.9,"center":[-79.795,43.326]},
            {"place_name":"Spencer Creek","relevance":0.5,"center":[-79.9,43.27]}
        ]}"#;
        let base = serve_once("200 OK", body).await;
        let best = best_match(&geocoder(base), "spencer smith").await.unwrap();
        assert_eq!(best.label, "Spencer Smith Park");
        assert!((best.longitude - -79.795).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unavailable_search_aborts_with_retry_hint() {
        let base = serve_once("503 Service Unavailable", r#"{"message":"busy"}"#).await;
        let err = best_match(&geocoder(base), "spencer smith").await.unwrap_err();
        assert_eq!(err.to_string(), "temporary failure, try again");
        assert!(matches!(
            err.downcast_ref::<GeocodeError>(),
            Some(GeocodeError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn empty_search_aborts() {
        let base = serve_once("200 OK", r#"{"features":[]}"#).await;
        let err = best_match(&geocoder(base), "nowhere").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GeocodeError>(),
            Some(GeocodeError::NoResult { .. })
        ));
    }

    #[tokio::test]
    async fn rejected_token_aborts_without_retry_hint() {
        let base = serve_once("401 Unauthorized", r#"{"message":"Not Authorized"}"#).await;
        let err = best_match(&geocoder(base), "spencer smith").await.unwrap_err();
        assert!(!format!("{err:#}").contains("try again"));
        assert!(matches!(
            err.downcast_ref::<GeocodeError>(),
            Some(GeocodeError::Status { status: 401, .. })
        ));
    }

    #[test]
    fn track_zoom_capture_has_fixed_size() {
        let args = capture_args(&["--track-zoom", "--pixel-ratio", "2"]);
        let rendered = render_capture(&args, Catalog::default(), roads(), None).unwrap();
        assert_eq!(rendered.capture.image.dimensions(), (768, 384));
    }

    #[test]
    fn capture_rejects_unknown_color() {
        let args = capture_args(&["--color", "plaid"]);
        assert!(render_capture(&args, Catalog::default(), roads(), None).is_err());
    }
}
