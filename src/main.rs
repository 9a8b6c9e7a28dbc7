//! popup-map - drives the map viewport coordinator from stdin
//!
//! This is the composition root that wires together all the components.

use popup_map::adapters::outbound::HttpListingApi;
use popup_map::application::{LocationHandler, MapViewportService, ViewportDecision};
use popup_map::config::load_config;
use popup_map::domain::ports::ListingApi;
use popup_map::domain::value_objects::{GeoBounds, GeoPoint, MarkerId};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::format::FmtSpan;

/// A single stdin command.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    View {
        lat_ne: f64,
        lon_ne: f64,
        lat_sw: f64,
        lon_sw: f64,
    },
    Click(MarkerId),
    Dismiss,
    Locate(GeoPoint),
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let name = parts.next().ok_or_else(|| "empty command".to_string())?;
    let args: Vec<&str> = parts.collect();

    let numbers = |expected: usize| -> Result<Vec<f64>, String> {
        if args.len() != expected {
            return Err(format!("{} expects {} arguments", name, expected));
        }
        args.iter()
            .map(|a| a.parse::<f64>().map_err(|_| format!("invalid number: {}", a)))
            .collect()
    };

    match name {
        "view" => {
            let n = numbers(4)?;
            Ok(Command::View {
                lat_ne: n[0],
                lon_ne: n[1],
                lat_sw: n[2],
                lon_sw: n[3],
            })
        }
        "click" => match args.as_slice() {
            [id] => id
                .parse()
                .map(|id| Command::Click(MarkerId(id)))
                .map_err(|_| format!("invalid marker id: {}", id)),
            _ => Err("click expects 1 argument".to_string()),
        },
        "locate" => {
            let n = numbers(2)?;
            Ok(Command::Locate(GeoPoint::new(n[0], n[1])))
        }
        "dismiss" => Ok(Command::Dismiss),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command: {}", other)),
    }
}

/// Log every marker, detail and user location snapshot until the service goes away.
fn spawn_snapshot_logger(service: &MapViewportService) {
    let mut markers = service.subscribe_markers();
    let mut detail = service.subscribe_detail();
    let mut location = service.subscribe_user_location();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = markers.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let set = markers.borrow_and_update().clone();
                    tracing::info!("markers: {} known", set.len());
                }
                changed = detail.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = detail.borrow_and_update().clone();
                    match (&state.shown, state.load_error, state.loading) {
                        (Some(post), _, _) => tracing::info!(
                            "detail: #{} {} [{}] {} - {}",
                            post.id,
                            post.title,
                            post.post_type,
                            post.start_time,
                            post.end_time
                        ),
                        (None, true, _) => tracing::info!("detail: failed to load"),
                        (None, false, true) => tracing::info!("detail: loading"),
                        (None, false, false) => tracing::info!("detail: hidden"),
                    }
                }
                changed = location.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if let Some(point) = *location.borrow_and_update() {
                        tracing::info!(
                            "user location: ({}, {})",
                            point.latitude,
                            point.longitude
                        );
                    }
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting popup-map api={} threshold={} merge={}",
        cfg.api_base_url,
        cfg.change_threshold,
        cfg.merge_policy
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapter
    let api: Arc<dyn ListingApi> = Arc::new(HttpListingApi::new(cfg.http_listing_config())?);

    // 2. Application services
    let service = MapViewportService::new(api, cfg.viewport_options());
    let location = Arc::new(LocationHandler::new());
    service.attach_location(&location);

    spawn_snapshot_logger(&service);

    // 3. Drive from stdin
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        };

        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::View {
                lat_ne,
                lon_ne,
                lat_sw,
                lon_sw,
            }) => {
                let bounds = match GeoBounds::new(
                    GeoPoint::new(lat_ne, lon_ne),
                    GeoPoint::new(lat_sw, lon_sw),
                ) {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!("rejected viewport: {}", e);
                        continue;
                    }
                };
                match service.on_viewport_changed(bounds) {
                    ViewportDecision::Fetch { generation } => {
                        tracing::info!("viewport {} -> fetch #{}", bounds, generation)
                    }
                    ViewportDecision::Unchanged => {
                        tracing::info!("viewport {} -> unchanged", bounds)
                    }
                }
            }
            Ok(Command::Click(id)) => service.on_marker_clicked(id),
            Ok(Command::Dismiss) => service.dismiss_detail(),
            Ok(Command::Locate(point)) => location.update_location(point),
            Ok(Command::Quit) => break,
            Err(e) => tracing::warn!("{}", e),
        }
    }

    service.detach_location();
    if !service.wait_idle(Duration::from_secs(5)).await {
        tracing::warn!("exiting with fetches still in flight");
    }

    tracing::info!("popup-map stopped");
    Ok(())
}
