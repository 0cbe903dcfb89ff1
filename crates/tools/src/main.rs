use std::path::PathBuf;
use std::process::ExitCode;

use catalog::{FileStateStore, PresenceCatalog, UserProfile};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use compute::GroupFilter;
use foundation::LatLng;
use formats::{MemberSnapshot, Topology};
use layers::{DetailView, MarkerElement, MemoryViewport, Viewport, ViewportKind};
use runtime::{FixedLocationProvider, Geolocator};
use tracing_subscriber::EnvFilter;
use watakoko::{AppConfig, AppError, PresenceApp, parse_radius};

type App = PresenceApp<FileStateStore, MemoryViewport>;

#[derive(Debug, Parser)]
#[command(name = "watakoko", version, about = "Campus presence map core")]
struct Cli {
    /// Building topology document (default: $WATAKOKO_TOPOLOGY).
    #[arg(long, global = true)]
    topology: Option<PathBuf>,
    /// Member snapshot document (default: $WATAKOKO_MEMBERS).
    #[arg(long, global = true)]
    members: Option<PathBuf>,
    /// Directory holding the stored profile and presence record.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a fix to a building, and optionally rank a floor's rooms.
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        floor: Option<String>,
        /// Room search radius in meters.
        #[arg(long, value_parser = parse_radius)]
        radius: Option<f64>,
    },
    /// Cluster the member snapshot at a zoom level.
    Cluster {
        #[arg(long)]
        zoom: f64,
        #[arg(long, default_value = "all")]
        group: String,
        /// Reference time for staleness (RFC 3339, default: now).
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Store the local user profile.
    Profile {
        #[arg(long)]
        id: String,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        group: String,
    },
    /// Register the current location (room or free text).
    Register {
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Use this building instead of the one containing the fix.
        #[arg(long)]
        building: Option<String>,
        #[arg(long, required_unless_present = "manual")]
        floor: Option<String>,
        #[arg(long, required_unless_present = "manual")]
        room: Option<String>,
        /// Free-text location instead of a room.
        #[arg(long, conflicts_with_all = ["floor", "room", "building"])]
        manual: Option<String>,
    },
    /// Rebuild personal markers from stored state on both viewports.
    Restore,
    /// Building overlay summary.
    Buildings,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = AppConfig::from_env();
    if let Some(p) = cli.topology {
        config.topology_path = p;
    }
    if let Some(p) = cli.members {
        config.members_path = p;
    }
    if let Some(p) = cli.state_dir {
        config.state_dir = p;
    }

    match cli.command {
        Command::Locate {
            lat,
            lng,
            floor,
            radius,
        } => {
            if let Some(r) = radius {
                config.room_radius_m = r;
            }
            let mut app = open(&config)?;
            let outcome = app.locate(&geolocator(&config, lat, lng)).await?;
            match (&outcome.building_id, &outcome.nearest) {
                (Some(id), _) => println!("building {id} {}", building_name(&app, id)),
                (None, Some((id, d))) => {
                    println!("not in any building; nearest {id} {} ({d:.1} m)", building_name(&app, id))
                }
                (None, None) => println!("not in any building"),
            }
            if let (Some(floor), Some(_)) = (floor, &outcome.building_id) {
                let ranked = app.select_floor(&floor)?;
                if ranked.is_empty() {
                    println!("no rooms within {:.0} m", config.room_radius_m);
                }
                for r in ranked {
                    println!("  {:>7.1} m  {} {}", r.distance_m, r.room.id, r.room.display_name);
                }
            }
        }
        Command::Cluster { zoom, group, now } => {
            let now = now.unwrap_or_else(Utc::now);
            let mut app = open(&config)?;
            app.attach(ViewportKind::Preview, MemoryViewport::new(zoom), now);
            app.set_group_filter(GroupFilter::parse(&group), now);
            app.toggle_members(now);
            print_member_layer(&app, ViewportKind::Preview);
        }
        Command::Profile {
            id,
            username,
            group,
        } => {
            let mut app = open(&config)?;
            app.set_user(UserProfile::new(id, username, group, Utc::now()))?;
            println!("profile saved to {}", config.state_dir.display());
        }
        Command::Register {
            lat,
            lng,
            building,
            floor,
            room,
            manual,
        } => {
            let now = Utc::now();
            let mut app = open(&config)?;
            for kind in ViewportKind::ALL {
                app.attach(kind, MemoryViewport::new(15.0), now);
            }
            if let (Some(lat), Some(lng)) = (lat, lng) {
                app.locate(&geolocator(&config, lat, lng)).await?;
            }
            let record = match manual {
                Some(name) => app.register_manual(&name, now)?,
                None => {
                    if let Some(b) = building {
                        app.select_building(&b)?;
                    }
                    let floor = floor.ok_or(AppError::IncompleteSelection)?;
                    let room = room.ok_or(AppError::IncompleteSelection)?;
                    app.select_floor(&floor)?;
                    app.select_room(&room)?;
                    app.register_location(now)?
                }
            };
            println!("{}", serde_json::to_string_pretty(&record).unwrap_or_default());
        }
        Command::Restore => {
            let now = Utc::now();
            let mut app = open(&config)?;
            for kind in ViewportKind::ALL {
                let restored = app.attach(kind, MemoryViewport::new(15.0), now);
                println!(
                    "{kind}: gps={} registered={}",
                    restored.gps, restored.registered
                );
                print_personal(&app, kind);
            }
        }
        Command::Buildings => {
            let app = open(&config)?;
            let overlay = app.building_overlay();
            for shape in &overlay.shapes {
                println!(
                    "{} {} outline={} triangles={}",
                    shape.building_id,
                    shape.color,
                    shape.outline.len(),
                    shape.fill.len() / 3
                );
            }
        }
    }
    Ok(())
}

fn open(config: &AppConfig) -> Result<App, AppError> {
    let topology = Topology::load(&config.topology_path)?;
    let members = MemberSnapshot::load(&config.members_path)?;
    if members.skipped > 0 {
        tracing::warn!(skipped = members.skipped, "member snapshot had malformed records");
    }
    let store = FileStateStore::new(&config.state_dir)?;
    Ok(PresenceApp::new(
        topology,
        members.snapshot,
        PresenceCatalog::new(store),
        config,
    ))
}

// The CLI has no device GPS; the fix comes from the command line.
fn geolocator(config: &AppConfig, lat: f64, lng: f64) -> Geolocator<FixedLocationProvider> {
    Geolocator::new(
        FixedLocationProvider::at(LatLng::new(lat, lng)),
        config.position_options(),
    )
}

fn building_name<'a>(app: &'a App, id: &str) -> &'a str {
    app.topology()
        .building(id)
        .map_or("", |b| b.display_name.as_str())
}

fn print_member_layer(app: &App, kind: ViewportKind) {
    let Some(viewport) = app.viewport(kind) else {
        return;
    };
    println!("zoom {}", viewport.zoom());
    for (handle, _) in app.markers().member_markers(kind) {
        let Some(placed) = viewport.marker(handle) else {
            continue;
        };
        match (&placed.element, app.click(kind, handle)) {
            (MarkerElement::Cluster(pin), Some(DetailView::Cluster(detail))) => {
                println!(
                    "cluster {} [{}] at {}: {} ({})",
                    pin.key, pin.badge.text, placed.at, detail.title, detail.summary
                );
            }
            (MarkerElement::Member(pin), Some(DetailView::Member(detail))) => {
                println!(
                    "member {} {} at {}: {} {} opacity={} | {}",
                    pin.member_id,
                    detail.username,
                    placed.at,
                    detail.status,
                    pin.color,
                    pin.opacity,
                    detail.location
                );
            }
            _ => {}
        }
    }
}

fn print_personal(app: &App, kind: ViewportKind) {
    let Some(viewport) = app.viewport(kind) else {
        return;
    };
    for (_, placed) in viewport.markers() {
        if !placed.element.is_member_layer() {
            println!("  {} at {}", placed.element.kind(), placed.at);
        }
    }
}
