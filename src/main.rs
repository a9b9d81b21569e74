//! Host-Path Provisioner
//!
//! Serves storage classes whose provisioner matches `PROVISIONER_NAME` by
//! creating volume directories under the mounted `HOST_DIR`.
//!
//! Without a subcommand the binary runs the claim and volume controllers
//! against the cluster. The `provision` and `reclaim` subcommands run the
//! lifecycle engine once against local manifests, with no API server.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hostpath_provisioner::controller::{self, claims};
use hostpath_provisioner::provisioner::DEFAULT_STORAGE_ROOT;
use hostpath_provisioner::{
    class_name_for_claim, Context, ControllerConfig, Error, HostPathProvisioner,
    InMemoryStorageClasses, KubeStorageClassLookup, ProvisionOptions, Provisioner,
    ProvisionerConfig, ProvisionerMetrics, Result, StorageClassLookup,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Host-Path Provisioner - host directories as dynamically provisioned volumes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Provisioner name storage classes refer to
    #[arg(long, env = "PROVISIONER_NAME")]
    provisioner_name: Option<String>,

    /// Host directory mounted at the storage root
    #[arg(long, env = "HOST_DIR")]
    host_dir: Option<PathBuf>,

    /// Mount point of the host directory inside this container
    #[arg(long, env = "STORAGE_ROOT", default_value = DEFAULT_STORAGE_ROOT)]
    storage_root: PathBuf,

    /// Kubeconfig for running outside the cluster
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Whether leader election is expected in front of the controllers
    #[arg(
        long,
        env = "ENABLE_LEADER_ELECTION",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    enable_leader_election: bool,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Provision a volume for a claim manifest and print the volume as YAML
    Provision {
        /// Claim manifest
        #[arg(long)]
        claim: PathBuf,
        /// Storage class manifest (multi-document YAML)
        #[arg(long)]
        storage_classes: PathBuf,
        /// Volume name; defaults to pvc-<claim uid>
        #[arg(long)]
        volume_name: Option<String>,
    },
    /// Reclaim the backing directory of a volume manifest
    Reclaim {
        /// Volume manifest
        #[arg(long)]
        volume: PathBuf,
        /// Storage class manifest (multi-document YAML)
        #[arg(long)]
        storage_classes: PathBuf,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let config = ProvisionerConfig::new(
        args.provisioner_name.clone().unwrap_or_default(),
        args.host_dir.clone().unwrap_or_default(),
    )?
    .with_storage_root(&args.storage_root);

    info!("Starting Host-Path Provisioner");
    info!("  Version: {}", hostpath_provisioner::VERSION);
    info!("  Provisioner: {}", config.provisioner_name);
    info!("  Host dir: {}", config.host_dir.display());
    info!("  Storage root: {}", config.storage_root.display());

    match &args.command {
        Some(Command::Provision {
            claim,
            storage_classes,
            volume_name,
        }) => provision_manifest(config, claim, storage_classes, volume_name.clone()).await,
        Some(Command::Reclaim {
            volume,
            storage_classes,
        }) => reclaim_manifest(config, volume, storage_classes).await,
        None => run_controllers(&args, config).await,
    }
}

async fn run_controllers(args: &Args, config: ProvisionerConfig) -> Result<()> {
    let client = kube_client(args.kubeconfig.as_deref()).await?;
    let version = client.apiserver_version().await?;
    info!("  API server: {}", version.git_version);
    info!("  Leader election: {}", args.enable_leader_election);

    let metrics = ProvisionerMetrics::new()?;
    let classes = Arc::new(KubeStorageClassLookup::new(client.clone()));
    let provisioner = Arc::new(HostPathProvisioner::new(config, classes.clone()));

    // Start health server
    let health_addr = args.health_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(&health_addr).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = args.metrics_addr.clone();
    let server_metrics = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr, server_metrics).await {
            error!("Metrics server error: {}", e);
        }
    });

    let ctx = Context::new(
        client,
        provisioner,
        classes,
        metrics,
        ControllerConfig {
            leader_election: args.enable_leader_election,
        },
    );
    controller::run(ctx).await;

    info!("Provisioner shutdown complete");
    Ok(())
}

async fn kube_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let Some(path) = kubeconfig else {
        return Ok(Client::try_default().await?);
    };

    let kubeconfig = Kubeconfig::read_from(path)
        .map_err(|e| Error::Configuration(format!("Failed to read kubeconfig: {}", e)))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::Configuration(format!("Failed to load kubeconfig: {}", e)))?;
    Ok(Client::try_from(config)?)
}

// =============================================================================
// Manifest Commands
// =============================================================================

async fn provision_manifest(
    config: ProvisionerConfig,
    claim_path: &Path,
    classes_path: &Path,
    volume_name: Option<String>,
) -> Result<()> {
    let classes = Arc::new(load_classes(classes_path).await?);
    let claim: PersistentVolumeClaim = read_manifest(claim_path).await?;

    let class_name = class_name_for_claim(&claim)
        .ok_or_else(|| Error::InvalidRequest("claim has no storage class".into()))?
        .to_string();
    let class = classes
        .get(&class_name)
        .await?
        .ok_or_else(|| Error::ResourceNotFound {
            kind: "StorageClass".into(),
            name: class_name.clone(),
        })?;

    let volume_name = volume_name
        .or_else(|| claims::volume_name_for(&claim))
        .ok_or_else(|| Error::InvalidRequest("claim has no uid; pass --volume-name".into()))?;

    let provisioner = HostPathProvisioner::new(config, classes);
    let options = ProvisionOptions::new(claim.clone(), class, volume_name);
    let outcome = provisioner.provision(&options).await?;
    let volume = claims::finalize_volume(
        outcome.volume,
        &claim,
        &class_name,
        provisioner.provisioner_name(),
    );

    print!("{}", serde_yaml::to_string(&volume)?);
    Ok(())
}

async fn reclaim_manifest(
    config: ProvisionerConfig,
    volume_path: &Path,
    classes_path: &Path,
) -> Result<()> {
    let classes = Arc::new(load_classes(classes_path).await?);
    let volume: PersistentVolume = read_manifest(volume_path).await?;

    HostPathProvisioner::new(config, classes).delete(&volume).await?;
    info!("Reclaimed {}", volume_path.display());
    Ok(())
}

async fn load_classes(path: &Path) -> Result<InMemoryStorageClasses> {
    let classes = InMemoryStorageClasses::load(path).await?;
    info!("  Storage classes: {} from {}", classes.len().await, path.display());
    Ok(classes)
}

async fn read_manifest<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io("read manifest", path, e))?;
    Ok(serde_yaml::from_str(&text)?)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = ["hyper=warn", "kube=info", "tower=warn"]
        .iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(
            EnvFilter::from_default_env().add_directive(level.into()),
            |filter, directive| filter.add_directive(directive),
        );

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

// =============================================================================
// Health Server
// =============================================================================

async fn run_health_server(addr: &str) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let response = match req.uri().path() {
                "/healthz" | "/livez" | "/readyz" => Response::new(Body::from("ok")),
                _ => {
                    let mut response = Response::new(Body::from("not found"));
                    *response.status_mut() = StatusCode::NOT_FOUND;
                    response
                }
            };
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid health server address: {}", e))
    })?;

    info!("Health server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str, metrics: ProvisionerMetrics) -> Result<()> {
    use hyper::header::{HeaderValue, CONTENT_TYPE};
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(move |_conn| {
        let metrics = metrics.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let metrics = metrics.clone();
                async move {
                    let response = match req.uri().path() {
                        "/metrics" => match metrics.encode() {
                            Ok((content_type, buffer)) => {
                                let mut response = Response::new(Body::from(buffer));
                                if let Ok(value) = HeaderValue::from_str(&content_type) {
                                    response.headers_mut().insert(CONTENT_TYPE, value);
                                }
                                response
                            }
                            Err(e) => {
                                let mut response = Response::new(Body::from(e.to_string()));
                                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                                response
                            }
                        },
                        _ => {
                            let mut response = Response::new(Body::from("not found"));
                            *response.status_mut() = StatusCode::NOT_FOUND;
                            response
                        }
                    };
                    Ok::<_, std::convert::Infallible>(response)
                }
            }))
        }
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid metrics server address: {}", e))
    })?;

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
