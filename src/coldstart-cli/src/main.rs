//! `coldstartd`: watches workloads in one Kubernetes namespace, scrapes
//! and autoscales the ones with autoscaling enabled, and serves the
//! activation gateway that forces parked workloads back up on demand.

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use coldstart_build_info::{build_info, BuildInfo};
use coldstart_context::Context as AppContext;
use coldstart_gateway::GatewayState;
use coldstart_ore::cli::{self, CliConfig};
use coldstart_ore::error::ErrorExt;
use once_cell::sync::Lazy;
use tracing::info;

const BUILD_INFO: BuildInfo = build_info!();

pub static VERSION: Lazy<String> = Lazy::new(|| BUILD_INFO.human_version());

/// Scale-to-zero autoscaler and activation gateway.
#[derive(clap::Parser)]
#[clap(name = "coldstartd", version = VERSION.as_str())]
struct Args {
    /// Path to a kubeconfig file. Falls back to in-cluster config when
    /// unset.
    #[clap(long, env = "KUBECONFIG", value_name = "PATH")]
    kubeconfig: Option<String>,

    /// The namespace to watch. Required: this process never watches
    /// cluster-wide.
    #[clap(long, env = "NAMESPACE", value_name = "NAMESPACE")]
    namespace: String,

    /// The address on which to serve the activation gateway (and the
    /// internal `/metrics`, `/api/livez` routes).
    #[clap(long, env = "LISTEN", value_name = "HOST:PORT", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Raise the default log level from `info` to `debug`.
    #[clap(long, env = "DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = cli::parse_args(CliConfig {
        env_prefix: Some("COLDSTARTD_"),
    });
    if let Err(err) = run(args).await {
        eprintln!("coldstartd: fatal: {}", err.display_with_causes());
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    coldstart_ore::tracing_setup::init(args.debug);
    info!(version = %VERSION.as_str(), namespace = %args.namespace, "starting coldstartd");

    let kube_config = match &args.kubeconfig {
        Some(path) => {
            let kubeconfig = kube::config::Kubeconfig::read_from(path)
                .with_context(|| format!("reading kubeconfig at {path}"))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &Default::default()).await?
        }
        None => kube::Config::infer().await.context("inferring kube config")?,
    };
    let client = kube::Client::try_from(kube_config).context("constructing kube client")?;

    let adapters = coldstart_kubernetes::adapters(client);
    let app_context = AppContext::new(adapters);
    coldstart_gateway::register_metrics(&app_context.metrics);
    coldstart_autoscaler::register_metrics(&app_context.metrics);
    let context_tasks = app_context.run();

    let gateway_state = Arc::new(GatewayState {
        workload_cache: Arc::clone(&app_context.workload_cache),
        workload_updater: Arc::clone(&app_context.workload_updater),
        registry: Arc::clone(&app_context.registry),
        signals: Arc::clone(&app_context.signals),
        clients: coldstart_gateway::ProxyClients::new(),
        metrics: app_context.metrics.clone(),
    });

    let shutdown = app_context.shutdown.clone();
    tokio::select! {
        result = coldstart_gateway::serve(gateway_state, args.listen, shutdown_signal()) => {
            result?;
        }
        _ = shutdown.cancelled() => {}
    }

    app_context.shutdown.cancel();
    context_tasks.join().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
