//! warden — playbook-driven namespace provisioning.
//!
//! ```text
//! warden create team-a
//! warden get namespaces
//! warden reset --namespace team-a
//! warden delete namespace team-a --wait
//! warden serve --port 8400 --cors
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod settings;
mod wiring;

use settings::Settings;

#[derive(Parser)]
#[command(
    name = "warden",
    about = "Warden — playbook-driven namespace provisioning",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Playbook working directory (defaults to $WARDEN_ROOT or `.`).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Kubeconfig context to use (defaults to $WARDEN_CONTEXT or the
    /// ambient configuration).
    #[arg(long, global = true)]
    context: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a namespace from the playbook
    Create {
        /// Namespace to provision
        namespace: String,
    },
    /// Delete cluster resources
    Delete {
        #[command(subcommand)]
        target: DeleteTarget,
    },
    /// List cluster resources
    Get {
        #[command(subcommand)]
        resource: GetResource,
    },
    /// Reset a namespace's inventory to the playbook defaults and re-apply
    Reset {
        #[arg(long)]
        namespace: String,
    },
    /// Re-render a namespace's current inventory and apply it
    Apply {
        namespace: String,
    },
    /// Run the HTTP API server and the deletion reconciler
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Enable permissive CORS
        #[arg(long)]
        cors: bool,
    },
    /// Print tool, client, and server versions
    Version,
}

#[derive(Subcommand)]
enum DeleteTarget {
    /// Delete a namespace and its local records
    Namespace {
        namespace: String,
        /// Defer local cleanup until the cluster confirms the namespace
        /// is gone (handled by the reconciler in `serve`)
        #[arg(long)]
        wait: bool,
    },
    /// Delete a batch job in a namespace
    Job { namespace: String, job: String },
}

#[derive(Subcommand)]
enum GetResource {
    /// All cluster namespaces with readiness and managed flags
    Namespaces,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,warden=debug".parse().expect("static filter")),
        )
        .init();

    let cli = Cli::parse();

    let (port, cors) = match &cli.command {
        Commands::Serve { port, cors } => (*port, *cors),
        _ => (None, false),
    };
    let settings = Settings::resolve(cli.root, cli.context, port, cors)?;

    match cli.command {
        Commands::Create { namespace } => commands::lifecycle::create(&settings, &namespace).await,
        Commands::Delete { target } => match target {
            DeleteTarget::Namespace { namespace, wait } => {
                commands::lifecycle::delete_namespace(&settings, &namespace, wait).await
            }
            DeleteTarget::Job { namespace, job } => {
                commands::lifecycle::delete_job(&settings, &namespace, &job).await
            }
        },
        Commands::Get {
            resource: GetResource::Namespaces,
        } => commands::get::namespaces(&settings).await,
        Commands::Reset { namespace } => commands::lifecycle::reset(&settings, &namespace).await,
        Commands::Apply { namespace } => commands::lifecycle::apply(&settings, &namespace).await,
        Commands::Serve { .. } => commands::serve::run(&settings).await,
        Commands::Version => commands::version::print(&settings).await,
    }
}
