use bytes::Bytes;
use jobbin::binaries::{
    Collaborators, InternalDbType, JobBinaryRegistry, RetrievalContext, StageContext,
    ValidationContext,
};
use jobbin::config::{Config, StorageProvider};
use jobbin::credentials::CredentialResolver;
use jobbin::fetcher::{FetchSettings, SizeGuardedFetcher};
use jobbin::observability::Metrics;
use jobbin::remote::LocalRemote;
use jobbin::secrets::EnvSecretResolver;
use jobbin::storage::{StorageClient, StorageSessionFactory};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::Commands;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(command: Commands, config: Config) -> Result<(), AnyError> {
    let base = match config.storage.provider {
        StorageProvider::Local => StorageClient::local(&config.storage.root, "")?,
        StorageProvider::Memory => StorageClient::in_memory(""),
    };
    let deps = Collaborators {
        secrets: Arc::new(EnvSecretResolver::new()),
        sessions: Arc::new(StorageSessionFactory::new(base.with_prefix("swift"))),
        internal_store: base.with_prefix("internal"),
        metrics: Arc::new(Metrics::new()),
    };

    match command {
        Commands::Validate(args) => {
            let reference = args.reference.to_reference();
            let ctx = match &reference.id {
                Some(id) => ValidationContext::updating(id),
                None => ValidationContext::creating(),
            };

            let registry = JobBinaryRegistry::from_config(&config, deps);
            registry
                .resolve_url(&reference.url)?
                .validate(&reference, &ctx)
                .await?;
            println!("valid");
        }
        Commands::Fetch(args) => {
            let reference = args.reference.to_reference();
            let mut ctx = RetrievalContext::new().with_cancellation(cancel_on_signal());
            ctx.proxy = args.proxy.to_delegation();

            let registry = JobBinaryRegistry::from_config(&config, deps);
            let data = registry
                .resolve_url(&reference.url)?
                .fetch(&reference, &ctx)
                .await?;

            tokio::fs::write(&args.out, &data).await?;
            info!(out = %args.out.display(), size = data.len(), "Wrote job binary");
        }
        Commands::Stage(args) => {
            let reference = args.reference.to_reference();
            let cancel = cancel_on_signal();
            let mut retrieval = RetrievalContext::new().with_cancellation(cancel.clone());
            retrieval.proxy = args.proxy.to_delegation();
            let staging = StageContext::new(Arc::new(LocalRemote::new(&args.remote_root)))
                .with_cancellation(cancel);
            let destination = args
                .dest
                .unwrap_or_else(|| config.job_binaries.staging_dir.clone());

            let registry = JobBinaryRegistry::from_config(&config, deps);
            let path = registry
                .resolve_url(&reference.url)?
                .copy_binary_to_cluster(&reference, &destination, &retrieval, &staging)
                .await?;
            println!("{path}");
        }
        Commands::Upload(args) => {
            let data = tokio::fs::read(&args.file).await?;
            let fetcher = SizeGuardedFetcher::new(
                FetchSettings::from(&config.job_binaries),
                CredentialResolver::new(deps.secrets),
                deps.sessions,
                deps.metrics,
            );

            let url = InternalDbType::new(deps.internal_store, fetcher)
                .upload(Bytes::from(data))
                .await?;
            println!("{url}");
        }
    }

    Ok(())
}

/// Token cancelled on Ctrl+C or SIGTERM
fn cancel_on_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
        info!("Shutdown signal received, cancelling retrieval");
        cancel.cancel();
    });

    token
}
