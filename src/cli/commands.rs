//! CLI command implementations
//!
//! Both commands boot the same way: build an in-memory cluster, open a
//! session on the configured keyspace and apply the schema migrations.
//! `serve` then hands the stack to the HTTP server; `migrate` reports
//! what was applied and exits.

use std::sync::Arc;

use tracing::info;

use crate::api::HttpServer;
use crate::config::AppConfig;
use crate::domain::TaskRepository;
use crate::migrate;
use crate::service::TaskService;
use crate::session::{MemoryCluster, Session};
use crate::store::TaskStore;

use super::errors::CliResult;

/// Boot the storage stack and serve the task API until interrupted.
pub fn serve(config: AppConfig) -> CliResult<()> {
    let service = boot_service(&config)?;
    let server = HttpServer::new(&config, service);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.start())?;

    Ok(())
}

/// Apply migrations against a fresh engine and print what ran.
///
/// The engine is in-memory, so this is a dry run of the boot sequence
/// rather than a change to any persistent state.
pub fn migrate(config: AppConfig) -> CliResult<()> {
    let cluster = Arc::new(MemoryCluster::new());
    let session = cluster.session(&config.keyspace);
    let applied = migrate::run_migrations(&session, &config.migrations_dir)?;

    if applied.is_empty() {
        println!("no pending migrations");
    } else {
        for name in &applied {
            println!("applied {}", name);
        }
    }

    Ok(())
}

/// Build the service stack: cluster, migrated schema, store, service.
fn boot_service(config: &AppConfig) -> CliResult<TaskService> {
    let cluster = Arc::new(MemoryCluster::new());
    let session = cluster.session(&config.keyspace);

    let applied = migrate::run_migrations(&session, &config.migrations_dir)?;
    info!(
        keyspace = %config.keyspace,
        applied = applied.len(),
        "schema migrations applied"
    );

    let session: Arc<dyn Session> = Arc::new(cluster.session(&config.keyspace));
    let store = TaskStore::new(session)?;
    let repository: Arc<dyn TaskRepository> = Arc::new(store);

    Ok(TaskService::new(repository))
}
