//! arrayctl - reconcile declared configuration against a storage array
//!
//! Loads a YAML desired-state file, builds an immutable client for the
//! array's management API, and reconciles each declared resource's
//! membership in turn. Exits non-zero if any resource failed.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use array_reconciler::{
    reconcile::differ::desired_set, ArrayApi, ArrayClient, ClientConfig, CompiledFilter,
    DeclaredResource, DeclaredState, Error, FilterClause, FilterOperator, HostGroup, HttpArrayApi,
    MembershipResource, ProtectionPolicy, ResourceKind, VolumeGroup,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Reconcile declared host-group, volume-group, and protection-policy
/// membership against a storage array
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the array management API
    #[arg(long, env = "ARRAY_ENDPOINT")]
    endpoint: String,

    /// API username
    #[arg(long, env = "ARRAY_USERNAME")]
    username: String,

    /// API password
    #[arg(long, env = "ARRAY_PASSWORD")]
    password: String,

    /// Accept self-signed appliance certificates
    #[arg(long, env = "ARRAY_INSECURE")]
    insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, env = "ARRAY_TIMEOUT", default_value = "10")]
    timeout_secs: u64,

    /// Path to the declared desired-state YAML file
    #[arg(long, env = "ARRAY_STATE_FILE", default_value = "state.yaml")]
    state_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    info!(
        version = array_reconciler::VERSION,
        endpoint = %args.endpoint,
        "starting array reconciler"
    );

    let state = DeclaredState::load(&args.state_file)
        .with_context(|| format!("loading declared state from {}", args.state_file))?;

    let client = Arc::new(ArrayClient::new(ClientConfig {
        endpoint: args.endpoint,
        username: args.username,
        password: args.password,
        insecure: args.insecure,
        timeout: Duration::from_secs(args.timeout_secs),
        ..ClientConfig::default()
    })?);

    let mut failures = 0usize;
    for declared in &state.resources {
        let outcome = match declared.kind {
            ResourceKind::HostGroup => reconcile_one::<HostGroup>(&client, declared).await,
            ResourceKind::VolumeGroup => reconcile_one::<VolumeGroup>(&client, declared).await,
            ResourceKind::ProtectionPolicy => {
                reconcile_one::<ProtectionPolicy>(&client, declared).await
            }
        };
        if let Err(err) = outcome {
            error!(kind = %declared.kind, name = %declared.name, error = %err, "reconciliation failed");
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{} resource(s) failed to reconcile", failures);
    }
    info!(resources = state.resources.len(), "all resources converged");
    Ok(())
}

/// Reconcile one declared resource, resolving its array ID by name when the
/// declaration does not pin one.
async fn reconcile_one<R: MembershipResource>(
    client: &Arc<ArrayClient>,
    declared: &DeclaredResource,
) -> array_reconciler::Result<()> {
    let api = HttpArrayApi::<R>::new(client.clone());

    let id = match &declared.id {
        Some(id) => id.clone(),
        None => {
            // Built from typed clauses, not DSL text, so names containing
            // metacharacters (',', '=') still look up.
            let filter = CompiledFilter::from_clauses(&[FilterClause {
                field: "name".into(),
                operator: FilterOperator::Eq,
                value: declared.name.clone(),
            }]);
            api.list(&filter)
                .await?
                .into_iter()
                .find(|r| r.name() == declared.name)
                .map(|r| r.id().to_string())
                .ok_or_else(|| Error::ResourceNotFound {
                    kind: R::collection().to_string(),
                    name: declared.name.clone(),
                })?
        }
    };

    let desired = desired_set(declared.members.iter().cloned());
    let report = array_reconciler::reconcile(&api, &id, &desired).await?;

    info!(
        kind = R::collection(),
        name = %declared.name,
        id = %report.resource_id,
        added = report.plan.to_add.len(),
        removed = report.plan.to_remove.len(),
        converged = report.converged_without_changes(),
        "pass complete"
    );
    Ok(())
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
