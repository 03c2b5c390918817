//! System-wide constants and defaults.

/// Service name of the orchestrator gateway in every primary manifest.
pub const GATEWAY_SERVICE: &str = "openclaw-gateway";

/// Service name of the interactive CLI companion of the gateway.
pub const GATEWAY_CLI_SERVICE: &str = "openclaw-cli";

/// Default gateway image repository (tag comes from the requested version).
pub const GATEWAY_IMAGE: &str = "ghcr.io/openclaw/openclaw";

/// Shared bridge network every companion is expected to join.
pub const SHARED_NETWORK: &str = "openclaw-network";

/// Host alias used by containers to reach services bound on the host.
pub const HOST_GATEWAY_ALIAS: &str = "host.docker.internal";

/// File name of the primary compose manifest.
pub const PRIMARY_COMPOSE_FILE: &str = "docker-compose.yml";

/// Id of the shared PostgreSQL service other services keep their data in.
pub const POSTGRES_SERVICE: &str = "postgresql";

/// Bundle path of the script that creates per-service databases.
pub const POSTGRES_INIT_SCRIPT: &str = "postgres/init-databases.sh";

/// Base memory reserved for the gateway itself, in MB.
pub const BASE_MEMORY_MB: u64 = 512;

/// Memory assumed for a descriptor that declares no minimum, in MB.
pub const DEFAULT_SERVICE_MEMORY_MB: u64 = 128;

/// Default ceiling on dependency-closure passes.
pub const DEFAULT_MAX_RESOLUTION_PASSES: usize = 50;

/// Services added when the monitoring stack is requested.
pub const MONITORING_SERVICES: [&str; 3] = ["uptime-kuma", "grafana", "prometheus"];

/// Default gateway version tag.
pub const DEFAULT_GATEWAY_VERSION: &str = "latest";
