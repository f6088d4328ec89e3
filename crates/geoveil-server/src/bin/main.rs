//! geoveil-server binary
//!
//! Run with:
//! ```bash
//! OPE_KEY_LON=... OPE_KEY_LAT=... JWT_SECRET=... cargo run -p geoveil-server -- --port 8000
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use geoveil_core::{CipherPair, MetadataResolver, Pipeline, PipelineConfig};
use geoveil_server::config::{AuthConfig, ServerConfig};
use geoveil_server::ServerBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geoveil-server")]
#[command(about = "Encrypt field polygons with order-preserving coordinates")]
struct Args {
    /// Pipeline config (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(long, default_value = "8000")]
    port: u16,

    /// Base64 longitude cipher key
    #[arg(long, env = "OPE_KEY_LON", hide_env_values = true)]
    ope_key_lon: String,

    /// Base64 latitude cipher key
    #[arg(long, env = "OPE_KEY_LAT", hide_env_values = true)]
    ope_key_lat: String,

    /// HS256 secret for bearer tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true, required_unless_present = "disable_auth")]
    jwt_secret: Option<String>,

    #[arg(long, default_value = geoveil_server::auth::DEFAULT_AUDIENCE)]
    jwt_audience: String,

    /// Accept unauthenticated requests
    #[arg(long)]
    disable_auth: bool,

    /// Per-request deadline in seconds
    #[arg(long, default_value = "30")]
    request_timeout_secs: u64,

    /// Serve Prometheus metrics on /metrics
    #[arg(long)]
    metrics: bool,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("config", &self.config)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_audience", &self.jwt_audience)
            .field("disable_auth", &self.disable_auth)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("geoveil_server=info".parse()?)
                .add_directive("geoveil_core=info".parse()?),
        )
        .init();

    let args = Args::parse();
    tracing::debug!(?args, "starting");

    let pipeline_config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    let ciphers = CipherPair::from_base64(&args.ope_key_lon, &args.ope_key_lat)?;
    let metadata = MetadataResolver::offline(pipeline_config.spatial_resolution)?;
    let pipeline = Pipeline::new(pipeline_config, Arc::new(ciphers), metadata)?;

    let auth = match (&args.jwt_secret, args.disable_auth) {
        (_, true) => AuthConfig::disabled(),
        (Some(secret), false) => AuthConfig::jwt(secret.as_bytes(), args.jwt_audience.clone()),
        (None, false) => anyhow::bail!("JWT_SECRET is required unless --disable-auth is set"),
    };

    let config = ServerConfig {
        addr: SocketAddr::new(args.host, args.port),
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        cors: true,
        auth,
        metrics: args.metrics,
    };

    let server = ServerBuilder::new(pipeline).config(config).build()?;
    tracing::info!(addr = %server.addr(), "Server ready");
    server.run().await?;

    Ok(())
}
