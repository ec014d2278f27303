//! Server startup: stderr logging and the `serve_stdio!` entry point

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used when the server's level variable is unset
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Initialize logging to stderr.
///
/// stdout carries the MCP protocol, so nothing may be logged there. The level
/// for the server crate and the shared `tool_runs` core comes from the
/// variable named by `level_var` (e.g. `DAML_VIEWER_LOG_LEVEL`), defaulting to
/// `warn`. `RUST_LOG` directives are layered underneath, and `LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_tracing(crate_name: &str, level_var: &str) -> anyhow::Result<()> {
    let level = log_level(std::env::var(level_var).ok().as_deref());

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("{}={}", crate_name, level).parse()?)
        .add_directive(format!("tool_runs={}", level).parse()?);

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }

    Ok(())
}

/// Normalize a user-supplied level, falling back to [`DEFAULT_LOG_LEVEL`]
pub fn log_level(value: Option<&str>) -> &'static str {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") | Some("warning") => "warn",
        Some("error") => "error",
        Some("off") => "off",
        _ => DEFAULT_LOG_LEVEL,
    }
}

/// Generate `main` for a stdio MCP server.
///
/// The server type must provide `from_env() -> anyhow::Result<Self>` and
/// implement `rmcp::ServerHandler`. A configuration error aborts startup
/// before the transport is opened.
///
/// ```rust,ignore
/// mcp_common::serve_stdio!(DamlViewerMcpServer, "daml_viewer_mcp", "DAML_VIEWER_LOG_LEVEL");
/// ```
#[macro_export]
macro_rules! serve_stdio {
    ($server_type:ty, $crate_name:expr, $level_var:expr) => {
        #[tokio::main]
        async fn main() -> anyhow::Result<()> {
            use rmcp::ServiceExt;

            $crate::init_tracing($crate_name, $level_var)?;

            tracing::info!(concat!("Starting ", $crate_name, " MCP Server"));

            let server = <$server_type>::from_env()?;
            let service = server.serve(rmcp::transport::stdio()).await?;

            tracing::info!("Server running, waiting for requests...");

            service.waiting().await?;

            tracing::info!("Server shutting down");
            Ok(())
        }
    };
}
