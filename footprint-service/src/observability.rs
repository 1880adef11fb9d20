use tracing_subscriber::{filter::Directive, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` directives are extended with
/// `info` for this crate and the provider clients.
pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["footprint_service=info", "grid_client=info"] {
        if let Ok(d) = directive.parse::<Directive>() {
            filter = filter.add_directive(d);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
