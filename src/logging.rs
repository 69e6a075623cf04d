//! Tracing subscriber setup.
//!
//! The subscriber is installed before anything else runs so that settings
//! loading can report problems. It starts from `RUST_LOG` (or `info`), and
//! once `navalii.toml` has been read the `[logging] filter` directive is
//! swapped in through a `reload` layer, unless `RUST_LOG` was set.

use std::io;

use tracing::{Subscriber, warn};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, reload};

use crate::config::LoggingConfig;

/// Filter used until the settings file has been read.
pub const DEFAULT_FILTER: &str = "info";

/// Handle on the live filter of the installed subscriber.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogHandle {
    /// Applies the `[logging] filter` setting. `RUST_LOG` always wins.
    ///
    /// An invalid directive keeps the current filter and is reported.
    pub fn apply(&self, config: &LoggingConfig) {
        if self.from_env {
            return;
        }
        match EnvFilter::try_new(&config.filter) {
            Ok(filter) => {
                if let Err(e) = self.filter.reload(filter) {
                    warn!(error = %e, "Cannot update log filter");
                }
            }
            Err(e) => {
                warn!(filter = %config.filter, error = %e, "Invalid [logging] filter, keeping default");
            }
        }
    }
}

/// Installs the global subscriber, writing to stdout.
pub fn init() -> LogHandle {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(DEFAULT_FILTER), false),
    };
    let (subscriber, handle) = subscriber(filter, from_env, io::stdout);
    subscriber.init();
    handle
}

/// Builds the subscriber without installing it.
fn subscriber<W>(
    filter: EnvFilter,
    from_env: bool,
    make_writer: W,
) -> (impl Subscriber + Send + Sync + 'static, LogHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer));
    (
        subscriber,
        LogHandle {
            filter: handle,
            from_env,
        },
    )
}
