pub mod autosave;
pub mod clock;
pub mod collection;
pub mod domain;
pub mod editor;
pub mod sequences;
pub mod session;
pub mod storage;
pub mod store;

pub use autosave::*;
pub use domain::*;
pub use editor::*;
pub use session::*;
pub use storage::*;
pub use store::*;

#[cfg(test)]
pub(crate) fn log_test() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "engine=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
