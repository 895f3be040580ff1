use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn setup_logger(verbosity: &Verbosity<InfoLevel>) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .with_env_var("REPO_NOTIFY_LOG")
        .from_env_lossy();

    let fmt = fmt::layer()
        .with_ansi(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .pretty();

    tracing_subscriber::registry().with(fmt).with(env_filter).init();
}
