use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// 按 `-v` 的次数选择默认的日志级别。
fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info,spl_processor=debug",
        _ => "debug,spl_processor=trace",
    }
}

/// 初始化全局的 tracing 订阅者，日志写到标准错误。
///
/// 设置了 `RUST_LOG` 时以环境变量为准。
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
