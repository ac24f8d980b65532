use tracing_subscriber::EnvFilter;

/// 初始化结构化日志
///
/// 环境变量 `RUST_LOG` 优先，未设置时用传入的默认过滤串。
/// 重复调用安全（后续调用不生效）。
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
