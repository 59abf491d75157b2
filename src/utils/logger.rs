use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 依 `[logging]` 設定初始化日誌；`RUST_LOG` 優先於設定檔
///
/// `verbose` 會把本 crate 的層級提高到 debug。
pub fn init_logger(logging: &LoggingConfig, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(logging, verbose)));

    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Compact => registry.with(layer.compact()).init(),
        // 容器部署使用 JSON 格式方便集中收集
        LogFormat::Json => registry.with(layer.json()).init(),
    }
}

fn default_directive(logging: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose {
        "debug".to_string()
    } else {
        logging.level.to_ascii_lowercase()
    };
    format!("xml_bridge={level},tower_http={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_follows_config_level() {
        let logging = LoggingConfig {
            level: "WARN".to_string(),
            format: LogFormat::Json,
        };
        assert_eq!(default_directive(&logging, false), "xml_bridge=warn,tower_http=warn");
        assert_eq!(default_directive(&logging, true), "xml_bridge=debug,tower_http=debug");
    }
}
