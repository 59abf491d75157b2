use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use xml_bridge::app::server::{self, AppState};
use xml_bridge::config::cli::{Cli, Command};
use xml_bridge::config::{BridgeConfig, UpstreamMode};
use xml_bridge::core::autodetect;
use xml_bridge::core::xml_check::XmlValidator;
use xml_bridge::core::{TransformEngine, TransformOutcome};
use xml_bridge::domain::model::TransactionType;
use xml_bridge::utils::error::{BridgeError, Result};
use xml_bridge::utils::{logger, validation::Validate};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_logger(&config.logging, cli.verbose);

    tracing::info!("Starting xml-bridge {}", env!("CARGO_PKG_VERSION"));
    if cli.verbose {
        tracing::debug!("CLI arguments: {:?}", cli);
    }

    if let Err(e) = run(cli, config).await {
        tracing::error!(
            "❌ xml-bridge failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        std::process::exit(e.severity().exit_code());
    }
}

async fn run(cli: Cli, mut config: BridgeConfig) -> Result<()> {
    match cli.command {
        Command::Serve { host, port, mock } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if mock {
                config.upstream.mode = UpstreamMode::Mock;
            }

            // 驗證配置
            config.validate()?;
            let state = AppState::from_config(&config)?;
            server::serve(&config, state).await
        }
        Command::ToJson { transaction, input } => {
            config.validate()?;
            let xml = read_input(input.as_ref())?;
            let engine = TransformEngine::new(std::sync::Arc::new(config.build_store()));
            let outcome = engine.xml_to_structured(&xml, &TransactionType::new(transaction))?;
            println!("{}", serde_json::to_string_pretty(&outcome.value)?);
            report_diagnostics(&outcome);
            Ok(())
        }
        Command::ToXml { transaction, input } => {
            config.validate()?;
            let text = read_input(input.as_ref())?;
            let data: serde_json::Value = serde_json::from_str(&text)?;
            let engine = TransformEngine::new(std::sync::Arc::new(config.build_store()));
            let outcome = engine.structured_to_xml(&data, &TransactionType::new(transaction))?;
            println!("{}", outcome.value);
            report_diagnostics(&outcome);
            Ok(())
        }
        Command::Validate { input, schema } => {
            let xml = std::fs::read_to_string(&input)?;
            let report = XmlValidator::new().validate(&xml, schema.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.is_valid() {
                println!("✅ {} is valid", input.display());
                Ok(())
            } else {
                eprintln!("❌ {} is not valid", input.display());
                std::process::exit(1);
            }
        }
        Command::Detect { transaction, direction } => {
            config.validate()?;
            let transaction = TransactionType::new(transaction);
            let configurations = config.transaction_configurations();
            let transaction_config = configurations
                .get(&transaction)
                .ok_or_else(|| BridgeError::UnknownTransactionType(transaction.to_string()))?;
            let rules = autodetect::detect(transaction_config, direction.into())?;
            println!("{}", serde_json::to_string_pretty(&rules)?);
            Ok(())
        }
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn report_diagnostics<T>(outcome: &TransformOutcome<T>) {
    if !outcome.has_warnings() {
        return;
    }
    for diagnostic in &outcome.diagnostics {
        tracing::debug!("⚠️ {:?}", diagnostic);
    }
    eprintln!(
        "⚠️ {} mapping diagnostics, run with -v for details",
        outcome.diagnostics.len()
    );
}
