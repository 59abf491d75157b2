use crate::config::file::BridgeConfig;
use crate::domain::model::Direction;
use crate::utils::error::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "xml-bridge")]
#[command(about = "Bidirectional XML ↔ JSON bridge for partner APIs")]
#[command(version)]
pub struct Cli {
    /// TOML 設定檔，未指定時使用內建預設值
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP collector service
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Answer with the example JSON response instead of calling the partner API
        #[arg(long)]
        mock: bool,
    },
    /// Convert an XML document into JSON using the transaction's request mappings
    ToJson {
        transaction: String,
        /// Input file, reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Render a JSON document into XML using the transaction's response mappings
    ToXml {
        transaction: String,
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Check well-formedness and optionally a schema
    Validate {
        input: PathBuf,
        /// Inline XSD or path to an .xsd file
        #[arg(long)]
        schema: Option<String>,
    },
    /// Derive mapping rules from the transaction's templates and print them
    Detect {
        transaction: String,
        #[arg(long, value_enum, default_value_t = DirectionArg::Request)]
        direction: DirectionArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Request,
    Response,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Request => Direction::Request,
            DirectionArg::Response => Direction::Response,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<BridgeConfig> {
        match &self.config {
            Some(path) => {
                tracing::info!("📄 Loading configuration from {}", path.display());
                BridgeConfig::from_file(path)
            }
            None => Ok(BridgeConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_overrides() {
        let cli = Cli::parse_from(["xml-bridge", "-v", "serve", "--port", "8081", "--mock"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Serve { host, port, mock } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8081));
                assert!(mock);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_detect_direction() {
        let cli = Cli::parse_from(["xml-bridge", "detect", "pago", "--direction", "response"]);
        match cli.command {
            Command::Detect { transaction, direction } => {
                assert_eq!(transaction, "pago");
                assert_eq!(Direction::from(direction), Direction::Response);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_default_config_without_file() {
        let cli = Cli::parse_from(["xml-bridge", "to-json", "query"]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.server.port, 5000);
    }
}
