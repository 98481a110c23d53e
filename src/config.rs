// Command line / environment configuration for psbridge-server.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Command line arguments for psbridge-server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Hostname/IP to bind the server to.
    /// If this option is specified without value, it will default to "*", meaning the server will listen on all interfaces.
    #[arg(long, env = "PSBRIDGE_HOST", default_value = "localhost", num_args = 0..=1, default_missing_value = "*")]
    pub host: String,

    /// Port number to listen on.
    #[arg(short, long, env = "PSBRIDGE_PORT", default_value_t = 8189)]
    pub port: u16,

    /// Directory the generation pipeline writes rendered images to.
    #[arg(long, env = "PSBRIDGE_TEMP_DIR", default_value = "temp")]
    pub temp_dir: PathBuf,

    /// Directory where masks and uploads from the editor are stored.
    #[arg(long, env = "PSBRIDGE_INPUTS_DIR", default_value = "data/ps_inputs/imgs")]
    pub inputs_dir: PathBuf,

    /// Directory holding workflows, icons and the placeholder image.
    #[arg(long, env = "PSBRIDGE_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Upper bound for reading one generated image, in milliseconds.
    #[arg(long, env = "PSBRIDGE_READ_TIMEOUT_MS", default_value_t = 10_000)]
    pub read_timeout_ms: u64,

    /// Upper bound for queueing a message to one session, in milliseconds.
    #[arg(long, env = "PSBRIDGE_SEND_TIMEOUT_MS", default_value_t = 2_000)]
    pub send_timeout_ms: u64,

    /// Outbound messages buffered per session before sends start waiting.
    #[arg(long, env = "PSBRIDGE_SESSION_QUEUE", default_value_t = 16)]
    pub session_queue: usize,

    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, env = "PSBRIDGE_LOG_LEVEL", default_value_t = Level::INFO)]
    pub log_level: Level,
}

impl AppConfig {
    pub fn bridge_dirs(&self) -> BridgeDirs {
        BridgeDirs::new(&self.temp_dir, &self.inputs_dir, &self.data_dir)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

/// Every directory the server reads from or writes to.
#[derive(Debug, Clone)]
pub struct BridgeDirs {
    /// Rendered images waiting to be sent to the editor.
    pub temp: PathBuf,
    /// Masks and uploaded images the pipeline consumes.
    pub inputs: PathBuf,
    pub workflows: PathBuf,
    pub icons: PathBuf,
    /// Shown by the editor when an input image is missing.
    pub placeholder_image: PathBuf,
}

impl BridgeDirs {
    pub fn new(temp: impl Into<PathBuf>, inputs: impl Into<PathBuf>, data: impl Into<PathBuf>) -> Self {
        let data = data.into();
        Self {
            temp: temp.into(),
            inputs: inputs.into(),
            workflows: data.join("workflows"),
            icons: data.join("icons"),
            placeholder_image: data.join("ps_inputs").join("NoImage.png"),
        }
    }

    /// Creates the directories the server writes into.
    pub async fn ensure_writable_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.temp).await?;
        tokio::fs::create_dir_all(&self.inputs).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::try_parse_from(["psbridge-server"]).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.send_timeout(), Duration::from_secs(2));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn test_bare_host_flag_means_wildcard() {
        let config = AppConfig::try_parse_from(["psbridge-server", "--host", "--port", "9000"]).unwrap();
        assert_eq!(config.host, "*");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_dirs_are_derived_from_data_dir() {
        let config = AppConfig::try_parse_from([
            "psbridge-server",
            "--data-dir",
            "/srv/bridge",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let dirs = config.bridge_dirs();
        assert_eq!(dirs.workflows, PathBuf::from("/srv/bridge/workflows"));
        assert_eq!(dirs.icons, PathBuf::from("/srv/bridge/icons"));
        assert_eq!(
            dirs.placeholder_image,
            PathBuf::from("/srv/bridge/ps_inputs/NoImage.png")
        );
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[tokio::test]
    async fn test_ensure_writable_dirs_creates_missing_dirs() {
        let root = tempfile::tempdir().unwrap();
        let dirs = BridgeDirs::new(root.path().join("t"), root.path().join("in/imgs"), root.path());
        dirs.ensure_writable_dirs().await.unwrap();
        assert!(dirs.temp.is_dir());
        assert!(dirs.inputs.is_dir());
    }
}
