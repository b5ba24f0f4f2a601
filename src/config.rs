//! Configuration for a beacon participant.
//!
//! Settings are layered: `beacon.toml` → environment → CLI flags. The
//! environment layer is handled by clap (`BEACON_*` variables on the `run`
//! flags), so by the time [`ElectionConfig::resolve`] runs there are only two
//! sources left to merge: the file and the overrides.
//!
//! # Configuration File Format
//!
//! ```toml
//! [coordination]
//! backend = "zookeeper"
//! endpoints = ["zk1:2181", "zk2:2181"]
//!
//! [timing]
//! leader_interval = "5s"
//! attempt_interval = "2s"
//!
//! [artifacts]
//! dir = "/var/lib/beacon"
//! capacity = 10
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "beacon.toml";

/// Which coordination service implementation to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A ZooKeeper ensemble (default)
    #[default]
    Zookeeper,
    /// In-process coordination, for standalone runs
    Memory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Zookeeper => write!(f, "zookeeper"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zookeeper" | "zk" => Ok(Backend::Zookeeper),
            "memory" => Ok(Backend::Memory),
            _ => anyhow::bail!("Invalid backend '{}'. Valid values: zookeeper, memory", s),
        }
    }
}

/// `[coordination]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinationSection {
    #[serde(default)]
    pub backend: Backend,
    /// `host:port` pairs of the ensemble
    #[serde(default)]
    pub endpoints: Vec<String>,
}

/// `[timing]` section. Durations are strings such as `"5s"` or `"1m30s"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_interval: Option<String>,
}

/// `[artifacts]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

/// The complete beacon.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeaconToml {
    #[serde(default)]
    pub coordination: CoordinationSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub artifacts: ArtifactsSection,
}

impl BeaconToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse beacon.toml")
    }

    /// Load an explicitly named file, or `beacon.toml` from `dir` if one exists.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Option<Self>> {
        match explicit {
            Some(path) => Self::load(path).map(Some),
            None => {
                let path = dir.join(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load(&path).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize beacon.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// A starter file for `beacon config init`.
    pub fn sample() -> Self {
        Self {
            coordination: CoordinationSection {
                backend: Backend::Zookeeper,
                endpoints: vec!["127.0.0.1:2181".to_string()],
            },
            timing: TimingSection {
                leader_interval: Some("5s".to_string()),
                attempt_interval: Some("2s".to_string()),
            },
            artifacts: ArtifactsSection {
                dir: Some(PathBuf::from("./artifacts")),
                capacity: Some(10),
            },
        }
    }
}

/// Values supplied on the command line (or through `BEACON_*` variables).
/// Anything set here wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend: Option<Backend>,
    pub endpoints: Vec<String>,
    pub leader_interval: Option<Duration>,
    pub attempt_interval: Option<Duration>,
    pub artifact_dir: Option<PathBuf>,
    pub capacity: Option<usize>,
}

/// Validated, immutable settings shared by every phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectionConfig {
    pub backend: Backend,
    pub endpoints: Vec<String>,
    /// Sleep between leader duty cycles
    pub leader_interval: Duration,
    /// Sleep between contention attempts while someone else leads
    pub attempt_interval: Duration,
    pub artifact_dir: PathBuf,
    /// Maximum number of entries kept in `artifact_dir`
    pub capacity: usize,
}

impl ElectionConfig {
    /// Merge the file and the overrides, then validate.
    pub fn resolve(file: Option<&BeaconToml>, overrides: ConfigOverrides) -> Result<Self> {
        let default_file = BeaconToml::default();
        let file = file.unwrap_or(&default_file);

        let endpoints = if overrides.endpoints.is_empty() {
            file.coordination.endpoints.clone()
        } else {
            overrides.endpoints
        };
        let endpoints = normalize_endpoints(endpoints);

        let leader_interval = match overrides.leader_interval {
            Some(d) => Some(d),
            None => file
                .timing
                .leader_interval
                .as_deref()
                .map(parse_duration)
                .transpose()
                .context("Invalid timing.leader_interval")?,
        };
        let attempt_interval = match overrides.attempt_interval {
            Some(d) => Some(d),
            None => file
                .timing
                .attempt_interval
                .as_deref()
                .map(parse_duration)
                .transpose()
                .context("Invalid timing.attempt_interval")?,
        };

        let config = Self {
            backend: overrides.backend.unwrap_or(file.coordination.backend),
            endpoints,
            leader_interval: leader_interval
                .context("Leader interval is required (--leader-timeout or timing.leader_interval)")?,
            attempt_interval: attempt_interval.context(
                "Attempter interval is required (--attempter-timeout or timing.attempt_interval)",
            )?,
            artifact_dir: overrides
                .artifact_dir
                .or_else(|| file.artifacts.dir.clone())
                .context("Artifact directory is required (--file-dir or artifacts.dir)")?,
            capacity: overrides
                .capacity
                .or(file.artifacts.capacity)
                .context("Storage capacity is required (--storage-capacity or artifacts.capacity)")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == Backend::Zookeeper && self.endpoints.is_empty() {
            anyhow::bail!("At least one ZooKeeper endpoint is required (--zk-servers)");
        }
        if self.capacity == 0 {
            anyhow::bail!("Storage capacity must be at least 1");
        }
        if self.artifact_dir.as_os_str().is_empty() {
            anyhow::bail!("Artifact directory cannot be empty");
        }
        Ok(())
    }

    /// Comma-joined connect string, the form ZooKeeper clients expect.
    pub fn connect_string(&self) -> String {
        self.endpoints.join(",")
    }
}

/// Split comma-separated entries, trim, and drop empties.
fn normalize_endpoints(raw: Vec<String>) -> Vec<String> {
    raw.iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a duration such as `"250ms"`, `"5s"`, `"1.5m"` or `"1h2m3s"`.
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`. A bare `0` is accepted.
/// `Duration`'s `Debug` output parses back through this function.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    if s.is_empty() {
        anyhow::bail!("Duration cannot be empty");
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            anyhow::bail!("Invalid duration '{}': expected a number", s);
        }
        let (num, tail) = rest.split_at(num_len);
        let value: f64 = num
            .parse()
            .with_context(|| format!("Invalid number in duration: {}", s))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let unit_nanos: f64 = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => anyhow::bail!("Missing unit in duration '{}'", s),
            other => anyhow::bail!("Unknown unit '{}' in duration '{}'", other, s),
        };

        total += Duration::from_nanos((value * unit_nanos).round() as u64);
        rest = next;
    }

    Ok(total)
}
