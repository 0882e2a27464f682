use std::path::PathBuf;

use clap::{Parser, Subcommand};
use glam::DVec3;

use crate::error::{KernelError, Result};
use crate::types::{CHUNK_BITS, ContinuousBox, LevelId, SubLevelId};

/// Which sub-level registry backs the queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    /// No sub-level system: every query answers as if the world had none.
    #[value(name = "none")]
    Disabled,
    /// In-memory plot registry per level.
    #[default]
    #[value(name = "plots")]
    Plots,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Disabled => write!(f, "none"),
            Backend::Plots => write!(f, "plots"),
        }
    }
}

/// Parameters shared by every query object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuerySettings {
    /// log2 of the chunk edge length.
    pub chunk_bits: u32,
    /// Duration of one simulation tick in seconds.
    pub tick_seconds: f64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            chunk_bits: CHUNK_BITS,
            tick_seconds: 0.05,
        }
    }
}

impl QuerySettings {
    /// Settings for a simulation running at `ticks_per_second`.
    pub fn with_tick_rate(ticks_per_second: f64) -> Self {
        Self {
            tick_seconds: 1.0 / ticks_per_second,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tick_seconds.is_finite() && self.tick_seconds > 0.0) {
            return Err(KernelError::Config(format!(
                "tick duration must be positive and finite, got {}",
                self.tick_seconds
            )));
        }
        if self.chunk_bits > 30 {
            return Err(KernelError::Config(format!(
                "chunk bits must be at most 30, got {}",
                self.chunk_bits
            )));
        }
        Ok(())
    }
}

/// Startup choice of registry plus its settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KernelConfig {
    pub backend: Backend,
    pub settings: QuerySettings,
}

/// A single query run by `sublevel-probe`.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Query {
    /// List every sub-level of the level
    List,
    /// Which sub-level's plot contains a point
    Contains {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        point: DVec3,
    },
    /// Map a point out of its owning sub-level into the main grid
    Project {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        point: DVec3,
    },
    /// Squared distance between two points in any frames
    Distance {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        a: DVec3,
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        b: DVec3,
    },
    /// Global velocity of a point carried by its sub-level
    Velocity {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        point: DVec3,
        /// Subtract the level's ambient wind
        #[arg(long)]
        relative_to_air: bool,
    },
    /// Sub-levels whose bounds intersect a box (minX,minY,minZ,maxX,maxY,maxZ)
    Intersecting {
        #[arg(value_parser = parse_box, allow_hyphen_values = true)]
        bounds: ContinuousBox,
    },
    /// Whether a chunk column belongs to any plot
    Plot {
        #[arg(allow_hyphen_values = true)]
        chunk_x: i32,
        #[arg(allow_hyphen_values = true)]
        chunk_z: i32,
    },
    /// Cells probed, in priority order, when resolving a point across frames
    Probes {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        point: DVec3,
        /// Skip the main-grid probe of the raw point
        #[arg(long)]
        skip_origin: bool,
        /// Sub-level to reinterpret the point in
        #[arg(long)]
        assume: Option<SubLevelId>,
    },
    /// Solid cells of the scene hit by a point, resolved across frames
    Solid {
        #[arg(value_parser = parse_vec3, allow_hyphen_values = true)]
        point: DVec3,
        #[arg(long)]
        skip_origin: bool,
        #[arg(long)]
        assume: Option<SubLevelId>,
    },
}

/// Fully resolved probe configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub scene: PathBuf,
    /// Level to query; the scene's active level when unset.
    pub level: Option<LevelId>,
    pub kernel: KernelConfig,
    pub query: Query,
    pub json: bool,
    pub verbose: bool,
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "sublevel-probe",
    about = "Query sub-level frames, poses and bounds from a scene file",
    version
)]
pub struct CliArgs {
    /// Scene file (JSON)
    #[arg(short = 's', long)]
    pub scene: PathBuf,

    /// Level to query (default: the scene's active level)
    #[arg(short = 'l', long)]
    pub level: Option<String>,

    /// Sub-level registry backend
    #[arg(long, value_enum, default_value = "plots")]
    pub backend: Backend,

    /// Simulation ticks per second
    #[arg(long, default_value_t = 20.0)]
    pub tick_rate: f64,

    /// log2 of the chunk edge length
    #[arg(long, default_value_t = CHUNK_BITS)]
    pub chunk_bits: u32,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub query: Query,
}

impl From<CliArgs> for ProbeConfig {
    fn from(args: CliArgs) -> Self {
        ProbeConfig {
            scene: args.scene,
            level: args.level.map(LevelId::new),
            kernel: KernelConfig {
                backend: args.backend,
                settings: QuerySettings {
                    chunk_bits: args.chunk_bits,
                    ..QuerySettings::with_tick_rate(args.tick_rate)
                },
            },
            query: args.query,
            json: args.json,
            verbose: args.verbose,
        }
    }
}

fn parse_reals<const N: usize>(s: &str) -> std::result::Result<[f64; N], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {N} comma-separated numbers, got {}", parts.len()));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|e| format!("invalid number {part:?}: {e}"))?;
    }
    Ok(out)
}

/// Parse `x,y,z`.
pub fn parse_vec3(s: &str) -> std::result::Result<DVec3, String> {
    parse_reals::<3>(s).map(DVec3::from_array)
}

/// Parse `minX,minY,minZ,maxX,maxY,maxZ`.
pub fn parse_box(s: &str) -> std::result::Result<ContinuousBox, String> {
    let [a, b, c, d, e, f] = parse_reals::<6>(s)?;
    Ok(ContinuousBox::new(a, b, c, d, e, f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let s = QuerySettings::default();
        assert_eq!(s.chunk_bits, 4);
        assert!((s.tick_seconds - 0.05).abs() < f64::EPSILON);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn tick_rate_to_seconds() {
        let s = QuerySettings::with_tick_rate(40.0);
        assert!((s.tick_seconds - 0.025).abs() < f64::EPSILON);
        assert!(QuerySettings::with_tick_rate(0.0).validate().is_err());
        assert!(QuerySettings::with_tick_rate(-20.0).validate().is_err());
    }

    #[test]
    fn oversized_chunk_bits_rejected() {
        let s = QuerySettings {
            chunk_bits: 31,
            ..QuerySettings::default()
        };
        assert!(matches!(s.validate(), Err(KernelError::Config(_))));
    }

    #[test]
    fn backend_display() {
        assert_eq!(Backend::Disabled.to_string(), "none");
        assert_eq!(Backend::Plots.to_string(), "plots");
        assert_eq!(Backend::default(), Backend::Plots);
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_vec3("1, -2.5,3").unwrap(), DVec3::new(1.0, -2.5, 3.0));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,2,x").is_err());
        let b = parse_box("10,0,0,0,5,5").unwrap();
        assert_eq!(b.to_array(), [0.0, 0.0, 0.0, 10.0, 5.0, 5.0]);
    }

    #[test]
    fn cli_args_to_probe_config() {
        let args = CliArgs::parse_from([
            "sublevel-probe",
            "-s",
            "scene.json",
            "-l",
            "nether",
            "--backend",
            "none",
            "--tick-rate",
            "10",
            "--chunk-bits",
            "5",
            "--json",
            "--log-json",
            "-v",
            "velocity",
            "1,2,3",
            "--relative-to-air",
        ]);

        assert!(args.log_json);
        let config: ProbeConfig = args.into();

        assert_eq!(config.scene, PathBuf::from("scene.json"));
        assert_eq!(config.level, Some(LevelId::new("nether")));
        assert_eq!(config.kernel.backend, Backend::Disabled);
        assert_eq!(config.kernel.settings.chunk_bits, 5);
        assert!((config.kernel.settings.tick_seconds - 0.1).abs() < f64::EPSILON);
        assert!(config.json);
        assert!(config.verbose);
        assert_eq!(
            config.query,
            Query::Velocity {
                point: DVec3::new(1.0, 2.0, 3.0),
                relative_to_air: true
            }
        );
    }

    #[test]
    fn cli_args_minimal() {
        let args = CliArgs::parse_from(["sublevel-probe", "-s", "scene.json", "list"]);
        let config: ProbeConfig = args.into();

        assert_eq!(config.level, None);
        assert_eq!(config.kernel, KernelConfig::default());
        assert_eq!(config.query, Query::List);
        assert!(!config.json);
        assert!(!config.verbose);
    }

    #[test]
    fn cli_probe_query_with_assumed_sub_level() {
        let args = CliArgs::parse_from([
            "sublevel-probe",
            "-s",
            "scene.json",
            "probes",
            "5,64,5",
            "--skip-origin",
            "--assume",
            "0000000000000000000000000000000a",
        ]);
        let config: ProbeConfig = args.into();
        assert_eq!(
            config.query,
            Query::Probes {
                point: DVec3::new(5.0, 64.0, 5.0),
                skip_origin: true,
                assume: Some(SubLevelId::from_u128(10)),
            }
        );
    }
}
