use std::fmt;
use std::time::{Duration, Instant};

use glam::DVec3;
use serde::Serialize;
use tracing::{debug, info};

use crate::companion::Companion;
use crate::config::{ProbeConfig, Query};
use crate::error::{KernelError, Result};
use crate::scene::Scene;
use crate::sublevel::{ProbeKind, SubLevel, SubLevelQueries, SubLevelQueriesExt, SubLevelState};
use crate::types::layout;
use crate::types::{ContinuousBox, LevelId, Pose, SubLevelId};

/// What a query reports about one sub-level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubLevelSummary {
    pub id: SubLevelId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bounding_box: ContinuousBox,
    pub pose: Pose,
}

impl SubLevelSummary {
    pub fn of(sub_level: &dyn SubLevel) -> Self {
        Self {
            id: sub_level.id(),
            name: sub_level.name().map(str::to_owned),
            bounding_box: *sub_level.bounding_box(),
            pose: *sub_level.logical_pose(),
        }
    }
}

impl fmt::Display for SubLevelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(name) = &self.name {
            write!(f, " \"{name}\"")?;
        }
        write!(f, " bounds {}", self.bounding_box)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeSummary {
    pub kind: ProbeKind,
    pub frame: Option<SubLevelId>,
    pub block: [i32; 3],
}

/// A cell found by a cross-frame lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellHit {
    pub frame: Option<SubLevelId>,
    pub block: [i32; 3],
}

fn frame_label(frame: Option<SubLevelId>) -> String {
    frame.map_or_else(|| "main grid".to_string(), |id| id.to_string())
}

/// Answer to one [`Query`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum Report {
    List {
        sub_levels: Vec<SubLevelSummary>,
    },
    Contains {
        #[serde(with = "layout::vec3")]
        point: DVec3,
        owner: Option<SubLevelSummary>,
    },
    Project {
        #[serde(with = "layout::vec3")]
        point: DVec3,
        #[serde(with = "layout::vec3")]
        projected: DVec3,
    },
    Distance {
        squared: f64,
    },
    Velocity {
        #[serde(with = "layout::vec3")]
        velocity: DVec3,
        relative_to_air: bool,
    },
    Intersecting {
        sub_levels: Vec<SubLevelSummary>,
    },
    Plot {
        chunk_x: i32,
        chunk_z: i32,
        owner: Option<SubLevelId>,
    },
    Probes {
        probes: Vec<ProbeSummary>,
    },
    Solid {
        hit: Option<CellHit>,
    },
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::List { sub_levels } | Report::Intersecting { sub_levels } => {
                writeln!(f, "{} sub-level(s)", sub_levels.len())?;
                for s in sub_levels {
                    writeln!(f, "  {s}")?;
                }
                Ok(())
            }
            Report::Contains { point, owner } => match owner {
                Some(s) => writeln!(f, "({}, {}, {}) is in {s}", point.x, point.y, point.z),
                None => writeln!(f, "({}, {}, {}) is in the main grid", point.x, point.y, point.z),
            },
            Report::Project { point, projected } => writeln!(
                f,
                "({}, {}, {}) -> ({:.6}, {:.6}, {:.6})",
                point.x, point.y, point.z, projected.x, projected.y, projected.z
            ),
            Report::Distance { squared } => {
                writeln!(f, "distance² {squared:.6} (distance {:.6})", squared.sqrt())
            }
            Report::Velocity {
                velocity,
                relative_to_air,
            } => writeln!(
                f,
                "velocity{} ({:.6}, {:.6}, {:.6}) m/s",
                if *relative_to_air { " relative to air" } else { "" },
                velocity.x,
                velocity.y,
                velocity.z
            ),
            Report::Plot {
                chunk_x,
                chunk_z,
                owner,
            } => match owner {
                Some(id) => writeln!(f, "chunk column ({chunk_x}, {chunk_z}) is claimed by {id}"),
                None => writeln!(f, "chunk column ({chunk_x}, {chunk_z}) is not in any plot"),
            },
            Report::Probes { probes } => {
                for (i, p) in probes.iter().enumerate() {
                    writeln!(
                        f,
                        "{}. {:?} [{}, {}, {}] in {}",
                        i + 1,
                        p.kind,
                        p.block[0],
                        p.block[1],
                        p.block[2],
                        frame_label(p.frame)
                    )?;
                }
                Ok(())
            }
            Report::Solid { hit } => match hit {
                Some(h) => writeln!(
                    f,
                    "solid [{}, {}, {}] in {}",
                    h.block[0],
                    h.block[1],
                    h.block[2],
                    frame_label(h.frame)
                ),
                None => writeln!(f, "no solid cell"),
            },
        }
    }
}

/// Summary of a completed query session.
#[derive(Debug)]
pub struct SessionOutcome {
    pub level: LevelId,
    pub report: Report,
    pub duration: Duration,
}

/// Loads a scene, builds its registries and answers one query.
pub struct Session;

impl Session {
    pub fn run(config: &ProbeConfig) -> Result<SessionOutcome> {
        let start = Instant::now();

        info!(scene = %config.scene.display(), "Starting query session");

        // 1. Load scene
        let scene = Scene::load(&config.scene)?;

        // 2. Build registries
        let companion = scene.build_companion(&config.kernel)?;

        // 3. Resolve level
        let level = config
            .level
            .clone()
            .or_else(|| companion.active_level().cloned())
            .ok_or_else(|| {
                KernelError::Config("No level given and the scene has no active level".into())
            })?;
        if scene.level(&level).is_none() {
            return Err(KernelError::Scene(format!("Unknown level {level}")));
        }
        debug!(%level, query = ?config.query, "Resolved level");

        // 4. Answer
        let report = Self::answer(&scene, &companion, &level, &config.query)?;

        let duration = start.elapsed();
        info!(%level, elapsed = ?duration, "Query complete");

        Ok(SessionOutcome {
            level,
            report,
            duration,
        })
    }

    /// Answer `query` against `level`.
    pub fn answer(
        scene: &Scene,
        companion: &Companion,
        level: &LevelId,
        query: &Query,
    ) -> Result<Report> {
        let queries = companion.queries(level);

        let report = match query {
            Query::List => Report::List {
                sub_levels: queries
                    .get_all_intersecting(&ContinuousBox::new(
                        f64::NEG_INFINITY,
                        f64::NEG_INFINITY,
                        f64::NEG_INFINITY,
                        f64::INFINITY,
                        f64::INFINITY,
                        f64::INFINITY,
                    ))
                    .map(SubLevelSummary::of)
                    .collect(),
            },
            Query::Contains { point } => Report::Contains {
                point: *point,
                owner: queries.get_containing_point(*point).map(SubLevelSummary::of),
            },
            Query::Project { point } => Report::Project {
                point: *point,
                projected: queries.project_out_of_sub_level(*point),
            },
            Query::Distance { a, b } => Report::Distance {
                squared: queries.distance_squared_with_sub_levels(*a, *b),
            },
            Query::Velocity {
                point,
                relative_to_air,
            } => Report::Velocity {
                velocity: if *relative_to_air {
                    queries.get_velocity_relative_to_air(*point)
                } else {
                    queries.get_velocity(*point)
                },
                relative_to_air: *relative_to_air,
            },
            Query::Intersecting { bounds } => Report::Intersecting {
                sub_levels: queries
                    .get_all_intersecting(bounds)
                    .map(SubLevelSummary::of)
                    .collect(),
            },
            Query::Plot { chunk_x, chunk_z } => Report::Plot {
                chunk_x: *chunk_x,
                chunk_z: *chunk_z,
                owner: queries.get_containing(*chunk_x, *chunk_z).map(|s| s.id()),
            },
            Query::Probes {
                point,
                skip_origin,
                assume,
            } => {
                let assumed = Self::assumed_state(scene, level, *assume)?;
                let probes = queries
                    .probe_order(*point, !skip_origin, assumed.as_ref().map(|s| s as &dyn SubLevel))
                    .iter()
                    .map(|p| ProbeSummary {
                        kind: p.kind,
                        frame: p.frame.map(|s| s.id()),
                        block: p.block().to_array(),
                    })
                    .collect();
                Report::Probes { probes }
            }
            Query::Solid {
                point,
                skip_origin,
                assume,
            } => {
                let assumed = Self::assumed_state(scene, level, *assume)?;
                let cells = scene.solid_cells(level);
                let hit = queries.run_including_sub_levels(
                    *point,
                    !skip_origin,
                    assumed.as_ref().map(|s| s as &dyn SubLevel),
                    |frame, block| {
                        cells.contains(&block).then(|| CellHit {
                            frame: frame.map(|s| s.id()),
                            block: block.to_array(),
                        })
                    },
                );
                Report::Solid { hit }
            }
        };

        Ok(report)
    }

    /// The scene's record of the sub-level a probe should assume.
    fn assumed_state(
        scene: &Scene,
        level: &LevelId,
        id: Option<SubLevelId>,
    ) -> Result<Option<SubLevelState>> {
        let Some(id) = id else {
            return Ok(None);
        };
        scene
            .level(level)
            .and_then(|l| l.sub_levels.iter().find(|r| r.id == id))
            .map(|r| Some(r.to_state()))
            .ok_or_else(|| KernelError::Scene(format!("Unknown sub-level {id} in level {level}")))
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::*;
    use crate::config::{Backend, KernelConfig};

    const SCENE: &str = r#"{
        "active_level": "overworld",
        "levels": {
            "overworld": {
                "solid": [[4097, 1, 1], [1, 65, 1]],
                "sub_levels": [{
                    "id": "a",
                    "name": "raft",
                    "plot": [4096, 0, 0, 4111, 15, 15],
                    "pose": { "position": [0.0, 64.0, 0.0], "rotation_point": [4096.0, 0.0, 0.0] },
                    "last_pose": { "position": [-1.0, 64.0, 0.0], "rotation_point": [4096.0, 0.0, 0.0] }
                }]
            }
        }
    }"#;

    fn answer(query: Query) -> Report {
        let scene = Scene::from_json(SCENE).unwrap();
        let companion = scene.build_companion(&KernelConfig::default()).unwrap();
        Session::answer(&scene, &companion, &LevelId::new("overworld"), &query).unwrap()
    }

    #[test]
    fn list_reports_every_sub_level() {
        let Report::List { sub_levels } = answer(Query::List) else {
            panic!("wrong report");
        };
        assert_eq!(sub_levels.len(), 1);
        assert_eq!(sub_levels[0].name.as_deref(), Some("raft"));
    }

    #[test]
    fn velocity_over_last_tick() {
        let report = answer(Query::Velocity {
            point: DVec3::new(4100.0, 1.0, 1.0),
            relative_to_air: false,
        });
        // one unit per 0.05 s tick
        assert_eq!(
            report,
            Report::Velocity {
                velocity: DVec3::new(20.0, 0.0, 0.0),
                relative_to_air: false
            }
        );
    }

    #[test]
    fn solid_prefers_origin_probe() {
        // (1.5, 65.5, 1.5) is solid in the main grid and, mapped into the
        // raft, is the solid plot cell (4097, 1, 1)
        let point = DVec3::new(1.5, 65.5, 1.5);
        let raft = SubLevelId::from_u128(10);

        let Report::Solid { hit } = answer(Query::Solid {
            point,
            skip_origin: false,
            assume: Some(raft),
        }) else {
            panic!("wrong report");
        };
        assert_eq!(
            hit,
            Some(CellHit {
                frame: None,
                block: [1, 65, 1]
            })
        );

        let Report::Solid { hit } = answer(Query::Solid {
            point,
            skip_origin: true,
            assume: Some(raft),
        }) else {
            panic!("wrong report");
        };
        assert_eq!(
            hit,
            Some(CellHit {
                frame: Some(raft),
                block: [4097, 1, 1]
            })
        );
    }

    #[test]
    fn solid_origin_hit_is_main_grid_on_every_backend() {
        let scene = Scene::from_json(SCENE).unwrap();
        let level = LevelId::new("overworld");
        let query = Query::Solid {
            point: DVec3::new(1.5, 65.5, 1.5),
            skip_origin: false,
            assume: Some(SubLevelId::from_u128(10)),
        };
        let expected = Report::Solid {
            hit: Some(CellHit {
                frame: None,
                block: [1, 65, 1],
            }),
        };

        for backend in [Backend::Plots, Backend::Disabled] {
            let config = KernelConfig {
                backend,
                ..KernelConfig::default()
            };
            let companion = scene.build_companion(&config).unwrap();
            let report = Session::answer(&scene, &companion, &level, &query).unwrap();
            assert_eq!(report, expected, "backend {backend}");
        }
    }

    #[test]
    fn probes_list_priority_order() {
        let Report::Probes { probes } = answer(Query::Probes {
            point: DVec3::new(4097.5, 1.5, 1.5),
            skip_origin: false,
            assume: None,
        }) else {
            panic!("wrong report");
        };
        let kinds: Vec<_> = probes.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![ProbeKind::Origin, ProbeKind::Projected]);
        assert_eq!(probes[1].block, IVec3::new(1, 65, 1).to_array());
    }

    #[test]
    fn unknown_assumed_sub_level_is_an_error() {
        let scene = Scene::from_json(SCENE).unwrap();
        let companion = scene.build_companion(&KernelConfig::default()).unwrap();
        let query = Query::Probes {
            point: DVec3::ZERO,
            skip_origin: false,
            assume: Some(SubLevelId::from_u128(99)),
        };
        let err = Session::answer(&scene, &companion, &LevelId::new("overworld"), &query);
        assert!(matches!(err, Err(KernelError::Scene(_))));
    }

    #[test]
    fn report_json_is_tagged() {
        let report = answer(Query::Plot {
            chunk_x: 256,
            chunk_z: 0,
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["query"], "plot");
        assert_eq!(json["owner"], "0000000000000000000000000000000a");
        assert!(report.to_string().contains("claimed by"));
    }

    #[test]
    fn report_text() {
        let report = Report::Distance { squared: 4.0 };
        assert_eq!(report.to_string(), "distance² 4.000000 (distance 2.000000)\n");
        let report = Report::Solid { hit: None };
        assert_eq!(report.to_string(), "no solid cell\n");
    }
}
