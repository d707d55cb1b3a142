use crate::config::SceneConfig;
use anyhow::{Context, Result};
use splitear_audio::{ListenerAggregator, PlaybackManager, SpatialPlayback};
use splitear_core::{Pose, SimTick, TICKS_PER_SECOND};
use splitear_testkit::{JsonlSink, RenderedSourceRecord};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub struct HeadlessConfig {
    pub scene: SceneConfig,
    /// Directory relative clip paths are resolved against.
    pub scene_dir: PathBuf,
    pub max_ticks: u64,
    pub trace: Option<PathBuf>,
    pub no_audio: bool,
    pub realtime: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub sources: usize,
    pub started: usize,
    pub failed: usize,
    pub records: usize,
}

pub fn run(cfg: HeadlessConfig) -> Result<RunSummary> {
    let scene = &cfg.scene;

    let mut builder = ListenerAggregator::builder(scene.aggregator_config());
    let handles: Vec<_> = scene
        .sources
        .iter()
        .map(|source| builder.register_source(&source.name, source.position.into()))
        .collect();
    let mut aggregator = builder.build().context("invalid scene configuration")?;

    let mut playback = if cfg.no_audio {
        PlaybackManager::stub(aggregator.anchor(), aggregator.distance_limit())
    } else {
        PlaybackManager::new(aggregator.anchor(), aggregator.distance_limit())
    };
    playback.update_settings(scene.audio_settings());

    for (source, handle) in scene.sources.iter().zip(&handles) {
        let Some(clip) = &source.clip else {
            continue;
        };
        let path = cfg.scene_dir.join(clip);
        if let Err(err) = playback.load_clip_from_path(*handle, &path) {
            warn!(source = %source.name, "Skipping clip: {err:#}");
        }
    }

    let mut sink = cfg
        .trace
        .as_deref()
        .map(JsonlSink::create)
        .transpose()?;

    info!(
        listeners = scene.listeners.len(),
        sources = aggregator.sources().len(),
        limit = aggregator.distance_limit().get(),
        mode = ?aggregator.mode(),
        audio = playback.is_available(),
        "Running headless scene"
    );

    let tick_interval = Duration::from_millis(1000 / TICKS_PER_SECOND);
    let mut summary = RunSummary {
        sources: aggregator.sources().len(),
        ..RunSummary::default()
    };

    let mut tick = SimTick::ZERO;
    let mut poses: Vec<Pose> = Vec::with_capacity(scene.listeners.len());
    while tick.0 < cfg.max_ticks {
        poses.clear();
        poses.extend(
            scene
                .listeners
                .iter()
                .filter(|listener| listener.join_tick <= tick.0)
                .map(|listener| listener.motion.pose_at(tick)),
        );

        let tick_summary = aggregator.tick(&poses, &mut playback);
        playback.update();
        summary.started += tick_summary.started;
        summary.failed += tick_summary.failed;

        if let Some(sink) = sink.as_mut() {
            for source in aggregator.sources() {
                let rendered = source.rendered_position();
                sink.write(&RenderedSourceRecord {
                    tick,
                    source: source.name().to_string(),
                    listeners: tick_summary.listeners,
                    nominal: source.nominal_position().to_array(),
                    rendered: rendered.to_array(),
                    distance: rendered.distance(aggregator.anchor()),
                    gain: playback.voice_gain(source.handle()).unwrap_or(0.0),
                    playing: playback.is_playing(source.handle()),
                })?;
            }
        }

        if cfg.realtime {
            std::thread::sleep(tick_interval);
        }
        tick = tick.advance(1);
    }
    summary.ticks = tick.0;

    playback.stop_all();
    if let Some(mut sink) = sink {
        sink.flush()?;
        summary.records = sink.written();
    }

    info!(
        ticks = summary.ticks,
        started = summary.started,
        failed = summary.failed,
        "Headless scene finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ListenerConfig, SourceConfig};
    use crate::motion::Motion;
    use splitear_testkit::read_jsonl;

    fn scene_config(scene: SceneConfig, max_ticks: u64, trace: Option<PathBuf>) -> HeadlessConfig {
        HeadlessConfig {
            scene,
            scene_dir: PathBuf::new(),
            max_ticks,
            trace,
            no_audio: true,
            realtime: false,
        }
    }

    fn static_listener(name: &str, position: [f32; 3], join_tick: u64) -> ListenerConfig {
        ListenerConfig {
            name: name.into(),
            join_tick,
            motion: Motion::Static {
                position,
                yaw_degrees: 0.0,
            },
        }
    }

    #[test]
    fn default_scene_runs_and_starts_every_source_once() {
        let summary = run(scene_config(SceneConfig::default(), 60, None)).expect("run");
        assert_eq!(summary.ticks, 60);
        assert_eq!(summary.sources, 3);
        assert_eq!(summary.started, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.records, 0);
    }

    #[test]
    fn invalid_limit_is_rejected_before_ticking() {
        let mut scene = SceneConfig::default();
        scene.audio.distance_limit = 0.0;
        let err = run(scene_config(scene, 10, None)).expect_err("invalid limit");
        assert!(format!("{err:#}").contains("distance limit"));
    }

    #[test]
    fn sources_wait_for_the_first_listener() {
        let scene = SceneConfig {
            listeners: vec![static_listener("late", [0.0, 0.0, -5.0], 3)],
            sources: vec![SourceConfig {
                name: "fire".into(),
                position: [0.0, 0.0, 0.0],
                clip: None,
            }],
            ..SceneConfig::default()
        };
        let trace = std::env::temp_dir()
            .join(format!("splitear_headless_{}", std::process::id()))
            .join("late.jsonl");

        let summary = run(scene_config(scene, 5, Some(trace.clone()))).expect("run");
        assert_eq!(summary.records, 5);

        let records: Vec<RenderedSourceRecord> = read_jsonl(&trace).expect("trace");
        for record in &records[..3] {
            assert_eq!(record.listeners, 0);
            assert!(!record.playing);
            assert_eq!(record.rendered, record.nominal);
        }
        for record in &records[3..] {
            assert_eq!(record.listeners, 1);
            assert!(record.playing);
            assert!((record.distance - 5.0).abs() < 1e-4);
        }

        let _ = std::fs::remove_dir_all(trace.parent().unwrap());
    }

    #[test]
    fn missing_clips_do_not_abort_the_run() {
        let mut scene = SceneConfig::default();
        scene.sources[0].clip = Some(PathBuf::from("does/not/exist.ogg"));
        let summary = run(scene_config(scene, 30, None)).expect("run");
        assert_eq!(summary.started, 3);
    }
}
