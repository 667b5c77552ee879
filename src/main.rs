use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context;
use ductkit::{
    init_logging, Bounds2D, DrawingSession, ElementId, EngineConfig, GeometryElement, Point2D,
    PointerSample, PointerSource, SessionEvent, TimerQueue, ViewTransform,
};

const TICK: Duration = Duration::from_millis(8);

/// Replays a fixed pointer path in real time, releasing each sample once its
/// offset from the start has elapsed.
struct ScriptedPointer {
    started: Instant,
    samples: VecDeque<(Duration, PointerSample)>,
}

impl ScriptedPointer {
    /// Sweeps from `from` to `to` in `steps` samples spaced `every` apart.
    fn sweep(
        from: Point2D,
        to: Point2D,
        steps: u32,
        every: Duration,
        view: ViewTransform,
    ) -> Self {
        let samples = (0..=steps)
            .map(|i| {
                let t = f64::from(i) / f64::from(steps.max(1));
                let position =
                    Point2D::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
                (every * i, PointerSample { position, view })
            })
            .collect();
        Self {
            started: Instant::now(),
            samples,
        }
    }
}

impl PointerSource for ScriptedPointer {
    fn poll(&mut self) -> Option<PointerSample> {
        let (due, _) = self.samples.front()?;
        if *due > self.started.elapsed() {
            return None;
        }
        self.samples.pop_front().map(|(_, sample)| sample)
    }
}

fn demo_layout() -> Vec<(ElementId, GeometryElement)> {
    vec![
        (
            ElementId(1),
            GeometryElement::Room {
                corners: vec![
                    Point2D::new(100.0, 100.0),
                    Point2D::new(900.0, 100.0),
                    Point2D::new(900.0, 600.0),
                    Point2D::new(100.0, 600.0),
                ],
            },
        ),
        (
            ElementId(2),
            GeometryElement::Equipment {
                position: Point2D::new(200.0, 350.0),
                ports: vec![Point2D::new(240.0, 350.0)],
            },
        ),
        (
            ElementId(3),
            GeometryElement::Centerline {
                points: vec![
                    Point2D::new(240.0, 350.0),
                    Point2D::new(500.0, 350.0),
                    Point2D::new(500.0, 200.0),
                ],
            },
        ),
        (
            ElementId(4),
            GeometryElement::BranchPoint {
                position: Point2D::new(500.0, 350.0),
            },
        ),
        (
            ElementId(5),
            GeometryElement::DuctSegment {
                start: Point2D::new(500.0, 350.0),
                end: Point2D::new(800.0, 350.0),
            },
        ),
    ]
}

fn load_config() -> anyhow::Result<EngineConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            EngineConfig::load_from_file(&path)
                .with_context(|| format!("loading engine config from {}", path.display()))
        }
        None => match EngineConfig::default_config_path() {
            Ok(path) => Ok(EngineConfig::load_or_default(&path)?),
            Err(e) => {
                tracing::warn!("No config directory ({}); using defaults", e);
                Ok(EngineConfig::default())
            }
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let config = load_config()?;

    let timers = Rc::new(TimerQueue::monotonic());
    let session = DrawingSession::new(
        Bounds2D::new(0.0, 0.0, 1000.0, 1000.0),
        &config,
        timers.clone(),
    )?;

    session.subscribe(|event| match event {
        SessionEvent::SnapChanged(resolution) => match &resolution.snap {
            Some(snap) => tracing::info!(
                "Snapped to {} of {} at ({:.1}, {:.1}), {:?}",
                snap.kind(),
                snap.snap_point.payload.element,
                resolution.attracted_position.x,
                resolution.attracted_position.y,
                snap.strength
            ),
            None => tracing::debug!("Pointer free"),
        },
        SessionEvent::TuningAdjusted(adjustment) => tracing::info!(
            "Tuned to delay {:?}, batch {}",
            adjustment.current.debounce_delay,
            adjustment.current.batch_size
        ),
        _ => {}
    });

    for (id, element) in demo_layout() {
        session.upsert_element(id, element)?;
    }

    session.attach_pointer_source(Box::new(ScriptedPointer::sweep(
        Point2D::new(120.0, 360.0),
        Point2D::new(880.0, 340.0),
        600,
        Duration::from_millis(4),
        ViewTransform::new(0.0, 0.0, 1.5),
    )));

    let mut ticker = tokio::time::interval(TICK);
    let mut last = Instant::now();
    let mut idle_ticks = 0;
    while idle_ticks < 32 {
        ticker.tick().await;
        let now = Instant::now();
        session.record_frame(now - last);
        last = now;

        if session.pump_pointer() == 0 {
            idle_ticks += 1;
        } else {
            idle_ticks = 0;
        }
        timers.run_due();
    }

    session.flush_all_debounced();
    session.flush_all_batches();
    tracing::info!("Engine stats: {}", session.stats());
    Ok(())
}
