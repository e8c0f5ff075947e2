//! Scope window for pcmscope

use std::time::Duration;

use gpui::prelude::*;
use gpui::*;
use log::{trace, warn};

use crate::audio::AudioSource;
use crate::scope::{DisplayMode, SharedScope};

/// Redraw interval, about 60fps
const REFRESH_INTERVAL: Duration = Duration::from_millis(16);

/// The root view: a full-window trace with a status line
pub struct ScopeView {
    scope: SharedScope,
    /// Owned so that its streams stop when the view goes away
    source: AudioSource,
    _refresh_task: Task<()>,
}

impl ScopeView {
    pub fn new(scope: SharedScope, source: AudioSource, cx: &mut Context<Self>) -> Self {
        let refresh_task = cx.spawn({
            async move |this: WeakEntity<Self>, cx: &mut AsyncApp| loop {
                cx.background_executor().timer(REFRESH_INTERVAL).await;

                let Some(this) = this.upgrade() else {
                    break;
                };
                let result = cx.update_entity(&this, |_, cx| {
                    cx.notify();
                });
                if result.is_err() {
                    break;
                }
            }
        });

        Self {
            scope,
            source,
            _refresh_task: refresh_task,
        }
    }

    fn status_line(&self) -> String {
        let mode = self.scope.mode();
        let mut status = format!("{} - {}", self.source.describe(), mode);
        if mode == DisplayMode::Level {
            if let Some(db) = self.scope.latest_level() {
                status.push_str(&format!(" - {:.1} dB", db));
            }
        }
        if self.source.is_finished() {
            status.push_str(" - end of input");
        }
        status
    }
}

impl Render for ScopeView {
    fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
        let scope = self.scope.clone();

        div()
            .relative()
            .size_full()
            .bg(rgb(0x000000))
            .child(
                canvas(
                    |_bounds, _window, _cx| {},
                    move |bounds, _, window, _cx| paint_trace(&scope, bounds, window),
                )
                .size_full(),
            )
            .child(
                div()
                    .absolute()
                    .top_2()
                    .left_2()
                    .text_xs()
                    .text_color(rgb(0x888888))
                    .child(self.status_line()),
            )
    }
}

/// Draw the whole trace as one polyline while holding the scope lock
fn paint_trace(scope: &SharedScope, bounds: Bounds<Pixels>, window: &mut Window) {
    let width = f32::from(bounds.size.width);
    let height = f32::from(bounds.size.height);

    scope.render_pass(|trace| {
        let points = trace.points(width, height);
        trace!(
            "Render pass: {} points, cursor at {}",
            points.len(),
            trace.cursor()
        );
        let mut points = points
            .into_iter()
            .map(|(x, y)| point(bounds.origin.x + px(x), bounds.origin.y + px(y)));

        let Some(first) = points.next() else {
            return;
        };
        let mut builder = PathBuilder::stroke(px(1.0));
        builder.move_to(first);
        let mut segments = 0;
        for next in points {
            builder.line_to(next);
            segments += 1;
        }
        if segments == 0 {
            return;
        }

        match builder.build() {
            Ok(path) => window.paint_path(path, white()),
            Err(e) => warn!("Failed to build trace path: {:?}", e),
        }
    });
}
