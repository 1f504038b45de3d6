use crate::error::TrialError;
use crate::rig::{Rig, TriggerContext};
use retrocue_cache::{ColourWheel, pointer_angle};
use retrocue_core::scoring::score;
use retrocue_core::{
    Display, Drawable, FrameLabel, HueIndex, Keyboard, Pointer, ResponseRecord, TriggerSink,
};
use retrocue_timing::{Timer, ns_to_ms};
use tracing::debug;

/// Runs the continuous report on the colour wheel: waits for the first pointer
/// movement, then tracks the pointer until a click.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseCollector;

impl ResponseCollector {
    /// `extras` are drawn on every response frame, above the wheel. Markers are
    /// sent only when `triggers` is given.
    pub fn collect<D, P, K, S, T>(
        &self,
        target: HueIndex,
        wheel: &ColourWheel,
        extras: &[Drawable],
        triggers: Option<&TriggerContext>,
        rig: &mut Rig<D, P, K, S, T>,
    ) -> Result<ResponseRecord, TrialError>
    where
        D: Display,
        P: Pointer,
        K: Keyboard,
        S: TriggerSink,
        T: Timer<Timestamp = u64>,
    {
        let ring = Drawable::Wheel {
            offset: wheel.offset(),
        };
        rig.pointer.reset();
        let shown = rig.timer.now();

        while !rig.pointer.moved_since_reset() {
            if rig.abort_requested() {
                return Err(TrialError::Aborted);
            }
            draw(&mut rig.display, ring, extras, None);
            rig.display.present();
        }
        let moved = rig.timer.now();
        if let Some(ctx) = triggers {
            rig.triggers.emit(&ctx.code(FrameLabel::ResponseOnset));
        }

        let selected = loop {
            if rig.abort_requested() {
                return Err(TrialError::Aborted);
            }
            let angle = pointer_angle(rig.pointer.position());
            let hue = wheel.hue_at(angle);
            draw(
                &mut rig.display,
                ring,
                extras,
                Some(Drawable::Marker {
                    hue,
                    angle_deg: angle,
                }),
            );
            rig.display.present();
            if rig.pointer.pressed() {
                break hue;
            }
        };
        let clicked = rig.timer.now();
        if let Some(ctx) = triggers {
            rig.triggers.emit(&ctx.code(FrameLabel::ResponseOffset));
        }

        let score = score(selected, target);
        debug!(
            %selected,
            %target,
            distance = score.circular_distance,
            performance = score.performance,
            "response collected"
        );
        Ok(ResponseRecord::new(
            ns_to_ms(moved.saturating_sub(shown)),
            ns_to_ms(clicked.saturating_sub(moved)),
            selected,
            wheel.offset(),
            score,
        ))
    }
}

fn draw<D: Display>(display: &mut D, ring: Drawable, extras: &[Drawable], marker: Option<Drawable>) {
    display.render(&Drawable::Fixation);
    display.render(&ring);
    for extra in extras {
        display.render(extra);
    }
    if let Some(marker) = marker {
        display.render(&marker);
    }
}
