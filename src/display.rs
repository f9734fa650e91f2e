//! The LCD status page: title, a claw glyph (filled circle when gripping,
//! outline when open), and the wall-clock time.

use std::time::Duration;

use chrono::Local;

use crate::arm_hal::DisplayHal;
use crate::periodic::run_periodic;
use crate::signals::ArmSignals;

pub const LCD_PERIOD: Duration = Duration::from_millis(500);

pub const TITLE: &str = "LEGO - ROBOTIC ARM";
const TITLE_X: i32 = 20;
const TITLE_Y: i32 = 10;
const CLAW_GLYPH_RADIUS: i32 = 35;
const CLOCK_X: i32 = 60;
const CLOCK_BOTTOM_MARGIN: i32 = 20;

pub struct LcdReporter {
    hal: Box<dyn DisplayHal + Send>,
    signals: ArmSignals,
}

impl LcdReporter {
    pub fn new(hal: Box<dyn DisplayHal + Send>, signals: ArmSignals) -> Self {
        Self { hal, signals }
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        let shutdown = self.signals.shutdown.clone();
        run_periodic(LCD_PERIOD, &shutdown, || self.tick())
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        let claw_closed = self.signals.claw_closed.is_set();
        let (width, height) = self.hal.dimensions();

        self.hal.clear();
        self.hal.draw_text(TITLE_X, TITLE_Y, TITLE);
        self.hal
            .draw_circle(width / 2, height / 2, CLAW_GLYPH_RADIUS, claw_closed);
        let clock = Local::now().format("%H:%M:%S").to_string();
        self.hal
            .draw_text(CLOCK_X, height - CLOCK_BOTTOM_MARGIN, &clock);
        self.hal.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm_hal_mock::{DisplayOp, MockDisplay};

    #[test]
    fn frame_has_title_glyph_and_clock() {
        let display = MockDisplay::new();
        let signals = ArmSignals::new();
        let mut reporter = LcdReporter::new(Box::new(display.clone()), signals.clone());

        reporter.tick().unwrap();
        let ops = display.ops();
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[0], DisplayOp::Clear);
        assert_eq!(
            ops[1],
            DisplayOp::Text {
                x: TITLE_X,
                y: TITLE_Y,
                text: TITLE.to_owned(),
            }
        );
        assert_eq!(
            ops[2],
            DisplayOp::Circle {
                x: 89,
                y: 64,
                radius: CLAW_GLYPH_RADIUS,
                filled: false,
            }
        );
        match &ops[3] {
            DisplayOp::Text { x, y, text } => {
                assert_eq!((*x, *y), (CLOCK_X, 108));
                // HH:MM:SS
                assert_eq!(text.len(), 8);
                assert_eq!(text.as_bytes()[2], b':');
                assert_eq!(text.as_bytes()[5], b':');
            }
            other => panic!("expected clock text, got {other:?}"),
        }
        assert_eq!(ops[4], DisplayOp::Render);
    }

    #[test]
    fn claw_glyph_fills_when_closed() {
        let display = MockDisplay::new();
        let signals = ArmSignals::new();
        signals.claw_closed.raise();
        let mut reporter = LcdReporter::new(Box::new(display.clone()), signals.clone());

        reporter.tick().unwrap();
        assert!(display
            .ops()
            .iter()
            .any(|op| matches!(op, DisplayOp::Circle { filled: true, .. })));
    }
}
