use anyhow::{anyhow, Context};
use ev3dev_lang_rust::{Ev3Button, Led, Screen};
use image::Rgb;
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_text_mut};
use rusttype::{Font, Scale};

use crate::arm_hal::{ButtonSnapshot, ButtonsHal, DisplayHal, HalError, LedColor, LedsHal};

pub struct Ev3Buttons {
    buttons: Ev3Button,
}

impl Ev3Buttons {
    pub fn new() -> anyhow::Result<Self> {
        let buttons = Ev3Button::new()
            .map_err(|err| HalError::DeviceNotConnected(format!("brick buttons: {err}")))?;
        Ok(Self { buttons })
    }
}

impl ButtonsHal for Ev3Buttons {
    fn read(&mut self) -> anyhow::Result<ButtonSnapshot> {
        self.buttons.process();
        Ok(ButtonSnapshot {
            left: self.buttons.is_left(),
            right: self.buttons.is_right(),
            up: self.buttons.is_up(),
            down: self.buttons.is_down(),
            center: self.buttons.is_enter(),
            back: self.buttons.is_backspace(),
        })
    }
}

pub struct Ev3Leds {
    led: Led,
}

impl Ev3Leds {
    pub fn new() -> anyhow::Result<Self> {
        let led = Led::new()
            .map_err(|err| HalError::DeviceNotConnected(format!("brick leds: {err}")))?;
        Ok(Self { led })
    }
}

impl LedsHal for Ev3Leds {
    fn set_both(&mut self, color: LedColor) -> anyhow::Result<()> {
        let channels = match color {
            LedColor::Green => Led::COLOR_GREEN,
            LedColor::Red => Led::COLOR_RED,
        };
        self.led.set_color(channels)?;
        Ok(())
    }
}

/// The brick's framebuffer plus a rasterized font. Frames are composed into
/// the backing image and pushed with `render()`.
pub struct Ev3Display {
    screen: Screen,
    font: Font<'static>,
}

impl Ev3Display {
    // Stock font on the ev3dev Debian image.
    const FONT_PATH: &'static str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
    const FONT_SCALE: f32 = 14.0;
    const INK: Rgb<u8> = Rgb([0, 0, 0]);

    pub fn new() -> anyhow::Result<Self> {
        let screen =
            Screen::new().map_err(|err| HalError::DeviceNotConnected(format!("lcd: {err}")))?;
        let bytes = std::fs::read(Ev3Display::FONT_PATH)
            .with_context(|| format!("reading lcd font {}", Ev3Display::FONT_PATH))?;
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| anyhow!("unparseable lcd font {}", Ev3Display::FONT_PATH))?;
        Ok(Self { screen, font })
    }
}

impl DisplayHal for Ev3Display {
    fn clear(&mut self) {
        self.screen.clear();
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        draw_text_mut(
            &mut self.screen.image,
            Ev3Display::INK,
            x.max(0) as u32,
            y.max(0) as u32,
            Scale::uniform(Ev3Display::FONT_SCALE),
            &self.font,
            text,
        );
    }

    fn draw_circle(&mut self, x: i32, y: i32, radius: i32, filled: bool) {
        if filled {
            draw_filled_circle_mut(&mut self.screen.image, (x, y), radius, Ev3Display::INK);
        } else {
            draw_hollow_circle_mut(&mut self.screen.image, (x, y), radius, Ev3Display::INK);
        }
    }

    fn dimensions(&self) -> (i32, i32) {
        (self.screen.xres() as i32, self.screen.yres() as i32)
    }

    fn render(&mut self) -> anyhow::Result<()> {
        self.screen.update();
        Ok(())
    }
}
