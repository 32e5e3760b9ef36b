//! Panel layout
//!
//! Draws the statistics into a landscape [FrameBuffer] that [pack](crate::packer::pack)
//! rotates onto the panel. Text positions are baselines.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_5X8, FONT_9X15_BOLD},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{renderer::TextRenderer, Baseline, Text},
};
use fontdue::{Font, FontSettings};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, warn};

use crate::color::{BLACK_RGBA, WHITE_RGBA};
use crate::config::RenderSection;
use crate::epd2in13bc::{HEIGHT, WIDTH};
use crate::framebuffer::FrameBuffer;
use crate::stats::CaseStats;

/// The panel seen in landscape
pub const FRAME_WIDTH: u32 = HEIGHT;
pub const FRAME_HEIGHT: u32 = WIDTH;

const SMALL: &MonoFont<'static> = &FONT_5X8;
const LARGE: &MonoFont<'static> = &FONT_9X15_BOLD;

// glyph coverage from which a pixel is inked
const COVERAGE_THRESHOLD: u8 = 128;

const SEPARATORS: [i32; 2] = [8, 95];

const LABEL_X: i32 = 1;
const WORLD_X: i32 = 60;
const COUNTRY_X: i32 = 150;

const UPDATED_Y: i32 = 7;
const CASES_Y: i32 = 40;
const RECOVERED_Y: i32 = 58;
const DEATHS_Y: i32 = 68;
const NEW_CASES_Y: i32 = 78;
const REFRESHED_Y: i32 = 103;

/// One of the two text sizes of the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Small,
    Large,
}

/// Where the glyphs come from
#[derive(Default)]
pub enum Fonts {
    /// Built-in embedded-graphics mono fonts
    #[default]
    Mono,
    /// A TrueType face rasterized with fontdue, sizes in pixels
    TrueType { font: Font, small: f32, large: f32 },
}

impl Fonts {
    /// Loads a TrueType font file.
    pub fn load<P: AsRef<Path>>(path: P, small: f32, large: f32) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow!("Failed to parse font {}: {}", path.display(), e))?;
        Ok(Fonts::TrueType { font, small, large })
    }

    /// The configured font, or the mono fonts when there is none or it can't be loaded.
    pub fn from_config(render: &RenderSection) -> Self {
        let Some(path) = &render.font else {
            return Fonts::Mono;
        };
        match Self::load(path, render.small_size as f32, render.large_size as f32) {
            Ok(fonts) => {
                info!("Using font {}", path.display());
                fonts
            }
            Err(e) => {
                warn!("{:#}, falling back to the built-in fonts", e);
                Fonts::Mono
            }
        }
    }

    /// Advance width of `content` in pixels
    pub fn width(&self, content: &str, size: TextSize) -> i32 {
        match self {
            Fonts::Mono => {
                let style = MonoTextStyle::new(mono(size), Rgb888::BLACK);
                style
                    .measure_string(content, Point::zero(), Baseline::Alphabetic)
                    .bounding_box
                    .size
                    .width as i32
            }
            Fonts::TrueType { font, small, large } => {
                let px = pick(size, *small, *large);
                content
                    .chars()
                    .map(|ch| font.metrics(ch, px).advance_width)
                    .sum::<f32>()
                    .ceil() as i32
            }
        }
    }

    /// Draws `content` in black with its baseline at `y`
    pub fn draw(&self, frame: &mut FrameBuffer, content: &str, x: i32, y: i32, size: TextSize) {
        match self {
            Fonts::Mono => {
                let style = MonoTextStyle::new(mono(size), Rgb888::BLACK);
                // drawing into a FrameBuffer is infallible
                let _ = Text::new(content, Point::new(x, y), style).draw(frame);
            }
            Fonts::TrueType { font, small, large } => {
                let px = pick(size, *small, *large);
                let mut cursor = x as f32;
                for ch in content.chars() {
                    let (metrics, coverage) = font.rasterize(ch, px);
                    let left = cursor.round() as i32 + metrics.xmin;
                    let top = y - metrics.ymin - metrics.height as i32;
                    for (i, &value) in coverage.iter().enumerate() {
                        if value < COVERAGE_THRESHOLD {
                            continue;
                        }
                        let gx = left + (i % metrics.width) as i32;
                        let gy = top + (i / metrics.width) as i32;
                        if gx >= 0 && gy >= 0 {
                            frame.set_pixel(gx as u32, gy as u32, BLACK_RGBA);
                        }
                    }
                    cursor += metrics.advance_width;
                }
            }
        }
    }
}

fn mono(size: TextSize) -> &'static MonoFont<'static> {
    match size {
        TextSize::Small => SMALL,
        TextSize::Large => LARGE,
    }
}

fn pick(size: TextSize, small: f32, large: f32) -> f32 {
    match size {
        TextSize::Small => small,
        TextSize::Large => large,
    }
}

/// Position and size of a number in the country column
///
/// A number that would run off the frame drops to the small size, and is
/// right aligned if it still does not fit.
pub fn country_placement(fonts: &Fonts, content: &str, size: TextSize) -> (i32, TextSize) {
    let room = FRAME_WIDTH as i32 - COUNTRY_X;
    let size = if fonts.width(content, size) > room {
        TextSize::Small
    } else {
        size
    };
    let x = COUNTRY_X.min(FRAME_WIDTH as i32 - fonts.width(content, size));
    (x, size)
}

fn country_text(frame: &mut FrameBuffer, fonts: &Fonts, content: &str, y: i32, size: TextSize) {
    let (x, size) = country_placement(fonts, content, size);
    fonts.draw(frame, content, x, y, size);
}

/// Lays out one refresh worth of numbers
pub fn render_panel(
    stats: &CaseStats,
    refreshed_at: &DateTime<FixedOffset>,
    fonts: &Fonts,
) -> FrameBuffer {
    use TextSize::{Large, Small};

    let mut frame = FrameBuffer::filled(FRAME_WIDTH, FRAME_HEIGHT, WHITE_RGBA);

    for y in SEPARATORS {
        let _ = Rectangle::new(Point::new(0, y), Size::new(FRAME_WIDTH, 1))
            .into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK))
            .draw(&mut frame);
    }

    fonts.draw(&mut frame, &stats.last_updated, LABEL_X, UPDATED_Y, Small);

    fonts.draw(&mut frame, "cases:", LABEL_X, CASES_Y, Small);
    fonts.draw(&mut frame, &stats.cases.to_string(), WORLD_X, CASES_Y, Large);
    let country = &stats.country;
    country_text(&mut frame, fonts, &country.cases.to_string(), CASES_Y, Large);

    let rows = [
        ("recovered:", stats.recovered, country.recovered, RECOVERED_Y),
        ("deaths:", stats.deaths, country.deaths, DEATHS_Y),
    ];
    for (label, world, local, y) in rows {
        fonts.draw(&mut frame, label, LABEL_X, y, Small);
        fonts.draw(&mut frame, &world.to_string(), WORLD_X, y, Small);
        country_text(&mut frame, fonts, &local.to_string(), y, Small);
    }

    let new_cases = format!("(+{})", country.new_cases);
    country_text(&mut frame, fonts, &new_cases, NEW_CASES_Y, Small);

    let refreshed = format!(
        "Last refreshed: {}",
        refreshed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    fonts.draw(&mut frame, &refreshed, LABEL_X, REFRESHED_Y, Small);

    frame
}

/// Writes the frame as an RGBA PNG
pub fn save_png<P: AsRef<Path>>(frame: &FrameBuffer, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create snapshot {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), frame.width(), frame.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(frame.data())?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::epd2in13bc::GEOMETRY;
    use crate::packer::pack;
    use crate::stats::CountryStats;

    fn sample() -> CaseStats {
        CaseStats {
            last_updated: "Last updated: April 02, 2020, 11:45 GMT".to_string(),
            cases: 952_171,
            deaths: 48_320,
            recovered: 202_966,
            country: CountryStats {
                name: "Czechia".to_string(),
                cases: 3_508,
                new_cases: 178,
                deaths: 44,
                recovered: 61,
            },
        }
    }

    fn refreshed() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2020-04-02T13:50:00+02:00").unwrap()
    }

    fn render(stats: &CaseStats) -> FrameBuffer {
        render_panel(stats, &refreshed(), &Fonts::Mono)
    }

    // shipped with the DejaVu fonts package on most systems
    const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

    fn has_black(frame: &FrameBuffer, x: std::ops::Range<u32>, y: std::ops::Range<u32>) -> bool {
        y.clone().any(|y| {
            x.clone()
                .any(|x| frame.pixel(x, y).map(Color::from_rgba) == Some(Color::Black))
        })
    }

    #[test]
    fn landscape_frame() {
        let frame = render(&sample());
        assert_eq!((frame.width(), frame.height()), (212, 104));
    }

    #[test]
    fn separator_lines() {
        let frame = render(&sample());
        for x in [0, 100, 211] {
            assert_eq!(frame.pixel(x, 8), Some(BLACK_RGBA));
            assert_eq!(frame.pixel(x, 95), Some(BLACK_RGBA));
        }
        // right edge between the columns stays blank
        assert_eq!(frame.pixel(211, 50), Some(WHITE_RGBA));
    }

    #[test]
    fn text_lands_in_its_columns() {
        let frame = render(&sample());
        // last updated, above the first line
        assert!(has_black(&frame, 1..100, 0..8));
        // large world and country cases
        assert!(has_black(&frame, 60..120, 26..41));
        assert!(has_black(&frame, 150..190, 26..41));
        // new cases
        assert!(has_black(&frame, 150..180, 71..80));
        // refreshed line under the second separator
        assert!(has_black(&frame, 1..200, 96..104));
    }

    #[test]
    fn long_country_numbers_stay_on_the_frame() {
        let fonts = Fonts::Mono;
        assert_eq!(
            country_placement(&fonts, "3508", TextSize::Large),
            (150, TextSize::Large)
        );
        // 9px per digit runs past 212 from the seventh digit on
        assert_eq!(
            country_placement(&fonts, "1234567", TextSize::Large),
            (150, TextSize::Small)
        );
        // 13 digits of 5px are right aligned
        assert_eq!(
            country_placement(&fonts, "1234567890123", TextSize::Small),
            (147, TextSize::Small)
        );

        let mut stats = sample();
        stats.country.cases = 1_234_567;
        let frame = render(&stats);
        // nothing in the upper part of the large cell, the digits are small
        assert!(!has_black(&frame, 150..212, 26..34));
        assert!(has_black(&frame, 150..212, 34..42));
    }

    #[test]
    fn missing_font_falls_back_to_mono() {
        let section = RenderSection {
            font: Some("/nonexistent/m3x6.ttf".into()),
            ..RenderSection::default()
        };
        assert!(matches!(Fonts::from_config(&section), Fonts::Mono));
        assert!(matches!(
            Fonts::from_config(&RenderSection::default()),
            Fonts::Mono
        ));

        // not a font at all
        let path = std::env::temp_dir().join(format!("epd-stats-{}.ttf", std::process::id()));
        std::fs::write(&path, b"not a font").unwrap();
        let loaded = Fonts::load(&path, 16.0, 32.0);
        std::fs::remove_file(&path).unwrap();
        assert!(loaded.is_err());
    }

    #[test]
    fn truetype_text_is_rasterized() {
        if !Path::new(SYSTEM_FONT).exists() {
            return;
        }
        let fonts = Fonts::load(SYSTEM_FONT, 16.0, 32.0).unwrap();
        assert!(fonts.width("cases:", TextSize::Large) > fonts.width("cases:", TextSize::Small));

        let mut frame = FrameBuffer::filled(FRAME_WIDTH, FRAME_HEIGHT, WHITE_RGBA);
        fonts.draw(&mut frame, "88", 10, 40, TextSize::Small);
        // glyphs sit on the baseline
        assert!(has_black(&frame, 10..40, 25..41));
        assert!(!has_black(&frame, 0..212, 41..104));

        let frame = render_panel(&sample(), &refreshed(), &fonts);
        assert!(has_black(&frame, 60..212, 10..41));
        assert_ne!(frame, render(&sample()));
    }

    #[test]
    fn frame_packs_for_the_panel() {
        let frame = render(&sample());
        let packed = pack(&frame, GEOMETRY).unwrap();
        assert_eq!(packed.len(), 2756);
        assert!(packed.as_bytes().iter().any(|b| *b != 0xFF));
    }

    #[test]
    fn snapshot_is_written() {
        let frame = render(&sample());
        let path = std::env::temp_dir().join(format!("epd-stats-{}.png", std::process::id()));
        save_png(&frame, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
