//! Refresh loop: fetch, render, pack, display, sleep.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, Local};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ScheduleSection};
use crate::packer::{pack, PackError};
use crate::render::{render_panel, save_png, Fonts};
use crate::stats::StatsSource;
use crate::traits::BiColorDisplay;

/// How a single refresh ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// New numbers are on the panel
    Displayed,
    /// No numbers this time, retry soon
    FetchFailed,
    /// The rendered frame did not fit the panel
    Skipped,
    /// The controller failed or timed out, the cycle was abandoned
    DisplayFailed,
}

/// Drives one panel from one source
pub struct App<S> {
    source: S,
    schedule: ScheduleSection,
    snapshot: Option<PathBuf>,
    fonts: Fonts,
}

impl<S: StatsSource> App<S> {
    pub fn new(source: S, config: &Config) -> Self {
        Self {
            source,
            schedule: config.schedule,
            snapshot: config.render.snapshot.clone(),
            fonts: Fonts::from_config(&config.render),
        }
    }

    /// Fetches once and, on success, puts the numbers on the panel.
    ///
    /// Errors are logged, never returned: the loop keeps going no matter
    /// what a single cycle ran into.
    pub fn cycle<D, SPI, DELAY>(&mut self, epd: &mut D, spi: &mut SPI, delay: &mut DELAY) -> Cycle
    where
        D: BiColorDisplay<SPI, DELAY>,
        D::Error: Display,
    {
        let stats = match self.source.fetch() {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Failed to fetch stats: {:#}", anyhow::Error::new(e));
                return Cycle::FetchFailed;
            }
        };

        if let Err(e) = epd.init(spi, delay) {
            error!("Failed to initialize display: {}", e);
            return Cycle::DisplayFailed;
        }

        let now: DateTime<FixedOffset> = Local::now().into();
        let frame = render_panel(&stats, &now, &self.fonts);
        if let Some(path) = &self.snapshot {
            if let Err(e) = save_png(&frame, path) {
                warn!("Failed to write snapshot: {:#}", e);
            }
        }

        let black = match pack(&frame, epd.geometry()) {
            Ok(black) => black,
            Err(e @ PackError::UnsupportedDimensions { .. }) => {
                error!("Skipping refresh: {}", e);
                return Cycle::Skipped;
            }
        };

        if let Err(e) = epd.display_black(spi, delay, black.as_bytes()) {
            error!("Failed to display frame: {}", e);
            return Cycle::DisplayFailed;
        }
        if let Err(e) = epd.sleep(spi, delay) {
            error!("Failed to put display to sleep: {}", e);
            return Cycle::DisplayFailed;
        }

        info!(
            "Displayed {} cases, {} in {}",
            stats.cases, stats.country.cases, stats.country.name
        );
        Cycle::Displayed
    }

    /// Runs `cycles` refreshes, or forever when `None`.
    ///
    /// `pause` is called between refreshes, never after the last one.
    pub fn run<D, SPI, DELAY, P>(
        &mut self,
        epd: &mut D,
        spi: &mut SPI,
        delay: &mut DELAY,
        cycles: Option<u64>,
        mut pause: P,
    ) -> Cycle
    where
        D: BiColorDisplay<SPI, DELAY>,
        D::Error: Display,
        P: FnMut(Duration),
    {
        let mut n = 0;
        loop {
            let outcome = self.cycle(epd, spi, delay);
            if cycles.is_some_and(|cycles| n + 1 >= cycles) {
                return outcome;
            }
            let wait = match outcome {
                Cycle::FetchFailed => self.schedule.retry(),
                _ => self.schedule.pause_after(n),
            };
            debug!("Next refresh in {:?}", wait);
            pause(wait);
            n += 1;
        }
    }
}

/// Whitens the panel and puts it to sleep
pub fn clear_panel<D, SPI, DELAY>(epd: &mut D, spi: &mut SPI, delay: &mut DELAY) -> Result<()>
where
    D: BiColorDisplay<SPI, DELAY>,
    D::Error: Display,
{
    epd.init(spi, delay)
        .map_err(|e| anyhow!("Failed to initialize display: {}", e))?;
    epd.clear(spi, delay)
        .map_err(|e| anyhow!("Failed to clear display: {}", e))?;
    epd.sleep(spi, delay)
        .map_err(|e| anyhow!("Failed to put display to sleep: {}", e))?;
    info!("Display cleared");
    Ok(())
}

/// Fetches once and writes the rendered frame, no hardware involved
pub fn snapshot<S: StatsSource>(source: &mut S, fonts: &Fonts, path: &Path) -> Result<()> {
    let stats = source.fetch().context("Failed to fetch stats")?;
    let now: DateTime<FixedOffset> = Local::now().into();
    save_png(&render_panel(&stats, &now, fonts), path)?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epd2in13bc::GEOMETRY;
    use crate::geometry::PanelGeometry;
    use crate::stats::{CaseStats, StatsError};
    use std::collections::VecDeque;

    struct Script(VecDeque<Result<CaseStats, StatsError>>);

    impl StatsSource for Script {
        fn fetch(&mut self) -> Result<CaseStats, StatsError> {
            self.0.pop_front().unwrap_or(Err(StatsError::MissingCounters))
        }
    }

    fn good() -> Result<CaseStats, StatsError> {
        Ok(CaseStats {
            cases: 10,
            ..CaseStats::default()
        })
    }

    #[derive(Default)]
    struct FakePanel {
        calls: Vec<&'static str>,
        fail_on: Option<&'static str>,
        geometry: Option<PanelGeometry>,
        frames: Vec<usize>,
    }

    impl FakePanel {
        fn step(&mut self, name: &'static str) -> Result<(), &'static str> {
            self.calls.push(name);
            match self.fail_on {
                Some(fail) if fail == name => Err("timeout"),
                _ => Ok(()),
            }
        }
    }

    impl BiColorDisplay<(), ()> for FakePanel {
        type Error = &'static str;

        fn init(&mut self, _: &mut (), _: &mut ()) -> Result<(), Self::Error> {
            self.step("init")
        }

        fn sleep(&mut self, _: &mut (), _: &mut ()) -> Result<(), Self::Error> {
            self.step("sleep")
        }

        fn wake_up(&mut self, _: &mut (), _: &mut ()) -> Result<(), Self::Error> {
            self.step("wake_up")
        }

        fn geometry(&self) -> PanelGeometry {
            self.geometry.unwrap_or(GEOMETRY)
        }

        fn display_black(
            &mut self,
            _: &mut (),
            _: &mut (),
            black: &[u8],
        ) -> Result<(), Self::Error> {
            self.frames.push(black.len());
            self.step("display_black")
        }

        fn display(
            &mut self,
            _: &mut (),
            _: &mut (),
            _: &[u8],
            _: &[u8],
        ) -> Result<(), Self::Error> {
            self.step("display")
        }

        fn clear(&mut self, _: &mut (), _: &mut ()) -> Result<(), Self::Error> {
            self.step("clear")
        }

        fn is_busy(&mut self) -> bool {
            false
        }
    }

    fn app(script: Vec<Result<CaseStats, StatsError>>) -> App<Script> {
        App::new(Script(script.into()), &Config::default())
    }

    #[test]
    fn displayed_cycle() {
        let mut panel = FakePanel::default();
        let outcome = app(vec![good()]).cycle(&mut panel, &mut (), &mut ());
        assert_eq!(outcome, Cycle::Displayed);
        assert_eq!(panel.calls, ["init", "display_black", "sleep"]);
        assert_eq!(panel.frames, [2756]);
    }

    #[test]
    fn failed_fetch_leaves_panel_alone() {
        let mut panel = FakePanel::default();
        let outcome = app(vec![Err(StatsError::MissingCounters)]).cycle(&mut panel, &mut (), &mut ());
        assert_eq!(outcome, Cycle::FetchFailed);
        assert!(panel.calls.is_empty());
    }

    #[test]
    fn mismatched_panel_is_skipped() {
        let mut panel = FakePanel {
            geometry: Some(PanelGeometry::new(128, 296).unwrap()),
            ..FakePanel::default()
        };
        let outcome = app(vec![good()]).cycle(&mut panel, &mut (), &mut ());
        assert_eq!(outcome, Cycle::Skipped);
        assert_eq!(panel.calls, ["init"]);
    }

    #[test]
    fn display_error_abandons_cycle() {
        let mut panel = FakePanel {
            fail_on: Some("display_black"),
            ..FakePanel::default()
        };
        let outcome = app(vec![good()]).cycle(&mut panel, &mut (), &mut ());
        assert_eq!(outcome, Cycle::DisplayFailed);
        assert_eq!(panel.calls, ["init", "display_black"]);
    }

    #[test]
    fn schedule_between_cycles() {
        let mut panel = FakePanel::default();
        let mut pauses = Vec::new();
        let outcome = app(vec![
            good(),
            Err(StatsError::MissingCounters),
            good(),
            good(),
        ])
        .run(&mut panel, &mut (), &mut (), Some(4), |d| pauses.push(d));
        assert_eq!(outcome, Cycle::Displayed);
        assert_eq!(
            pauses,
            [
                Duration::from_secs(20),
                Duration::from_secs(10),
                Duration::from_secs(300),
            ]
        );
        assert_eq!(panel.frames.len(), 3);
    }

    #[test]
    fn single_cycle_does_not_pause() {
        let mut panel = FakePanel::default();
        let mut pauses = Vec::new();
        app(vec![good()]).run(&mut panel, &mut (), &mut (), Some(1), |d| pauses.push(d));
        assert!(pauses.is_empty());
    }

    #[test]
    fn clear_sequence() {
        let mut panel = FakePanel::default();
        clear_panel(&mut panel, &mut (), &mut ()).unwrap();
        assert_eq!(panel.calls, ["init", "clear", "sleep"]);

        let mut panel = FakePanel {
            fail_on: Some("clear"),
            ..FakePanel::default()
        };
        let err = clear_panel(&mut panel, &mut (), &mut ()).unwrap_err();
        assert_eq!(err.to_string(), "Failed to clear display: timeout");
        assert_eq!(panel.calls, ["init", "clear"]);
    }
}
