//! Case numbers scraped from the statistics page.

use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while fetching or reading the page.
#[derive(Error, Debug)]
pub enum StatsError {
    /// The request itself failed or returned an error status.
    #[error("request failed")]
    Http(#[from] Box<ureq::Error>),

    /// Reading the body failed.
    #[error("failed to read response body")]
    Io(#[from] std::io::Error),

    /// The server answered with something other than a web page.
    #[error("unexpected content type {0:?}")]
    UnexpectedContentType(String),

    /// The page carries no main counters, most likely a changed layout.
    #[error("main counters not found on the page")]
    MissingCounters,

    /// A CSS selector did not compile.
    #[error("invalid selector {0:?}")]
    InvalidSelector(&'static str),
}

/// Numbers of a single country, taken from the country table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryStats {
    pub name: String,
    pub cases: u64,
    /// Cases reported today
    pub new_cases: u64,
    pub deaths: u64,
    pub recovered: u64,
}

/// Everything shown on the panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseStats {
    /// Free text next to the update label, e.g. "Last updated: ..."
    pub last_updated: String,
    pub cases: u64,
    pub deaths: u64,
    pub recovered: u64,
    /// All zero when the country is not in the table
    pub country: CountryStats,
}

/// Something that yields fresh numbers.
pub trait StatsSource {
    fn fetch(&mut self) -> Result<CaseStats, StatsError>;
}

/// Blocking HTTP client for the statistics page.
pub struct StatsClient {
    agent: ureq::Agent,
    url: String,
    country: String,
}

impl StatsClient {
    /// Creates a client; every request is bounded by `timeout`.
    pub fn new(url: impl Into<String>, country: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            url: url.into(),
            country: country.into(),
        }
    }

    /// Downloads the page body, rejecting anything that is not HTML.
    pub fn download(&self) -> Result<String, StatsError> {
        debug!("GET {}", self.url);
        let response = self.agent.get(&self.url).call().map_err(Box::new)?;
        let content_type = response.content_type();
        if !content_type.starts_with("text/html") {
            return Err(StatsError::UnexpectedContentType(content_type.to_string()));
        }
        Ok(response.into_string()?)
    }
}

impl StatsSource for StatsClient {
    fn fetch(&mut self) -> Result<CaseStats, StatsError> {
        let body = self.download()?;
        let stats = parse_stats(&body, &self.country)?;
        info!(
            "{}: {} cases, {} deaths, {} recovered",
            stats.last_updated, stats.cases, stats.deaths, stats.recovered
        );
        Ok(stats)
    }
}

fn selector(css: &'static str) -> Result<Selector, StatsError> {
    Selector::parse(css).map_err(|_| StatsError::InvalidSelector(css))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parses a counter, `"1,234,567"` or `"+89"`. Anything unreadable counts as 0.
pub fn to_number(text: &str) -> u64 {
    let digits: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '+')
        .collect();
    digits.parse().unwrap_or(0)
}

/// Extracts the world totals and one country row from the page.
pub fn parse_stats(html: &str, country: &str) -> Result<CaseStats, StatsError> {
    let document = Html::parse_document(html);

    let label = selector(".label-counter")?;
    let last_updated = document
        .select(&label)
        .next()
        .and_then(|label| label.next_siblings().find_map(ElementRef::wrap))
        .map(text_of)
        .unwrap_or_default();

    let counters = selector("#maincounter-wrap .maincounter-number span")?;
    let totals: Vec<u64> = document
        .select(&counters)
        .map(|span| to_number(&text_of(span)))
        .collect();
    if totals.is_empty() {
        return Err(StatsError::MissingCounters);
    }
    let total = |i: usize| totals.get(i).copied().unwrap_or(0);

    let rows = selector("#main_table_countries tbody tr")?;
    let cells = selector("td")?;
    let mut row_stats = CountryStats {
        name: country.to_string(),
        ..CountryStats::default()
    };
    let row = document.select(&rows).find(|row| {
        row.select(&cells)
            .next()
            .is_some_and(|first| text_of(first) == country)
    });
    match row {
        Some(row) => {
            for (i, cell) in row.select(&cells).enumerate() {
                let value = to_number(&text_of(cell));
                match i {
                    1 => row_stats.cases = value,
                    2 => row_stats.new_cases = value,
                    3 => row_stats.deaths = value,
                    5 => row_stats.recovered = value,
                    _ => {}
                }
            }
        }
        None => debug!("{country} not found in the country table"),
    }

    Ok(CaseStats {
        last_updated,
        cases: total(0),
        deaths: total(1),
        recovered: total(2),
        country: row_stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <div class="content-inner">
    <div class="label-counter" id="page-top">Coronavirus Cases:</div>
    <div style="font-size:13px; color:#999;">Last updated: April 02, 2020, 11:45 GMT</div>
    <div id="maincounter-wrap">
      <h1>Coronavirus Cases:</h1>
      <div class="maincounter-number"><span style="color:#aaa">952,171 </span></div>
    </div>
    <div id="maincounter-wrap">
      <h1>Deaths:</h1>
      <div class="maincounter-number"><span>48,320</span></div>
    </div>
    <div id="maincounter-wrap">
      <h1>Recovered:</h1>
      <div class="maincounter-number" style="color:#8ACA2B "><span>202,966</span></div>
    </div>
  </div>
  <table id="main_table_countries">
    <thead><tr><th>Country</th><th>Total</th></tr></thead>
    <tbody>
      <tr><td>USA</td><td>216,722</td><td>+3,135</td><td>5,137</td><td>+20</td><td>8,878</td></tr>
      <tr><td> Czechia </td><td>3,508</td><td>+178</td><td>44</td><td>+5</td><td>61</td></tr>
      <tr><td>Slovakia</td><td>400</td><td></td><td>1</td><td></td><td>7</td></tr>
    </tbody>
  </table>
</body></html>
"#;

    #[test]
    fn numbers() {
        assert_eq!(to_number("1,234,567"), 1_234_567);
        assert_eq!(to_number(" +178 "), 178);
        assert_eq!(to_number(""), 0);
        assert_eq!(to_number("N/A"), 0);
    }

    #[test]
    fn world_totals_in_page_order() {
        let stats = parse_stats(PAGE, "Czechia").unwrap();
        assert_eq!(stats.last_updated, "Last updated: April 02, 2020, 11:45 GMT");
        assert_eq!(stats.cases, 952_171);
        assert_eq!(stats.deaths, 48_320);
        assert_eq!(stats.recovered, 202_966);
    }

    #[test]
    fn country_row() {
        let stats = parse_stats(PAGE, "Czechia").unwrap();
        assert_eq!(
            stats.country,
            CountryStats {
                name: "Czechia".to_string(),
                cases: 3_508,
                new_cases: 178,
                deaths: 44,
                recovered: 61,
            }
        );

        let stats = parse_stats(PAGE, "Slovakia").unwrap();
        assert_eq!(stats.country.cases, 400);
        assert_eq!(stats.country.new_cases, 0);
        assert_eq!(stats.country.recovered, 7);
    }

    #[test]
    fn unknown_country_is_zero() {
        let stats = parse_stats(PAGE, "Atlantis").unwrap();
        assert_eq!(stats.country.name, "Atlantis");
        assert_eq!(stats.country.cases, 0);
        assert_eq!(stats.cases, 952_171);
    }

    #[test]
    fn page_without_counters() {
        let result = parse_stats("<html><body><p>maintenance</p></body></html>", "Czechia");
        assert!(matches!(result, Err(StatsError::MissingCounters)));
    }
}
