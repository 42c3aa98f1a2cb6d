use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use clap::Parser;
use influx_writer::BatchConfig;
use influx_writer::HttpConfig;
use influx_writer::APPLICATION_TAG;
use utils::version;

use crate::handlers::HandlerSettings;

/// Path meaning "read events from stdin"
pub const STDIN: &str = "-";

#[derive(Parser, Debug, Clone)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[arg(
        long,
        env = "JFR_EXPORTER_INPUT",
        value_hint = clap::ValueHint::FilePath,
        default_value = STDIN,
        help = "File with one JSON encoded flight recorder event per line, '-' reads stdin"
    )]
    pub input: PathBuf,

    #[arg(
        long,
        env = "INFLUX_URL",
        help = "InfluxDB base url, e.g. http://localhost:8086. Points are only logged when unset"
    )]
    pub influx_url: Option<String>,

    #[arg(
        long,
        env = "INFLUX_DATABASE",
        default_value = "jfr",
        help = "InfluxDB database to write to"
    )]
    pub influx_database: String,

    #[arg(long, env = "INFLUX_USER", help = "InfluxDB user")]
    pub influx_user: Option<String>,

    #[arg(long, env = "INFLUX_PASSWORD", help = "InfluxDB password")]
    pub influx_password: Option<String>,

    #[arg(
        long = "tag",
        value_name = "NAME/VALUE",
        value_parser = parse_tag,
        help = "Tag added to every point, may be repeated, e.g. --tag env/prod"
    )]
    pub tags: Vec<(String, String)>,

    #[arg(
        long,
        env = "JFR_EXPORTER_APPLICATION",
        help = "Deprecated, use --tag application/<name>"
    )]
    pub application: Option<String>,

    #[arg(
        long,
        default_value_t = 256_000,
        help = "Report allocations outside TLAB larger than this many bytes"
    )]
    pub big_object_threshold: i64,

    #[arg(
        long,
        default_value_t = 48_000_000,
        help = "Report allocation samples with a weight above this many bytes"
    )]
    pub big_object_sample_weight_threshold: i64,

    #[arg(long, help = "Only keep the first three frames of stack traces")]
    pub disable_stack_traces: bool,

    #[arg(
        long,
        default_value_t = 1000,
        help = "Send a batch once more than this many lines are buffered"
    )]
    pub max_batch_size: usize,

    #[arg(
        long,
        default_value_t = 5000,
        help = "Send a batch at the latest this many milliseconds after the previous one"
    )]
    pub max_batch_age_ms: u64,

    #[arg(long, default_value_t = 120, help = "Timeout of one InfluxDB request")]
    pub request_timeout_secs: u64,

    #[arg(
        long,
        value_parser = parse_iso_duration,
        help = "Stop after this ISO-8601 duration, e.g. PT30S"
    )]
    pub duration: Option<Duration>,

    #[arg(
        long,
        env = "JFR_EXPORTER_DEBUG",
        help = "Log at debug level unless RUST_LOG says otherwise"
    )]
    pub debug: bool,
}

impl Cli {
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == STDIN
    }

    /// Tags written on every line. `--application` wins over a tag of the same name.
    pub fn origin_tags(&self) -> Vec<(String, String)> {
        let mut tags = self.tags.clone();
        if let Some(application) = &self.application {
            tags.push((APPLICATION_TAG.to_string(), application.clone()));
        }
        tags
    }

    /// InfluxDB settings, `None` when no url was given.
    pub fn http_config(&self) -> Option<HttpConfig> {
        let url = self.influx_url.clone()?;
        Some(HttpConfig {
            url,
            database: self.influx_database.clone(),
            user: self.influx_user.clone(),
            password: self.influx_password.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: format!("jfr-exporter/{}", &*version::VERSION),
            ..HttpConfig::default()
        })
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            max_batch_size: self.max_batch_size,
            max_batch_age: Duration::from_millis(self.max_batch_age_ms),
        }
    }

    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            big_object_threshold: self.big_object_threshold,
            sample_weight_threshold: self.big_object_sample_weight_threshold,
        }
    }

    /// End of the recording when a duration was given.
    pub fn deadline(&self, start: Instant) -> Option<Instant> {
        self.duration.and_then(|duration| start.checked_add(duration))
    }
}

/// Parse a `name/value` tag.
fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split('/').collect::<Vec<_>>().as_slice() {
        [name, value] if !name.trim().is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected a tag as name/value, got `{raw}`")),
    }
}

const DATE_UNITS: &[(char, f64)] = &[('D', 86_400.0)];
const TIME_UNITS: &[(char, f64)] = &[('H', 3_600.0), ('M', 60.0), ('S', 1.0)];

/// Parse an ISO-8601 duration such as `PT30S`, `PT1H30M` or `P1DT12H`.
///
/// Years, months and weeks are rejected since their length is not fixed.
fn parse_iso_duration(raw: &str) -> Result<Duration, String> {
    let invalid = || format!("expected an ISO-8601 duration like PT30S, got `{raw}`");
    let rest = raw
        .trim()
        .to_ascii_uppercase()
        .strip_prefix('P')
        .map(str::to_string)
        .ok_or_else(invalid)?;

    let (date, time) = match rest.split_once('T') {
        Some((date, time)) if !time.is_empty() => (date.to_string(), time.to_string()),
        Some(_) => return Err(invalid()),
        None => (rest.clone(), String::new()),
    };
    if date.is_empty() && time.is_empty() {
        return Err(invalid());
    }

    let mut seconds = 0.0;
    for (part, units) in [(date, DATE_UNITS), (time, TIME_UNITS)] {
        let mut number = String::new();
        let mut next_unit = 0;
        for c in part.chars() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
                continue;
            }
            let position = units[next_unit..]
                .iter()
                .position(|(unit, _)| *unit == c)
                .ok_or_else(invalid)?;
            let (_, factor) = units[next_unit + position];
            let value: f64 = number.parse().map_err(|_| invalid())?;
            seconds += value * factor;
            number.clear();
            next_unit += position + 1;
        }
        if !number.is_empty() {
            return Err(invalid());
        }
    }

    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}
