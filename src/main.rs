use chromepdf_config::Config;
use chromepdf_render::error::{ErrorKind, Result as RenderResult};
use chromepdf_render::{Generator, Options, Output, Pdf};
use clap::Parser;
use exn::ResultExt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Render HTML to PDF with headless Chrome/Chromium.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// HTML file to render, or `-` to read HTML from stdin.
    input: PathBuf,
    /// Where to write the PDF. Defaults to a generated name in the temp directory.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Extra Chrome flag for this render, as `name` or `name=value`. Repeatable.
    #[arg(short = 'O', long = "option", value_name = "NAME[=VALUE]")]
    options: Vec<String>,
    /// Chrome executable. Discovered on the system when not configured.
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,
    /// Directory for staging and auto-named output files.
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,
    /// Kill Chrome if it runs for longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}
impl Cli {
    fn render_options(&self) -> Options {
        self.options.iter().map(|option| parse_option(option)).collect()
    }
}

/// `name=value` sets a value; a bare `name` (or `name=`) is a valueless flag.
/// Leading dashes are tolerated so `--option=--lang=en` reads naturally.
fn parse_option(option: &str) -> (&str, Option<&str>) {
    let option = option.trim_start_matches('-');
    match option.split_once('=') {
        Some((name, value)) => (name, Some(value).filter(|v| !v.is_empty())),
        None => (option, None),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn generator(cli: &Cli, config: &Config) -> RenderResult<Generator> {
    let generator = match cli.chrome.as_ref().or(config.chrome.binary.as_ref()) {
        Some(binary) => Generator::new(binary),
        None => Generator::discover()?,
    };
    let mut generator = generator.with_options(&config.chrome.options().collect::<Options>());
    if let Some(temp_dir) = cli.temp_dir.as_ref().or(config.chrome.temp_dir.as_ref()) {
        generator = generator.with_temp_dir(temp_dir);
    }
    if let Some(timeout) = cli.timeout.map(Duration::from_secs).or(config.chrome.timeout()) {
        generator = generator.with_timeout(timeout);
    }
    tracing::debug!(
        binary = %generator.binary().display(),
        temp_dir = %generator.temp_dir().display(),
        timeout = ?generator.timeout(),
        "Generator configured"
    );
    Ok(generator)
}

fn render(cli: &Cli, generator: Generator) -> RenderResult<Output> {
    let temp_dir = generator.temp_dir().to_path_buf();
    let pdf = Pdf::new(generator).with_temp_dir(temp_dir);
    let options = cli.render_options();
    let target = cli.output.as_deref();
    if cli.input == Path::new("-") {
        let mut content = Vec::new();
        std::io::stdin().read_to_end(&mut content).or_raise(|| ErrorKind::Io(PathBuf::from("<stdin>")))?;
        tracing::debug!(bytes = content.len(), "Read HTML from stdin");
        return pdf.generate_from_content(content, target, &options);
    }
    pdf.generate(&cli.input, target, &options)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:?}");
            return ExitCode::FAILURE;
        },
    };
    match generator(&cli, &config).and_then(|generator| render(&cli, generator)) {
        Ok(output) => {
            println!("{}", output.path().display());
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("{e:?}");
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("headless", ("headless", None))]
    #[case("headless=", ("headless", None))]
    #[case("--headless=new", ("headless", Some("new")))]
    #[case("window-size=1280,720", ("window-size", Some("1280,720")))]
    #[case("user-agent=a=b", ("user-agent", Some("a=b")))]
    fn test_parse_option(#[case] input: &str, #[case] expected: (&str, Option<&str>)) {
        assert_eq!(parse_option(input), expected);
    }

    #[test]
    fn test_cli_options_keep_order() {
        let cli = Cli::parse_from(["chromepdf", "-O", "landscape", "--option", "lang=en", "-O", "landscape=false", "in.html"]);
        assert_eq!(cli.render_options().to_args(), ["--landscape=false", "--lang=en"]);
        assert_eq!(cli.input, PathBuf::from("in.html"));
    }

    #[test]
    fn test_generator_prefers_cli_over_config() {
        let cli = Cli::parse_from(["chromepdf", "--chrome", "/cli/chrome", "--timeout", "7", "in.html"]);
        let mut config = Config::default();
        config.chrome.binary = Some(PathBuf::from("/config/chrome"));
        config.chrome.temp_dir = Some(PathBuf::from("/config/tmp"));
        config.chrome.timeout = Some(60);
        config.chrome.options.insert("lang".to_string(), "en".to_string());

        let generator = generator(&cli, &config).unwrap();
        assert_eq!(generator.binary(), Path::new("/cli/chrome"));
        assert_eq!(generator.temp_dir(), Path::new("/config/tmp"));
        assert_eq!(generator.timeout(), Some(Duration::from_secs(7)));
        assert_eq!(generator.options().get("lang"), Some(Some("en")));
        assert_eq!(generator.options().get("headless"), Some(None));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
