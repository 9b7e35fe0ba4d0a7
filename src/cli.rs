//! Command line surface of the `webcapture` binary

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::request::{parse_dimension, parse_percent};
use crate::{CaptureOptions, CaptureRequest, Error, Result};

/// Render a web page to an image
///
/// Numeric options are parsed leniently: anything that is not an integer
/// counts as 0. Zoom and scale never go below 10%.
#[derive(Parser, Debug, Clone)]
#[command(name = "webcapture", version, disable_help_flag = true, allow_negative_numbers = true)]
pub struct Cli {
    /// Print help
    #[arg(short = '?', long = "help", action = ArgAction::Help)]
    help: Option<bool>,

    /// Zoom factor in percent
    #[arg(short = 'z', long = "zoom-factor", value_name = "PERCENT", default_value = "100")]
    pub zoom: String,

    /// Scale factor of the saved image in percent
    #[arg(short = 's', long = "scale-factor", value_name = "PERCENT", default_value = "100")]
    pub scale: String,

    /// Output file, format follows the extension
    #[arg(short = 'o', long = "output", value_name = "FILE", default_value = "image.png")]
    pub output: PathBuf,

    /// Viewport and image width (0 = page width)
    #[arg(short = 'w', long = "width", value_name = "PIXELS", default_value = "0")]
    pub width: String,

    /// Viewport and image height (0 = page height)
    #[arg(short = 'h', long = "height", value_name = "PIXELS", default_value = "0")]
    pub height: String,

    /// Seconds to wait after loading before taking the picture
    #[arg(short = 'p', long = "pause", value_name = "SECONDS", default_value = "0")]
    pub pause: String,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// User agent sent with page requests
    #[arg(long = "user-agent", value_name = "STRING")]
    pub user_agent: Option<String>,

    /// URL or local file to capture
    pub url: Option<String>,
}

impl Cli {
    pub fn options(&self) -> CaptureOptions {
        CaptureOptions {
            zoom_percent: parse_percent(&self.zoom),
            scale_percent: parse_percent(&self.scale),
            output: self.output.clone(),
            width: parse_dimension(&self.width),
            height: parse_dimension(&self.height),
            pause_secs: parse_dimension(&self.pause) as u64,
        }
    }

    /// Turn parsed arguments into a capture request.
    ///
    /// Fails with [`Error::UsageError`] when no URL was given.
    pub fn to_request(&self) -> Result<CaptureRequest> {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(CaptureRequest::new(url, self.options())),
            _ => Err(Error::UsageError("missing URL".into())),
        }
    }

    /// Log level filter for the `-v` count
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use std::path::Path;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("webcapture").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&["example.com"]);
        assert_eq!(cli.options(), CaptureOptions::default());
        assert_eq!(cli.log_level(), log::LevelFilter::Warn);
    }

    #[test]
    fn short_and_long_flags() {
        let cli = parse(&[
            "-z", "150", "--scale-factor", "50", "-o", "out.jpg", "-w", "800", "-h", "600", "-p", "2",
            "page.html",
        ]);
        let opts = cli.options();
        assert_eq!(opts.zoom_percent, 150);
        assert_eq!(opts.scale_percent, 50);
        assert_eq!(opts.output, PathBuf::from("out.jpg"));
        assert_eq!((opts.width, opts.height), (800, 600));
        assert_eq!(opts.pause_secs, 2);

        let request = cli.to_request().unwrap();
        assert_eq!(request.output_path(), Path::new("out.jpg"));
        assert_eq!(request.pause_millis(), 2000);
    }

    #[test]
    fn malformed_numbers_are_lenient() {
        let cli = parse(&["-z", "abc", "-s", "5", "-w", "-20", "-p", "soon", "x"]);
        let opts = cli.options();
        assert_eq!(opts.zoom_percent, 10);
        assert_eq!(opts.scale_percent, 10);
        assert_eq!(opts.width, 0);
        assert_eq!(opts.pause_secs, 0);
    }

    #[test]
    fn missing_url_is_a_usage_error() {
        let cli = parse(&["-z", "200"]);
        assert!(matches!(cli.to_request(), Err(Error::UsageError(_))));
    }

    #[test]
    fn help_and_version() {
        let err = Cli::try_parse_from(["webcapture", "-?"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        let err = Cli::try_parse_from(["webcapture", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        let err = Cli::try_parse_from(["webcapture", "-V"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["webcapture", "--frobnicate", "x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn verbosity_counts() {
        assert_eq!(parse(&["-vv", "x"]).log_level(), log::LevelFilter::Debug);
        assert_eq!(parse(&["-v", "-v", "-v", "-v", "x"]).log_level(), log::LevelFilter::Trace);
    }
}
