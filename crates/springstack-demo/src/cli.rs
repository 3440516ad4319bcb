#![forbid(unsafe_code)]

use clap::Parser;
use springstack::{BuildError, MissingCardPolicy, TimingMode};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::session::{self, SessionOptions, Step};

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("cannot build the stack: {0}")]
    Build(#[from] BuildError),
    #[error("cannot encode steps: {0}")]
    Json(#[from] serde_json::Error),
}

impl DemoError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Build(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "springstack-demo",
    about = "Walk the sample library through a headless Springstack",
    version
)]
pub struct Cli {
    /// normal, reduced, off, gratuitous (or exaggerated), slow.
    #[arg(long, default_value = "normal")]
    pub timing: TimingMode,

    /// Address the session starts at, e.g. a deep link.
    #[arg(long, default_value = "/")]
    pub url: String,

    /// Keep the route in the fragment.
    #[arg(long)]
    pub hash: bool,

    #[arg(long)]
    pub base_path: Option<String>,

    /// abort, push or wait.
    #[arg(long, default_value = "abort")]
    pub missing_card: MissingCardPolicy,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Print the steps as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            timing: self.timing,
            url: self.url.clone(),
            use_hash: self.hash,
            base_path: self.base_path.clone(),
            missing_card: self.missing_card,
            fps: self.fps,
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "springstack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub fn run_from_env() -> Result<(), DemoError> {
    init_tracing();
    let cli = Cli::parse();
    run(&cli)
}

/// Run the session and print it to stdout.
pub fn run(cli: &Cli) -> Result<(), DemoError> {
    let steps = session::run(&cli.session_options())?;
    println!("{}", render(&steps, cli.json)?);
    Ok(())
}

fn render(steps: &[Step], json: bool) -> Result<String, DemoError> {
    if json {
        return Ok(serde_json::to_string_pretty(steps)?);
    }
    let mut out = String::new();
    for step in steps {
        let marker = if step.settled { "" } else { " (unsettled)" };
        out.push_str(&format!(
            "{} -> {}  [{} frames]{marker}\n",
            step.label, step.location, step.frames
        ));
        for (depth, crumb) in step.trail.iter().enumerate() {
            out.push_str(&format!("  {}{crumb}\n", "  ".repeat(depth)));
        }
    }
    Ok(out.trim_end().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_session_options() {
        let cli = Cli::try_parse_from([
            "springstack-demo",
            "--timing",
            "exaggerated",
            "--hash",
            "--missing-card",
            "push",
            "--fps",
            "30",
        ])
        .unwrap();
        let options = cli.session_options();
        assert_eq!(options.timing, TimingMode::Gratuitous);
        assert!(options.use_hash);
        assert_eq!(options.missing_card, MissingCardPolicy::Push);
        assert_eq!(options.fps, 30);
        assert_eq!(options.url, "/");
    }

    #[test]
    fn unknown_timing_is_rejected() {
        assert!(Cli::try_parse_from(["springstack-demo", "--timing", "warp"]).is_err());
    }

    #[test]
    fn text_output_indents_the_trail() {
        let steps = vec![Step {
            label: "mount".to_owned(),
            trail: vec!["[book-open] Library".to_owned(), "[folder] Media".to_owned()],
            location: "/corpus/media--c-media".to_owned(),
            frames: 4,
            settled: true,
        }];
        let text = render(&steps, false).unwrap();
        assert_eq!(
            text,
            "mount -> /corpus/media--c-media  [4 frames]\n  [book-open] Library\n    [folder] Media"
        );
        assert!(render(&steps, true).unwrap().contains("\"label\": \"mount\""));
    }
}
