#![deny(
    rust_2018_idioms,
    unreachable_pub,
    unsafe_code,
    unused_imports,
    unused_mut,
    missing_debug_implementations
)]

use anyhow::Context;
use colored::*;
use embex::{
    scheme::{self, Scheme},
    CancelToken, Event, ExtractionJob, JobReport, JobState,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

const EXIT_FAILED: i32 = 1;
const EXIT_CANCELLED: i32 = 130;

#[derive(StructOpt, Debug)]
#[structopt()]
struct Opt {
    /// Directories holding the containers to extract from
    #[structopt(
        name = "INPUT_DIRS",
        parse(from_os_str),
        required_unless = "list"
    )]
    input_dirs: Vec<PathBuf>,

    /// JSON file describing the container schemes
    #[structopt(
        short = "s",
        long = "schemes",
        parse(from_os_str),
        default_value = "schemes.json"
    )]
    schemes: PathBuf,

    /// Scheme to extract with, required when the file defines more than one
    #[structopt(short = "n", long = "scheme")]
    scheme: Option<String>,

    /// Walk input directories recursively
    #[structopt(short, long)]
    recursive: bool,

    /// Print configured schemes and exit
    #[structopt(short, long)]
    list: bool,
}

fn main() {
    env_logger::init();
    let opt = Opt::from_args();

    let code = match run(&opt) {
        Ok(code) => code,
        Err(err) => {
            log::error!("Error while extracting: {:#}", err);
            eprintln!("{}", format!("{:#}", err).red());
            EXIT_FAILED
        }
    };
    std::process::exit(code);
}

fn run(opt: &Opt) -> anyhow::Result<i32> {
    let schemes = scheme::load(&opt.schemes)?;
    if opt.list {
        print_schemes(&schemes);
        return Ok(0);
    }
    let scheme = select_scheme(&schemes, opt.scheme.as_deref())?;
    log::debug!("Scheme {:?}", scheme);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("Could not install Ctrl-C handler")?;

    let progress_bar = init_progressbar(&scheme.name);
    let reports = opt
        .input_dirs
        .par_iter()
        .map(|dir| {
            let mut job = ExtractionJob::new(dir, scheme.clone());
            if opt.recursive {
                job = job.recursive(true);
            }
            let report = job.run(&cancel, &|event: Event| {
                report_event(&progress_bar, dir, event)
            });
            (dir, report)
        })
        .collect::<Vec<_>>();
    progress_bar.finish_and_clear();

    for (dir, report) in reports.iter() {
        print_summary(dir, report);
    }
    Ok(exit_code(reports.iter().map(|(_, report)| &report.state)))
}

fn select_scheme<'a>(
    schemes: &'a [Scheme],
    name: Option<&str>,
) -> anyhow::Result<&'a Scheme> {
    match (name, schemes) {
        (Some(name), _) => Ok(scheme::find(schemes, name)?),
        (None, [only]) => Ok(only),
        (None, []) => anyhow::bail!("Scheme file defines no schemes"),
        (None, _) => anyhow::bail!(
            "Scheme file defines {} schemes, pick one with --scheme",
            schemes.len()
        ),
    }
}

fn exit_code<'a>(states: impl Iterator<Item = &'a JobState>) -> i32 {
    states.fold(0, |code, state| match state {
        JobState::Failed(_) => EXIT_FAILED,
        JobState::Cancelled if code == 0 => EXIT_CANCELLED,
        _ => code,
    })
}

fn print_schemes(schemes: &[Scheme]) {
    for scheme in schemes {
        println!(
            " {}: [{}] {}",
            scheme.name.bold(),
            scheme.extensions.join(", "),
            scheme.model
        );
    }
}

fn init_progressbar(prefix: &str) -> ProgressBar {
    let progress_bar = ProgressBar::new_spinner().with_style(
        ProgressStyle::default_spinner()
            .template(" {spinner} {prefix} {wide_msg}"),
    );
    progress_bar.set_prefix(prefix);
    progress_bar.enable_steady_tick(100);
    progress_bar
}

fn report_event(progress_bar: &ProgressBar, dir: &Path, event: Event) {
    match event {
        Event::Started(msg) | Event::Progress(msg) => {
            progress_bar.set_message(&msg)
        }
        Event::Error(msg) => progress_bar.println(format!("{}", msg.yellow())),
        Event::Completed { extracted } => progress_bar.println(format!(
            "{:?}: {}",
            dir,
            format!("extracted {} files", extracted).green()
        )),
        Event::Failed(msg) => {
            progress_bar.println(format!("{:?}: {}", dir, msg.red()))
        }
        Event::Cancelled => progress_bar
            .println(format!("{:?}: {}", dir, "cancelled".yellow())),
    }
}

fn print_summary(dir: &Path, report: &JobReport) {
    let failures = report
        .containers
        .iter()
        .map(|container| {
            container.failures.len() + container.error.iter().count()
        })
        .sum::<usize>();
    let state = match &report.state {
        JobState::Completed => "completed".green(),
        JobState::Cancelled => "cancelled".yellow(),
        JobState::Failed(_) => "failed".red(),
        JobState::Pending | JobState::Running => "unfinished".normal(),
    };
    println!(
        "{:?}: {} ({} containers, {} sub-files, {} errors)",
        dir,
        state,
        report.containers.len(),
        report.extracted,
        failures
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_prefers_failure_over_cancel() {
        let states = [JobState::Completed, JobState::Cancelled];
        assert_eq!(exit_code(states.iter()), EXIT_CANCELLED);
        let states = [
            JobState::Cancelled,
            JobState::Failed(String::new()),
            JobState::Completed,
        ];
        assert_eq!(exit_code(states.iter()), EXIT_FAILED);
        assert_eq!(exit_code([JobState::Completed].iter()), 0);
    }

    #[test]
    fn single_scheme_is_selected_implicitly() {
        let schemes = scheme::parse(
            r#"{"schemes": [{"name": "a", "extensions": ["x"],
                "model": {"type": "offset_table", "table_start": 0,
                          "extension": "bin"}}]}"#,
        )
        .unwrap();
        assert_eq!(select_scheme(&schemes, None).unwrap().name, "a");
        assert!(select_scheme(&schemes, Some("b")).is_err());
        assert!(select_scheme(&[], None).is_err());
    }
}
