//! Cancellable extraction job: walks an input directory, carves every
//! matching container with its scheme's driver and reports through events.

use crate::{
    container::Container,
    driver::Scanned,
    error::EmbexError,
    scheme::Scheme,
    writer,
};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};
use walkdir::WalkDir;

/// Cooperative cancellation flag shared between a job and its owner
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(String),
    /// Emitted per container and per written sub-file
    Progress(String),
    /// Recoverable per-container or per-entry failure
    Error(String),
    Completed { extracted: usize },
    Failed(String),
    Cancelled,
}

pub trait EventSink {
    fn emit(&self, event: Event);
}

impl<F> EventSink for F
where
    F: Fn(Event),
{
    fn emit(&self, event: Event) {
        self(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    /// Position of the entry in the container's scan order
    pub index: usize,
    pub reason: String,
}

/// Outcome of carving one container
#[derive(Debug, Clone, Default)]
pub struct ContainerReport {
    pub container: PathBuf,
    pub written: Vec<PathBuf>,
    pub failures: Vec<EntryFailure>,
    /// Container-level failure, set when nothing could be carved
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub state: JobState,
    pub containers: Vec<ContainerReport>,
    pub extracted: usize,
}

#[derive(Debug, Clone)]
pub struct ExtractionJob {
    input_dir: PathBuf,
    scheme: Scheme,
    recursive: bool,
    state: JobState,
}

impl ExtractionJob {
    pub fn new(input_dir: &Path, scheme: Scheme) -> Self {
        Self {
            input_dir: input_dir.to_path_buf(),
            recursive: scheme.recursive,
            scheme,
            state: JobState::Pending,
        }
    }
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
    pub fn state(&self) -> &JobState {
        &self.state
    }
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Runs the job to a terminal state on the current thread
    pub fn run(
        &mut self,
        cancel: &CancelToken,
        sink: &dyn EventSink,
    ) -> JobReport {
        let mut report = JobReport {
            state: JobState::Pending,
            containers: Vec::new(),
            extracted: 0,
        };
        if self.state.is_terminal() {
            report.state = self.state.clone();
            return report;
        }
        self.state = JobState::Running;
        sink.emit(Event::Started(format!(
            "Extracting {} from {:?}",
            self.scheme.name, self.input_dir
        )));

        let inputs = match collect_inputs(
            &self.input_dir,
            &self.scheme,
            self.recursive,
        ) {
            Ok(inputs) => inputs,
            Err(err) => {
                log::error!("{}", err);
                let state = JobState::Failed(err.to_string());
                return self.finish(report, state, sink);
            }
        };

        for path in inputs.iter() {
            if cancel.is_cancelled() {
                return self.finish(report, JobState::Cancelled, sink);
            }
            sink.emit(Event::Progress(format!("Processing {:?}", path)));
            let (container_report, cancelled) =
                self.process_container(path, cancel, sink);
            report.extracted += container_report.written.len();
            report.containers.push(container_report);
            if cancelled {
                return self.finish(report, JobState::Cancelled, sink);
            }
        }
        self.finish(report, JobState::Completed, sink)
    }

    /// Moves the job onto a background thread
    pub fn spawn<S>(
        mut self,
        cancel: CancelToken,
        sink: S,
    ) -> JoinHandle<JobReport>
    where
        S: EventSink + Send + 'static,
    {
        thread::spawn(move || self.run(&cancel, &sink))
    }

    fn finish(
        &mut self,
        mut report: JobReport,
        state: JobState,
        sink: &dyn EventSink,
    ) -> JobReport {
        match &state {
            JobState::Completed => sink.emit(Event::Completed {
                extracted: report.extracted,
            }),
            JobState::Failed(reason) => {
                sink.emit(Event::Failed(reason.clone()))
            }
            JobState::Cancelled => {
                log::info!("Extraction from {:?} cancelled", self.input_dir);
                sink.emit(Event::Cancelled)
            }
            JobState::Pending | JobState::Running => {}
        }
        self.state = state.clone();
        report.state = state;
        report
    }

    /// Second value is true when cancellation was observed mid-container
    fn process_container(
        &self,
        path: &Path,
        cancel: &CancelToken,
        sink: &dyn EventSink,
    ) -> (ContainerReport, bool) {
        let mut report = ContainerReport {
            container: path.to_path_buf(),
            ..ContainerReport::default()
        };
        let container = match Container::open(path) {
            Ok(container) => container,
            Err(err) => {
                container_error(&mut report, err.to_string(), sink);
                return (report, false);
            }
        };
        log::info!("Scanning {:?} ({} bytes)", path, container.len());

        let output_dir = self.scheme.layout.output_dir(path);
        let base_name = container.base_name();
        let mut extracted = 0;
        let mut invalid = 0;

        for (position, item) in self.scheme.model.scan(&container).enumerate() {
            if cancel.is_cancelled() {
                return (report, true);
            }
            match item {
                Scanned::Found { range, name } => {
                    extracted += 1;
                    let file_name = name.file_name(&base_name, extracted);
                    match writer::write(
                        &container,
                        range,
                        &output_dir,
                        &file_name,
                    ) {
                        Ok(written) => {
                            sink.emit(Event::Progress(format!(
                                "Extracted {:?}",
                                written
                            )));
                            report.written.push(written);
                        }
                        Err(err) => {
                            log::warn!(
                                "{:?} entry {}: {:#}",
                                path,
                                position,
                                err
                            );
                            sink.emit(Event::Error(format!(
                                "{:?}: entry {}: {:#}",
                                path, position, err
                            )));
                            report.failures.push(EntryFailure {
                                index: position,
                                reason: format!("{:#}", err),
                            });
                        }
                    }
                }
                Scanned::Invalid { index, reason } => {
                    invalid += 1;
                    log::warn!("{:?} entry {}: {}", path, index, reason);
                    sink.emit(Event::Error(format!(
                        "{:?}: entry {}: {}",
                        path, index, reason
                    )));
                    report.failures.push(EntryFailure { index, reason });
                }
            }
        }

        if extracted == 0 {
            let reason = if invalid > 0 {
                format!("all {} entries are invalid", invalid)
            } else {
                String::from("no sub-files found")
            };
            container_error(&mut report, reason, sink);
        }
        (report, false)
    }
}

fn container_error(
    report: &mut ContainerReport,
    reason: String,
    sink: &dyn EventSink,
) {
    log::warn!("{:?}: {}", report.container, reason);
    sink.emit(Event::Error(format!("{:?}: {}", report.container, reason)));
    report.error = Some(reason);
}

/// Files under `dir` matching the scheme's extensions, sorted by path
pub fn collect_inputs(
    dir: &Path,
    scheme: &Scheme,
    recursive: bool,
) -> Result<Vec<PathBuf>, EmbexError> {
    if !dir.is_dir() {
        return Err(EmbexError::InputDirMissing(dir.to_path_buf()));
    }
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut inputs = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| scheme.matches_extension(path))
        .collect::<Vec<_>>();
    if inputs.is_empty() {
        return Err(EmbexError::NoMatchingFiles {
            dir: dir.to_path_buf(),
            extensions: scheme.extensions.clone(),
        });
    }
    inputs.sort();
    log::debug!("{} input containers in {:?}", inputs.len(), dir);
    Ok(inputs)
}
