use super::GlobalConfig;
use crate::config::{
    compilation::CompilationLogLevel, profiling::ProfilingLogLevel, tuning::TuningLogLevel,
};
use core::fmt::Display;
use hashbrown::HashMap;
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

/// Configuration of one logging category, parameterized by its log level type.
///
/// Note that you can use multiple outputs at the same time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Path to the log file, if file logging is enabled.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Optional `log` crate output with its level.
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// The log level of the category.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

fn append_default() -> bool {
    true
}

/// Trait for types that can be used as log levels in [LoggerConfig].
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// Binary log level for enabling or disabling logging.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryLogLevel {
    /// Logging is disabled.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// Logging is fully enabled.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for BinaryLogLevel {}

/// In-memory log sink, shared by every logger created from it.
#[derive(Clone, Debug, Default)]
pub struct LogCapture {
    lines: Arc<spin::Mutex<Vec<String>>>,
}

impl LogCapture {
    /// Create an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message captured so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// If a captured message contains the given text.
    pub fn contains(&self, text: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(text))
    }

    /// Drop the captured messages.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }

    fn push(&self, line: String) {
        self.lines.lock().push(line);
    }
}

/// Central logging utility, managing multiple log outputs per category.
#[derive(Debug)]
pub struct Logger {
    /// Collection of logger outputs.
    loggers: Vec<LoggerKind>,

    /// Indices of outputs used for compilation logging.
    compilation_index: Vec<usize>,

    /// Indices of outputs used for profiling logging.
    profiling_index: Vec<usize>,

    /// Indices of outputs used for tuning logging.
    tuning_index: Vec<usize>,

    /// Configuration the logger was created from.
    pub config: Arc<GlobalConfig>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Creates a new `Logger` based on the global configuration.
    ///
    /// Note that creating a logger is quite expensive.
    pub fn new() -> Self {
        Self::from_config(GlobalConfig::get())
    }

    /// Creates a new `Logger` based on the given configuration.
    pub fn from_config(config: Arc<GlobalConfig>) -> Self {
        let mut loggers = Vec::new();
        let mut compilation_index = Vec::new();
        let mut profiling_index = Vec::new();
        let mut tuning_index = Vec::new();

        #[derive(Hash, PartialEq, Eq)]
        enum LoggerId {
            File(PathBuf),
            Stdout,
            Stderr,
            LogCrate(LogCrateLevel),
        }

        let mut logger2index = HashMap::<LoggerId, usize>::new();

        fn new_logger<S: Clone, ID: Fn(S) -> LoggerId, LG: Fn(S) -> Option<LoggerKind>>(
            setting_index: &mut Vec<usize>,
            loggers: &mut Vec<LoggerKind>,
            logger2index: &mut HashMap<LoggerId, usize>,
            state: S,
            func_id: ID,
            func_logger: LG,
        ) {
            let id = func_id(state.clone());

            if let Some(index) = logger2index.get(&id) {
                setting_index.push(*index);
            } else if let Some(logger) = func_logger(state) {
                let index = loggers.len();
                logger2index.insert(id, index);
                loggers.push(logger);
                setting_index.push(index);
            }
        }

        fn register_logger<L: LogLevel>(
            kind: &LoggerConfig<L>,
            setting_index: &mut Vec<usize>,
            loggers: &mut Vec<LoggerKind>,
            logger2index: &mut HashMap<LoggerId, usize>,
        ) {
            if let Some(file) = &kind.file {
                new_logger(
                    setting_index,
                    loggers,
                    logger2index,
                    (file, kind.append),
                    |(file, _append)| LoggerId::File(file.clone()),
                    |(file, append)| FileLogger::new(file, append).map(LoggerKind::File),
                );
            }

            if kind.stdout {
                new_logger(
                    setting_index,
                    loggers,
                    logger2index,
                    (),
                    |_| LoggerId::Stdout,
                    |_| Some(LoggerKind::Stdout),
                );
            }

            if kind.stderr {
                new_logger(
                    setting_index,
                    loggers,
                    logger2index,
                    (),
                    |_| LoggerId::Stderr,
                    |_| Some(LoggerKind::Stderr),
                );
            }

            if let Some(level) = kind.log {
                new_logger(
                    setting_index,
                    loggers,
                    logger2index,
                    level,
                    LoggerId::LogCrate,
                    |level| Some(LoggerKind::Log(level)),
                );
            }
        }

        if config.compilation.logger.level != CompilationLogLevel::Disabled {
            register_logger(
                &config.compilation.logger,
                &mut compilation_index,
                &mut loggers,
                &mut logger2index,
            )
        }

        if config.profiling.logger.level != ProfilingLogLevel::Disabled {
            register_logger(
                &config.profiling.logger,
                &mut profiling_index,
                &mut loggers,
                &mut logger2index,
            )
        }

        if config.tuning.logger.level != TuningLogLevel::Disabled {
            register_logger(
                &config.tuning.logger,
                &mut tuning_index,
                &mut loggers,
                &mut logger2index,
            )
        }

        Self {
            loggers,
            compilation_index,
            profiling_index,
            tuning_index,
            config,
        }
    }

    /// Creates a logger writing every enabled category of the configuration to the capture.
    pub fn capture(config: Arc<GlobalConfig>, capture: &LogCapture) -> Self {
        let enabled = |enabled: bool| if enabled { vec![0] } else { Vec::new() };

        Self {
            loggers: vec![LoggerKind::Capture(capture.clone())],
            compilation_index: enabled(
                config.compilation.logger.level != CompilationLogLevel::Disabled,
            ),
            profiling_index: enabled(config.profiling.logger.level != ProfilingLogLevel::Disabled),
            tuning_index: enabled(config.tuning.logger.level != TuningLogLevel::Disabled),
            config,
        }
    }

    /// Logs a message for compilation, directing it to all configured compilation outputs.
    pub fn log_compilation<S: Display>(&mut self, msg: &S) {
        Self::log_all(&mut self.loggers, &self.compilation_index, msg);
    }

    /// Logs a message for profiling, directing it to all configured profiling outputs.
    pub fn log_profiling<S: Display>(&mut self, msg: &S) {
        Self::log_all(&mut self.loggers, &self.profiling_index, msg);
    }

    /// Logs a message for tuning, directing it to all configured tuning outputs.
    pub fn log_tuning<S: Display>(&mut self, msg: &S) {
        Self::log_all(&mut self.loggers, &self.tuning_index, msg);
    }

    /// Returns the current tuning log level.
    pub fn log_level_tuning(&self) -> TuningLogLevel {
        self.config.tuning.logger.level
    }

    /// Returns the current compilation log level.
    pub fn log_level_compilation(&self) -> CompilationLogLevel {
        self.config.compilation.logger.level
    }

    /// Returns the current profiling log level.
    pub fn log_level_profiling(&self) -> ProfilingLogLevel {
        self.config.profiling.logger.level
    }

    fn log_all<S: Display>(loggers: &mut [LoggerKind], indices: &[usize], msg: &S) {
        match indices {
            [] => {}
            [index] => loggers[*index].log(msg),
            indices => {
                let msg = msg.to_string();
                for index in indices {
                    loggers[*index].log(&msg);
                }
            }
        }
    }
}

/// Represents different types of log outputs.
#[derive(Debug)]
enum LoggerKind {
    /// Logs to a file.
    File(FileLogger),

    /// Logs to standard output.
    Stdout,

    /// Logs to standard error.
    Stderr,

    /// Logs using the `log` crate with a specified level.
    Log(LogCrateLevel),

    /// Logs to an in-memory capture.
    Capture(LogCapture),
}

impl LoggerKind {
    fn log<S: Display>(&mut self, msg: &S) {
        match self {
            LoggerKind::File(file_logger) => file_logger.log(msg),
            LoggerKind::Stdout => println!("{msg}"),
            LoggerKind::Stderr => eprintln!("{msg}"),
            LoggerKind::Log(level) => match level {
                LogCrateLevel::Info => log::info!("{msg}"),
                LogCrateLevel::Debug => log::debug!("{msg}"),
                LogCrateLevel::Trace => log::trace!("{msg}"),
            },
            LoggerKind::Capture(capture) => capture.push(msg.to_string()),
        }
    }
}

/// Logger that writes messages to a file.
#[derive(Debug)]
struct FileLogger {
    writer: BufWriter<File>,
}

impl FileLogger {
    // Opens the file, the output is skipped when it can't be opened.
    fn new(path: &PathBuf, append: bool) -> Option<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path);

        match file {
            Ok(file) => Some(Self {
                writer: BufWriter::new(file),
            }),
            Err(err) => {
                log::warn!("Unable to open log file {}: {err}", path.display());
                None
            }
        }
    }

    // Write failures are dropped, logging never masks the logged error.
    fn log<S: Display>(&mut self, msg: &S) {
        let _ = writeln!(self.writer, "{msg}").and_then(|_| self.writer.flush());
    }
}
