//! Rotating file sink
//!
//! Two strategies are supported. Size rotation keeps numbered backups next to
//! the active file (`app.log.1`, `app.log.2`, ...), optionally gzip-compressed
//! and pruned by age. Time rotation treats the path as a strftime pattern and
//! opens a new file at every interval boundary, keeping the newest files that
//! match the pattern.

use crate::core::{LoggerError, Result, Sink};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const MAX_DELETION_FAILURES: usize = 5;

/// When to switch to a new file
///
/// # Examples
///
/// ```
/// use rust_field_logger::sinks::RotationStrategy;
/// use std::time::Duration;
///
/// // Rotate when the file would exceed 200 MB
/// let size = RotationStrategy::size(200 * 1024 * 1024);
///
/// // New file every hour, named from the path pattern
/// let hourly = RotationStrategy::Time { interval: Duration::from_secs(3600) };
/// assert_eq!(hourly, RotationStrategy::hourly());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RotationStrategy {
    /// Rotate before a write would push the file past `max_bytes`
    Size { max_bytes: u64 },

    /// Expand the path as a strftime pattern at each `interval` boundary
    Time { interval: Duration },

    /// No rotation (useful when external rotation is used)
    Never,
}

impl Default for RotationStrategy {
    fn default() -> Self {
        RotationStrategy::Size {
            max_bytes: 200 * 1024 * 1024,
        }
    }
}

impl RotationStrategy {
    #[must_use]
    pub fn size(max_bytes: u64) -> Self {
        RotationStrategy::Size { max_bytes }
    }

    #[must_use]
    pub fn hourly() -> Self {
        RotationStrategy::Time {
            interval: Duration::from_secs(3600),
        }
    }

    #[must_use]
    pub fn never() -> Self {
        RotationStrategy::Never
    }
}

/// Rotation strategy plus retention rules
///
/// ```
/// use rust_field_logger::sinks::{RotationPolicy, RotationStrategy};
/// use std::time::Duration;
///
/// let policy = RotationPolicy::new()
///     .with_max_size(50 * 1024 * 1024)
///     .with_max_backups(7)
///     .with_max_age(Duration::from_secs(15 * 24 * 3600))
///     .with_compression(true);
/// assert_eq!(policy.max_file_size(), Some(50 * 1024 * 1024));
/// ```
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    pub strategy: RotationStrategy,
    /// Maximum number of rotated files to keep
    pub max_backup_files: usize,
    /// Rotated files older than this are removed
    pub max_age: Option<Duration>,
    /// Gzip size-rotated backups
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            strategy: RotationStrategy::default(),
            max_backup_files: 200,
            max_age: None,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_strategy(mut self, strategy: RotationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Shorthand for `with_strategy(RotationStrategy::Size { max_bytes: size })`
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.strategy = RotationStrategy::Size { max_bytes: size };
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backup_files = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[must_use]
    pub fn max_file_size(&self) -> Option<u64> {
        match self.strategy {
            RotationStrategy::Size { max_bytes } => Some(max_bytes),
            _ => None,
        }
    }
}

/// File sink that rotates according to a [`RotationPolicy`]
///
/// ```no_run
/// use rust_field_logger::sinks::{RotatingFileSink, RotationPolicy, RotationStrategy};
///
/// // Size rotation with the default 200 MB limit
/// let sink = RotatingFileSink::new("/var/log/app.log").unwrap();
///
/// // One file per hour: /var/log/app-2024010215.log, ...
/// let policy = RotationPolicy::new()
///     .with_strategy(RotationStrategy::hourly())
///     .with_max_backups(24);
/// let sink = RotatingFileSink::with_policy("/var/log/app-%Y%m%d%H.log", policy).unwrap();
/// ```
pub struct RotatingFileSink {
    /// Base path (size strategy) or strftime pattern (time strategy)
    pattern: PathBuf,
    policy: RotationPolicy,
    current_path: PathBuf,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// Start of the active interval in unix seconds (time strategy)
    period_start: i64,
    deletion_failure_count: usize,
}

impl RotatingFileSink {
    /// Size-rotated sink with the default policy
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or opened
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// # Errors
    ///
    /// Returns error if the file cannot be opened, or if the time strategy is
    /// given an invalid pattern or a zero interval
    pub fn with_policy(path: impl AsRef<Path>, policy: RotationPolicy) -> Result<Self> {
        Self::open_at(path.as_ref().to_path_buf(), policy, Local::now())
    }

    fn open_at(pattern: PathBuf, policy: RotationPolicy, now: DateTime<Local>) -> Result<Self> {
        let (current_path, period_start) = match policy.strategy {
            RotationStrategy::Time { interval } => {
                if interval.as_secs() == 0 {
                    return Err(LoggerError::config(
                        "rotating_file",
                        "time rotation interval must be at least one second",
                    ));
                }
                validate_pattern(&pattern)?;
                let start = period_start(now, interval);
                (expand_pattern(&pattern, start)?, start)
            }
            _ => (pattern.clone(), 0),
        };

        let (file, current_size) = open_append(&current_path)?;
        Ok(Self {
            pattern,
            policy,
            current_path,
            writer: Some(BufWriter::new(file)),
            current_size,
            period_start,
            deletion_failure_count: 0,
        })
    }

    /// File currently receiving lines
    #[must_use]
    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Path (or pattern) the sink was opened with
    #[must_use]
    pub fn pattern(&self) -> &Path {
        &self.pattern
    }

    fn should_rotate(&self, incoming: u64, now: DateTime<Local>) -> bool {
        match self.policy.strategy {
            RotationStrategy::Never => false,
            RotationStrategy::Size { max_bytes } => {
                self.current_size > 0 && self.current_size.saturating_add(incoming) > max_bytes
            }
            RotationStrategy::Time { interval } => period_start(now, interval) != self.period_start,
        }
    }

    fn write_at(&mut self, line: &[u8], now: DateTime<Local>) -> Result<()> {
        if self.should_rotate(line.len() as u64, now) {
            if let Err(e) = self.rotate(now) {
                eprintln!(
                    "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );
                if self.writer.is_none() {
                    let (file, size) = open_append(&self.current_path).map_err(|reopen_err| {
                        eprintln!(
                            "[LOGGER ERROR] Failed to reopen log file after rotation failure: {}",
                            reopen_err
                        );
                        e
                    })?;
                    self.writer = Some(BufWriter::new(file));
                    self.current_size = size;
                }
                // Let the file grow past its limit rather than retry on every line
                self.current_size = 0;
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::sink_write("rotating_file", "Writer not initialized"))?;
        writer.write_all(line).map_err(|e| {
            LoggerError::io_operation(
                "write log line",
                format!("Failed to write to '{}'", self.current_path.display()),
                e,
            )
        })?;
        self.current_size += line.len() as u64;
        Ok(())
    }

    fn close_writer(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.current_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn rotate(&mut self, now: DateTime<Local>) -> Result<()> {
        match self.policy.strategy {
            RotationStrategy::Size { .. } => self.rotate_by_size(),
            RotationStrategy::Time { interval } => self.rotate_by_time(now, interval),
            RotationStrategy::Never => Ok(()),
        }
    }

    fn rotate_by_size(&mut self) -> Result<()> {
        self.close_writer()?;

        let max = self.policy.max_backup_files;
        if max > 0 {
            self.remove_backup(max)?;
            for i in (1..max).rev() {
                let from = self.backup_path(i);
                let to = self.backup_path(i + 1);
                let (from_gz, to_gz) = (gz_path(&from), gz_path(&to));
                if from_gz.exists() {
                    rename_replacing(&from_gz, &to_gz)?;
                } else if from.exists() {
                    rename_replacing(&from, &to)?;
                }
            }

            let first = self.backup_path(1);
            if self.current_path.exists() {
                fs::rename(&self.current_path, &first).map_err(|e| {
                    LoggerError::file_rotation(
                        self.current_path.display().to_string(),
                        format!("Failed to rotate current log file: {}", e),
                    )
                })?;
                if self.policy.compress {
                    compress_file(&first)?;
                }
            }
            self.prune_expired_backups();
        } else if self.current_path.exists() {
            fs::remove_file(&self.current_path).map_err(|e| {
                LoggerError::file_rotation(
                    self.current_path.display().to_string(),
                    format!("Failed to truncate log file: {}", e),
                )
            })?;
        }

        self.reopen()
    }

    fn rotate_by_time(&mut self, now: DateTime<Local>, interval: Duration) -> Result<()> {
        self.close_writer()?;
        let start = period_start(now, interval);
        self.current_path = expand_pattern(&self.pattern, start)?;
        self.period_start = start;
        self.reopen()?;
        self.prune_time_backups();
        Ok(())
    }

    fn reopen(&mut self) -> Result<()> {
        let (file, size) = open_append(&self.current_path).map_err(|e| {
            LoggerError::file_rotation(
                self.current_path.display().to_string(),
                format!("Failed to create new log file: {}", e),
            )
        })?;
        self.writer = Some(BufWriter::new(file));
        self.current_size = size;
        Ok(())
    }

    /// Remove the backup that would be pushed past the retention count.
    /// Repeated failures abort the rotation.
    fn remove_backup(&mut self, index: usize) -> Result<()> {
        let plain = self.backup_path(index);
        let mut failed = false;
        for path in [gz_path(&plain), plain] {
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    failed = true;
                    eprintln!(
                        "[LOGGER WARNING] Failed to remove oldest backup {}: {} (failure #{}/{})",
                        path.display(),
                        e,
                        self.deletion_failure_count + 1,
                        MAX_DELETION_FAILURES
                    );
                }
            }
        }

        if !failed {
            self.deletion_failure_count = 0;
            return Ok(());
        }
        self.deletion_failure_count += 1;
        if self.deletion_failure_count >= MAX_DELETION_FAILURES {
            return Err(LoggerError::file_rotation(
                self.current_path.display().to_string(),
                format!(
                    "Rotation aborted: failed to delete old backup files {} consecutive times",
                    self.deletion_failure_count
                ),
            ));
        }
        Ok(())
    }

    fn prune_expired_backups(&self) {
        let Some(max_age) = self.policy.max_age else {
            return;
        };
        for i in 1..=self.policy.max_backup_files {
            let plain = self.backup_path(i);
            for path in [gz_path(&plain), plain] {
                if is_older_than(&path, max_age) {
                    if let Err(e) = fs::remove_file(&path) {
                        eprintln!(
                            "[LOGGER WARNING] Failed to remove expired backup {}: {}",
                            path.display(),
                            e
                        );
                    }
                }
            }
        }
    }

    /// Keep the newest `max_backup_files` files matching the pattern; the
    /// active file is never removed.
    fn prune_time_backups(&self) {
        let Some(file_pattern) = self.pattern.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let segments = literal_segments(file_pattern);
        let dir = match self.current_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Failed to list log directory {}: {}",
                    dir.display(),
                    e
                );
                return;
            }
        };

        let mut candidates: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| matches_segments(name, &segments))
            })
            .map(|entry| {
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, entry.path())
            })
            .filter(|(_, path)| path.file_name() != self.current_path.file_name())
            .collect();

        // newest first; names break mtime ties
        candidates.sort_by(|a, b| b.cmp(a));

        let keep = self.policy.max_backup_files.saturating_sub(1);
        for (index, (_, path)) in candidates.iter().enumerate() {
            let expired = self
                .policy
                .max_age
                .is_some_and(|age| is_older_than(path, age));
            if index >= keep || expired {
                if let Err(e) = fs::remove_file(path) {
                    eprintln!(
                        "[LOGGER WARNING] Failed to remove old log file {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut path = self.current_path.clone();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log")
            .to_string();
        path.set_file_name(format!("{}.{}", filename, index));
        path
    }
}

impl Sink for RotatingFileSink {
    fn write(&mut self, line: &[u8]) -> Result<()> {
        self.write_at(line, Local::now())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::io_operation(
                    "flush log file",
                    format!("Failed to flush '{}'", self.current_path.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "rotating_file"
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            LoggerError::io_operation(
                "open log file",
                format!("Failed to open '{}'", path.display()),
                e,
            )
        })?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

fn rename_replacing(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // Some platforms refuse to rename over an existing file
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to).map_err(|e| {
        LoggerError::file_rotation(
            from.display().to_string(),
            format!("Failed to rotate backup files: {}", e),
        )
    })
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

fn is_older_than(path: &Path, age: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|elapsed| elapsed > age)
}

/// Compress `path` to `path.gz`, streaming through a temporary file. The
/// original is only removed once the compressed copy is complete.
fn compress_file(path: &Path) -> Result<()> {
    use std::io::{BufReader, Read};

    let gz = gz_path(path);
    let mut tmp_name = gz.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let compress_err = |message: String, e: std::io::Error| {
        let _ = fs::remove_file(&tmp);
        LoggerError::io_operation("compress log file", message, e)
    };

    let input = File::open(path)
        .map_err(|e| compress_err(format!("Failed to open '{}'", path.display()), e))?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);
    let output = File::create(&tmp)
        .map_err(|e| compress_err(format!("Failed to create '{}'", tmp.display()), e))?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let mut chunk = vec![0u8; 64 * 1024];
    loop {
        let read = reader
            .read(&mut chunk)
            .map_err(|e| compress_err(format!("Failed to read '{}'", path.display()), e))?;
        if read == 0 {
            break;
        }
        encoder
            .write_all(&chunk[..read])
            .map_err(|e| compress_err("Failed to compress data chunk".to_string(), e))?;
    }
    let mut out = encoder
        .finish()
        .map_err(|e| compress_err("Failed to finish compression".to_string(), e))?;
    out.flush()
        .map_err(|e| compress_err("Failed to flush compressed file".to_string(), e))?;
    drop(out);

    fs::rename(&tmp, &gz)
        .map_err(|e| compress_err(format!("Failed to rename to '{}'", gz.display()), e))?;

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compression succeeded but failed to remove original file {}: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

fn validate_pattern(pattern: &Path) -> Result<()> {
    let text = pattern.to_str().ok_or_else(|| {
        LoggerError::config("rotating_file", "time rotation pattern must be valid UTF-8")
    })?;
    if StrftimeItems::new(text).any(|item| matches!(item, Item::Error)) {
        return Err(LoggerError::config(
            "rotating_file",
            format!("invalid strftime pattern {:?}", text),
        ));
    }
    Ok(())
}

fn expand_pattern(pattern: &Path, period_start: i64) -> Result<PathBuf> {
    let text = pattern.to_string_lossy();
    let time = Local
        .timestamp_opt(period_start, 0)
        .earliest()
        .unwrap_or_else(Local::now);
    let mut expanded = String::with_capacity(text.len() + 16);
    write!(expanded, "{}", time.format(&text)).map_err(|_| {
        LoggerError::config("rotating_file", format!("invalid strftime pattern {:?}", text))
    })?;
    Ok(PathBuf::from(expanded))
}

fn period_start(now: DateTime<Local>, interval: Duration) -> i64 {
    let step = interval.as_secs().max(1) as i64;
    // boundaries follow the local wall clock
    let offset = i64::from(now.offset().local_minus_utc());
    let local = now.timestamp() + offset;
    local - local.rem_euclid(step) - offset
}

/// Split a strftime pattern into the literal runs between its specifiers.
fn literal_segments(pattern: &str) -> Vec<String> {
    let mut segments = vec![String::new()];
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            if let Some(last) = segments.last_mut() {
                last.push(c);
            }
            continue;
        }
        match chars.peek().copied() {
            Some('%') | None => {
                chars.next();
                if let Some(last) = segments.last_mut() {
                    last.push('%');
                }
            }
            Some(_) => {
                // skip flags and widths up to the conversion letter
                for n in chars.by_ref() {
                    if n.is_ascii_alphabetic() {
                        break;
                    }
                }
                segments.push(String::new());
            }
        }
    }
    segments
}

/// Glob-style match where every specifier stands for any run of characters.
fn matches_segments(name: &str, segments: &[String]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return name.is_empty();
    };
    let Some(mut remaining) = name.strip_prefix(first.as_str()) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for segment in middle {
        match remaining.find(segment.as_str()) {
            Some(i) => remaining = &remaining[i + segment.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}
