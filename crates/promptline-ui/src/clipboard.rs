//! System clipboard access with silent degradation.
//!
//! Reads and writes walk an ordered chain of backends (platform clipboard
//! utility, then the native clipboard library) and stop at the first that
//! works. An in-process store sits behind the chain and always has the last
//! written text, so copy/paste keeps working inside the prompt even when no
//! system clipboard is reachable.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use promptline_core::ClipboardConfig;
use std::io::{self, Read, Write};
use std::ffi::OsStr;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

pub trait ClipboardBackend: Send + Sync {
    fn name(&self) -> &'static str;
    /// Whether the mechanism looks usable, without touching the clipboard.
    fn is_available(&self) -> bool;
    fn try_read(&self) -> Option<String>;
    fn try_write(&self, text: &str) -> bool;
}

#[derive(thiserror::Error, Debug)]
pub enum ClipboardError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` timed out after {timeout_ms} ms")]
    Timeout { program: String, timeout_ms: u128 },
    #[error("`{program}` exited with {status}")]
    Failed { program: String, status: ExitStatus },
    #[error("clipboard pipe error: {0}")]
    Io(#[from] io::Error),
}

/// One external utility invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ClipboardCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Run the utility and capture its standard output.
    ///
    /// Returns within `timeout` even when a descendant keeps the pipe open;
    /// the drain thread is left to finish on its own.
    pub fn read(&self, timeout: Duration) -> Result<String, ClipboardError> {
        let deadline = Instant::now() + timeout;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| self.spawn_error(source))?;
        // Drain stdout while waiting so a large clipboard cannot fill the pipe.
        let drained = child.stdout.take().map(drain_detached);

        let status = self.wait_until(&mut child, deadline, timeout)?;
        let captured = match drained {
            Some(rx) => rx
                .recv_timeout(time_left(deadline))
                .map_err(|_| self.timeout_error(timeout))?,
            None => Vec::new(),
        };
        if !status.success() {
            return Err(ClipboardError::Failed {
                program: self.program.clone(),
                status,
            });
        }
        let text = String::from_utf8_lossy(&captured).to_string();
        Ok(strip_one_newline(text))
    }

    /// Run the utility with `text` on its standard input.
    ///
    /// The text is fed from a detached thread so a utility that never reads
    /// cannot stall the caller past `timeout`.
    pub fn write(&self, text: &str, timeout: Duration) -> Result<(), ClipboardError> {
        let deadline = Instant::now() + timeout;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| self.spawn_error(source))?;
        let fed = child
            .stdin
            .take()
            .map(|stdin| feed_detached(stdin, text.as_bytes().to_vec()));

        let status = self.wait_until(&mut child, deadline, timeout)?;
        if let Some(rx) = fed {
            match rx.recv_timeout(time_left(deadline)) {
                Ok(result) => result?,
                Err(_) => return Err(self.timeout_error(timeout)),
            }
        }
        if !status.success() {
            return Err(ClipboardError::Failed {
                program: self.program.clone(),
                status,
            });
        }
        Ok(())
    }

    /// Wait for exit until `deadline`; a child still running then is killed.
    fn wait_until(
        &self,
        child: &mut Child,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<ExitStatus, ClipboardError> {
        let waited = child.wait_timeout(time_left(deadline));
        if let Ok(Some(status)) = waited {
            return Ok(status);
        }
        let _ = child.kill();
        let _ = child.wait();
        match waited {
            Err(err) => Err(err.into()),
            _ => Err(self.timeout_error(timeout)),
        }
    }

    fn spawn_error(&self, source: io::Error) -> ClipboardError {
        ClipboardError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    fn timeout_error(&self, timeout: Duration) -> ClipboardError {
        ClipboardError::Timeout {
            program: self.program.clone(),
            timeout_ms: timeout.as_millis(),
        }
    }
}

/// Time to collect pipe results once the child has exited, even when the
/// deadline was reached in the same instant.
const PIPE_GRACE: Duration = Duration::from_millis(20);

fn time_left(deadline: Instant) -> Duration {
    deadline
        .saturating_duration_since(Instant::now())
        .max(PIPE_GRACE)
}

fn drain_detached(mut out: ChildStdout) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = out.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

fn feed_detached(mut stdin: ChildStdin, bytes: Vec<u8>) -> Receiver<io::Result<()>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = stdin.write_all(&bytes);
        drop(stdin);
        let _ = tx.send(result);
    });
    rx
}

fn strip_one_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

/// Operating-system family used to pick clipboard utilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    /// Linux and the BSDs; Wayland or X11 is decided at call time.
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Clipboard through platform utilities run as subprocesses.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    name: &'static str,
    read: Vec<ClipboardCommand>,
    write: Vec<ClipboardCommand>,
    timeout: Duration,
}

impl CommandBackend {
    pub fn new(
        name: &'static str,
        read: Vec<ClipboardCommand>,
        write: Vec<ClipboardCommand>,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            read,
            write,
            timeout,
        }
    }

    /// Utilities for the running system.
    pub fn detect(timeout: Duration) -> Self {
        let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some_and(|v| !v.is_empty());
        Self::for_platform(Platform::current(), wayland, timeout)
    }

    pub fn for_platform(platform: Platform, wayland: bool, timeout: Duration) -> Self {
        match platform {
            Platform::MacOs => Self::new(
                "pbcopy",
                vec![ClipboardCommand::new("pbpaste", &[])],
                vec![ClipboardCommand::new("pbcopy", &[])],
                timeout,
            ),
            Platform::Windows => Self::new(
                "clip",
                vec![ClipboardCommand::new(
                    "powershell",
                    &["-NoProfile", "-Command", "Get-Clipboard -Raw"],
                )],
                vec![ClipboardCommand::new("clip", &[])],
                timeout,
            ),
            Platform::Unix if wayland => Self::new(
                "wl-clipboard",
                vec![ClipboardCommand::new("wl-paste", &["--no-newline"])],
                vec![ClipboardCommand::new("wl-copy", &[])],
                timeout,
            ),
            Platform::Unix => Self::new(
                "x11",
                vec![
                    ClipboardCommand::new("xclip", &["-selection", "clipboard", "-o"]),
                    ClipboardCommand::new("xsel", &["--clipboard", "--output"]),
                ],
                vec![
                    ClipboardCommand::new("xclip", &["-selection", "clipboard"]),
                    ClipboardCommand::new("xsel", &["--clipboard", "--input"]),
                ],
                timeout,
            ),
        }
    }

    pub fn read_commands(&self) -> &[ClipboardCommand] {
        &self.read
    }

    pub fn write_commands(&self) -> &[ClipboardCommand] {
        &self.write
    }
}

impl ClipboardBackend for CommandBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.write.iter().any(|cmd| command_exists(&cmd.program))
    }

    fn try_read(&self) -> Option<String> {
        for cmd in &self.read {
            match cmd.read(self.timeout) {
                Ok(text) => return Some(text),
                Err(err) => tracing::debug!(backend = self.name, %err, "clipboard read failed"),
            }
        }
        None
    }

    fn try_write(&self, text: &str) -> bool {
        for cmd in &self.write {
            match cmd.write(text, self.timeout) {
                Ok(()) => return true,
                Err(err) => tracing::debug!(backend = self.name, %err, "clipboard write failed"),
            }
        }
        false
    }
}

/// Whether `name` resolves to an executable file on `PATH`.
pub fn command_exists(name: &str) -> bool {
    resolves_in(name, std::env::var_os("PATH").as_deref())
}

fn resolves_in(name: &str, search_path: Option<&OsStr>) -> bool {
    if name.trim().is_empty() {
        return false;
    }
    let Ok(cwd) = std::env::current_dir() else {
        return which::which(name).is_ok();
    };
    which::which_in(name, search_path, cwd).is_ok()
}

/// Clipboard through the `arboard` library.
///
/// The handle is opened on first use and kept for the lifetime of the
/// backend: on X11 and Wayland the owning instance is what serves the copied
/// text to other applications.
#[cfg(feature = "native")]
#[derive(Default)]
pub struct NativeBackend {
    clipboard: Mutex<Option<arboard::Clipboard>>,
}

#[cfg(feature = "native")]
impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_clipboard<T>(
        &self,
        action: &str,
        op: impl FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error>,
    ) -> Option<T> {
        let mut slot = self
            .clipboard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => *slot = Some(clipboard),
                Err(err) => {
                    tracing::debug!(%err, action, "native clipboard unavailable");
                    return None;
                }
            }
        }
        let clipboard = slot.as_mut()?;
        match op(clipboard) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(%err, action, "native clipboard failed");
                None
            }
        }
    }
}

#[cfg(feature = "native")]
impl ClipboardBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "arboard"
    }

    fn is_available(&self) -> bool {
        self.with_clipboard("open", |_| Ok(())).is_some()
    }

    fn try_read(&self) -> Option<String> {
        self.with_clipboard("read", |cb| cb.get_text())
    }

    fn try_write(&self, text: &str) -> bool {
        self.with_clipboard("write", |cb| cb.set_text(text.to_owned()))
            .is_some()
    }
}

/// In-process clipboard; never fails.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    value: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn try_read(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn try_write(&self, text: &str) -> bool {
        *self
            .value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(text.to_string());
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Osc52Settings {
    enabled: bool,
    tmux_passthrough: bool,
    max_bytes: usize,
}

impl From<&ClipboardConfig> for Osc52Settings {
    fn from(cfg: &ClipboardConfig) -> Self {
        Self {
            enabled: cfg.osc52,
            tmux_passthrough: cfg.tmux_passthrough,
            max_bytes: cfg.osc52_max_bytes,
        }
    }
}

/// Layered clipboard used by the prompt's copy and paste bindings.
///
/// Construct one at startup and pass it by reference; each bridge owns its
/// own fallback store.
pub struct ClipboardBridge {
    backends: Vec<Box<dyn ClipboardBackend>>,
    memory: MemoryClipboard,
    osc52: Osc52Settings,
}

impl ClipboardBridge {
    pub fn new(backends: Vec<Box<dyn ClipboardBackend>>) -> Self {
        Self {
            backends,
            memory: MemoryClipboard::new(),
            osc52: Osc52Settings::from(&ClipboardConfig::default()),
        }
    }

    /// Only the in-process store.
    pub fn memory_only() -> Self {
        Self::new(Vec::new())
    }

    /// Platform utilities first, then the native library when enabled.
    pub fn system(cfg: &ClipboardConfig) -> Self {
        let timeout = Duration::from_millis(cfg.timeout_ms);
        let mut backends: Vec<Box<dyn ClipboardBackend>> =
            vec![Box::new(CommandBackend::detect(timeout))];
        #[cfg(feature = "native")]
        if cfg.native {
            backends.push(Box::new(NativeBackend::new()));
        }
        Self::new(backends).with_config(cfg)
    }

    pub fn with_config(mut self, cfg: &ClipboardConfig) -> Self {
        self.osc52 = Osc52Settings::from(cfg);
        self
    }

    /// Name and availability of each external backend, in resolution order.
    pub fn backend_status(&self) -> Vec<(&'static str, bool)> {
        self.backends
            .iter()
            .map(|b| (b.name(), b.is_available()))
            .collect()
    }

    /// Whether any external clipboard looks reachable; decides whether the
    /// host exposes clipboard key bindings.
    pub fn has_system_clipboard(&self) -> bool {
        self.backends.iter().any(|b| b.is_available())
    }

    pub fn read(&self) -> Option<String> {
        for backend in &self.backends {
            if let Some(text) = backend.try_read() {
                tracing::trace!(backend = backend.name(), "clipboard read");
                return Some(text);
            }
        }
        self.memory.try_read()
    }

    /// Store `text`. The in-process store is always updated, so this only
    /// reports failure if that store could not be written.
    pub fn write(&self, text: &str) -> bool {
        match self.backends.iter().find(|backend| backend.try_write(text)) {
            Some(backend) => tracing::trace!(backend = backend.name(), "clipboard write"),
            None if !self.backends.is_empty() => {
                tracing::debug!("no system clipboard accepted the write")
            }
            None => {}
        }
        self.memory.try_write(text)
    }

    /// Ask the terminal to set its clipboard with an OSC 52 sequence written
    /// to `out`. Works across SSH; errors writing to `out` are ignored.
    pub fn broadcast(&self, out: &mut dyn Write, text: &str) {
        if !self.osc52.enabled {
            return;
        }
        let tmux = self.osc52.tmux_passthrough && std::env::var_os("TMUX").is_some();
        let encoded = STANDARD.encode(text.as_bytes());
        if encoded.len() > self.osc52.max_bytes {
            tracing::debug!(len = encoded.len(), "osc52 payload too large, skipped");
            return;
        }
        let sequence = osc52_wrap(&encoded, tmux);
        if out.write_all(sequence.as_bytes()).and_then(|_| out.flush()).is_err() {
            tracing::trace!("osc52 broadcast could not be written");
        }
    }
}

/// `ESC ] 52 ; c ; <base64> BEL`, optionally inside a tmux passthrough.
pub fn osc52_sequence(text: &str, tmux: bool) -> String {
    osc52_wrap(&STANDARD.encode(text.as_bytes()), tmux)
}

fn osc52_wrap(encoded: &str, tmux: bool) -> String {
    if tmux {
        format!("\x1bPtmux;\x1b\x1b]52;c;{encoded}\x07\x1b\\")
    } else {
        format!("\x1b]52;c;{encoded}\x07")
    }
}
