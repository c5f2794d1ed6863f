use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use async_trait::async_trait;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::{broadcast, watch};

use crate::error::TerminalError;
use crate::process::{ProcessFactory, ProcessHandle};
use crate::shell::ShellConfig;
use crate::OUTPUT_CHANNEL_CAPACITY;

/// Owns a portable-pty child process, master pair, and writer, and pumps the
/// raw output stream into a broadcast channel from a dedicated reader thread.
///
/// The reader thread is the single authority on process exit: when the read
/// side returns EOF (or errors), it reaps the child and flips the exit watch.
pub struct PtyProcess {
    master: Mutex<Box<dyn MasterPty + Send>>,
    writer: Mutex<Box<dyn Write + Send>>,
    child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
    output_tx: broadcast::Sender<Vec<u8>>,
    exit_rx: watch::Receiver<bool>,
    alive: Arc<AtomicBool>,
}

impl PtyProcess {
    /// Spawn a shell in a fresh PTY with the given configuration.
    pub fn spawn(config: &ShellConfig) -> Result<Self, TerminalError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows: config.rows,
                cols: config.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| TerminalError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(config.resolve_command());
        if let Some(dir) = &config.working_dir {
            cmd.cwd(dir);
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| TerminalError::SpawnFailed(format!("failed to spawn command: {e}")))?;

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TerminalError::SpawnFailed(format!("failed to clone reader: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| TerminalError::SpawnFailed(format!("failed to take writer: {e}")))?;

        let (output_tx, _) = broadcast::channel(OUTPUT_CHANNEL_CAPACITY);
        let (exit_tx, exit_rx) = watch::channel(false);
        let child = Arc::new(Mutex::new(child));
        let alive = Arc::new(AtomicBool::new(true));

        let tx = output_tx.clone();
        let child_ref = Arc::clone(&child);
        let alive_flag = Arc::clone(&alive);
        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    // EOF or error: the child is gone or the PTY closed.
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        // A send error only means no observer is currently
                        // subscribed; output is not buffered for latecomers.
                        let _ = tx.send(buf[..n].to_vec());
                    }
                }
            }
            // Reap the child before announcing the exit so the process table
            // entry is gone by the time anyone reacts.
            let _ = child_ref.lock().unwrap().wait();
            alive_flag.store(false, Ordering::SeqCst);
            let _ = exit_tx.send(true);
            log::debug!("PTY reader thread finished");
        });

        Ok(Self {
            master: Mutex::new(pair.master),
            writer: Mutex::new(writer),
            child,
            output_tx,
            exit_rx,
            alive,
        })
    }
}

impl ProcessHandle for PtyProcess {
    fn write_input(&self, data: &[u8]) -> Result<(), TerminalError> {
        if !self.is_alive() {
            return Err(TerminalError::ProcessExited);
        }
        let mut writer = self.writer.lock().unwrap();
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    fn resize(&self, cols: u16, rows: u16) -> Result<(), TerminalError> {
        self.master
            .lock()
            .unwrap()
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| TerminalError::ResizeFailed(format!("{e}")))
    }

    fn kill(&self) -> Result<(), TerminalError> {
        self.child.lock().unwrap().kill()?;
        Ok(())
    }

    fn subscribe_output(&self) -> broadcast::Receiver<Vec<u8>> {
        self.output_tx.subscribe()
    }

    fn subscribe_exit(&self) -> watch::Receiver<bool> {
        self.exit_rx.clone()
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        // The reader thread exits on its own once the child dies and the
        // read side hits EOF.
        if self.is_alive() {
            let _ = self.child.lock().unwrap().kill();
        }
    }
}

/// Factory producing real PTY-backed processes.
pub struct PtyProcessFactory;

#[async_trait]
impl ProcessFactory for PtyProcessFactory {
    async fn spawn(&self, config: &ShellConfig) -> Result<Arc<dyn ProcessHandle>, TerminalError> {
        let process = PtyProcess::spawn(config)?;
        Ok(Arc::new(process))
    }
}
