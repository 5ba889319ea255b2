//! Global keyboard hook using a Windows low-level keyboard hook
//!
//! Intercepts system-wide key events for hotkey detection.
//! Runs on a dedicated thread with its own message loop; the hook callback
//! only decodes the event and hands it to the agent through a bounded channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::keys::KeyEdge;

/// Key edges that could not be queued because the agent fell behind
static DROPPED_EDGES: AtomicU64 = AtomicU64::new(0);

/// Process-wide low-level keyboard hook feeding `KeyEdge`s to the agent
pub struct KeyboardHook {
    edge_tx: mpsc::Sender<KeyEdge>,
    installed: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    thread_id: u32,
}

impl KeyboardHook {
    /// Create a new, not yet installed hook
    pub fn new(edge_tx: mpsc::Sender<KeyEdge>) -> Self {
        Self {
            edge_tx,
            installed: Arc::new(AtomicBool::new(false)),
            thread: None,
            thread_id: 0,
        }
    }

    /// Install the hook
    ///
    /// This spawns a dedicated thread that registers the hook and pumps its
    /// message queue. Returns once the OS has accepted or refused the hook.
    pub fn install(&mut self) -> Result<(), HookInstallError> {
        if self.thread.is_some() {
            return Err(HookInstallError::AlreadyInstalled);
        }

        let (thread, thread_id) = platform::spawn(self.edge_tx.clone(), Arc::clone(&self.installed))?;
        self.thread = Some(thread);
        self.thread_id = thread_id;

        info!(thread_id, "keyboard hook installed");
        Ok(())
    }

    /// Remove the hook and stop its thread; safe to call more than once
    pub fn uninstall(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        platform::request_quit(self.thread_id);
        if thread.join().is_err() {
            warn!("keyboard hook thread panicked");
        }
        self.installed.store(false, Ordering::SeqCst);

        let dropped = DROPPED_EDGES.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!(dropped, "key edges were dropped while the agent was busy");
        }
        info!("keyboard hook uninstalled");
    }

    /// Check if the hook is currently registered with the OS
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Errors that can occur while installing the keyboard hook
#[derive(Debug, thiserror::Error)]
pub enum HookInstallError {
    #[error("keyboard hook is already installed")]
    AlreadyInstalled,

    #[error("failed to register low-level keyboard hook: {0}")]
    Register(String),

    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(String),

    #[error("hook thread exited before reporting its status")]
    ThreadExited,

    #[error("low-level keyboard hooks are only available on Windows")]
    Unsupported,
}

/// Queue an edge without blocking; a full queue drops the edge
fn forward_edge(edge_tx: &mpsc::Sender<KeyEdge>, edge: KeyEdge) {
    if edge_tx.try_send(edge).is_err() {
        DROPPED_EDGES.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(windows)]
mod platform {
    use std::cell::{Cell, RefCell};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    use tokio::sync::mpsc;
    use tracing::{error, info};
    use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
        SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, MSG,
        PM_NOREMOVE, WH_KEYBOARD_LL, WM_QUIT,
    };

    use super::{forward_edge, HookInstallError};
    use crate::hotkey::keys::KeyEdge;

    thread_local! {
        static HOOK: Cell<Option<HHOOK>> = const { Cell::new(None) };
        static EDGE_SINK: RefCell<Option<mpsc::Sender<KeyEdge>>> = const { RefCell::new(None) };
    }

    pub(super) fn spawn(
        edge_tx: mpsc::Sender<KeyEdge>,
        installed: Arc<AtomicBool>,
    ) -> Result<(JoinHandle<()>, u32), HookInstallError> {
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel(1);

        let thread = thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || {
                run_hook_loop(edge_tx, installed, ready_tx);
            })
            .map_err(|e| HookInstallError::ThreadSpawn(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => Ok((thread, thread_id)),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(HookInstallError::ThreadExited)
            }
        }
    }

    pub(super) fn request_quit(thread_id: u32) {
        unsafe {
            if let Err(e) = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) {
                error!(?e, "failed to signal keyboard hook thread");
            }
        }
    }

    /// Register the hook and pump messages until `WM_QUIT`
    fn run_hook_loop(
        edge_tx: mpsc::Sender<KeyEdge>,
        installed: Arc<AtomicBool>,
        ready: std::sync::mpsc::SyncSender<Result<u32, HookInstallError>>,
    ) {
        EDGE_SINK.with(|sink| *sink.borrow_mut() = Some(edge_tx));

        unsafe {
            let mut msg = MSG::default();
            // Force creation of the thread message queue before anyone posts to it
            let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);

            let module = match GetModuleHandleW(None) {
                Ok(module) => module,
                Err(e) => {
                    let _ = ready.send(Err(HookInstallError::Register(e.to_string())));
                    return;
                }
            };

            let hook = match SetWindowsHookExW(
                WH_KEYBOARD_LL,
                Some(keyboard_hook_proc),
                Some(module.into()),
                0,
            ) {
                Ok(hook) => hook,
                Err(e) => {
                    let _ = ready.send(Err(HookInstallError::Register(e.to_string())));
                    return;
                }
            };

            HOOK.with(|h| h.set(Some(hook)));
            installed.store(true, Ordering::SeqCst);
            let _ = ready.send(Ok(GetCurrentThreadId()));

            info!("keyboard hook thread started");

            // GetMessageW returns -1 on failure, 0 on WM_QUIT
            while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }

            HOOK.with(|h| h.set(None));
            if let Err(e) = UnhookWindowsHookEx(hook) {
                error!(?e, "failed to unhook keyboard hook");
            }
            installed.store(false, Ordering::SeqCst);
        }

        EDGE_SINK.with(|sink| sink.borrow_mut().take());
        info!("keyboard hook thread stopped");
    }

    /// Low-level keyboard hook procedure; forwards the edge, then passes it on
    unsafe extern "system" fn keyboard_hook_proc(
        code: i32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        if code >= 0 {
            let info = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
            if let Some(edge) = KeyEdge::decode(wparam.0 as u32, info.vkCode) {
                EDGE_SINK.with(|sink| {
                    if let Some(edge_tx) = sink.borrow().as_ref() {
                        forward_edge(edge_tx, edge);
                    }
                });
            }
        }

        CallNextHookEx(HOOK.with(Cell::get), code, wparam, lparam)
    }
}

#[cfg(not(windows))]
mod platform {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread::JoinHandle;

    use tokio::sync::mpsc;

    use super::HookInstallError;
    use crate::hotkey::keys::KeyEdge;

    pub(super) fn spawn(
        _edge_tx: mpsc::Sender<KeyEdge>,
        _installed: Arc<AtomicBool>,
    ) -> Result<(JoinHandle<()>, u32), HookInstallError> {
        Err(HookInstallError::Unsupported)
    }

    pub(super) fn request_quit(_thread_id: u32) {}
}
