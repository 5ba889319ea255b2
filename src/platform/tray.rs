//! Notification-area icon and the status window
//!
//! All Win32 objects live on a dedicated UI thread. The agent reaches it
//! through a `TrayPoster`, which queues `AppEvent`s in a shared inbox and
//! wakes the hidden window with a private message. Menu choices travel the
//! other way as `Command`s on the agent's command channel.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::c_void;
use std::mem::size_of;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, POINT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_INFO, NIF_MESSAGE, NIF_TIP, NIIF_INFO, NIM_ADD, NIM_DELETE,
    NIM_MODIFY, NOTIFYICONDATAW, NOTIFYICONDATAW_0,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, CreateWindowExW, DefWindowProcW, DestroyMenu, DestroyWindow,
    DispatchMessageW, GetCursorPos, GetMessageW, IsWindowVisible, LoadIconW, PostMessageW,
    PostQuitMessage, RegisterClassW, SetForegroundWindow, SetWindowTextW, ShowWindow,
    TrackPopupMenu, TranslateMessage, CW_USEDEFAULT, HICON, HMENU, IDI_APPLICATION, MF_CHECKED,
    MF_GRAYED, MF_POPUP, MF_SEPARATOR, MF_STRING, MSG, SW_HIDE, SW_SHOW, TPM_BOTTOMALIGN,
    TPM_LEFTALIGN, TPM_NONOTIFY, TPM_RETURNCMD, TPM_RIGHTBUTTON, WINDOW_EX_STYLE, WM_APP,
    WM_CLOSE, WM_DESTROY, WM_ENDSESSION, WM_LBUTTONDBLCLK, WM_NULL, WM_RBUTTONUP, WM_USER,
    WNDCLASSW, WS_CAPTION, WS_CHILD, WS_EX_TOOLWINDOW, WS_OVERLAPPED, WS_SYSMENU, WS_VISIBLE,
};

use super::icon::{glyph_to_icon, OwnedIcon};
use super::registry::wide;
use crate::events::AppEvent;
use crate::render::GlyphImage;
use crate::ui::{self, Command, MenuEntry, StatusSnapshot, APP_NAME};

/// Shell callback for icon clicks
const WM_TRAYICON: u32 = WM_USER + 1;

/// Inbox has events to apply
const WM_APP_INBOX: u32 = WM_APP + 1;

const TRAY_ICON_ID: u32 = 1;
const BALLOON_TIMEOUT_MS: u32 = 1500;

const STATUS_WIDTH: i32 = 340;
const STATUS_HEIGHT: i32 = 200;

type Inbox = Arc<Mutex<VecDeque<AppEvent>>>;

struct UiState {
    tray_hwnd: HWND,
    status_hwnd: HWND,
    label_hwnd: HWND,
    icon: Option<OwnedIcon>,
    snapshot: Option<StatusSnapshot>,
    commands: mpsc::Sender<Command>,
    inbox: Inbox,
}

thread_local! {
    static UI: RefCell<Option<UiState>> = const { RefCell::new(None) };
}

/// Borrow the UI state briefly; never call into Win32 while borrowed
fn with_ui<R>(f: impl FnOnce(&mut UiState) -> R) -> Option<R> {
    UI.with(|ui| ui.borrow_mut().as_mut().map(f))
}

/// Cross-thread handle that queues events for the UI thread
#[derive(Clone)]
pub struct TrayPoster {
    hwnd: isize,
    inbox: Inbox,
}

impl TrayPoster {
    pub fn post(&self, event: AppEvent) {
        match self.inbox.lock() {
            Ok(mut inbox) => inbox.push_back(event),
            Err(_) => {
                warn!("tray inbox poisoned, dropping event");
                return;
            }
        }
        unsafe {
            let _ = PostMessageW(
                Some(HWND(self.hwnd as *mut c_void)),
                WM_APP_INBOX,
                WPARAM(0),
                LPARAM(0),
            );
        }
    }
}

/// The tray surface and its UI thread
pub struct TrayUi {
    poster: TrayPoster,
    thread: Option<JoinHandle<()>>,
}

impl TrayUi {
    /// Start the UI thread and wait until the tray icon exists
    pub fn spawn(commands: mpsc::Sender<Command>) -> Result<Self> {
        let inbox: Inbox = Arc::new(Mutex::new(VecDeque::new()));
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<isize, String>>(1);

        let thread_inbox = Arc::clone(&inbox);
        let thread = thread::Builder::new()
            .name("tray-ui".to_string())
            .spawn(move || run_ui_thread(commands, thread_inbox, ready_tx))
            .context("failed to spawn tray UI thread")?;

        let hwnd = match ready_rx.recv() {
            Ok(Ok(hwnd)) => hwnd,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(anyhow!("failed to create tray icon: {e}"));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(anyhow!("tray UI thread exited during startup"));
            }
        };

        info!("tray icon created");

        Ok(Self {
            poster: TrayPoster { hwnd, inbox },
            thread: Some(thread),
        })
    }

    pub fn poster(&self) -> TrayPoster {
        self.poster.clone()
    }

    /// Remove the icon, close the windows and join the UI thread
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        unsafe {
            let _ = PostMessageW(
                Some(HWND(self.poster.hwnd as *mut c_void)),
                WM_CLOSE,
                WPARAM(0),
                LPARAM(0),
            );
        }
        if thread.join().is_err() {
            warn!("tray UI thread panicked");
        }
        info!("tray icon removed");
    }
}

impl Drop for TrayUi {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_ui_thread(
    commands: mpsc::Sender<Command>,
    inbox: Inbox,
    ready: std::sync::mpsc::SyncSender<Result<isize, String>>,
) {
    let (tray_hwnd, status_hwnd, label_hwnd) = match unsafe { create_windows() } {
        Ok(handles) => handles,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };

    UI.with(|ui| {
        *ui.borrow_mut() = Some(UiState {
            tray_hwnd,
            status_hwnd,
            label_hwnd,
            icon: None,
            snapshot: None,
            commands,
            inbox,
        });
    });

    if let Err(e) = unsafe { add_tray_icon(tray_hwnd) } {
        unsafe {
            let _ = DestroyWindow(status_hwnd);
            let _ = DestroyWindow(tray_hwnd);
        }
        UI.with(|ui| ui.borrow_mut().take());
        let _ = ready.send(Err(e.to_string()));
        return;
    }

    let _ = ready.send(Ok(tray_hwnd.0 as isize));

    unsafe {
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    UI.with(|ui| ui.borrow_mut().take());
    debug!("tray UI thread exiting");
}

unsafe fn create_windows() -> windows::core::Result<(HWND, HWND, HWND)> {
    let instance = GetModuleHandleW(None)?;

    let tray_class = w!("TaskStatusAssistantTray");
    let status_class = w!("TaskStatusAssistantStatus");

    for (class_name, proc) in [
        (tray_class, tray_wndproc as WndProc),
        (status_class, status_wndproc as WndProc),
    ] {
        let wc = WNDCLASSW {
            lpfnWndProc: Some(proc),
            hInstance: instance.into(),
            lpszClassName: class_name,
            ..Default::default()
        };
        if RegisterClassW(&wc) == 0 {
            return Err(windows::core::Error::from_thread());
        }
    }

    // Never shown; only receives shell and inbox messages
    let tray_hwnd = CreateWindowExW(
        WINDOW_EX_STYLE::default(),
        tray_class,
        w!("Task Status Assistant"),
        WS_OVERLAPPED,
        0,
        0,
        0,
        0,
        None,
        None,
        Some(instance.into()),
        None,
    )?;

    let status_hwnd = CreateWindowExW(
        WS_EX_TOOLWINDOW,
        status_class,
        w!("Task Status Assistant"),
        WS_OVERLAPPED | WS_CAPTION | WS_SYSMENU,
        CW_USEDEFAULT,
        CW_USEDEFAULT,
        STATUS_WIDTH,
        STATUS_HEIGHT,
        None,
        None,
        Some(instance.into()),
        None,
    )?;

    let label_hwnd = CreateWindowExW(
        WINDOW_EX_STYLE::default(),
        w!("STATIC"),
        w!(""),
        WS_CHILD | WS_VISIBLE,
        14,
        14,
        STATUS_WIDTH - 40,
        STATUS_HEIGHT - 60,
        Some(status_hwnd),
        None,
        Some(instance.into()),
        None,
    )?;

    Ok((tray_hwnd, status_hwnd, label_hwnd))
}

type WndProc = unsafe extern "system" fn(HWND, u32, WPARAM, LPARAM) -> LRESULT;

fn notify_icon_data(hwnd: HWND) -> NOTIFYICONDATAW {
    NOTIFYICONDATAW {
        cbSize: size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: TRAY_ICON_ID,
        ..Default::default()
    }
}

/// Copy `text` into a fixed UTF-16 buffer, truncating to keep the terminator
fn copy_wide(dst: &mut [u16], text: &str) {
    let limit = dst.len().saturating_sub(1);
    for (i, c) in text.encode_utf16().take(limit).enumerate() {
        dst[i] = c;
    }
}

unsafe fn add_tray_icon(hwnd: HWND) -> windows::core::Result<()> {
    let mut nid = notify_icon_data(hwnd);
    nid.uFlags = NIF_ICON | NIF_MESSAGE | NIF_TIP;
    nid.uCallbackMessage = WM_TRAYICON;
    nid.hIcon = LoadIconW(None, IDI_APPLICATION)?;
    copy_wide(&mut nid.szTip, APP_NAME);

    if Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
        Ok(())
    } else {
        Err(windows::core::Error::from_thread())
    }
}

unsafe fn remove_tray_icon(hwnd: HWND) {
    let nid = notify_icon_data(hwnd);
    let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
}

unsafe fn update_tray_icon(hwnd: HWND, icon: HICON, tooltip: &str) {
    let mut nid = notify_icon_data(hwnd);
    nid.uFlags = NIF_ICON | NIF_TIP;
    nid.hIcon = icon;
    copy_wide(&mut nid.szTip, tooltip);

    if !Shell_NotifyIconW(NIM_MODIFY, &nid).as_bool() {
        warn!("failed to update tray icon");
    }
}

unsafe fn show_balloon(hwnd: HWND, title: &str, message: &str) {
    let mut nid = notify_icon_data(hwnd);
    nid.uFlags = NIF_INFO;
    nid.dwInfoFlags = NIIF_INFO;
    nid.Anonymous = NOTIFYICONDATAW_0 {
        uTimeout: BALLOON_TIMEOUT_MS,
    };
    copy_wide(&mut nid.szInfoTitle, title);
    copy_wide(&mut nid.szInfo, message);

    if !Shell_NotifyIconW(NIM_MODIFY, &nid).as_bool() {
        warn!(title, "failed to show notification");
    }
}

/// Apply everything queued by the agent, in order
fn drain_inbox() {
    let Some(inbox) = with_ui(|ui| Arc::clone(&ui.inbox)) else {
        return;
    };
    let events: Vec<AppEvent> = match inbox.lock() {
        Ok(mut queue) => queue.drain(..).collect(),
        Err(_) => return,
    };

    for event in events {
        apply_event(event);
    }
}

fn apply_event(event: AppEvent) {
    debug!(%event, "applying tray event");

    match event {
        AppEvent::Notification { title, message } => {
            if let Some(hwnd) = with_ui(|ui| ui.tray_hwnd) {
                unsafe { show_balloon(hwnd, &title, &message) };
            }
        }
        AppEvent::IconChanged { glyph, tooltip } => apply_icon(&glyph, &tooltip),
        AppEvent::StatusRefreshed { snapshot, reveal } => {
            let text = snapshot.text();
            let Some((status_hwnd, label_hwnd)) = with_ui(|ui| {
                ui.snapshot = Some(snapshot);
                (ui.status_hwnd, ui.label_hwnd)
            }) else {
                return;
            };

            unsafe {
                if reveal || IsWindowVisible(status_hwnd).as_bool() {
                    let text_w = wide(&text);
                    let _ = SetWindowTextW(label_hwnd, PCWSTR(text_w.as_ptr()));
                }
                if reveal {
                    let _ = ShowWindow(status_hwnd, SW_SHOW);
                    let _ = SetForegroundWindow(status_hwnd);
                }
            }
        }
    }
}

fn apply_icon(glyph: &GlyphImage, tooltip: &str) {
    let Some(hwnd) = with_ui(|ui| ui.tray_hwnd) else {
        return;
    };

    match glyph_to_icon(glyph) {
        Ok(icon) => {
            unsafe { update_tray_icon(hwnd, icon.handle(), tooltip) };
            // Previous handle is destroyed only after the shell holds the new one
            let previous = with_ui(|ui| ui.icon.replace(icon));
            drop(previous);
        }
        Err(e) => {
            warn!(error = %e, "cannot build tray icon, keeping previous");
        }
    }
}

fn send_command(command: Command) {
    let Some(commands) = with_ui(|ui| ui.commands.clone()) else {
        return;
    };
    if let Err(e) = command.deliver(&commands) {
        warn!(?command, error = %e, "failed to deliver menu command");
    }
}

unsafe fn build_menu(entries: &[MenuEntry]) -> windows::core::Result<HMENU> {
    let menu = CreatePopupMenu()?;

    for entry in entries {
        match entry {
            MenuEntry::Item {
                command,
                label,
                checked,
                enabled,
            } => {
                let mut flags = MF_STRING;
                if *checked {
                    flags |= MF_CHECKED;
                }
                if !*enabled {
                    flags |= MF_GRAYED;
                }
                let label_w = wide(label);
                AppendMenuW(
                    menu,
                    flags,
                    command.menu_id() as usize,
                    PCWSTR(label_w.as_ptr()),
                )?;
            }
            MenuEntry::Info(text) => {
                let text_w = wide(text);
                AppendMenuW(menu, MF_STRING | MF_GRAYED, 0, PCWSTR(text_w.as_ptr()))?;
            }
            MenuEntry::Submenu { label, entries } => {
                let submenu = build_menu(entries)?;
                let label_w = wide(label);
                AppendMenuW(
                    menu,
                    MF_POPUP,
                    submenu.0 as usize,
                    PCWSTR(label_w.as_ptr()),
                )?;
            }
            MenuEntry::Separator => {
                AppendMenuW(menu, MF_SEPARATOR, 0, None)?;
            }
        }
    }

    Ok(menu)
}

fn fallback_menu() -> Vec<MenuEntry> {
    vec![MenuEntry::Item {
        command: Command::Exit,
        label: "Exit",
        checked: false,
        enabled: true,
    }]
}

unsafe fn show_menu(hwnd: HWND) {
    let entries = with_ui(|state| state.snapshot.as_ref().map(ui::menu_entries))
        .flatten()
        .unwrap_or_else(fallback_menu);

    let menu = match build_menu(&entries) {
        Ok(menu) => menu,
        Err(e) => {
            warn!(error = %e, "failed to build tray menu");
            return;
        }
    };

    let mut pt = POINT::default();
    let _ = GetCursorPos(&mut pt);

    // Required for the menu to dismiss when clicking outside
    let _ = SetForegroundWindow(hwnd);

    let chosen = TrackPopupMenu(
        menu,
        TPM_BOTTOMALIGN | TPM_LEFTALIGN | TPM_RIGHTBUTTON | TPM_RETURNCMD | TPM_NONOTIFY,
        pt.x,
        pt.y,
        None,
        hwnd,
        None,
    );
    let _ = PostMessageW(Some(hwnd), WM_NULL, WPARAM(0), LPARAM(0));
    let _ = DestroyMenu(menu);

    if let Some(command) = Command::from_menu_id(chosen.0 as u32) {
        send_command(command);
    }
}

unsafe extern "system" fn tray_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_APP_INBOX => {
            drain_inbox();
            LRESULT(0)
        }
        WM_TRAYICON => {
            match (lparam.0 as u32) & 0xFFFF {
                WM_RBUTTONUP => show_menu(hwnd),
                WM_LBUTTONDBLCLK => send_command(Command::ShowStatus),
                _ => {}
            }
            LRESULT(0)
        }
        WM_ENDSESSION => {
            if wparam.0 != 0 {
                info!("session ending");
                send_command(Command::Exit);
            }
            LRESULT(0)
        }
        WM_CLOSE => {
            if let Some(status_hwnd) = with_ui(|ui| ui.status_hwnd) {
                let _ = DestroyWindow(status_hwnd);
            }
            let _ = DestroyWindow(hwnd);
            LRESULT(0)
        }
        WM_DESTROY => {
            remove_tray_icon(hwnd);
            let icon = with_ui(|ui| ui.icon.take());
            drop(icon);
            PostQuitMessage(0);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

unsafe extern "system" fn status_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        // Closing hides; the window lives as long as the tray
        WM_CLOSE => {
            let _ = ShowWindow(hwnd, SW_HIDE);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
