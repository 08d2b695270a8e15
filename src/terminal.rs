// SPDX-License-Identifier: GPL-3.0-only

//! Terminal scanner UI
//!
//! Renders the camera feed with Unicode half-block characters, the decoded
//! result and the action buttons. Keys drive the scanner; a left click on
//! the preview is a focus hint.

use crate::actions::{ActionHandlers, ActionOutcome, PendingShare};
use crate::backends::camera::V4l2Backend;
use crate::backends::camera::types::{CameraFrame, Facing};
use crate::config::Config;
use crate::constants::ui::{HIGHLIGHT_DURATION, INPUT_POLL, ZOOM_GAUGE_WIDTH};
use crate::errors::{ActionError, CameraError};
use crate::fl;
use crate::scanner::types::{FrameRegion, QrAction, WifiSecurity};
use crate::scanner::{
    CameraState, ControllerOptions, Feedback, FocusHint, NoFeedback, RqrrDecoder, ScanController,
    ScanStatus, TerminalBell,
};

use crossterm::{
    cursor::Show,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, LineGauge, Paragraph, Widget, Wrap},
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Options for a terminal scan run
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Exit after the first accepted code
    pub once: bool,
    /// Overrides the configured facing direction
    pub facing: Option<Facing>,
    /// Config file to write back to instead of the default location
    pub config_path: Option<PathBuf>,
}

/// Run the terminal scanner
///
/// With `once` set, the accepted text is printed to stdout after the
/// terminal is restored.
pub fn run(mut config: Config, options: ScanOptions) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let feedback: Box<dyn Feedback> = if config.feedback_enabled {
        Box::new(TerminalBell)
    } else {
        Box::new(NoFeedback)
    };
    let controller = ScanController::new(
        Box::new(V4l2Backend::new()),
        Arc::new(RqrrDecoder::with_max_dimension(config.max_decode_dimension)),
        runtime.handle().clone(),
        feedback,
        ControllerOptions {
            stop_after_first: options.once,
            ..ControllerOptions::from(&config)
        },
    );
    let mut app = App::new(
        controller,
        Arc::new(ActionHandlers::from_config(&config)),
        runtime.handle().clone(),
        options.once,
    );

    // Set up terminal; the guard restores it on every exit path, panics included
    let guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    app.start(options.facing.unwrap_or(config.preferred_facing));
    let result = app.run(&mut terminal);

    drop(terminal);
    guard.restore()?;

    config.preferred_facing = app.controller.facing();
    if let Some(path) = app.last_camera_path.take() {
        config.last_camera_path = Some(path);
    }
    let saved = match &options.config_path {
        Some(path) => config.save_to(path),
        None => config.save(),
    };
    if let Err(e) = saved {
        warn!(error = %e, "Failed to save config");
    }

    if options.once
        && let Some(decoded) = app.controller.result()
    {
        println!("{}", decoded.text);
    }

    // Release the camera, then leave any share command still open behind
    drop(app);
    runtime.shutdown_background();

    result
}

/// Raw mode, alternate screen and mouse capture for as long as it lives
struct TerminalGuard {
    leave: Option<fn() -> io::Result<()>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        // From here on a failure must still leave raw mode
        let guard = Self::armed(leave_terminal);
        execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        Ok(guard)
    }

    fn armed(leave: fn() -> io::Result<()>) -> Self {
        Self { leave: Some(leave) }
    }

    /// Restore the terminal, reporting the error instead of logging it
    fn restore(mut self) -> io::Result<()> {
        self.leave.take().map_or(Ok(()), |leave| leave())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Some(leave) = self.leave.take()
            && let Err(e) = leave()
        {
            warn!(error = %e, "Failed to restore terminal");
        }
    }
}

fn leave_terminal() -> io::Result<()> {
    let raw = disable_raw_mode();
    execute!(stdout(), DisableMouseCapture, LeaveAlternateScreen, Show)?;
    raw
}

struct App {
    controller: ScanController,
    actions: Arc<ActionHandlers>,
    runtime: Handle,
    /// Share command still running; its outcome is shown when it exits
    pending_share: Option<PendingShare>,
    once: bool,
    /// Transient message from the last user action
    message: Option<String>,
    /// Where the last frame was drawn, for mapping clicks
    image_area: Option<Rect>,
    last_camera_path: Option<String>,
    should_quit: bool,
}

impl App {
    fn new(
        controller: ScanController,
        actions: Arc<ActionHandlers>,
        runtime: Handle,
        once: bool,
    ) -> Self {
        Self {
            controller,
            actions,
            runtime,
            pending_share: None,
            once,
            message: None,
            image_area: None,
            last_camera_path: None,
            should_quit: false,
        }
    }

    fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            self.controller.poll_frame();
            if self.controller.pump() > 0 {
                self.message = None;
            }
            if let Some(outcome) = self
                .pending_share
                .as_mut()
                .and_then(PendingShare::try_outcome)
            {
                self.pending_share = None;
                self.show_outcome(outcome);
            }

            if self.once
                && self.controller.result().is_some()
                && self.controller.state() == CameraState::Off
            {
                info!("Code accepted, leaving single-scan mode");
                break;
            }

            let mut image_area = None;
            terminal.draw(|f| image_area = self.draw(f))?;
            self.image_area = image_area;

            // Handle input with timeout for frame updates
            if event::poll(INPUT_POLL)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn start(&mut self, facing: Facing) {
        self.message = None;
        if self.controller.start(facing).is_ok() {
            self.remember_camera();
        }
    }

    fn remember_camera(&mut self) {
        if let Some(session) = self.controller.session() {
            self.last_camera_path = Some(session.device().path.clone());
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('s') => self.start(self.controller.facing()),
            KeyCode::Char('f') => {
                self.message = None;
                if self.controller.flip().is_ok() {
                    self.remember_camera();
                }
            }
            KeyCode::Char('c') => {
                let outcome = self.actions.copy(self.controller.result());
                self.show_outcome(outcome);
            }
            KeyCode::Char('h') if self.pending_share.is_none() => {
                match self
                    .actions
                    .share_in_background(&self.runtime, self.controller.result())
                {
                    Ok(pending) => {
                        self.pending_share = Some(pending);
                        self.message = Some(fl!("action-sharing"));
                    }
                    Err(e) => self.show_outcome(Err(e)),
                }
            }
            KeyCode::Char('o') => {
                let outcome = self.actions.open(self.controller.result());
                self.show_outcome(outcome);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.controller.zoom_by(1);
            }
            KeyCode::Char('-') => {
                self.controller.zoom_by(-1);
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let Some(area) = self.image_area else {
            return;
        };
        let mirrored = self.controller.facing().is_mirrored();
        let Some((x, y)) = normalized_position(area, mouse.column, mouse.row, mirrored) else {
            return;
        };

        self.message = match self.controller.focus_at(x, y) {
            FocusHint::Refocused => Some(fl!("focus-refocus")),
            FocusHint::ContinuousEnabled => Some(fl!("focus-continuous")),
            FocusHint::Ignored => None,
        };
    }

    fn show_outcome(&mut self, outcome: Result<ActionOutcome, ActionError>) {
        self.message = match outcome {
            Ok(ActionOutcome::Copied) => Some(fl!("action-copied")),
            Ok(ActionOutcome::CopiedViaFallback) => Some(fl!("action-copied-terminal")),
            Ok(ActionOutcome::Shared) => Some(fl!("action-shared")),
            Ok(ActionOutcome::SharedViaClipboard) => Some(fl!("action-shared-clipboard")),
            Ok(ActionOutcome::Opened) => Some(fl!("action-opened")),
            // Dismissed share sheets and disabled buttons stay quiet
            Ok(ActionOutcome::ShareCancelled) | Err(ActionError::Unavailable) => None,
            Err(e) => {
                warn!(error = %e, "Action failed");
                Some(fl!("action-failed", reason = e.to_string()))
            }
        };
    }

    /// Draw the whole UI; returns the rectangle the frame was drawn into
    fn draw(&self, f: &mut Frame) -> Option<Rect> {
        // Borders plus two text lines, grown for parsed details
        let details = self
            .controller
            .result()
            .map_or(0, |result| detail_lines(&result.action).len() as u16);
        let [preview_area, result_area, buttons_area, status_area] = Layout::vertical([
            Constraint::Min(3),
            Constraint::Length(4 + details),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(f.area());

        let facing = self.controller.facing();
        let highlight = self
            .controller
            .result()
            .filter(|r| {
                (chrono::Local::now() - r.scanned_at)
                    .to_std()
                    .is_ok_and(|age| age < HIGHLIGHT_DURATION)
            })
            .and_then(|r| r.bounds.clone());

        let image_area = match self.controller.latest_frame() {
            Some(frame) => {
                let widget = FrameWidget {
                    frame,
                    mirrored: facing.is_mirrored(),
                    highlight,
                };
                let image_area = fit_frame(preview_area, frame.width, frame.height);
                f.render_widget(widget, image_area);
                Some(image_area)
            }
            None => {
                let placeholder = match self.controller.state() {
                    CameraState::Off => fl!("preview-off"),
                    CameraState::Starting | CameraState::Live => fl!("preview-waiting"),
                    CameraState::Failed => fl!("preview-failed"),
                };
                let y = preview_area.y + preview_area.height / 2;
                let area = Rect { y, height: 1, ..preview_area };
                f.render_widget(Paragraph::new(placeholder).centered(), area);
                None
            }
        };

        self.draw_result(f, result_area);
        self.draw_buttons(f, buttons_area);

        let message = self.status_message();
        let status = StatusBar { message: &message };
        f.render_widget(status, status_area);

        image_area
    }

    fn draw_result(&self, f: &mut Frame, area: Rect) {
        let (title, body) = match self.controller.result() {
            Some(result) => {
                let mut lines: Vec<Line> = detail_lines(&result.action)
                    .into_iter()
                    .map(|detail| Line::styled(detail, Style::default().fg(Color::Cyan)))
                    .collect();
                lines.push(Line::from(result.text.as_str()));
                (
                    format!(" {} · {} ", fl!("result-title"), kind_text(&result.action)),
                    lines,
                )
            }
            None => (
                format!(" {} ", fl!("result-title")),
                vec![Line::styled(
                    fl!("result-empty"),
                    Style::default().fg(Color::DarkGray),
                )],
            ),
        };

        let paragraph = Paragraph::new(body)
            .block(Block::bordered().title(title))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn draw_buttons(&self, f: &mut Frame, area: Rect) {
        let availability = self.controller.availability();
        let buttons = [
            ("s", fl!("button-scan"), true),
            ("f", fl!("button-flip"), true),
            ("c", fl!("button-copy"), availability.copy),
            ("h", fl!("button-share"), availability.share),
            ("o", fl!("button-open"), availability.open),
            ("q", fl!("button-quit"), true),
        ];

        let mut spans = Vec::with_capacity(buttons.len() * 2);
        for (key, label, enabled) in buttons {
            let (key_style, label_style) = if enabled {
                (
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                    Style::default().fg(Color::White),
                )
            } else {
                let disabled = Style::default().fg(Color::DarkGray);
                (disabled, disabled)
            };
            spans.push(Span::styled(format!("[{}]", key), key_style));
            spans.push(Span::styled(format!("{}  ", label), label_style));
        }

        let zoom = self.controller.capabilities().zoom;
        let gauge_width = if zoom.is_some() { ZOOM_GAUGE_WIDTH } else { 0 };
        let [buttons_area, gauge_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(gauge_width)]).areas(area);

        f.render_widget(Paragraph::new(Line::from(spans)), buttons_area);

        // Zoom slider only when the hardware has a zoom control
        if let Some(zoom) = zoom {
            let gauge = LineGauge::default()
                .ratio(zoom.fraction().clamp(0.0, 1.0))
                .label(fl!("zoom-label"))
                .filled_style(Style::default().fg(Color::Cyan))
                .unfilled_style(Style::default().fg(Color::DarkGray));
            f.render_widget(gauge, gauge_area);
        }
    }

    fn status_message(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }

        match self.controller.status() {
            ScanStatus::Idle => fl!("status-idle"),
            ScanStatus::CameraOn => {
                let camera = self
                    .controller
                    .session()
                    .map(|session| session.device().name.clone())
                    .unwrap_or_default();
                fl!("status-scanning", camera = camera)
            }
            ScanStatus::CameraFailed(error) => camera_error_text(error),
            ScanStatus::Found => fl!("status-found"),
            ScanStatus::Stopped => fl!("status-stopped"),
        }
    }
}

fn camera_error_text(error: &CameraError) -> String {
    match error {
        CameraError::NoCameraFound => fl!("error-no-camera"),
        CameraError::PermissionDenied(_) => fl!("error-camera-permission"),
        CameraError::Busy => fl!("error-camera-busy"),
        other => fl!("error-camera", reason = other.to_string()),
    }
}

fn kind_text(action: &QrAction) -> String {
    match action {
        QrAction::Url(_) => fl!("kind-link"),
        QrAction::Wifi { .. } => fl!("kind-wifi"),
        QrAction::Text(_) => fl!("kind-text"),
        QrAction::Phone(_) => fl!("kind-phone"),
        QrAction::Email { .. } => fl!("kind-email"),
        QrAction::Sms { .. } => fl!("kind-sms"),
        QrAction::Location { .. } => fl!("kind-location"),
        QrAction::Contact(_) => fl!("kind-contact"),
        QrAction::Event(_) => fl!("kind-event"),
    }
}

/// Parsed fields worth showing above the raw text
fn detail_lines(action: &QrAction) -> Vec<String> {
    let mut lines = Vec::new();
    match action {
        QrAction::Wifi {
            ssid,
            password,
            security,
            hidden,
        } => {
            lines.push(fl!("detail-network", ssid = ssid.clone()));
            lines.push(fl!("detail-security", security = security_text(security)));
            if let Some(password) = password {
                lines.push(fl!("detail-password", password = password.clone()));
            }
            if *hidden {
                lines.push(fl!("detail-hidden"));
            }
        }
        QrAction::Email {
            address,
            subject,
            body,
        } => {
            lines.push(fl!("detail-to", recipient = address.clone()));
            if let Some(subject) = subject {
                lines.push(fl!("detail-subject", subject = subject.clone()));
            }
            if let Some(body) = body {
                lines.push(fl!("detail-message", message = body.clone()));
            }
        }
        QrAction::Sms { number, message } => {
            lines.push(fl!("detail-to", recipient = number.clone()));
            if let Some(message) = message {
                lines.push(fl!("detail-message", message = message.clone()));
            }
        }
        QrAction::Phone(number) => lines.push(fl!("detail-number", number = number.clone())),
        QrAction::Location {
            latitude,
            longitude,
            label,
        } => {
            let coordinates = format!("{:.5}, {:.5}", latitude, longitude);
            lines.push(fl!("detail-coordinates", coordinates = coordinates));
            if let Some(label) = label {
                lines.push(fl!("detail-place", place = label.clone()));
            }
        }
        QrAction::Url(_) | QrAction::Text(_) | QrAction::Contact(_) | QrAction::Event(_) => {}
    }
    lines
}

fn security_text(security: &WifiSecurity) -> String {
    match security {
        WifiSecurity::None => fl!("security-open"),
        WifiSecurity::Wep => fl!("security-wep"),
        WifiSecurity::Wpa => fl!("security-wpa"),
        WifiSecurity::Wpa2Enterprise => fl!("security-enterprise"),
        WifiSecurity::Wpa3 => fl!("security-wpa3"),
    }
}

/// Largest rectangle inside `area` with the frame's aspect ratio, centered
///
/// Each terminal cell displays 2 vertical pixels using half-block characters.
fn fit_frame(area: Rect, frame_width: u32, frame_height: u32) -> Rect {
    if frame_width == 0 || frame_height == 0 || area.width == 0 || area.height == 0 {
        return Rect { width: 0, height: 0, ..area };
    }

    let frame_aspect = frame_width as f64 / frame_height as f64;
    let term_width = area.width as f64;
    let term_height = (area.height * 2) as f64;

    let (width, height) = if term_width / term_height > frame_aspect {
        // Terminal is wider - fit to height
        let w = term_height * frame_aspect;
        (w as u16, area.height)
    } else {
        // Terminal is taller - fit to width
        let h = term_width / frame_aspect;
        (area.width, (h / 2.0) as u16)
    };
    let (width, height) = (width.clamp(1, area.width), height.clamp(1, area.height));

    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Map a terminal cell inside `image` to normalized frame coordinates
fn normalized_position(image: Rect, column: u16, row: u16, mirrored: bool) -> Option<(f32, f32)> {
    if !image.contains((column, row).into()) {
        return None;
    }
    let x = (column - image.x) as f32 + 0.5;
    let y = (row - image.y) as f32 + 0.5;
    let nx = x / image.width as f32;
    let ny = y / image.height as f32;
    Some((if mirrored { 1.0 - nx } else { nx }, ny))
}

/// Cell range (x0, y0, x1, y1), inclusive, covered by `region` in a
/// `width` x `height` cell image
fn region_cells(region: &FrameRegion, width: u16, height: u16, mirrored: bool) -> (u16, u16, u16, u16) {
    let to_cell = |v: f32, size: u16| ((v.clamp(0.0, 1.0) * size as f32) as u16).min(size.saturating_sub(1));

    let mut x0 = to_cell(region.x, width);
    let mut x1 = to_cell(region.x + region.width, width);
    let y0 = to_cell(region.y, height);
    let y1 = to_cell(region.y + region.height, height);

    if mirrored {
        let last = width.saturating_sub(1);
        (x0, x1) = (last - x1, last - x0);
    }
    (x0, y0, x1, y1)
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget<'a> {
    frame: &'a CameraFrame,
    /// Front cameras are shown mirrored
    mirrored: bool,
    /// Outline drawn around a freshly decoded code
    highlight: Option<FrameRegion>,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let frame = self.frame;
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Scale factors
        let x_scale = frame.width as f64 / area.width as f64;
        let y_scale = frame.height as f64 / (area.height * 2) as f64;

        let outline = self
            .highlight
            .as_ref()
            .map(|region| region_cells(region, area.width, area.height, self.mirrored));

        // Render using half-block characters
        // Each terminal cell represents 2 vertical pixels:
        // - Upper half (▀) colored with fg
        // - Lower half colored with bg
        for ty in 0..area.height {
            for tx in 0..area.width {
                let Some(cell) = buf.cell_mut((area.x + tx, area.y + ty)) else {
                    continue;
                };

                if let Some((x0, y0, x1, y1)) = outline
                    && (x0..=x1).contains(&tx)
                    && (y0..=y1).contains(&ty)
                    && (tx == x0 || tx == x1 || ty == y0 || ty == y1)
                {
                    cell.set_char('▀');
                    cell.set_fg(Color::Yellow);
                    cell.set_bg(Color::Yellow);
                    continue;
                }

                let column = if self.mirrored { area.width - 1 - tx } else { tx };
                let src_x = (column as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let (r, g, b) = frame.rgb(src_x, src_y_top);
                let top_color = Color::Rgb(r, g, b);
                let (r, g, b) = frame.rgb(src_x, src_y_bottom);
                let bottom_color = Color::Rgb(r, g, b);

                cell.set_char('▀');
                cell.set_fg(top_color);
                cell.set_bg(bottom_color);
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().fg(Color::White).bg(Color::DarkGray);

        // Fill background
        buf.set_style(area, style);

        // set_stringn clips to the available width on a char boundary
        buf.set_stringn(area.x, area.y, self.message, area.width as usize, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fit_frame_wide_terminal() {
        // 80x20 cells = 80x40 pixels; a 4:3 frame fits to the height
        let area = Rect::new(0, 0, 80, 20);
        let fitted = fit_frame(area, 640, 480);
        assert_eq!(fitted.height, 20);
        assert_eq!(fitted.width, 53);
        assert_eq!(fitted.x, (80 - 53) / 2);
    }

    #[test]
    fn test_fit_frame_tall_terminal() {
        let area = Rect::new(0, 0, 40, 100);
        let fitted = fit_frame(area, 640, 480);
        assert_eq!(fitted.width, 40);
        assert_eq!(fitted.height, 15);
    }

    #[test]
    fn test_normalized_position() {
        let image = Rect::new(10, 5, 20, 10);
        assert_eq!(normalized_position(image, 9, 5, false), None);

        let (x, y) = normalized_position(image, 10, 5, false).unwrap();
        assert!((x - 0.025).abs() < 1e-6 && (y - 0.05).abs() < 1e-6);

        let (x, _) = normalized_position(image, 10, 5, true).unwrap();
        assert!((x - 0.975).abs() < 1e-6);
    }

    #[test]
    fn test_wifi_details_show_network_and_security() {
        let details = detail_lines(&QrAction::parse("WIFI:S:HomeNet;T:WPA;P:secret;H:true;;"));
        assert_eq!(details.len(), 4);
        assert!(details[0].contains("HomeNet"));
        assert!(details[1].contains("WPA/WPA2"));
        assert!(details[2].contains("secret"));
    }

    #[test]
    fn test_location_details_show_place() {
        let details = detail_lines(&QrAction::parse("geo:48.8584,2.2945?q=Eiffel+Tower"));
        assert_eq!(details.len(), 2);
        assert!(details[0].contains("48.85840, 2.29450"));
        assert!(details[1].contains("Eiffel Tower"));
    }

    #[test]
    fn test_mail_and_sms_details() {
        let details = detail_lines(&QrAction::parse("mailto:a@example.com?subject=Hi"));
        assert!(details[0].contains("a@example.com"));
        assert!(details[1].contains("Hi"));

        let details = detail_lines(&QrAction::parse("smsto:+15550100?body=On+my+way"));
        assert!(details[0].contains("+15550100"));
        assert!(details[1].contains("On my way"));
    }

    #[test]
    fn test_plain_text_has_no_details() {
        assert!(detail_lines(&QrAction::parse("hello")).is_empty());
        assert!(detail_lines(&QrAction::parse("https://example.com")).is_empty());
    }

    static LEFT_ON_PANIC: AtomicUsize = AtomicUsize::new(0);
    static LEFT_ON_RESTORE: AtomicUsize = AtomicUsize::new(0);

    fn count_panic_leave() -> io::Result<()> {
        LEFT_ON_PANIC.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn count_restore_leave() -> io::Result<()> {
        LEFT_ON_RESTORE.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    #[test]
    fn test_terminal_guard_restores_on_panic() {
        let outcome = std::panic::catch_unwind(|| {
            let _guard = TerminalGuard::armed(count_panic_leave);
            panic!("draw failed");
        });
        assert!(outcome.is_err());
        assert_eq!(LEFT_ON_PANIC.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_terminal_guard_restores_once() {
        let guard = TerminalGuard::armed(count_restore_leave);
        assert!(guard.restore().is_ok());
        assert_eq!(LEFT_ON_RESTORE.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_region_cells_mirrored() {
        let region = FrameRegion {
            x: 0.0,
            y: 0.5,
            width: 0.25,
            height: 0.5,
        };
        assert_eq!(region_cells(&region, 20, 10, false), (0, 5, 5, 9));
        assert_eq!(region_cells(&region, 20, 10, true), (14, 5, 19, 9));
    }

    #[test]
    fn test_frame_widget_mirrors() {
        // 2x2 frame: left column black, right column white
        let frame = CameraFrame::packed(2, 2, PixelFormat::Gray8, vec![0, 255, 0, 255]);
        let area = Rect::new(0, 0, 2, 1);

        let mut buf = Buffer::empty(area);
        FrameWidget {
            frame: &frame,
            mirrored: true,
            highlight: None,
        }
        .render(area, &mut buf);

        assert_eq!(buf[(0, 0)].fg, Color::Rgb(255, 255, 255));
        assert_eq!(buf[(1, 0)].fg, Color::Rgb(0, 0, 0));
    }

    #[test]
    fn test_status_bar_truncates() {
        let area = Rect::new(0, 0, 5, 1);
        let mut buf = Buffer::empty(area);
        StatusBar {
            message: "scanning for codes",
        }
        .render(area, &mut buf);
        assert_eq!(buf[(4, 0)].symbol(), "n");
    }
}
