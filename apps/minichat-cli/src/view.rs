//! Terminal presentation of session snapshots.
//!
//! The transcript is laid out as text rows of a fixed virtual height so the shared
//! scroll-preservation controller can reason in the same pixel units a graphical
//! view would use.

use std::fmt::Write as _;

use minichat_core::{
    MessageView, ScrollController, ScrollGeometry, SessionPhase, SessionSnapshot,
};
use tracing::{debug, trace};

/// Virtual height of one transcript row.
const LINE_HEIGHT_PX: f32 = 20.0;
/// Minimum spacing between two automatic older-page requests.
const OLDER_PAGE_COOLDOWN_MS: u64 = 750;
const PREVIEW_CHARS: usize = 32;

#[derive(Debug, Default, Clone)]
struct OlderPageTracker {
    in_flight: bool,
    last_requested_ms: Option<u64>,
}

impl OlderPageTracker {
    fn should_request(&self, at_top: bool, has_more: bool, now_ms: u64) -> bool {
        if !at_top || !has_more || self.in_flight {
            return false;
        }
        self.last_requested_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= OLDER_PAGE_COOLDOWN_MS)
    }

    fn mark_requested(&mut self, now_ms: u64) {
        self.in_flight = true;
        self.last_requested_ms = Some(now_ms);
    }

    fn mark_complete(&mut self) {
        self.in_flight = false;
    }
}

/// Scrollable transcript viewport for the selected conversation.
#[derive(Debug, Clone)]
pub struct TranscriptView {
    viewport_lines: usize,
    scroll: ScrollController,
    scroll_top_px: f32,
    selection_epoch: Option<u64>,
    lines: Vec<String>,
    older: OlderPageTracker,
}

impl TranscriptView {
    pub fn new(viewport_lines: usize) -> Self {
        Self {
            viewport_lines: viewport_lines.max(1),
            scroll: ScrollController::new(),
            scroll_top_px: 0.0,
            selection_epoch: None,
            lines: Vec::new(),
            older: OlderPageTracker::default(),
        }
    }

    /// Commit a new snapshot, then reconcile the viewport against the new layout.
    pub fn apply(&mut self, snapshot: &SessionSnapshot) {
        if self.selection_epoch != Some(snapshot.selection_epoch) {
            debug!(
                selection_epoch = snapshot.selection_epoch,
                "transcript selection changed"
            );
            self.selection_epoch = Some(snapshot.selection_epoch);
            self.scroll.reset();
            self.scroll_top_px = 0.0;
            self.older = OlderPageTracker::default();
        }
        if !snapshot.right.loading {
            self.older.mark_complete();
        }

        self.lines = transcript_lines(&snapshot.messages);
        if self.scroll.commit(snapshot.messages.len()) {
            let adjustment = self.scroll.reconcile(self.geometry());
            trace!(?adjustment, "transcript scroll reconciled");
            if let Some(scroll_top) = adjustment.scroll_top() {
                self.scroll_top_px = scroll_top;
            }
        }
        self.clamp();
    }

    /// Scroll by whole rows; negative moves toward older messages.
    pub fn scroll_by(&mut self, rows: isize) {
        self.scroll_top_px += rows as f32 * LINE_HEIGHT_PX;
        self.clamp();
    }

    pub fn at_top(&self) -> bool {
        self.scroll_top_px <= 0.0
    }

    /// Decide whether reaching the top should fetch an older page, and record it.
    pub fn request_older_if_needed(&mut self, has_more: bool, now_ms: u64) -> bool {
        if !self.older.should_request(self.at_top(), has_more, now_ms) {
            return false;
        }
        self.older.mark_requested(now_ms);
        true
    }

    pub fn first_visible_line(&self) -> usize {
        (self.scroll_top_px / LINE_HEIGHT_PX).round().max(0.0) as usize
    }

    pub fn visible_lines(&self) -> &[String] {
        let start = self.first_visible_line().min(self.lines.len());
        let end = (start + self.viewport_lines).min(self.lines.len());
        &self.lines[start..end]
    }

    fn content_height(&self) -> f32 {
        self.lines.len() as f32 * LINE_HEIGHT_PX
    }

    fn client_height(&self) -> f32 {
        self.viewport_lines as f32 * LINE_HEIGHT_PX
    }

    fn geometry(&self) -> ScrollGeometry {
        ScrollGeometry {
            scroll_top: self.scroll_top_px,
            scroll_height: self.content_height(),
            client_height: self.client_height(),
        }
    }

    fn clamp(&mut self) {
        let max_top = (self.content_height() - self.client_height()).max(0.0);
        self.scroll_top_px = self.scroll_top_px.clamp(0.0, max_top);
    }
}

fn transcript_lines(messages: &[MessageView]) -> Vec<String> {
    let mut lines = Vec::with_capacity(messages.len());
    for message in messages {
        let time = message.created_at.get(11..16).unwrap_or(&message.created_at);
        let who = if message.is_own {
            "you"
        } else {
            message.sender.name.as_str()
        };
        let mut body_lines = message.body.lines();
        let first = body_lines.next().unwrap_or_default();
        lines.push(format!("{time} {who}: {first}"));
        lines.extend(body_lines.map(|line| format!("      {line}")));
    }
    lines
}

fn preview(body: &str) -> String {
    let first = body.lines().next().unwrap_or_default();
    if first.chars().count() > PREVIEW_CHARS {
        let cut: String = first.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        first.to_owned()
    }
}

/// Full-screen text frame for a snapshot.
pub fn render_frame(snapshot: &SessionSnapshot, transcript: &TranscriptView) -> String {
    let mut out = String::new();

    let who = match (&snapshot.me, snapshot.acting_user_id) {
        (Some(me), _) => format!("{} (#{})", me.name, me.id),
        (None, Some(id)) => format!("user #{id}"),
        (None, None) => "nobody".to_owned(),
    };
    let phase = match snapshot.phase {
        SessionPhase::Uninitialized => "starting",
        SessionPhase::Initializing { .. } => "loading",
        SessionPhase::Ready => "ready",
    };
    let _ = writeln!(out, "minichat | {who} | {phase}");

    let _ = writeln!(out, "-- conversations --");
    if snapshot.left.loading {
        let _ = writeln!(out, "  (loading)");
    }
    for conversation in &snapshot.conversations {
        let marker = if conversation.is_selected { '>' } else { ' ' };
        let last = conversation
            .summary
            .last_message
            .as_ref()
            .map(|message| preview(&message.body))
            .unwrap_or_else(|| "(no messages)".to_owned());
        let _ = writeln!(
            out,
            "{marker} [{}] {}: {last}",
            conversation.summary.id, conversation.summary.participant.name
        );
    }
    if snapshot.conversations_has_more {
        let _ = writeln!(out, "  /more for older conversations");
    }
    if let Some(error) = &snapshot.left.error {
        let _ = writeln!(out, "  ! {error}");
    }
    if !snapshot.users_for_new_chat.is_empty() {
        let names: Vec<String> = snapshot
            .users_for_new_chat
            .iter()
            .map(|user| format!("{} {}", user.id, user.name))
            .collect();
        let _ = writeln!(out, "  /new <id>: {}", names.join(", "));
    }

    match (snapshot.selected_conversation_id, &snapshot.selected_participant) {
        (None, _) => {
            let _ = writeln!(out, "-- no conversation selected (/chat <id>) --");
        }
        (Some(id), participant) => {
            let title = participant
                .as_ref()
                .map(|user| user.name.clone())
                .unwrap_or_else(|| format!("conversation {id}"));
            let _ = writeln!(out, "-- {title} --");
            if snapshot.messages_has_more && transcript.at_top() {
                let _ = writeln!(out, "  /older for earlier messages");
            }
            for line in transcript.visible_lines() {
                let _ = writeln!(out, "{line}");
            }
            if snapshot.right.loading {
                let _ = writeln!(out, "  (loading)");
            }
        }
    }
    if let Some(error) = &snapshot.right.error {
        let _ = writeln!(out, "  ! {error}");
    }
    out
}
