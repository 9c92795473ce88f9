use crate::{
    error::SessionError,
    types::{SessionCommand, SessionEvent, SessionPhase, UserId},
};

/// Session lifecycle: `Uninitialized → Initializing(user) → Ready`.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
        }
    }
}

impl SessionStateMachine {
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Validate a command against the current phase.
    ///
    /// Only a user switch is accepted before the first initialization started.
    pub fn check(&self, command: &SessionCommand) -> Result<(), SessionError> {
        use SessionCommand::*;

        match command {
            SwitchUser { .. } | ComposerChanged { .. } | Shutdown => Ok(()),
            SelectConversation { .. }
            | CreateConversation { .. }
            | LoadMoreConversations
            | LoadOlderMessages
            | SendMessage { .. } => {
                if self.phase == SessionPhase::Uninitialized {
                    Err(SessionError::invalid_state(self.phase, command_action(command)))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Enter `Initializing` for a (possibly different) acting user from any phase.
    pub fn begin_init(&mut self, acting_user_id: UserId) -> SessionEvent {
        self.phase = SessionPhase::Initializing { acting_user_id };
        SessionEvent::PhaseChanged { phase: self.phase }
    }

    /// Leave `Initializing` for `acting_user_id`.
    ///
    /// Initialization failures still end in `Ready`; the failure lives in the
    /// conversation scope's error slot.
    pub fn finish_init(&mut self, acting_user_id: UserId) -> Result<SessionEvent, SessionError> {
        match self.phase {
            SessionPhase::Initializing {
                acting_user_id: current,
            } if current == acting_user_id => {
                self.phase = SessionPhase::Ready;
                Ok(SessionEvent::PhaseChanged { phase: self.phase })
            }
            other => Err(SessionError::invalid_state(other, "finish_init")),
        }
    }
}

/// Stable action name used in logs and invalid-state errors.
pub fn command_action(command: &SessionCommand) -> &'static str {
    match command {
        SessionCommand::SwitchUser { .. } => "switch_user",
        SessionCommand::SelectConversation { .. } => "select_conversation",
        SessionCommand::CreateConversation { .. } => "create_conversation",
        SessionCommand::LoadMoreConversations => "load_more_conversations",
        SessionCommand::LoadOlderMessages => "load_older_messages",
        SessionCommand::ComposerChanged { .. } => "composer_changed",
        SessionCommand::SendMessage { .. } => "send_message",
        SessionCommand::Shutdown => "shutdown",
    }
}
