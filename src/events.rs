use crate::icon::IconCache;
use crate::presence::{self, Application};
use crate::protocol::SocketMessage;
use crate::source::{ActivationPolicy, WorkspaceEvent, WorkspaceEventKind};

/// A lifecycle change worth streaming to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    Launch(Application),
    Close(Application),
    Activate(Application),
}

impl From<PresenceEvent> for SocketMessage {
    fn from(event: PresenceEvent) -> Self {
        match event {
            PresenceEvent::Launch(app) => SocketMessage::Launch(app),
            PresenceEvent::Close(app) => SocketMessage::Close(app),
            PresenceEvent::Activate(app) => SocketMessage::Activate(app),
        }
    }
}

/// Translate one workspace event into a presence event, or nothing.
///
/// Background and agent processes are not presence-worthy: anything whose
/// activation policy isn't regular is dropped here. The application snapshot
/// is taken as delivered; it is not refreshed against the live registry.
pub fn adapt(event: WorkspaceEvent, icons: &IconCache) -> Option<PresenceEvent> {
    if event.app.policy != ActivationPolicy::Regular {
        tracing::debug!(
            "Ignoring {:?} for background process {}",
            event.kind,
            event.app.name
        );
        return None;
    }

    let app = presence::to_application(&event.app, icons);
    Some(match event.kind {
        WorkspaceEventKind::Launched => PresenceEvent::Launch(app),
        WorkspaceEventKind::Terminated => PresenceEvent::Close(app),
        WorkspaceEventKind::Activated => PresenceEvent::Activate(app),
    })
}
