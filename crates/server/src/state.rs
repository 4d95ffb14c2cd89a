use std::sync::Arc;

use filemill_core::{
    processor::Subscription, Config, ConversionOrchestrator, SanitizedConfig, TaskEvent,
    ToolAvailability,
};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<ConversionOrchestrator>,
    tools: ToolAvailability,
    ws_broadcaster: WsBroadcaster,
    // Forwards task events to WebSocket clients while the state lives
    _task_events: Subscription,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Arc<ConversionOrchestrator>,
        tools: ToolAvailability,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        let broadcaster = ws_broadcaster.clone();
        let task_events =
            orchestrator.subscribe(move |event: &TaskEvent| broadcaster.task_event(event));

        Self {
            config,
            orchestrator,
            tools,
            ws_broadcaster,
            _task_events: task_events,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &ConversionOrchestrator {
        self.orchestrator.as_ref()
    }

    /// Tool probe results taken at startup.
    pub fn tools(&self) -> &ToolAvailability {
        &self.tools
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
