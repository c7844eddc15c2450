use crate::control::{InjectedInput, InjectionCapability, InputInjector};
use std::sync::Arc;
use tether_core::RemoteControlEvent;
use tracing::debug;

/// Host-side sink for inbound control events, from either path.
pub struct ControlDispatcher {
    capability: InjectionCapability,
}

impl ControlDispatcher {
    /// Probes the injector once; an unavailable one turns every dispatch
    /// into a no-op.
    pub fn new(injector: Arc<dyn InputInjector>) -> Self {
        Self {
            capability: InjectionCapability::probe(injector),
        }
    }

    pub fn can_inject(&self) -> bool {
        self.capability.is_available()
    }

    /// Data-channel payload. Malformed or unknown events are dropped.
    pub fn dispatch_bytes(&self, payload: &[u8]) -> bool {
        match RemoteControlEvent::decode(payload) {
            Ok(event) => self.dispatch(event),
            Err(e) => {
                debug!("Dropping control payload: {}", e);
                false
            }
        }
    }

    /// Signaling fallback payload.
    pub fn dispatch_value(&self, value: serde_json::Value) -> bool {
        match RemoteControlEvent::from_value(value) {
            Ok(event) => self.dispatch(event),
            Err(e) => {
                debug!("Dropping control event: {}", e);
                false
            }
        }
    }

    /// Returns whether the event reached the injector.
    pub fn dispatch(&self, event: RemoteControlEvent) -> bool {
        let InjectionCapability::Available(injector) = &self.capability else {
            return false;
        };
        debug!("Injecting {}", event.tag());
        match InjectedInput::from(event) {
            InjectedInput::Mouse(input) => injector.inject_mouse(input),
            InjectedInput::Keyboard(input) => injector.inject_keyboard(input),
        }
        true
    }
}
