pub mod channel;
pub mod channels;
pub mod dispatcher;
pub mod event;

pub use channel::{DeliveryResult, NotifyChannel};
pub use channels::{EmailChannel, EmailConfig, InAppChannel, WebhookChannel, WebhookConfig};
pub use dispatcher::EventDispatcher;
pub use event::{EventKind, NotifyLevel, OpsEvent};
