// Terra - configurable event dispatch for a geographic data backend
//
// This library ties together the event bus, its built-in handlers, the
// mail layer they deliver through, settings and logging.

// Re-export core functionality
pub use terra_events::*;

pub use terra_mail;

// Re-export optional crates
#[cfg(feature = "config")]
pub use terra_config;

#[cfg(feature = "log")]
pub use terra_log;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        DispatchReport,
        Event,
        EventBus,
        EventBusConfig,
        EventHandlerConfig,
        EventPublisher,
        Handler,
        HandlerCatalog,
        HandlerContext,
        HandlerError,
        HandlerRegistry,
        HandlerServices,
        InstanceRef,
        MemoryStore,
        Record,
        RecordStore,
        UserRef,
        async_trait,
    };
    pub use terra_mail::{Mailer, MemoryTransport};

    #[cfg(feature = "config")]
    pub use terra_config::Settings;
}
