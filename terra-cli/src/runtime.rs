//! Wires settings into a mailer, a record store and an event bus.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use terra_config::{EventSettings, MailBackend, MailSecurity, MailSettings, Settings};
use terra_events::{EventBus, HandlerServices, JsonFileStore, MemoryStore, RecordStore};
use terra_mail::{ConsoleTransport, Mailer, MemoryTransport, SmtpConfig, SmtpSecurity};
use tracing::debug;

use crate::error::CliResult;

pub struct Runtime {
    pub bus: EventBus,
    /// Captured messages when the `memory` mail backend is selected
    pub outbox: Option<MemoryTransport>,
}

impl Runtime {
    pub fn load(config: Option<&Path>) -> CliResult<Self> {
        let settings = load_settings(config)?;
        let (mailer, outbox) = mailer(&settings.mail)?;
        let services = HandlerServices::new(mailer, store(&settings.events));
        let bus = EventBus::from_settings(&settings.events, services)?;

        debug!(
            handlers = bus.registry().len(),
            backend = ?settings.mail.backend,
            "Runtime ready"
        );

        Ok(Self { bus, outbox })
    }
}

pub fn load_settings(config: Option<&Path>) -> CliResult<Settings> {
    Ok(Settings::load(config)?)
}

fn mailer(settings: &MailSettings) -> CliResult<(Mailer, Option<MemoryTransport>)> {
    let (mailer, outbox) = match settings.backend {
        MailBackend::Smtp => {
            let security = match settings.security {
                MailSecurity::None => SmtpSecurity::None,
                MailSecurity::Starttls => SmtpSecurity::StartTls,
                MailSecurity::Tls => SmtpSecurity::Tls,
            };
            let mut config = SmtpConfig::new(&settings.host)
                .port(settings.port)
                .security(security)
                .timeout(Duration::from_secs(settings.timeout_secs));
            if let (Some(user), Some(password)) = (&settings.username, &settings.password) {
                config = config.credentials(user, password);
            }
            (Mailer::smtp(config)?, None)
        }
        MailBackend::Console => (Mailer::new(ConsoleTransport::stdout()), None),
        MailBackend::Memory => {
            let outbox = MemoryTransport::new();
            (Mailer::new(outbox.clone()), Some(outbox))
        }
    };

    Ok((mailer.default_from(&settings.default_from)?, outbox))
}

fn store(settings: &EventSettings) -> Arc<dyn RecordStore> {
    match &settings.records_file {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    }
}
