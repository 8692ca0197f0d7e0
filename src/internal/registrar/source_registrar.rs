// src/internal/registrar/source_registrar.rs

use tracing::{debug, info};

use crate::internal::host::{validate_channel, EventHost, RegistrationError, MESSAGE_FILE_FIELD};

/// Outcome of a registration pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub channel: String,
    /// Source name after defaulting a blank one to the channel
    pub source: String,
    /// Whether this pass created the registration
    pub created: bool,
    /// Formatting resource attached to the registration, if any
    pub message_resource: Option<String>,
}

/// SourceRegistrar makes sure a source is registered against a channel before
/// anything is written through it
pub struct SourceRegistrar<'h, H: EventHost + ?Sized> {
    host: &'h H,
}

impl<'h, H: EventHost + ?Sized> SourceRegistrar<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self { host }
    }

    /// Source name used for `source` under `channel`
    pub fn effective_source<'a>(channel: &'a str, source: &'a str) -> &'a str {
        if source.trim().is_empty() {
            channel
        } else {
            source
        }
    }

    /// Register `source` under `channel` if it is not already, then attach the
    /// host's message-formatting resource when the registration has none.
    ///
    /// Once a resource is attached, further calls only read host state.
    /// A resource that cannot be located is not an error.
    pub fn ensure_registered(
        &self,
        channel: &str,
        source: &str,
    ) -> Result<Registration, RegistrationError> {
        validate_channel(channel).map_err(RegistrationError::InvalidChannel)?;
        let source = Self::effective_source(channel, source);

        let mut created = false;
        if !self.host.source_exists(channel, source)? {
            // a concurrent creator may win the race; the host treats that as success
            self.host.create_source(channel, source)?;
            created = true;
            info!("Registered event source '{}' under '{}'", source, channel);
        }

        let existing = self
            .host
            .read_field(channel, source, MESSAGE_FILE_FIELD)?
            .filter(|value| !value.is_empty());

        let message_resource = match existing {
            Some(value) => Some(value),
            None => self.attach_message_resource(channel, source)?,
        };

        Ok(Registration {
            channel: channel.to_string(),
            source: source.to_string(),
            created,
            message_resource,
        })
    }

    fn attach_message_resource(
        &self,
        channel: &str,
        source: &str,
    ) -> Result<Option<String>, RegistrationError> {
        let Some(location) = self.host.message_resource_location() else {
            debug!("No message resource location known to host, skipping");
            return Ok(None);
        };

        if !location.is_file() {
            debug!("Message resource not found at {}", location.display());
            return Ok(None);
        }

        let value = location.to_string_lossy().into_owned();
        self.host
            .write_field(channel, source, MESSAGE_FILE_FIELD, &value)?;
        debug!(
            "Attached message resource {} to '{}' under '{}'",
            value, source, channel
        );
        Ok(Some(value))
    }
}
