//! Syslog header of a drain frame payload.
//!
//! Drain payloads follow the logplex flavour of RFC 5424:
//! ```text
//! <PRI>VERSION TIMESTAMP HOSTNAME APP-NAME PROCID MSGID MSG
//! <134>1 2024-03-01T10:00:00+00:00 host app postgres.1 - LOG:  checkpoint starting
//! ```
//! The platform never emits STRUCTURED-DATA, so everything after MSGID is
//! the message.

/// Header fields of one frame, borrowed from the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogHeader<'a> {
    pub priority: u8,
    pub version: u8,
    pub timestamp: &'a str,
    pub hostname: &'a str,
    pub app_name: &'a str,
    pub proc_id: &'a str,
    pub msg_id: &'a str,
}

impl<'a> SyslogHeader<'a> {
    /// Split `payload` into its header and message.
    ///
    /// Returns `None` if the payload is not UTF-8 or does not carry a full
    /// header. One trailing newline is removed from the message.
    pub fn parse(payload: &'a [u8]) -> Option<(Self, &'a str)> {
        let text = std::str::from_utf8(payload).ok()?;
        let mut fields = text.splitn(7, ' ');

        let (priority, version) = parse_pri_version(fields.next()?)?;
        let timestamp = non_empty(fields.next()?)?;
        let hostname = non_empty(fields.next()?)?;
        let app_name = non_empty(fields.next()?)?;
        let proc_id = non_empty(fields.next()?)?;
        let msg_id = non_empty(fields.next()?)?;
        let message = fields.next().unwrap_or(&text[text.len()..]);

        let message = message.strip_suffix('\n').unwrap_or(message);
        let message = message.strip_suffix('\r').unwrap_or(message);

        Some((
            Self {
                priority,
                version,
                timestamp,
                hostname,
                app_name,
                proc_id,
                msg_id,
            },
            message,
        ))
    }

    /// Render the header followed by `message`, the inverse of [`parse`](Self::parse).
    pub fn render(&self, message: &str) -> String {
        format!(
            "<{}>{} {} {} {} {} {} {}",
            self.priority,
            self.version,
            self.timestamp,
            self.hostname,
            self.app_name,
            self.proc_id,
            self.msg_id,
            message
        )
    }
}

fn parse_pri_version(token: &str) -> Option<(u8, u8)> {
    let rest = token.strip_prefix('<')?;
    let (pri, version) = rest.split_once('>')?;
    if pri.is_empty() || pri.len() > 3 || version.is_empty() {
        return None;
    }
    // PRI is facility * 8 + severity, at most 191
    let priority: u8 = pri.parse().ok().filter(|p| *p <= 191)?;
    let version: u8 = version.parse().ok()?;
    Some((priority, version))
}

fn non_empty(field: &str) -> Option<&str> {
    (!field.is_empty()).then_some(field)
}
