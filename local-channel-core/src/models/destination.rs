use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::LocalError;

/// Per-pair options parsed from the `/options` suffix of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LocalOptions {
    /// `n`: never masquerade the pair out of the call path.
    pub no_optimization: bool,
    /// `j`: enable the jitterbuffer on the owner-side (requires `n`).
    pub jitterbuffer: bool,
    /// `b`: report the far real channel as the bridged peer.
    pub bridge_report: bool,
    /// `m`: relay hold/unhold instead of playing music-on-hold locally.
    pub moh_passthru: bool,
}

impl LocalOptions {
    fn parse(opts: &str) -> Self {
        let no_optimization = opts.contains('n');
        let mut jitterbuffer = false;
        if opts.contains('j') {
            if no_optimization {
                jitterbuffer = true;
            } else {
                log::error!(
                    "the 'n' option is required with 'j' to enable the jitterbuffer on a local channel"
                );
            }
        }
        Self {
            no_optimization,
            jitterbuffer,
            bridge_report: opts.contains('b'),
            moh_passthru: opts.contains('m'),
        }
    }
}

/// Parsed `extension[@context][/options]` destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub exten: String,
    pub context: String,
    pub options: LocalOptions,
}

impl Destination {
    /// Parse a destination, falling back to `default_context` when no `@context` is given.
    pub fn parse(data: &str, default_context: &str) -> Result<Self, LocalError> {
        let (target, options) = match data.split_once('/') {
            Some((target, opts)) => (target, LocalOptions::parse(opts)),
            None => (data, LocalOptions::default()),
        };

        let (exten, context) = match target.split_once('@') {
            Some((exten, context)) => (exten, context),
            None => (target, default_context),
        };

        if exten.is_empty() {
            return Err(LocalError::InvalidDestination {
                destination: data.to_string(),
                reason: "missing extension".into(),
            });
        }
        if context.is_empty() {
            return Err(LocalError::InvalidDestination {
                destination: data.to_string(),
                reason: "empty context".into(),
            });
        }

        Ok(Self {
            exten: exten.to_string(),
            context: context.to_string(),
            options,
        })
    }

    /// Parse the device part of a device-state query. Requires an explicit context.
    pub fn parse_device(data: &str) -> Option<(String, String)> {
        let (exten, rest) = data.split_once('@')?;
        let context = rest.split_once('/').map_or(rest, |(context, _)| context);
        Some((exten.to_string(), context.to_string()))
    }
}

impl FromStr for Destination {
    type Err = LocalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, "default")
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.exten, self.context)
    }
}
