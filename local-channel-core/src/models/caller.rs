/// Caller identity carried by a channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallerId {
    pub num: Option<String>,
    pub name: Option<String>,
    pub dnid: Option<String>,
    pub rdnis: Option<String>,
    pub ani: Option<String>,
    pub presentation: i32,
    pub ani2: i32,
    pub ton: i32,
    pub tns: i32,
}

/// Per-call attributes inherited from the owner-side when a pair is called.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallProfile {
    pub language: String,
    pub accountcode: String,
    pub musicclass: String,
    pub cdr_flags: u32,
    /// Name of the application currently running on the channel.
    pub application: Option<String>,
}
