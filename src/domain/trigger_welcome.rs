/// Whether the caller wants welcome messages sent for this change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerWelcome {
    Send,
    Suppress,
    #[default]
    Default,
}

impl TriggerWelcome {
    /// `Y` asks for welcomes, absence keeps the default, anything else suppresses them.
    pub fn parse(value: Option<&str>) -> TriggerWelcome {
        match value {
            None => Self::Default,
            Some("Y") => Self::Send,
            Some(_) => Self::Suppress,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        *self == Self::Suppress
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerWelcome::Send => "send",
            TriggerWelcome::Suppress => "suppress",
            TriggerWelcome::Default => "default",
        }
    }
}

impl TryFrom<String> for TriggerWelcome {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "send" => Ok(Self::Send),
            "suppress" => Ok(Self::Suppress),
            "default" => Ok(Self::Default),
            other => Err(format!("{} is not a known welcome trigger.", other)),
        }
    }
}
