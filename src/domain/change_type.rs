/// What a change request does to the subscriber's newsletter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// Add the given newsletters, leaving the others untouched.
    Subscribe,
    /// Remove the given newsletters, leaving the others untouched.
    Unsubscribe,
    /// The given newsletters become the complete list.
    Set,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Subscribe => "subscribe",
            ChangeType::Unsubscribe => "unsubscribe",
            ChangeType::Set => "set",
        }
    }
}

impl TryFrom<String> for ChangeType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "subscribe" => Ok(Self::Subscribe),
            "unsubscribe" => Ok(Self::Unsubscribe),
            "set" => Ok(Self::Set),
            other => Err(format!("{} is not a known change type.", other)),
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
