use serde::{Serialize, Serializer};

/// Format the subscriber wants their email in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailFormat {
    #[default]
    Html,
    Text,
}

impl EmailFormat {
    /// Accepts the short platform codes as well as the long names, in any case.
    pub fn parse(s: &str) -> Result<EmailFormat, String> {
        match s.trim().to_lowercase().as_str() {
            "h" | "html" => Ok(Self::Html),
            "t" | "text" => Ok(Self::Text),
            _ => Err(format!("{} is not a valid email format.", s)),
        }
    }

    /// Reads the value stored on the platform, where anything but `T` is HTML.
    pub fn from_platform(value: Option<&str>) -> EmailFormat {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("t") => Self::Text,
            _ => Self::Html,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            EmailFormat::Html => "H",
            EmailFormat::Text => "T",
        }
    }
}

impl Serialize for EmailFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_code())
    }
}
