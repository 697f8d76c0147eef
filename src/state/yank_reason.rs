use std::fmt;

/// Why a link is excluded from fetching
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum YankReason {
    /// The URL matched a configured yank pattern
    Yanked,

    /// The URL is external and external links are avoided
    ExternalAvoided,

    /// robots.txt of the site disallows the URL
    RobotRestricted,

    /// No fetcher is registered for the URL scheme
    UnsupportedScheme(String),
}

impl YankReason {
    /// Converts the reason to its database string representation
    pub fn to_db_string(&self) -> String {
        match self {
            Self::Yanked => "yanked".to_string(),
            Self::ExternalAvoided => "external avoided".to_string(),
            Self::RobotRestricted => "robot restricted".to_string(),
            Self::UnsupportedScheme(scheme) => format!("unsupported scheme ({})", scheme),
        }
    }

    /// Parses a reason from its database string representation
    ///
    /// Returns None if the string doesn't match any known reason.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "yanked" => Some(Self::Yanked),
            "external avoided" => Some(Self::ExternalAvoided),
            "robot restricted" => Some(Self::RobotRestricted),
            _ => s
                .strip_prefix("unsupported scheme (")
                .and_then(|rest| rest.strip_suffix(')'))
                .map(|scheme| Self::UnsupportedScheme(scheme.to_string())),
        }
    }
}

impl fmt::Display for YankReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
