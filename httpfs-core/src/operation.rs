use std::fmt;

/// The unit of work selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Stream the whole file back to the client.
    Read,
    /// Create the file if needed and append the request body.
    AppendWrite,
    /// Create the file if needed and replace its content with the request body.
    TruncateWrite,
    /// Remove the file.
    Delete,
}

impl OperationKind {
    /// Gerund naming the attempted action, as used in client-facing errors.
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::Read => "reading",
            Self::AppendWrite => "appending",
            Self::TruncateWrite => "truncating",
            Self::Delete => "deleting",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}
