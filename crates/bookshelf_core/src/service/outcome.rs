//! Status messages and navigation targets returned to the admin surface.

use crate::model::resource::Container;
use std::fmt::{Display, Formatter};

/// Name of the contents listing view.
pub const CONTENTS_VIEW: &str = "@@contents";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Success,
    Danger,
}

impl StatusLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Danger => "danger",
        }
    }
}

/// One flash message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Success,
            text: text.into(),
        }
    }

    pub fn danger(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Danger,
            text: text.into(),
        }
    }
}

impl Display for StatusMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.text)
    }
}

/// Where the admin surface should go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub container: Container,
    pub view: &'static str,
}

impl NavigationTarget {
    pub fn contents(container: Container) -> Self {
        Self {
            container,
            view: CONTENTS_VIEW,
        }
    }

    /// `/@@contents` or `/<folder>/@@contents`.
    pub fn path(&self) -> String {
        match &self.container {
            Container::Root => format!("/{}", self.view),
            Container::Folder(name) => format!("/{name}/{}", self.view),
        }
    }
}

impl Display for NavigationTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::NavigationTarget;
    use crate::model::resource::Container;

    #[test]
    fn contents_paths() {
        assert_eq!(
            NavigationTarget::contents(Container::Root).path(),
            "/@@contents"
        );
        assert_eq!(
            NavigationTarget::contents(Container::folder("shelf")).path(),
            "/shelf/@@contents"
        );
    }
}
