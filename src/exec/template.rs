// src/exec/template.rs

use crate::types::{LaunchMode, PackageId};

/// Placeholder substituted with the package identifier.
pub const PACKAGE_PLACEHOLDER: &str = "{package}";

/// Build command template, e.g. `go install example.com/repo/{package}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    template: String,
    mode: LaunchMode,
}

impl BuildCommand {
    pub fn new(template: impl Into<String>, mode: LaunchMode) -> Self {
        Self {
            template: template.into(),
            mode,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn mode(&self) -> LaunchMode {
        self.mode
    }

    /// Substitute every `{package}` occurrence with `package`.
    pub fn render(&self, package: &PackageId) -> String {
        self.template.replace(PACKAGE_PLACEHOLDER, package.as_str())
    }
}

/// Returns true if `template` contains the package placeholder.
pub fn has_placeholder(template: &str) -> bool {
    template.contains(PACKAGE_PLACEHOLDER)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::resolve::resolve;

    #[test]
    fn renders_package_into_template() {
        let pkg = resolve(
            Path::new("/home/u/proj/src/test/foo/bar_test.go"),
            Path::new("/home/u/proj"),
        )
        .unwrap();
        let cmd = BuildCommand::new("go install github.com/org/repo/{package}", LaunchMode::Shell);
        assert_eq!(cmd.render(&pkg), "go install github.com/org/repo/src/test/foo");
    }

    #[test]
    fn placeholder_detection() {
        assert!(has_placeholder("make -C {package}"));
        assert!(!has_placeholder("make -C {pkg}"));
    }
}
