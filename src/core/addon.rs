//! Addon interface and hook dispatch.
//!
//! Addons contribute optional lifecycle hooks around a build. Each addon
//! declares which hooks it implements; the orchestrator only calls those.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{BuildResult, ResultAnnotation};

/// Lifecycle hooks an addon may implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hook {
    PreBuild,
    Build,
    PostBuild,
    OutputReady,
    BuildError,
}

impl Hook {
    pub const ALL: [Hook; 5] = [
        Hook::PreBuild,
        Hook::Build,
        Hook::PostBuild,
        Hook::OutputReady,
        Hook::BuildError,
    ];

    /// Lifecycle name as written in config files
    pub fn name(self) -> &'static str {
        match self {
            Hook::PreBuild => "preBuild",
            Hook::Build => "build",
            Hook::PostBuild => "postBuild",
            Hook::OutputReady => "outputReady",
            Hook::BuildError => "buildError",
        }
    }

    /// Parse a lifecycle name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|hook| hook.name() == name)
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pluggable collaborator contributing build hooks
///
/// Every hook has a no-op default; `implements` decides which ones the
/// orchestrator actually calls.
#[async_trait]
pub trait Addon: Send + Sync {
    /// Human-readable addon name
    fn name(&self) -> &str;

    /// Whether this addon provides `hook`
    fn implements(&self, hook: Hook) -> bool;

    async fn pre_build(&self, _annotation: Option<&ResultAnnotation>) -> Result<()> {
        Ok(())
    }

    async fn build(&self) -> Result<()> {
        Ok(())
    }

    async fn post_build(&self, _result: &BuildResult) -> Result<()> {
        Ok(())
    }

    async fn output_ready(&self, _result: &BuildResult) -> Result<()> {
        Ok(())
    }

    async fn build_error(&self, _error: &anyhow::Error) -> Result<()> {
        Ok(())
    }
}

/// A hook invocation with its arguments
#[derive(Clone, Copy)]
pub enum HookCall<'a> {
    PreBuild(Option<&'a ResultAnnotation>),
    Build,
    PostBuild(&'a BuildResult),
    OutputReady(&'a BuildResult),
    BuildError(&'a anyhow::Error),
}

impl HookCall<'_> {
    pub fn hook(&self) -> Hook {
        match self {
            HookCall::PreBuild(_) => Hook::PreBuild,
            HookCall::Build => Hook::Build,
            HookCall::PostBuild(_) => Hook::PostBuild,
            HookCall::OutputReady(_) => Hook::OutputReady,
            HookCall::BuildError(_) => Hook::BuildError,
        }
    }

    /// Invoke this hook on `addon`
    pub async fn dispatch(&self, addon: &dyn Addon) -> Result<()> {
        match *self {
            HookCall::PreBuild(annotation) => addon.pre_build(annotation).await,
            HookCall::Build => addon.build().await,
            HookCall::PostBuild(result) => addon.post_build(result).await,
            HookCall::OutputReady(result) => addon.output_ready(result).await,
            HookCall::BuildError(error) => addon.build_error(error).await,
        }
    }
}

/// Addons implementing `hook`, in registration order
pub fn implementors(addons: &[Arc<dyn Addon>], hook: Hook) -> Vec<Arc<dyn Addon>> {
    addons
        .iter()
        .filter(|addon| addon.implements(hook))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyPostBuild(&'static str);

    #[async_trait]
    impl Addon for OnlyPostBuild {
        fn name(&self) -> &str {
            self.0
        }

        fn implements(&self, hook: Hook) -> bool {
            hook == Hook::PostBuild
        }
    }

    #[test]
    fn test_hook_names_roundtrip() {
        for hook in Hook::ALL {
            assert_eq!(Hook::from_name(hook.name()), Some(hook));
        }
        assert_eq!(Hook::from_name("postbuild"), None);
        assert_eq!(Hook::OutputReady.to_string(), "outputReady");
    }

    #[test]
    fn test_implementors_preserve_order() {
        let addons: Vec<Arc<dyn Addon>> = vec![
            Arc::new(OnlyPostBuild("first")),
            Arc::new(OnlyPostBuild("second")),
        ];

        let names: Vec<String> = implementors(&addons, Hook::PostBuild)
            .iter()
            .map(|a| a.name().to_string())
            .collect();

        assert_eq!(names, vec!["first", "second"]);
        assert!(implementors(&addons, Hook::PreBuild).is_empty());
    }

    #[tokio::test]
    async fn test_default_hooks_succeed() {
        let addon = OnlyPostBuild("noop");
        let result = BuildResult::new("dist");

        assert!(HookCall::PostBuild(&result).dispatch(&addon).await.is_ok());
        assert!(HookCall::Build.dispatch(&addon).await.is_ok());
    }
}
