//! Crate-level test support and behaviour tests.

use mockall::mock;

pub(crate) use crate::test_support::StubCommand;
use crate::plugin::{PluginError, PluginExecutor, PluginManifest, PluginRequest, PluginResponse};


mock! {
    pub Executor {}
    impl PluginExecutor for Executor {
        fn execute(
            &self,
            manifest: &PluginManifest,
            request: &PluginRequest,
        ) -> Result<PluginResponse, PluginError>;
    }
}
