//! Blog declarations shared by unit tests (same files the demo server loads).

use crate::config::{resolve, FullConfig, ResolvedModel};

pub(crate) fn blog_config() -> FullConfig {
    FullConfig {
        models: serde_json::from_str(include_str!("../demo_server/schema/models.json")).unwrap(),
        resources: serde_json::from_str(include_str!("../demo_server/schema/resources.json")).unwrap(),
    }
}

pub(crate) fn blog_model() -> ResolvedModel {
    resolve(&blog_config()).unwrap()
}
