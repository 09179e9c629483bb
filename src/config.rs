use serde::Deserialize;

/// Options for [`crate::Model::from_slice_with`].
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LoadOptions {
    /// Reject containers whose header version is not 2.
    pub strict_version: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict_version: true,
        }
    }
}

/// Options for [`crate::gpu::ResourceBuilder`].
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BuildOptions {
    /// Prefix for GPU object labels, e.g. `"glb"` gives `"glb accessor 3 (POSITION)"`.
    pub label_prefix: String,
    /// Upload attributes that have no binding location (custom semantics).
    pub upload_unbound_attributes: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            label_prefix: "glb".to_string(),
            upload_unbound_attributes: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options: BuildOptions = serde_json::from_str(r#"{"label_prefix": "lantern"}"#).unwrap();
        assert_eq!(options.label_prefix, "lantern");
        assert!(options.upload_unbound_attributes);

        let options: LoadOptions = serde_json::from_str("{}").unwrap();
        assert!(options.strict_version);
        let options: LoadOptions = serde_json::from_str(r#"{"strict_version": false}"#).unwrap();
        assert!(!options.strict_version);
    }
}
