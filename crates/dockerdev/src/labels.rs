//! Container labels.

use std::collections::BTreeMap;

/// Label holding the deployment id.
pub const LABEL_ID: &str = "waypoint.hashicorp.com/id";
pub const LABEL_APP: &str = "app";
pub const LABEL_WORKSPACE: &str = "workspace";

/// The labels every deployed container carries.
pub fn default_labels(deployment_id: &str, app: &str, workspace: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_ID.to_string(), deployment_id.to_string()),
        (LABEL_APP.to_string(), app.to_string()),
        (LABEL_WORKSPACE.to_string(), workspace.to_string()),
    ])
}

/// Merges user labels with the system defaults into a new map.
///
/// Last write wins per key and the defaults are written last, so a user
/// cannot override `id`, `app` or `workspace`.
pub fn merge_labels(
    user: &BTreeMap<String, String>,
    defaults: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    user.iter()
        .chain(defaults.iter())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_keys_win() {
        let user = BTreeMap::from([
            ("app".to_string(), "spoofed".to_string()),
            ("team".to_string(), "payments".to_string()),
        ]);
        let merged = merge_labels(&user, &default_labels("01H", "web", "default"));

        assert_eq!(merged["app"], "web");
        assert_eq!(merged["team"], "payments");
        assert_eq!(merged[LABEL_ID], "01H");
        assert_eq!(merged.len(), 4);
        assert_eq!(user["app"], "spoofed");
    }

    #[test]
    fn no_user_labels_gives_defaults() {
        let defaults = default_labels("01H", "web", "dev");
        assert_eq!(merge_labels(&BTreeMap::new(), &defaults), defaults);
    }
}
