pub mod store;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// The experiment settings document shared with the media server.
///
/// The key names are a collaborator contract: the media server and the
/// retraining job read the same file. Unknown keys at every level are kept
/// in flattened catch-all maps so a rewrite never drops fields this
/// supervisor does not understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub experiments: Vec<Experiment>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub fingerprint: Fingerprint,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abr_name: Option<String>,
    pub cc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abr_config: Option<AbrConfig>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbrConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Fingerprint {
    /// Exact match selecting the canonical experiment to retrain
    fn is_retrain_canonical(&self, cc: &str, abr_name: &str) -> bool {
        self.cc == cc && self.abr_name.as_deref() == Some(abr_name)
    }

    /// Substring match selecting every consumer of a shared model family
    fn shares_model(&self, cc: &str, tag: &str) -> bool {
        self.cc == cc && self.abr_name.as_deref().is_some_and(|name| name.contains(tag))
    }
}

impl Settings {
    /// Experiments whose fingerprint names exactly `abr_name` under `cc`.
    /// These are the canonical experiments whose model gets retrained.
    pub fn eligible_for_retrain(&self, cc: &str, abr_name: &str) -> Vec<&Experiment> {
        self.experiments
            .iter()
            .filter(|e| e.fingerprint.is_retrain_canonical(cc, abr_name))
            .collect()
    }

    /// Experiments whose abr_name contains `tag` under `cc`: the full set of
    /// consumers that share one trained model.
    pub fn sharing_model(&self, cc: &str, tag: &str) -> Vec<&Experiment> {
        self.experiments
            .iter()
            .filter(|e| e.fingerprint.shares_model(cc, tag))
            .collect()
    }

    /// Point every model-family consumer at `new_model_dir`. Returns the
    /// number of experiments updated. Experiments outside the family are
    /// left untouched.
    pub fn update_shared_model(&mut self, cc: &str, tag: &str, new_model_dir: &str) -> usize {
        let mut updated = 0;
        for experiment in &mut self.experiments {
            if !experiment.fingerprint.shares_model(cc, tag) {
                continue;
            }
            let abr_config = experiment
                .fingerprint
                .abr_config
                .get_or_insert_with(|| AbrConfig {
                    model_dir: None,
                    extra: BTreeMap::new(),
                });
            abr_config.model_dir = Some(new_model_dir.to_string());
            updated += 1;
        }
        updated
    }
}
