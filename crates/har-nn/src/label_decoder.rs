//! Maps classifier output indices to activity labels.

use crate::error::{NnError, NnResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelFile {
    Wrapped { classes: Vec<String> },
    Bare(Vec<String>),
}

/// Ordered set of class labels known to the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDecoder {
    classes: Vec<String>,
}

impl LabelDecoder {
    /// Build a decoder from an ordered label list
    pub fn new(classes: Vec<String>) -> NnResult<Self> {
        if classes.is_empty() {
            return Err(NnError::config("label decoder has no classes"));
        }
        let mut seen = HashSet::new();
        for label in &classes {
            if !seen.insert(label.as_str()) {
                return Err(NnError::config(format!("duplicate class label '{}'", label)));
            }
        }
        Ok(Self { classes })
    }

    /// Load from `{"classes": [...]}` or a bare JSON array
    pub fn from_json<P: AsRef<Path>>(path: P) -> NnResult<Self> {
        let path = path.as_ref();
        info!(?path, "Loading label encoder");
        let contents = std::fs::read_to_string(path).map_err(|e| {
            NnError::model_load("label encoder", format!("{}: {}", path.display(), e))
        })?;
        let file: LabelFile = serde_json::from_str(&contents).map_err(|e| {
            NnError::model_load("label encoder", format!("{}: {}", path.display(), e))
        })?;
        let classes = match file {
            LabelFile::Wrapped { classes } | LabelFile::Bare(classes) => classes,
        };
        let decoder =
            Self::new(classes).map_err(|e| NnError::model_load("label encoder", e.to_string()))?;
        info!(classes = ?decoder.classes, "Label encoder loaded");
        Ok(decoder)
    }

    /// Label for a class index
    pub fn decode(&self, index: usize) -> NnResult<&str> {
        self.classes.get(index).map(String::as_str).ok_or_else(|| {
            NnError::inference(format!(
                "class index {} is outside the {} known labels",
                index,
                self.classes.len()
            ))
        })
    }

    /// All labels in index order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of known classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Always false for a constructed decoder
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_decode_in_range() {
        let decoder = LabelDecoder::new(labels(&["A", "B", "C"])).unwrap();
        assert_eq!(decoder.decode(0).unwrap(), "A");
        assert_eq!(decoder.decode(2).unwrap(), "C");
    }

    #[test]
    fn test_decode_out_of_range_is_inference_error() {
        let decoder = LabelDecoder::new(labels(&["A"])).unwrap();
        assert!(matches!(decoder.decode(1), Err(NnError::Inference(_))));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(LabelDecoder::new(labels(&["A", "A"])).is_err());
        assert!(LabelDecoder::new(Vec::new()).is_err());
    }

    #[test]
    fn test_from_json_both_layouts() {
        let mut wrapped = tempfile::NamedTempFile::new().unwrap();
        write!(wrapped, r#"{{"classes": ["A", "B", "C", "D", "E"]}}"#).unwrap();
        assert_eq!(LabelDecoder::from_json(wrapped.path()).unwrap().len(), 5);

        let mut bare = tempfile::NamedTempFile::new().unwrap();
        write!(bare, r#"["Sitting", "Walking"]"#).unwrap();
        let decoder = LabelDecoder::from_json(bare.path()).unwrap();
        assert_eq!(decoder.classes(), &["Sitting".to_string(), "Walking".to_string()]);
    }
}
