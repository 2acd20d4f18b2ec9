use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::features::{FeatureValue, FeatureVector};

use super::Classifier;

/// Gradient-boosted tree ensemble exported as JSON.
///
/// Each tree contributes a score to one class; the predicted label is the class with the
/// highest summed score. Categorical columns are encoded as the index of the value in
/// `categories[column]`; an unlisted category is treated as missing.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    classes: Vec<i64>,
    #[serde(default)]
    base_score: Vec<f64>,
    #[serde(default)]
    categories: HashMap<String, Vec<String>>,
    trees: Vec<Tree>,
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    class_index: usize,
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default)]
        missing: Option<usize>,
    },
    Leaf {
        leaf: f64,
    },
}

impl TreeEnsemble {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact: {}", path.display()))?;

        Self::from_json(&contents)
            .with_context(|| format!("Invalid model artifact: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let model: TreeEnsemble = serde_json::from_str(json).context("Failed to parse model JSON")?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            bail!("model declares no classes");
        }
        if !self.base_score.is_empty() && self.base_score.len() != self.classes.len() {
            bail!(
                "base_score has {} entries but model has {} classes",
                self.base_score.len(),
                self.classes.len()
            );
        }

        for (i, tree) in self.trees.iter().enumerate() {
            if tree.class_index >= self.classes.len() {
                bail!("tree {i} targets class index {} out of range", tree.class_index);
            }
            if tree.nodes.is_empty() {
                bail!("tree {i} has no nodes");
            }
            for node in &tree.nodes {
                if let Node::Split { left, right, missing, .. } = node {
                    let n = tree.nodes.len();
                    if *left >= n || *right >= n || missing.is_some_and(|m| m >= n) {
                        bail!("tree {i} has a child index out of range");
                    }
                }
            }
        }

        Ok(())
    }

    fn encode(&self, feature: &str, features: &FeatureVector) -> Option<f64> {
        match features.get(feature)? {
            FeatureValue::Number(v) if v.is_nan() => None,
            FeatureValue::Number(v) => Some(*v),
            FeatureValue::Category(value) => self
                .categories
                .get(feature)?
                .iter()
                .position(|c| c == value)
                .map(|idx| idx as f64),
        }
    }

    fn score_tree(&self, tree: &Tree, features: &FeatureVector) -> Result<f64> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..tree.nodes.len() {
            let node = tree
                .nodes
                .get(idx)
                .ok_or_else(|| anyhow!("node index {idx} out of range"))?;

            match node {
                Node::Leaf { leaf } => return Ok(*leaf),
                Node::Split { feature, threshold, left, right, missing } => {
                    idx = match self.encode(feature, features) {
                        Some(v) if v < *threshold => *left,
                        Some(_) => *right,
                        None => missing.unwrap_or(*left),
                    };
                }
            }
        }

        bail!("tree does not terminate in a leaf")
    }
}

impl Classifier for TreeEnsemble {
    fn predict(&self, features: &FeatureVector) -> Result<i64> {
        let mut scores = if self.base_score.is_empty() {
            vec![0.0; self.classes.len()]
        } else {
            self.base_score.clone()
        };

        for (i, tree) in self.trees.iter().enumerate() {
            let score = self.score_tree(tree, features).with_context(|| format!("tree {i}"))?;
            scores[tree.class_index] += score;
        }

        let best = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .ok_or_else(|| anyhow!("model declares no classes"))?;

        Ok(self.classes[best])
    }
}
