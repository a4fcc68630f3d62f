//! Classifier adapter: Implementation of RecommendationModel.
//!
//! Loads the fertilizer classifier exported from the training pipeline.
//! Supported kinds:
//!
//! - `random_forest`: scikit-learn tree arrays per estimator. A sample goes
//!   left when `x[feature] <= threshold`; the prediction is the class with the
//!   highest mean leaf probability over all trees.
//! - `linear`: multinomial linear model, argmax of `coef · x + intercept`.
//!   A single coefficient row is a binary model (class 1 when the score is
//!   positive).
//!
//! Ties resolve to the lowest class index.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::ScaledFeatures;
use crate::ports::{ModelInputError, RecommendationModel};

use super::artifacts::{read_json, ArtifactError};

/// One decision tree in scikit-learn's flat array layout.
///
/// Leaves have `children_left == children_right == -1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class counts (or weights); only leaf rows are used.
    pub value: Vec<Vec<f64>>,
}

/// Classifier as written by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportedClassifier {
    RandomForest {
        n_features: usize,
        n_classes: usize,
        trees: Vec<ExportedTree>,
    },
    Linear {
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        proba: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_export(
        index: usize,
        tree: ExportedTree,
        n_features: usize,
        n_classes: usize,
    ) -> Result<Self, ArtifactError> {
        let invalid = |msg: String| ArtifactError::Invalid(format!("tree {index}: {msg}"));

        let n = tree.children_left.len();
        if n == 0 {
            return Err(invalid("has no nodes".into()));
        }
        if tree.children_right.len() != n
            || tree.feature.len() != n
            || tree.threshold.len() != n
            || tree.value.len() != n
        {
            return Err(invalid("node array lengths differ".into()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (tree.children_left[i], tree.children_right[i]);

            if left == -1 && right == -1 {
                let counts = &tree.value[i];
                if counts.len() != n_classes {
                    return Err(invalid(format!(
                        "leaf {i} has {} class values, expected {n_classes}",
                        counts.len()
                    )));
                }
                let total: f64 = counts.iter().sum();
                if !total.is_finite() || total <= 0.0 || counts.iter().any(|c| *c < 0.0) {
                    return Err(invalid(format!("leaf {i} has no usable class distribution")));
                }
                nodes.push(Node::Leaf {
                    proba: counts.iter().map(|c| c / total).collect(),
                });
                continue;
            }

            // Children always come after their parent in the exported layout,
            // which also guarantees traversal terminates.
            let child = |c: i64| -> Result<usize, ArtifactError> {
                usize::try_from(c)
                    .ok()
                    .filter(|c| *c > i && *c < n)
                    .ok_or_else(|| invalid(format!("node {i} has invalid child {c}")))
            };
            let feature = usize::try_from(tree.feature[i])
                .ok()
                .filter(|f| *f < n_features)
                .ok_or_else(|| {
                    invalid(format!("node {i} splits on invalid feature {}", tree.feature[i]))
                })?;
            if !tree.threshold[i].is_finite() {
                return Err(invalid(format!("node {i} has a non-finite threshold")));
            }

            nodes.push(Node::Split {
                feature,
                threshold: tree.threshold[i],
                left: child(left)?,
                right: child(right)?,
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_proba(&self, x: &[f64]) -> &[f64] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { proba } => return proba,
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Estimator {
    Forest(Vec<Tree>),
    Linear {
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
}

/// Validated fertilizer classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    estimator: Estimator,
    n_features: usize,
    n_classes: usize,
}

impl Classifier {
    /// Build a classifier from an in-memory export.
    ///
    /// # Errors
    /// Returns `ArtifactError::Invalid` if the export is structurally unsound.
    pub fn from_export(export: ExportedClassifier) -> Result<Self, ArtifactError> {
        match export {
            ExportedClassifier::RandomForest {
                n_features,
                n_classes,
                trees,
            } => {
                if n_features == 0 || n_classes == 0 {
                    return Err(ArtifactError::Invalid(
                        "random forest needs at least one feature and one class".into(),
                    ));
                }
                if trees.is_empty() {
                    return Err(ArtifactError::Invalid("random forest has no trees".into()));
                }
                let trees = trees
                    .into_iter()
                    .enumerate()
                    .map(|(i, t)| Tree::from_export(i, t, n_features, n_classes))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Self {
                    estimator: Estimator::Forest(trees),
                    n_features,
                    n_classes,
                })
            }
            ExportedClassifier::Linear {
                coefficients,
                intercepts,
            } => {
                let n_features = coefficients.first().map_or(0, Vec::len);
                if n_features == 0 {
                    return Err(ArtifactError::Invalid(
                        "linear model has no coefficients".into(),
                    ));
                }
                if coefficients.iter().any(|row| row.len() != n_features)
                    || intercepts.len() != coefficients.len()
                {
                    return Err(ArtifactError::Invalid(
                        "linear model coefficient and intercept shapes do not match".into(),
                    ));
                }
                if coefficients
                    .iter()
                    .flatten()
                    .chain(&intercepts)
                    .any(|v| !v.is_finite())
                {
                    return Err(ArtifactError::Invalid(
                        "linear model parameters must be finite".into(),
                    ));
                }

                let n_classes = if coefficients.len() == 1 {
                    2
                } else {
                    coefficients.len()
                };

                Ok(Self {
                    estimator: Estimator::Linear {
                        coefficients,
                        intercepts,
                    },
                    n_features,
                    n_classes,
                })
            }
        }
    }

    /// Load a classifier from an exported JSON file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or is invalid.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let export: ExportedClassifier = read_json(path)?;
        let model = Self::from_export(export)?;

        tracing::info!(
            "Loaded {} classifier from {:?} (n_features={}, n_classes={})",
            model.kind(),
            path,
            model.n_features,
            model.n_classes
        );

        Ok(model)
    }

    /// Name of the exported estimator kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self.estimator {
            Estimator::Forest(_) => "random_forest",
            Estimator::Linear { .. } => "linear",
        }
    }

    /// Per-class scores: mean leaf probabilities for a forest, decision
    /// function values for a linear model.
    fn scores(&self, x: &[f64]) -> Vec<f64> {
        match &self.estimator {
            Estimator::Forest(trees) => {
                let mut sum = vec![0.0; self.n_classes];
                for tree in trees {
                    for (acc, p) in sum.iter_mut().zip(tree.leaf_proba(x)) {
                        *acc += p;
                    }
                }
                let n = trees.len() as f64;
                sum.into_iter().map(|s| s / n).collect()
            }
            Estimator::Linear {
                coefficients,
                intercepts,
            } => coefficients
                .iter()
                .zip(intercepts)
                .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
                .collect(),
        }
    }
}

/// Index of the largest value; the first one wins a tie.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

impl RecommendationModel for Classifier {
    fn predict(&self, features: &ScaledFeatures) -> Result<u32, ModelInputError> {
        let x = features.as_slice();
        if x.len() != self.n_features {
            return Err(ModelInputError::FeatureCount {
                expected: self.n_features,
                got: x.len(),
            });
        }

        let scores = self.scores(x);
        let class = match &self.estimator {
            Estimator::Linear { coefficients, .. } if coefficients.len() == 1 => {
                usize::from(scores[0] > 0.0)
            }
            _ => argmax(&scores),
        };

        // n_classes fits in u32: it is bounded by the label encoder size.
        Ok(class as u32)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}
