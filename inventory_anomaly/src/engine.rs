//! Train and score anomaly models over aggregated rows
//!
//! A model is fitted once on a snapshot of [`AggregatedFrame`] rows and is
//! bound to the ordered list of feature columns it was trained on. Scoring
//! rejects any other column list. Every run retrains from scratch, so the
//! same data and seed always reproduce the same model.

use crate::error::{AnomalyError, Result};
use crate::forest::{ForestParams, IsolationForest, DEFAULT_MAX_SAMPLES};
use crate::scored::ScoredFrame;
use inventory_data::AggregatedFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Aggregate column used as the consumption feature by the pipeline
pub const CONSUMPTION_FEATURE: &str = "consumption_mean";
/// Aggregate column used as the stock feature by the pipeline
pub const STOCK_FEATURE: &str = "stock_mean";

/// Training settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Expected anomaly fraction, in (0, 0.5]
    pub contamination: f64,
    pub random_state: u64,
    pub n_estimators: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            contamination: 0.1,
            random_state: 42,
            n_estimators: 100,
        }
    }
}

impl TrainingParams {
    pub fn with_contamination(contamination: f64) -> Self {
        Self {
            contamination,
            ..Default::default()
        }
    }
}

/// A trained outlier model bound to its feature columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyModel {
    feature_columns: Vec<String>,
    params: TrainingParams,
    training_rows: usize,
    forest: IsolationForest,
}

impl AnomalyModel {
    /// Feature columns, in training order
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    pub fn contamination(&self) -> f64 {
        self.params.contamination
    }

    /// Number of complete rows the model was fitted on
    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    pub fn forest(&self) -> &IsolationForest {
        &self.forest
    }
}

/// Fit a model on the rows of `data` whose features are all present
pub fn train<S: AsRef<str>>(
    data: &AggregatedFrame,
    feature_columns: &[S],
    params: &TrainingParams,
) -> Result<AnomalyModel> {
    let columns = resolve_columns(data, feature_columns)?;
    let (matrix, _) = feature_matrix(data, &columns);
    if matrix.is_empty() {
        return Err(AnomalyError::DataError(
            "No rows with complete features to train on".to_string(),
        ));
    }

    info!(
        rows = matrix.len(),
        features = ?columns,
        contamination = params.contamination,
        n_estimators = params.n_estimators,
        "Training isolation forest"
    );

    let forest = IsolationForest::fit(
        &matrix,
        &ForestParams {
            n_estimators: params.n_estimators,
            max_samples: DEFAULT_MAX_SAMPLES,
            contamination: params.contamination,
            random_state: params.random_state,
        },
    )?;

    Ok(AnomalyModel {
        feature_columns: columns.into_iter().map(|(name, _)| name).collect(),
        params: params.clone(),
        training_rows: matrix.len(),
        forest,
    })
}

/// Score every row of `data`
///
/// Rows with a missing or infinite feature keep `anomaly_score = NaN` and
/// `is_anomaly = false`. Larger scores are more anomalous.
pub fn score<S: AsRef<str>>(
    model: &AnomalyModel,
    data: &AggregatedFrame,
    feature_columns: &[S],
) -> Result<ScoredFrame> {
    let columns = resolve_columns(data, feature_columns)?;
    let requested: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
    if requested != model.feature_columns {
        return Err(AnomalyError::FeatureMismatch {
            expected: model.feature_columns.clone(),
            found: requested,
        });
    }

    let (matrix, valid_rows) = feature_matrix(data, &columns);
    if matrix.is_empty() {
        return Err(AnomalyError::DataError(
            "No rows with complete features to score".to_string(),
        ));
    }

    let raw = model.forest.score_samples(&matrix);
    let flags = model.forest.predict_scores(&raw);

    let mut anomaly_score = vec![f64::NAN; data.len()];
    let mut is_anomaly = vec![false; data.len()];
    for ((&row, &s), &flag) in valid_rows.iter().zip(&raw).zip(&flags) {
        anomaly_score[row] = -s;
        is_anomaly[row] = flag;
    }

    let scored = ScoredFrame::new(data.clone(), anomaly_score, is_anomaly);
    info!(
        scored = valid_rows.len(),
        skipped = data.len() - valid_rows.len(),
        anomalies = scored.anomaly_count(),
        mean_score = scored.mean_score_flagged(),
        "Scored rows"
    );
    Ok(scored)
}

/// Train on and score the same snapshot using whichever of the two columns exist
pub fn detect_anomalies(
    data: &AggregatedFrame,
    consumption_column: &str,
    stock_column: &str,
    contamination: f64,
) -> Result<(ScoredFrame, AnomalyModel)> {
    detect_anomalies_with(
        data,
        consumption_column,
        stock_column,
        &TrainingParams::with_contamination(contamination),
    )
}

/// [`detect_anomalies`] with full training settings
pub fn detect_anomalies_with(
    data: &AggregatedFrame,
    consumption_column: &str,
    stock_column: &str,
    params: &TrainingParams,
) -> Result<(ScoredFrame, AnomalyModel)> {
    let features: Vec<&str> = [consumption_column, stock_column]
        .into_iter()
        .filter(|c| data.has_column(c))
        .collect();
    if features.is_empty() {
        return Err(AnomalyError::DataError(format!(
            "Neither '{}' nor '{}' is present in the data",
            consumption_column, stock_column
        )));
    }
    debug!(features = ?features, "Resolved anomaly features");

    let model = train(data, &features, params)?;
    let scored = score(&model, data, &features)?;
    Ok((scored, model))
}

/// Map names to column indices, failing on the first absent name
fn resolve_columns<S: AsRef<str>>(
    data: &AggregatedFrame,
    feature_columns: &[S],
) -> Result<Vec<(String, usize)>> {
    if feature_columns.is_empty() {
        return Err(AnomalyError::InvalidParameter(
            "At least one feature column is required".to_string(),
        ));
    }

    let missing: Vec<&str> = feature_columns
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| !data.has_column(c))
        .collect();
    if !missing.is_empty() {
        return Err(AnomalyError::DataError(format!(
            "Feature columns not found in data: {}",
            missing.join(", ")
        )));
    }

    Ok(feature_columns
        .iter()
        .filter_map(|c| {
            let name = c.as_ref();
            data.column_index(name).map(|idx| (name.to_string(), idx))
        })
        .collect())
}

/// Complete feature rows and their positions in `data`
///
/// A row is complete when every feature is finite; NaN and infinite values
/// leave the row out of both training and scoring.
fn feature_matrix(data: &AggregatedFrame, columns: &[(String, usize)]) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut matrix = Vec::new();
    let mut positions = Vec::new();
    for (pos, row) in data.rows().iter().enumerate() {
        let features: Vec<f64> = columns.iter().map(|(_, idx)| row.values[*idx]).collect();
        if features.iter().all(|v| v.is_finite()) {
            matrix.push(features);
            positions.push(pos);
        }
    }
    (matrix, positions)
}
