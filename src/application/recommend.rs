//! Recommendation service: Orchestrates the inference pipeline.
//!
//! This service coordinates, in order:
//! - Structural validation of the inbound measurements
//! - Categorical encoding (soil, crop)
//! - Feature scaling
//! - Model prediction
//! - Label decoding
//! - Remark lookup

use std::path::Path;
use std::sync::Arc;

use crate::adapters::{ArtifactBundle, Classifier, FittedScaler, LabelEncoders};
use crate::domain::{
    CategoricalField, EncodedFeatures, MeasurementInput, MeasurementRecord, MissingField,
    RecommendationResult,
};
use crate::ports::{
    CategoryEncoder, EncoderError, FeatureScaler, ModelInputError, RecommendationModel,
};
use crate::AfrigrowError;

/// Pipeline step at which a recommendation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validate,
    Encode,
    Scale,
    Predict,
    Decode,
}

impl PipelineStage {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Encode => "encode",
            Self::Scale => "scale",
            Self::Predict => "predict",
            Self::Decode => "decode",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Underlying reason a recommendation failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FailureCause {
    #[error(transparent)]
    MissingField(#[from] MissingField),

    #[error(transparent)]
    Encoding(#[from] EncoderError),

    #[error(transparent)]
    ModelInput(#[from] ModelInputError),
}

/// A recommendation could not be produced. No partial result exists.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("recommendation failed at {stage} stage: {cause}")]
pub struct RecommendationFailed {
    pub stage: PipelineStage,
    #[source]
    pub cause: FailureCause,
}

impl RecommendationFailed {
    fn new(stage: PipelineStage, cause: impl Into<FailureCause>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    /// Whether the person who entered the measurements can fix this by
    /// resubmitting (a missing field or an unknown soil/crop). Everything else
    /// points at mismatched artifacts or a pipeline bug.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self.cause,
            FailureCause::MissingField(_)
                | FailureCause::Encoding(EncoderError::UnknownCategory { .. })
        )
    }
}

/// Check that every field of an inbound form is present and in range.
///
/// # Errors
/// Returns `AfrigrowError::Recommendation` at the validate stage for a missing
/// field, or `AfrigrowError::Validation` listing every out-of-range value.
pub fn checked_record(input: &MeasurementInput) -> crate::Result<MeasurementRecord> {
    let record = MeasurementRecord::try_from(input.clone())
        .map_err(|e| RecommendationFailed::new(PipelineStage::Validate, e))?;
    record.validate().map_err(AfrigrowError::Validation)?;
    Ok(record)
}

/// Service for running fertilizer recommendations.
///
/// Holds the loaded artifacts as shared read-only state. Build it once at
/// startup and share it (it is `Send + Sync`); nothing here mutates the
/// artifacts, so concurrent requests need no locking.
pub struct RecommendationService<E, S, M>
where
    E: CategoryEncoder,
    S: FeatureScaler,
    M: RecommendationModel,
{
    encoder: Arc<E>,
    scaler: Arc<S>,
    model: Arc<M>,
}

/// Service over the JSON-exported artifacts.
pub type DefaultRecommender = RecommendationService<LabelEncoders, FittedScaler, Classifier>;

impl<E, S, M> Clone for RecommendationService<E, S, M>
where
    E: CategoryEncoder,
    S: FeatureScaler,
    M: RecommendationModel,
{
    fn clone(&self) -> Self {
        Self {
            encoder: Arc::clone(&self.encoder),
            scaler: Arc::clone(&self.scaler),
            model: Arc::clone(&self.model),
        }
    }
}

impl<E, S, M> RecommendationService<E, S, M>
where
    E: CategoryEncoder,
    S: FeatureScaler,
    M: RecommendationModel,
{
    /// Create a new recommendation service.
    pub fn new(encoder: Arc<E>, scaler: Arc<S>, model: Arc<M>) -> Self {
        Self {
            encoder,
            scaler,
            model,
        }
    }

    /// The category encoder (vocabularies for soil, crop and fertilizer).
    #[must_use]
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Check that every field is present, then run the pipeline.
    ///
    /// # Errors
    /// Returns `RecommendationFailed` at the validate stage for a missing field,
    /// or whatever [`Self::recommend`] returns.
    pub fn recommend_input(
        &self,
        input: &MeasurementInput,
    ) -> Result<RecommendationResult, RecommendationFailed> {
        let record = MeasurementRecord::try_from(input.clone())
            .map_err(|e| RecommendationFailed::new(PipelineStage::Validate, e))?;
        self.recommend(&record)
    }

    /// Check presence and ranges of the inbound form, then run the pipeline.
    ///
    /// This is the entry point for measurements typed in by a person.
    ///
    /// # Errors
    /// Returns error if the form fails [`checked_record`] or the pipeline fails.
    pub fn recommend_checked(
        &self,
        input: &MeasurementInput,
    ) -> crate::Result<RecommendationResult> {
        let record = checked_record(input)?;
        Ok(self.recommend(&record)?)
    }

    /// Run the recommendation pipeline on a complete record.
    ///
    /// Performs, in fixed order:
    /// 1. Encode soil and crop
    /// 2. Scale the named feature vector
    /// 3. Predict the fertilizer class
    /// 4. Decode the class to its label
    /// 5. Attach the remark and the crop/soil echo
    ///
    /// The same record against the same artifacts always gives the same result.
    ///
    /// # Errors
    /// Returns `RecommendationFailed` carrying the stage and cause if any step
    /// rejects its input.
    pub fn recommend(
        &self,
        record: &MeasurementRecord,
    ) -> Result<RecommendationResult, RecommendationFailed> {
        tracing::debug!("Step 1: Encoding categorical fields...");
        let encoded = self.encode(record)?;

        tracing::debug!("Step 2: Scaling features...");
        let scaled = self
            .scaler
            .scale(&encoded)
            .map_err(|e| RecommendationFailed::new(PipelineStage::Scale, e))?;

        tracing::debug!("Step 3: Predicting fertilizer class...");
        let class = self
            .model
            .predict(&scaled)
            .map_err(|e| RecommendationFailed::new(PipelineStage::Predict, e))?;

        tracing::debug!("Step 4: Decoding class {}...", class);
        let fertilizer = self
            .encoder
            .decode(CategoricalField::Fertilizer, class)
            .map_err(|e| RecommendationFailed::new(PipelineStage::Decode, e))?;

        let result = RecommendationResult::new(fertilizer, &record.crop, &record.soil);

        tracing::info!(
            "Recommendation complete: fertilizer={}, crop={}, soil={}",
            result.fertilizer,
            result.crop,
            result.soil
        );

        Ok(result)
    }

    fn encode(&self, record: &MeasurementRecord) -> Result<EncodedFeatures, RecommendationFailed> {
        let encode = |field, value: &str| {
            self.encoder
                .encode(field, value)
                .map_err(|e| RecommendationFailed::new(PipelineStage::Encode, e))
        };

        Ok(EncodedFeatures {
            temperature: record.temperature,
            moisture: record.moisture,
            rainfall: f64::from(record.rainfall),
            ph: record.ph,
            nitrogen: f64::from(record.nitrogen),
            phosphorous: f64::from(record.phosphorous),
            potassium: f64::from(record.potassium),
            carbon: record.carbon,
            soil: encode(CategoricalField::Soil, &record.soil)?,
            crop: encode(CategoricalField::Crop, &record.crop)?,
        })
    }
}

impl DefaultRecommender {
    /// Build the service from a loaded artifact bundle.
    #[must_use]
    pub fn from_bundle(bundle: ArtifactBundle) -> Self {
        Self::new(
            Arc::new(bundle.encoders),
            Arc::new(bundle.scaler),
            Arc::new(bundle.model),
        )
    }

    /// Load artifacts from a model directory and build the service.
    ///
    /// # Errors
    /// Returns error if the artifacts cannot be loaded.
    pub fn load(model_dir: &Path, require_manifest: bool) -> crate::Result<Self> {
        let bundle = ArtifactBundle::load(model_dir, require_manifest)?;
        Ok(Self::from_bundle(bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{remarks::REMARKS, Feature, ScaledFeatures, FALLBACK_REMARK};
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn create_test_service() -> DefaultRecommender {
        DefaultRecommender::load(Path::new("models"), false).expect("Bundled models should load")
    }

    fn example_record() -> MeasurementRecord {
        MeasurementRecord {
            temperature: 25.0,
            moisture: 0.5,
            rainfall: 200,
            ph: 6.5,
            nitrogen: 50,
            phosphorous: 50,
            potassium: 50,
            carbon: 1.0,
            soil: "Loamy Soil".into(),
            crop: "rice".into(),
        }
    }

    #[test]
    fn test_end_to_end_example() {
        let service = create_test_service();
        let result = service.recommend(&example_record()).expect("Should recommend");

        assert!(REMARKS.iter().any(|(label, _)| *label == result.fertilizer));
        assert_eq!(result.fertilizer, "Balanced NPK Fertilizer");
        assert!(!result.remark.is_empty());
        assert_ne!(result.remark, FALLBACK_REMARK);
        assert_eq!(result.crop, "rice");
        assert_eq!(result.soil, "Loamy Soil");
    }

    #[test]
    fn test_recommendation_is_idempotent() {
        let service = create_test_service();
        let first = service.recommend(&example_record()).expect("Should recommend");
        let second = service.recommend(&example_record()).expect("Should recommend");
        assert_eq!(first, second);

        let via_input = service
            .recommend_input(&MeasurementInput::from(example_record()))
            .expect("Should recommend");
        assert_eq!(first, via_input);
    }

    #[test]
    fn test_random_valid_records_yield_known_labels() {
        let service = create_test_service();
        let soils = service.encoder().classes(CategoricalField::Soil).to_vec();
        let crops = service.encoder().classes(CategoricalField::Crop).to_vec();
        let labels = service.encoder().classes(CategoricalField::Fertilizer).to_vec();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        for _ in 0..500 {
            let record = MeasurementRecord {
                temperature: rng.gen_range(0.0..=50.0),
                moisture: rng.gen_range(0.0..=1.0),
                rainfall: rng.gen_range(0..=1000),
                ph: rng.gen_range(0.0..=14.0),
                nitrogen: rng.gen_range(0..=200),
                phosphorous: rng.gen_range(0..=200),
                potassium: rng.gen_range(0..=200),
                carbon: rng.gen_range(0.0..=5.0),
                soil: soils.choose(&mut rng).expect("soils").clone(),
                crop: crops.choose(&mut rng).expect("crops").clone(),
            };

            let result = service.recommend(&record).expect("Valid record should recommend");
            assert!(labels.contains(&result.fertilizer));
            assert!(!result.remark.is_empty());
        }
    }

    #[test]
    fn test_unknown_soil_fails_at_encode() {
        let service = create_test_service();
        let record = MeasurementRecord {
            soil: "Swamp Soil".into(),
            ..example_record()
        };

        let err = service.recommend(&record).expect_err("Should fail");
        assert_eq!(err.stage, PipelineStage::Encode);
        assert_eq!(
            err.cause,
            FailureCause::Encoding(EncoderError::UnknownCategory {
                field: CategoricalField::Soil,
                value: "Swamp Soil".into(),
            })
        );
        assert!(err.is_user_correctable());
        assert!(err.to_string().contains("Swamp Soil"));
    }

    #[test]
    fn test_unknown_crop_fails_at_encode() {
        let service = create_test_service();
        let record = MeasurementRecord {
            crop: "Rice".into(),
            ..example_record()
        };
        let err = service.recommend(&record).expect_err("Should fail");
        assert_eq!(err.stage, PipelineStage::Encode);
    }

    #[test]
    fn test_missing_field_fails_at_validate() {
        let service = create_test_service();
        let input = MeasurementInput {
            rainfall: None,
            ..MeasurementInput::from(example_record())
        };

        let err = service.recommend_input(&input).expect_err("Should fail");
        assert_eq!(err.stage, PipelineStage::Validate);
        assert_eq!(err.cause, FailureCause::MissingField(MissingField("Rainfall")));
        assert!(err.is_user_correctable());
    }

    #[test]
    fn test_non_finite_measurement_fails_at_scale() {
        let service = create_test_service();
        let record = MeasurementRecord {
            moisture: f64::NAN,
            ..example_record()
        };
        let err = service.recommend(&record).expect_err("Should fail");
        assert_eq!(err.stage, PipelineStage::Scale);
        assert!(!err.is_user_correctable());
    }

    #[test]
    fn test_positional_field_order_changes_prediction() {
        let bundle = ArtifactBundle::load(Path::new("models"), false).expect("Should load");
        let service = create_test_service();
        let encoded = service.encode(&example_record()).expect("Should encode");

        let row = encoded.ordered(bundle.scaler.layout());
        let by_name = bundle.scaler.scale(&encoded).expect("Should scale");
        assert_eq!(by_name.as_slice(), bundle.scaler.transform_positional(&row).unwrap());

        // Same values, Temperature and Rainfall swapped positionally.
        let t = bundle.scaler.layout().iter().position(|f| *f == Feature::Temperature);
        let r = bundle.scaler.layout().iter().position(|f| *f == Feature::Rainfall);
        let mut permuted = row.clone();
        permuted.swap(t.expect("temperature"), r.expect("rainfall"));
        let misordered = ScaledFeatures::new(
            bundle.scaler.transform_positional(&permuted).expect("Should scale"),
        );

        let expected = bundle.model.predict(&by_name).expect("Should predict");
        let wrong = bundle.model.predict(&misordered).expect("Should predict");
        assert_ne!(expected, wrong);
    }

    #[test]
    fn test_checked_input_rejects_out_of_range_values() {
        let service = create_test_service();
        let input = MeasurementInput {
            temperature: Some(500.0),
            ph: Some(99.0),
            ..MeasurementInput::from(example_record())
        };

        // The bare pipeline accepts it; the checked entry point does not.
        assert!(service.recommend_input(&input).is_ok());
        match service.recommend_checked(&input) {
            Err(AfrigrowError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].starts_with("Temperature"));
            }
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_checked_input_reports_missing_field_at_validate() {
        let service = create_test_service();
        let input = MeasurementInput {
            soil: None,
            ..MeasurementInput::from(example_record())
        };

        let err = service.recommend_checked(&input).expect_err("Should fail");
        assert_eq!(err.stage(), "validate");
        assert_eq!(err.detail(), "missing required field `Soil`");
    }

    #[test]
    fn test_checked_input_matches_pipeline_for_valid_form() {
        let service = create_test_service();
        let input = MeasurementInput::from(example_record());
        let checked = service.recommend_checked(&input).expect("Should recommend");
        assert_eq!(Ok(checked), service.recommend_input(&input));
    }

    #[test]
    fn test_missing_artifacts_reported_as_load_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = match DefaultRecommender::load(temp.path(), false) {
            Err(e) => e,
            Ok(_) => panic!("Empty directory should not load"),
        };
        assert!(matches!(err, AfrigrowError::Artifacts(_)));
        assert_eq!(err.stage(), "load");
    }

    // Mock artifacts to exercise failure paths that well-formed exports cannot reach.

    struct FixedEncoder {
        classes: Vec<String>,
    }

    impl CategoryEncoder for FixedEncoder {
        fn encode(&self, _field: CategoricalField, _value: &str) -> Result<u32, EncoderError> {
            Ok(0)
        }

        fn decode(&self, field: CategoricalField, code: u32) -> Result<&str, EncoderError> {
            self.classes
                .get(code as usize)
                .map(String::as_str)
                .ok_or(EncoderError::UnknownCode { field, code })
        }

        fn classes(&self, _field: CategoricalField) -> &[String] {
            &self.classes
        }
    }

    struct IdentityScaler {
        layout: Vec<Feature>,
    }

    impl FeatureScaler for IdentityScaler {
        fn scale(&self, features: &EncodedFeatures) -> Result<ScaledFeatures, ModelInputError> {
            Ok(ScaledFeatures::new(features.ordered(&self.layout)))
        }

        fn layout(&self) -> &[Feature] {
            &self.layout
        }
    }

    struct ConstantModel {
        class: u32,
    }

    impl RecommendationModel for ConstantModel {
        fn predict(&self, features: &ScaledFeatures) -> Result<u32, ModelInputError> {
            if features.len() != 10 {
                return Err(ModelInputError::FeatureCount {
                    expected: 10,
                    got: features.len(),
                });
            }
            Ok(self.class)
        }

        fn n_features(&self) -> usize {
            10
        }

        fn n_classes(&self) -> usize {
            1
        }
    }

    fn mock_service(
        width: usize,
        class: u32,
    ) -> RecommendationService<FixedEncoder, IdentityScaler, ConstantModel> {
        RecommendationService::new(
            Arc::new(FixedEncoder {
                classes: vec!["SomeUnlistedLabel".into()],
            }),
            Arc::new(IdentityScaler {
                layout: Feature::ALL[..width].to_vec(),
            }),
            Arc::new(ConstantModel { class }),
        )
    }

    #[test]
    fn test_unlisted_label_gets_fallback_remark() {
        let result = mock_service(10, 0)
            .recommend(&example_record())
            .expect("Should recommend");
        assert_eq!(result.fertilizer, "SomeUnlistedLabel");
        assert_eq!(result.remark, FALLBACK_REMARK);
    }

    #[test]
    fn test_malformed_vector_fails_at_predict() {
        let err = mock_service(9, 0)
            .recommend(&example_record())
            .expect_err("Should fail");
        assert_eq!(err.stage, PipelineStage::Predict);
        assert_eq!(
            err.cause,
            FailureCause::ModelInput(ModelInputError::FeatureCount {
                expected: 10,
                got: 9
            })
        );
        assert!(!err.is_user_correctable());
    }

    #[test]
    fn test_out_of_vocabulary_class_fails_at_decode() {
        let err = mock_service(10, 7)
            .recommend(&example_record())
            .expect_err("Should fail");
        assert_eq!(err.stage, PipelineStage::Decode);
        assert!(!err.is_user_correctable());
    }
}
