//! Soil, crop and climate measurements for fertilizer recommendation.
//!
//! Field names follow the columns the model was trained on:
//! Temperature, Moisture, Rainfall, PH, Nitrogen, Phosphorous, Potassium, Carbon, Soil, Crop

use serde::{Deserialize, Serialize};

/// Inbound measurements as they arrive from a form, JSON body or file.
///
/// Every field is optional here; turning this into a [`MeasurementRecord`] is
/// the structural presence check. No defaults are substituted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementInput {
    #[serde(rename = "Temperature", alias = "temperature", default)]
    pub temperature: Option<f64>,

    #[serde(rename = "Moisture", alias = "moisture", default)]
    pub moisture: Option<f64>,

    #[serde(rename = "Rainfall", alias = "rainfall", default)]
    pub rainfall: Option<u32>,

    #[serde(rename = "PH", alias = "ph", default)]
    pub ph: Option<f64>,

    #[serde(rename = "Nitrogen", alias = "nitrogen", default)]
    pub nitrogen: Option<u32>,

    #[serde(rename = "Phosphorous", alias = "phosphorous", default)]
    pub phosphorous: Option<u32>,

    #[serde(rename = "Potassium", alias = "potassium", default)]
    pub potassium: Option<u32>,

    #[serde(rename = "Carbon", alias = "carbon", default)]
    pub carbon: Option<f64>,

    #[serde(rename = "Soil", alias = "soil", default)]
    pub soil: Option<String>,

    #[serde(rename = "Crop", alias = "crop", default)]
    pub crop: Option<String>,
}

/// A required field was absent from the inbound measurements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing required field `{0}`")]
pub struct MissingField(pub &'static str);

/// Complete measurement record for one recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Air temperature in °C (0-50)
    pub temperature: f64,

    /// Soil moisture, 0 = dry, 1 = saturated
    pub moisture: f64,

    /// Rainfall in mm (0-1000)
    pub rainfall: u32,

    /// Soil pH (0-14)
    pub ph: f64,

    /// Nitrogen in mg/kg (0-200)
    pub nitrogen: u32,

    /// Phosphorous in mg/kg (0-200)
    pub phosphorous: u32,

    /// Potassium in mg/kg (0-200)
    pub potassium: u32,

    /// Organic carbon content in % (0-5)
    pub carbon: f64,

    /// Soil type, e.g. "Loamy Soil"
    pub soil: String,

    /// Crop name, e.g. "rice"
    pub crop: String,
}

impl TryFrom<MeasurementInput> for MeasurementRecord {
    type Error = MissingField;

    fn try_from(input: MeasurementInput) -> Result<Self, Self::Error> {
        Ok(Self {
            temperature: input.temperature.ok_or(MissingField("Temperature"))?,
            moisture: input.moisture.ok_or(MissingField("Moisture"))?,
            rainfall: input.rainfall.ok_or(MissingField("Rainfall"))?,
            ph: input.ph.ok_or(MissingField("PH"))?,
            nitrogen: input.nitrogen.ok_or(MissingField("Nitrogen"))?,
            phosphorous: input.phosphorous.ok_or(MissingField("Phosphorous"))?,
            potassium: input.potassium.ok_or(MissingField("Potassium"))?,
            carbon: input.carbon.ok_or(MissingField("Carbon"))?,
            soil: input.soil.ok_or(MissingField("Soil"))?,
            crop: input.crop.ok_or(MissingField("Crop"))?,
        })
    }
}

impl From<MeasurementRecord> for MeasurementInput {
    fn from(record: MeasurementRecord) -> Self {
        Self {
            temperature: Some(record.temperature),
            moisture: Some(record.moisture),
            rainfall: Some(record.rainfall),
            ph: Some(record.ph),
            nitrogen: Some(record.nitrogen),
            phosphorous: Some(record.phosphorous),
            potassium: Some(record.potassium),
            carbon: Some(record.carbon),
            soil: Some(record.soil),
            crop: Some(record.crop),
        }
    }
}

impl MeasurementRecord {
    /// Check that every numeric measurement lies within the range the input
    /// form accepts.
    ///
    /// The recommendation pipeline does not call this; range checks belong to
    /// whatever collects the measurements.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        check_range(&mut errors, "Temperature", self.temperature, 0.0, 50.0);
        check_range(&mut errors, "Moisture", self.moisture, 0.0, 1.0);
        check_range(&mut errors, "Rainfall", f64::from(self.rainfall), 0.0, 1000.0);
        check_range(&mut errors, "PH", self.ph, 0.0, 14.0);
        check_range(&mut errors, "Carbon", self.carbon, 0.0, 5.0);
        check_range(&mut errors, "Nitrogen", f64::from(self.nitrogen), 0.0, 200.0);
        check_range(&mut errors, "Phosphorous", f64::from(self.phosphorous), 0.0, 200.0);
        check_range(&mut errors, "Potassium", f64::from(self.potassium), 0.0, 200.0);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_range(errors: &mut Vec<String>, name: &str, value: f64, min: f64, max: f64) {
    // NaN fails `contains`, so it is reported as out of range too.
    if !(min..=max).contains(&value) {
        errors.push(format!("{name} {value} out of range [{min}, {max}]"));
    }
}
