//! Explanatory remarks shown next to a recommended fertilizer.

/// Returned for any label without its own remark.
pub const FALLBACK_REMARK: &str = "Optimal for your current soil and crop conditions.";

/// Remarks for the fertilizer classes the model was trained on.
pub const REMARKS: [(&str, &str); 10] = [
    (
        "Compost",
        "Enhances organic matter and improves soil structure. Ideal for building long-term soil health.",
    ),
    (
        "Balanced NPK Fertilizer",
        "Provides equal nitrogen, phosphorus, and potassium for general crop nutrition.",
    ),
    (
        "Water Retaining Fertilizer",
        "Helps soil retain moisture, perfect for drought-prone areas.",
    ),
    (
        "Organic Fertilizer",
        "Natural nutrients from plant/animal sources. Improves soil biology.",
    ),
    (
        "Gypsum",
        "Improves soil structure and reduces compaction in clay soils.",
    ),
    (
        "Lime",
        "Raises soil pH in acidic soils. Essential for calcium/magnesium.",
    ),
    (
        "DAP",
        "Diammonium phosphate - high phosphorus starter fertilizer.",
    ),
    (
        "Urea",
        "High nitrogen content for vigorous vegetative growth.",
    ),
    (
        "Muriate of Potash",
        "Provides potassium for fruit quality and disease resistance.",
    ),
    (
        "General Purpose Fertilizer",
        "Balanced blend suitable for most crops.",
    ),
];

/// Remark for a fertilizer label, or [`FALLBACK_REMARK`] when the label is not listed.
#[must_use]
pub fn remark_for(label: &str) -> &'static str {
    REMARKS
        .iter()
        .find(|(name, _)| *name == label)
        .map_or(FALLBACK_REMARK, |(_, remark)| *remark)
}
