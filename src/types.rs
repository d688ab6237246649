//! Typed records returned by the inference endpoints.

use serde::{Deserialize, Serialize};

/// One inference result fetched from the API.
///
/// An endpoint query may match zero, one, or many inferences; each carries
/// the pre-signed URLs of its segmentation artifacts. By the time a caller
/// holds an `Inference`, those artifacts have been downloaded into the
/// destination directory the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inference {
    /// The model that produced this inference.
    pub model_id: String,

    /// Medical record number of the patient the inference belongs to.
    pub patient_mrn: String,

    /// Pre-signed, time-limited download URLs for the segmentation
    /// artifacts.
    pub segmentation_presigned_urls: Vec<String>,
}

/// Wire form of one record in the resource endpoint's JSON array. The
/// server guarantees the artifact URL list at minimum; identifiers are
/// filled in from the caller's query.
#[derive(Debug, Deserialize)]
pub(crate) struct InferenceRecord {
    pub(crate) segmentation_presigned_urls: Vec<String>,
}
