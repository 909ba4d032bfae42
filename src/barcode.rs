use crate::geometry::{Offset, Size};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Symbologies a native detector can be asked to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    Unknown,
    Code128,
    Code39,
    Code93,
    Codabar,
    DataMatrix,
    Ean13,
    Ean8,
    Itf,
    QrCode,
    Upca,
    Upce,
    Pdf417,
    Aztec,
}

/// Camera direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    Front,
    #[default]
    Back,
}

impl CameraFacing {
    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

/// How aggressively detection results are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSpeed {
    /// Suppress results identical to the previous detection
    NoDuplicates,
    /// At most one result per detection timeout
    #[default]
    Normal,
    /// Every analyzed frame
    Unrestricted,
}

/// Torch (flash) state reported by the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorchState {
    #[default]
    Unavailable,
    Off,
    On,
    Auto,
}

/// A single decoded barcode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barcode {
    pub format: BarcodeFormat,
    pub raw_value: Option<String>,
    pub display_value: Option<String>,
    /// Corner points in texture pixels, clockwise from top-left
    pub corners: Vec<Offset>,
}

impl Barcode {
    pub fn new<S: Into<String>>(format: BarcodeFormat, raw_value: S) -> Self {
        let raw_value = raw_value.into();
        Self {
            format,
            display_value: Some(raw_value.clone()),
            raw_value: Some(raw_value),
            corners: Vec::new(),
        }
    }
}

/// A batch of barcodes decoded from one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub barcodes: Vec<Barcode>,
    pub timestamp: DateTime<Utc>,
    /// Size of the analyzed image, when the bridge reports it
    pub image_size: Option<Size>,
}

impl Detection {
    pub fn new(barcodes: Vec<Barcode>) -> Self {
        Self {
            barcodes,
            timestamp: Utc::now(),
            image_size: None,
        }
    }

    /// Raw values of every barcode in the batch, ignoring order
    pub fn raw_values(&self) -> BTreeSet<&str> {
        self.barcodes
            .iter()
            .filter_map(|barcode| barcode.raw_value.as_deref())
            .collect()
    }
}
