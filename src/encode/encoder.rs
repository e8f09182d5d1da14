use ndarray::{Array1, Array2, ArrayViewMut1};
use tracing::{debug, info};

use crate::element::element_model::{ElementFeatures, FEATURE_COLUMN_COUNT};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("cannot fit an encoder on an empty snapshot")]
    EmptySnapshot,
}

// ============================================================================
// One-hot encoding
// ============================================================================

/// One-hot encoder over the fixed feature columns.
///
/// Each column gets one output slot per distinct value seen at fit time (null
/// included, as its own category). A value never seen during fit encodes to
/// all zeros for that column.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotEncoder {
    /// Sorted categories per column
    categories: Vec<Vec<Option<String>>>,
    /// Start of each column's slots in the output vector
    offsets: Vec<usize>,
    width: usize,
}

impl OneHotEncoder {
    pub fn fit(records: &[ElementFeatures]) -> Result<Self, EncodeError> {
        if records.is_empty() {
            return Err(EncodeError::EmptySnapshot);
        }

        let mut categories: Vec<Vec<Option<String>>> = vec![Vec::new(); FEATURE_COLUMN_COUNT];
        for record in records {
            for (column, value) in record.column_values().into_iter().enumerate() {
                let seen = &mut categories[column];
                if let Err(at) = seen.binary_search_by(|c| c.as_deref().cmp(&value)) {
                    seen.insert(at, value.map(str::to_string));
                }
            }
        }

        let mut offsets = Vec::with_capacity(FEATURE_COLUMN_COUNT);
        let mut width = 0;
        for column in &categories {
            offsets.push(width);
            width += column.len();
        }

        debug!(width, rows = records.len(), "encoder fitted");
        Ok(Self {
            categories,
            offsets,
            width,
        })
    }

    /// Length of an encoded vector.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn categories(&self, column: usize) -> &[Option<String>] {
        &self.categories[column]
    }

    pub fn transform(&self, records: &[ElementFeatures]) -> Array2<f64> {
        let mut matrix = Array2::zeros((records.len(), self.width));
        for (record, row) in records.iter().zip(matrix.rows_mut()) {
            self.encode_into(record, row);
        }
        matrix
    }

    /// Encode one record into the fitted space.
    pub fn transform_query(&self, record: &ElementFeatures) -> Array1<f64> {
        let mut vector = Array1::zeros(self.width);
        self.encode_into(record, vector.view_mut());
        vector
    }

    fn encode_into(&self, record: &ElementFeatures, mut out: ArrayViewMut1<'_, f64>) {
        for (column, value) in record.column_values().into_iter().enumerate() {
            let seen = &self.categories[column];
            if let Ok(slot) = seen.binary_search_by(|c| c.as_deref().cmp(&value)) {
                out[self.offsets[column] + slot] = 1.0;
            }
        }
    }
}

/// Fit on the snapshot and encode it.
pub fn fit_transform(
    snapshot: &[ElementFeatures],
) -> Result<(OneHotEncoder, Array2<f64>), EncodeError> {
    let encoder = OneHotEncoder::fit(snapshot)?;
    let matrix = encoder.transform(snapshot);
    Ok((encoder, matrix))
}

/// A snapshot and a query encoded into the same space.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPage {
    pub matrix: Array2<f64>,
    pub query: Array1<f64>,
}

/// Encode snapshot and query together; either both succeed or neither.
pub fn encode(snapshot: &[ElementFeatures], query: &ElementFeatures) -> Result<EncodedPage, EncodeError> {
    let (encoder, matrix) = fit_transform(snapshot)?;
    info!(rows = matrix.nrows(), width = encoder.width(), "page encoded");
    let query = encoder.transform_query(query);
    debug!("element encoded");
    Ok(EncodedPage { matrix, query })
}
