//! Parameter checkpoints.
//!
//! The evaluator hands the current best parameters to a [`CheckpointSink`].
//! With the `serde` feature, [`JsonCheckpointDir`] writes them as versioned JSON
//! files named after the score and the topology.
//!
//! Design notes:
//! - The on-disk format is a dedicated `SerializedParams` struct rather than the
//!   in-memory types, so internal layout can change without breaking files.
//! - Loading validates shapes, the format version and that all values are finite.

use crate::{ParameterSet, Topology};

#[cfg(feature = "serde")]
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use log::{info, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use crate::{Error, Matrix, Result};

/// Destination for best-model snapshots.
///
/// Implementations report failure by returning `false`; training carries on
/// either way.
pub trait CheckpointSink {
    fn save(&mut self, params: &ParameterSet, topology: &Topology, score: usize) -> bool;
}

/// Sink that discards every checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCheckpoints;

impl CheckpointSink for NoCheckpoints {
    fn save(&mut self, _params: &ParameterSet, _topology: &Topology, _score: usize) -> bool {
        false
    }
}

pub const PARAMS_FORMAT_VERSION: u32 = 1;

#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedParams {
    pub format_version: u32,
    pub topology: Vec<usize>,
    pub layers: Vec<SerializedLayer>,
}

#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLayer {
    pub in_dim: usize,
    pub out_dim: usize,
    /// Row-major (out_dim, in_dim).
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

#[cfg(feature = "serde")]
impl SerializedParams {
    pub fn validate(&self) -> Result<()> {
        if self.format_version != PARAMS_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported params format_version {}; expected {}",
                self.format_version, PARAMS_FORMAT_VERSION
            )));
        }
        let topology = Topology::new(&self.topology)?;
        if self.layers.len() != topology.num_transitions() {
            return Err(Error::InvalidData(format!(
                "topology {topology} needs {} layers, file has {}",
                topology.num_transitions(),
                self.layers.len()
            )));
        }

        let expected = topology.transitions();
        for (i, (layer, (out_dim, in_dim))) in self.layers.iter().zip(expected).enumerate() {
            if layer.in_dim != in_dim || layer.out_dim != out_dim {
                return Err(Error::InvalidData(format!(
                    "layer {i} is {}x{}, topology expects {out_dim}x{in_dim}",
                    layer.out_dim, layer.in_dim
                )));
            }
            let expected_w = in_dim.checked_mul(out_dim).ok_or_else(|| {
                Error::InvalidData(format!("layer {i} weight shape overflows"))
            })?;
            if layer.weights.len() != expected_w {
                return Err(Error::InvalidData(format!(
                    "layer {i} weights length {} does not match {out_dim} * {in_dim}",
                    layer.weights.len()
                )));
            }
            if layer.biases.len() != out_dim {
                return Err(Error::InvalidData(format!(
                    "layer {i} biases length {} does not match out_dim {out_dim}",
                    layer.biases.len()
                )));
            }
            if layer.weights.iter().chain(&layer.biases).any(|v| !v.is_finite()) {
                return Err(Error::InvalidData(format!("layer {i} contains non-finite values")));
            }
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl From<&ParameterSet> for SerializedParams {
    fn from(params: &ParameterSet) -> Self {
        let mut topology = Vec::with_capacity(params.num_transitions() + 1);
        let mut layers = Vec::with_capacity(params.num_transitions());
        for l in 0..params.num_transitions() {
            let w = params.weights(l);
            if l == 0 {
                topology.push(w.cols());
            }
            topology.push(w.rows());
            layers.push(SerializedLayer {
                in_dim: w.cols(),
                out_dim: w.rows(),
                weights: w.as_slice().to_vec(),
                biases: params.biases(l).as_slice().to_vec(),
            });
        }
        Self {
            format_version: PARAMS_FORMAT_VERSION,
            topology,
            layers,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<SerializedParams> for ParameterSet {
    type Error = Error;

    fn try_from(value: SerializedParams) -> std::result::Result<Self, Self::Error> {
        value.validate()?;
        let topology = Topology::new(&value.topology)?;

        let mut weights = Vec::with_capacity(value.layers.len());
        let mut biases = Vec::with_capacity(value.layers.len());
        for layer in value.layers {
            weights.push(Matrix::from_vec(layer.out_dim, layer.in_dim, layer.weights)?);
            biases.push(Matrix::from_vec(layer.out_dim, 1, layer.biases)?);
        }
        ParameterSet::new(&topology, weights, biases)
    }
}

/// Serialize parameters to a pretty-printed JSON string.
#[cfg(feature = "serde")]
pub fn to_json_string_pretty(params: &ParameterSet) -> Result<String> {
    serde_json::to_string_pretty(&SerializedParams::from(params))
        .map_err(|e| Error::InvalidData(format!("failed to serialize parameters: {e}")))
}

/// Parse parameters from a JSON string.
#[cfg(feature = "serde")]
pub fn from_json_str(s: &str) -> Result<ParameterSet> {
    let ser: SerializedParams = serde_json::from_str(s)
        .map_err(|e| Error::InvalidData(format!("failed to parse parameters json: {e}")))?;
    ser.try_into()
}

#[cfg(feature = "serde")]
pub fn save_params(params: &ParameterSet, path: &Path) -> Result<()> {
    let s = to_json_string_pretty(params)?;
    std::fs::write(path, s)
        .map_err(|e| Error::Io(format!("failed to write {}: {e}", path.display())))
}

#[cfg(feature = "serde")]
pub fn load_params(path: &Path) -> Result<ParameterSet> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("failed to read {}: {e}", path.display())))?;
    from_json_str(&s)
}

/// Writes each checkpoint to `{dir}/params-{score}-{topology}.json`.
#[cfg(feature = "serde")]
#[derive(Debug, Clone)]
pub struct JsonCheckpointDir {
    dir: PathBuf,
}

#[cfg(feature = "serde")]
impl JsonCheckpointDir {
    /// The directory is created lazily on the first save.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, topology: &Topology, score: usize) -> PathBuf {
        let shape = topology
            .sizes()
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join("-");
        self.dir.join(format!("params-{score}-[{shape}].json"))
    }

    fn try_save(
        &self,
        params: &ParameterSet,
        topology: &Topology,
        score: usize,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Io(format!("failed to create {}: {e}", self.dir.display())))?;
        let path = self.path_for(topology, score);
        save_params(params, &path)?;
        Ok(path)
    }
}

#[cfg(feature = "serde")]
impl CheckpointSink for JsonCheckpointDir {
    fn save(&mut self, params: &ParameterSet, topology: &Topology, score: usize) -> bool {
        match self.try_save(params, topology, score) {
            Ok(path) => {
                info!("saved parameters scoring {score} to {}", path.display());
                true
            }
            Err(e) => {
                warn!("checkpoint for score {score} not saved: {e}");
                false
            }
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    fn small_params() -> ParameterSet {
        let t = Topology::new(&[2, 3, 1]).unwrap();
        ParameterSet::new(
            &t,
            vec![
                Matrix::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
                Matrix::from_vec(1, 3, vec![7.0, 8.0, 9.0]).unwrap(),
            ],
            vec![Matrix::column(&[0.1, 0.2, 0.3]), Matrix::column(&[0.4])],
        )
        .unwrap()
    }

    #[test]
    fn golden_json_is_stable_and_roundtrips() {
        let json = to_json_string_pretty(&small_params()).unwrap();

        let golden = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/golden/params_v1.json"
        ))
        .trim_end();
        assert_eq!(json, golden);

        let loaded = from_json_str(golden).unwrap();
        assert_eq!(loaded, small_params());
    }

    #[test]
    fn rejects_unknown_version() {
        let bad = r#"{"format_version":999,"topology":[2,1],"layers":[]}"#;
        let err = from_json_str(bad).unwrap_err();
        assert!(format!("{err}").contains("format_version"));
    }

    #[test]
    fn rejects_layer_shape_mismatch() {
        let bad = r#"{"format_version":1,"topology":[2,1],"layers":[{"in_dim":2,"out_dim":1,"weights":[1.0],"biases":[0.0]}]}"#;
        let err = from_json_str(bad).unwrap_err();
        assert!(format!("{err}").contains("weights length"));
    }

    #[test]
    fn rejects_weight_shape_that_overflows() {
        let bad = r#"{"format_version":1,"topology":[9223372036854775808,3],"layers":[{"in_dim":9223372036854775808,"out_dim":3,"weights":[],"biases":[0.0,0.0,0.0]}]}"#;
        let err = from_json_str(bad).unwrap_err();
        assert!(matches!(&err, Error::InvalidData(msg) if msg.contains("overflows")), "{err}");
    }

    #[test]
    fn directory_sink_names_files_by_score_and_topology() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonCheckpointDir::new(dir.path().join("ckpt"));
        let params = small_params();
        let topology = params.topology().unwrap();

        assert!(sink.save(&params, &topology, 9_512));
        let path = dir.path().join("ckpt").join("params-9512-[2-3-1].json");
        assert_eq!(load_params(&path).unwrap(), params);
    }

    #[test]
    fn directory_sink_reports_failure_instead_of_erroring() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let mut sink = JsonCheckpointDir::new(&blocker);
        let params = small_params();
        assert!(!sink.save(&params, &params.topology().unwrap(), 1));
    }
}
